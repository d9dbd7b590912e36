//! Lifecycle and progress events.
//!
//! [`JobEvent`] is the external notification surface: the orchestrator
//! broadcasts them to zero-or-more subscribers with best-effort delivery
//! (a lagging subscriber drops old events rather than blocking the job).
//!
//! [`StageEvent`] is the internal upward channel from pipeline stages to
//! the orchestrator's supervisor, which is the only writer of job state.

use tokio::sync::broadcast;

/// Events emitted to external subscribers over the life of one job.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// The job transitioned to running.
    Started,

    /// Progress changed materially.
    Progress {
        /// Percent complete, clamped to `[0, 100]`.
        percent: f64,
        /// Documents written so far.
        docs_written: u64,
    },

    /// The estimated total record count was revised (line-delimited
    /// imports where the true count is unknowable upfront).
    GuesstimatedTotal(u64),

    /// The job finished normally.
    Completed {
        docs_written: u64,
        docs_failed: u64,
    },

    /// The job was canceled by the user.
    Canceled { docs_written: u64 },

    /// A fatal error halted the job.
    Failed { message: String },
}

/// Capacity of the broadcast buffer; slow subscribers lag past this.
pub(crate) const EVENT_BUFFER: usize = 256;

/// Fan-out sender with subscription management.
#[derive(Debug)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    /// Subscribe to job events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    /// Best-effort emit; having no subscribers is not an error.
    pub fn emit(&self, event: JobEvent) {
        let _ = self.sender.send(event);
    }
}

/// Events pipeline stages report upward to the supervisor.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StageEvent {
    /// The exact total record count is known upfront (export).
    ExactTotal(u64),

    /// Revised guesstimated total record count (import).
    GuesstimatedTotal(u64),

    /// Additional input bytes consumed (import).
    BytesProcessed(u64),

    /// A batch finished at the sink; deltas, not totals.
    DocsWritten { written: u64, failed: u64 },

    /// One record was skipped under continue-on-error.
    RecordFailed,
}
