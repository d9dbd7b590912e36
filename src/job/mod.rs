//! Job lifecycle: state machine, progress tracking and orchestration.
//!
//! A job moves through `Idle → Running → {Completed | Canceled | Failed}`,
//! with `Running → Canceling → Canceled` on user cancellation. The
//! [`JobOrchestrator`] is the single writer of job state: pipeline stages
//! only report events upward, and the orchestrator folds them into
//! [`ProgressState`] and re-broadcasts them as [`JobEvent`]s.

pub mod events;
pub mod orchestrator;

pub use events::JobEvent;
pub use orchestrator::JobOrchestrator;


/// Lifecycle state of the single job slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    /// No job has run, or a finished job has been acknowledged.
    #[default]
    Idle,

    /// A pipeline is executing.
    Running,

    /// Cancellation latched; the pipeline is draining.
    Canceling,

    /// End of input reached with no unrecovered error.
    Completed,

    /// Canceled by the user before end of input.
    Canceled,

    /// A fatal error halted the pipeline.
    Failed,
}

impl JobState {
    /// Whether the job slot is occupied.
    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Running | JobState::Canceling)
    }

    /// Whether the job reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Canceled | JobState::Failed
        )
    }
}

/// Progress of the running (or finished) job.
///
/// Monotonically non-decreasing while a job runs; reset only when a new
/// job starts.
#[derive(Debug, Clone, Default)]
pub struct ProgressState {
    /// Bytes of input consumed (import only).
    pub bytes_processed: u64,

    /// Percent complete, clamped to `[0, 100]`.
    pub percent: f64,

    /// Whether `estimated_total` is exact (export) or a guesstimate
    /// (line-delimited import).
    pub total_known: bool,

    /// Exact or estimated total record count. Advisory for display only,
    /// never used to gate completion.
    pub estimated_total: u64,

    /// Documents written to the sink so far.
    pub docs_written: u64,

    /// Per-record failures skipped so far.
    pub docs_failed: u64,
}

/// Snapshot of the job slot: state, progress and terminal error.
#[derive(Debug, Clone, Default)]
pub struct JobStatus {
    /// Lifecycle state.
    pub state: JobState,

    /// Progress counters.
    pub progress: ProgressState,

    /// Fatal error message, set only in `Failed`.
    pub error: Option<String>,
}

/// Totals a pipeline reports when it finishes on its own.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PipelineSummary {
    pub docs_written: u64,
    pub docs_failed: u64,
}
