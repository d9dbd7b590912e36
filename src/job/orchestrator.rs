//! The job orchestrator.
//!
//! Owns the lifecycle state machine and wires pipelines together. At most
//! one job is active at a time: `start_*` while a job is running is
//! rejected outright, with no queueing. All state mutation happens here,
//! in the supervisor task; stages only send [`StageEvent`]s upward.

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collection::{BulkSink, DocumentSource};
use crate::config::JobConfig;
use crate::error::{JobError, Result};

use super::events::{EventBus, JobEvent, StageEvent};
use super::{JobState, JobStatus, PipelineSummary};

/// Capacity of the stage-event channel from pipeline to supervisor.
const STAGE_EVENT_BUFFER: usize = 256;

/// Orchestrates one import or export job at a time.
pub struct JobOrchestrator {
    status: Arc<Mutex<JobStatus>>,
    events: Arc<EventBus>,
    cancel: Mutex<Option<CancellationToken>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl JobOrchestrator {
    /// Create an orchestrator in the idle state.
    pub fn new() -> Self {
        Self {
            status: Arc::new(Mutex::new(JobStatus::default())),
            events: Arc::new(EventBus::new()),
            cancel: Mutex::new(None),
            supervisor: Mutex::new(None),
        }
    }

    /// Subscribe to lifecycle and progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current job status.
    pub fn status(&self) -> JobStatus {
        self.status.lock().expect("status lock").clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        self.status.lock().expect("status lock").state
    }

    /// Start an import job.
    ///
    /// Validates the configuration synchronously; the job never
    /// transitions to running on a validation failure. Rejected with
    /// [`JobError::AlreadyRunning`] if a job is active.
    ///
    /// # Arguments
    /// * `config` - Import configuration, immutable for this job
    /// * `sink` - Destination for typed document batches
    pub fn start_import(&self, config: JobConfig, sink: Box<dyn BulkSink>) -> Result<()> {
        config.validate()?;
        let file_size = std::fs::metadata(&config.file_path)?.len();

        let token = self.begin()?;
        info!(
            "starting import of {} ({} bytes)",
            config.file_path.display(),
            file_size
        );

        let (stage_tx, stage_rx) = mpsc::channel(STAGE_EVENT_BUFFER);
        let pipeline = tokio::spawn(crate::import::run_import_pipeline(
            config,
            sink,
            stage_tx,
            token.clone(),
        ));
        self.launch_supervisor(stage_rx, pipeline, Some(file_size));
        self.events.emit(JobEvent::Started);
        Ok(())
    }

    /// Start an export job.
    ///
    /// # Arguments
    /// * `config` - Export configuration, immutable for this job
    /// * `source` - Cursor-like producer over the query result
    pub fn start_export(&self, config: JobConfig, source: Box<dyn DocumentSource>) -> Result<()> {
        config.validate()?;

        let token = self.begin()?;
        info!("starting export to {}", config.file_path.display());

        let (stage_tx, stage_rx) = mpsc::channel(STAGE_EVENT_BUFFER);
        let pipeline = tokio::spawn(crate::export::run_export_pipeline(
            config,
            source,
            stage_tx,
            token.clone(),
        ));
        self.launch_supervisor(stage_rx, pipeline, None);
        self.events.emit(JobEvent::Started);
        Ok(())
    }

    /// Cancel the running job.
    ///
    /// Latches the canceling state and detaches the source at the next
    /// suspension point. Idempotent: canceling twice, or canceling a job
    /// that already reached a terminal state, is a no-op.
    pub fn cancel(&self) {
        {
            let mut status = self.status.lock().expect("status lock");
            if status.state != JobState::Running {
                debug!("no running job to cancel");
                return;
            }
            status.state = JobState::Canceling;
        }
        if let Some(token) = self.cancel.lock().expect("cancel lock").as_ref() {
            token.cancel();
        }
        info!("job canceled by user");
    }

    /// Acknowledge a finished job, returning the slot to idle.
    ///
    /// No-op while a job is active.
    pub fn acknowledge(&self) {
        let mut status = self.status.lock().expect("status lock");
        if status.state.is_terminal() {
            *status = JobStatus::default();
        }
    }

    /// Wait for the current job to reach a terminal state.
    pub async fn wait(&self) {
        let handle = self.supervisor.lock().expect("supervisor lock").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Claim the job slot and reset progress. Fails if a job is active.
    fn begin(&self) -> Result<CancellationToken> {
        let mut status = self.status.lock().expect("status lock");
        if status.state.is_active() {
            return Err(JobError::AlreadyRunning.into());
        }
        *status = JobStatus {
            state: JobState::Running,
            ..JobStatus::default()
        };
        drop(status);

        let token = CancellationToken::new();
        *self.cancel.lock().expect("cancel lock") = Some(token.clone());
        Ok(token)
    }

    fn launch_supervisor(
        &self,
        stage_rx: mpsc::Receiver<StageEvent>,
        pipeline: JoinHandle<Result<PipelineSummary>>,
        total_bytes: Option<u64>,
    ) {
        let status = Arc::clone(&self.status);
        let events = Arc::clone(&self.events);
        let handle = tokio::spawn(supervise(status, events, stage_rx, pipeline, total_bytes));
        *self.supervisor.lock().expect("supervisor lock") = Some(handle);
    }
}

impl Default for JobOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Drain stage events into job status, then settle the terminal state.
///
/// A latched `Canceling` always wins: a pipeline that finishes (or fails
/// while draining) after cancellation still terminates as `Canceled`,
/// never `Completed` or `Failed`.
async fn supervise(
    status: Arc<Mutex<JobStatus>>,
    events: Arc<EventBus>,
    mut stage_rx: mpsc::Receiver<StageEvent>,
    pipeline: JoinHandle<Result<PipelineSummary>>,
    total_bytes: Option<u64>,
) {
    while let Some(event) = stage_rx.recv().await {
        fold_event(&status, &events, event, total_bytes);
    }

    let result = pipeline.await;
    let mut status = status.lock().expect("status lock");
    let cancel_latched = matches!(
        status.state,
        JobState::Canceling | JobState::Canceled
    );

    match result {
        Ok(Ok(summary)) => {
            status.progress.docs_written = status.progress.docs_written.max(summary.docs_written);
            status.progress.docs_failed = status.progress.docs_failed.max(summary.docs_failed);
            if cancel_latched {
                status.state = JobState::Canceled;
                events.emit(JobEvent::Canceled {
                    docs_written: status.progress.docs_written,
                });
            } else {
                status.state = JobState::Completed;
                status.progress.percent = 100.0;
                events.emit(JobEvent::Completed {
                    docs_written: status.progress.docs_written,
                    docs_failed: status.progress.docs_failed,
                });
                info!(
                    "job completed: {} written, {} failed",
                    status.progress.docs_written, status.progress.docs_failed
                );
            }
        }
        Ok(Err(error)) => {
            if cancel_latched {
                // Errors raised while draining after cancel are expected
                status.state = JobState::Canceled;
                events.emit(JobEvent::Canceled {
                    docs_written: status.progress.docs_written,
                });
            } else {
                let message = error.to_string();
                warn!("job failed: {}", message);
                status.state = JobState::Failed;
                status.error = Some(message.clone());
                events.emit(JobEvent::Failed { message });
            }
        }
        Err(join_error) => {
            let message = format!("pipeline task panicked: {join_error}");
            status.state = JobState::Failed;
            status.error = Some(message.clone());
            events.emit(JobEvent::Failed { message });
        }
    }
}

/// Fold one stage event into progress state, emitting external events
/// when something material changed. Progress is monotone and clamped.
pub(super) fn fold_event(
    status: &Arc<Mutex<JobStatus>>,
    events: &Arc<EventBus>,
    event: StageEvent,
    total_bytes: Option<u64>,
) {
    let mut status = status.lock().expect("status lock");
    let cancel_latched = matches!(
        status.state,
        JobState::Canceling | JobState::Canceled
    );

    match event {
        StageEvent::ExactTotal(total) => {
            status.progress.total_known = true;
            status.progress.estimated_total = total;
        }
        StageEvent::GuesstimatedTotal(total) => {
            status.progress.estimated_total = total;
            events.emit(JobEvent::GuesstimatedTotal(total));
        }
        StageEvent::BytesProcessed(delta) => {
            status.progress.bytes_processed += delta;
            if let Some(total) = total_bytes.filter(|&t| t > 0) {
                let percent =
                    (status.progress.bytes_processed as f64 / total as f64 * 100.0).min(100.0);
                let crossed = percent.floor() > status.progress.percent.floor();
                status.progress.percent = status.progress.percent.max(percent);
                if crossed && !cancel_latched {
                    events.emit(JobEvent::Progress {
                        percent: status.progress.percent,
                        docs_written: status.progress.docs_written,
                    });
                }
            }
        }
        StageEvent::DocsWritten { written, failed } => {
            // Results landing after cancellation are discarded for
            // progress-counting purposes
            if cancel_latched {
                return;
            }
            status.progress.docs_written += written;
            status.progress.docs_failed += failed;
            if total_bytes.is_none() && status.progress.estimated_total > 0 {
                let percent = (status.progress.docs_written as f64
                    / status.progress.estimated_total as f64
                    * 100.0)
                    .min(100.0);
                status.progress.percent = status.progress.percent.max(percent);
            }
            events.emit(JobEvent::Progress {
                percent: status.progress.percent,
                docs_written: status.progress.docs_written,
            });
        }
        StageEvent::RecordFailed => {
            status.progress.docs_failed += 1;
        }
    }
}
