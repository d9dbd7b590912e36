//! The import pipeline.
//!
//! Wires file → parse → blank-filter → project/coerce → batch → sink as
//! a chain of stages connected by bounded channels. The parser runs on a
//! blocking thread and applies backpressure through the channel: a slow
//! sink suspends parsing rather than buffering the file in memory, so
//! end-to-end memory use stays O(batch size), independent of file size.
//!
//! Cancellation is cooperative: the token is checked at every handoff,
//! and once latched, in-flight write results are discarded for
//! progress-counting purposes.

use bson::Document;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::collection::{BATCH_SIZE, BulkSink};
use crate::config::{FileFormat, JobConfig};
use crate::error::{MongoportError, ParseError, Result};
use crate::job::events::StageEvent;
use crate::job::PipelineSummary;
use crate::parser::{RawRecord, make_parser};

pub mod blanks;
pub mod guesstimator;
pub mod preview;
pub mod projection;

pub use preview::{FieldSample, Preview, preview_file};
pub use projection::Projection;

use blanks::remove_blanks;
use guesstimator::SizeGuesstimator;

/// Capacity of the parser → transform handoff buffer, in records.
const CHANNEL_CAPACITY: usize = 64;

/// Whether an error is a skippable per-record failure.
///
/// A malformed JSON line or CSV row only poisons that one record: the
/// parsers recover at the next record boundary. Everything else
/// (I/O, missing header, truncated input) is fatal.
fn is_record_error(error: &MongoportError) -> bool {
    matches!(
        error,
        MongoportError::Parse(ParseError::Json { .. }) | MongoportError::Parse(ParseError::Csv(_))
    )
}

/// Run one import job to completion, cancellation or failure.
///
/// Returns the totals when the pipeline stops on its own (end of input
/// or cancellation drain); the orchestrator decides the terminal state.
pub(crate) async fn run_import_pipeline(
    config: JobConfig,
    mut sink: Box<dyn BulkSink>,
    events: mpsc::Sender<StageEvent>,
    cancel: CancellationToken,
) -> Result<PipelineSummary> {
    let result = drive_import(&config, &mut sink, &events, &cancel).await;
    if result.is_err() {
        // Stop the producer thread promptly on a fatal error
        cancel.cancel();
    }
    result
}

async fn drive_import(
    config: &JobConfig,
    sink: &mut Box<dyn BulkSink>,
    events: &mpsc::Sender<StageEvent>,
    cancel: &CancellationToken,
) -> Result<PipelineSummary> {
    let file_size = std::fs::metadata(&config.file_path)?.len();
    let line_delimited = matches!(config.format, FileFormat::Csv | FileFormat::JsonLines);

    let (raw_tx, mut raw_rx) = mpsc::channel::<Result<RawRecord>>(CHANNEL_CAPACITY);
    spawn_producer(config, raw_tx, cancel.clone());

    let projection = Projection::compile(&config.fields);
    let mut guesstimator = SizeGuesstimator::new(file_size);
    let mut batch: Vec<Document> = Vec::with_capacity(BATCH_SIZE);
    let mut summary = PipelineSummary::default();

    while let Some(item) = raw_rx.recv().await {
        if cancel.is_cancelled() {
            break;
        }

        let raw = match item {
            Ok(raw) => raw,
            Err(error) if is_record_error(&error) => {
                summary.docs_failed += 1;
                let _ = events.send(StageEvent::RecordFailed).await;
                if config.stop_on_errors {
                    return Err(error);
                }
                continue;
            }
            Err(error) => return Err(error),
        };

        let _ = events.send(StageEvent::BytesProcessed(raw.bytes)).await;
        if line_delimited {
            if let Some(estimate) = guesstimator.observe(raw.bytes) {
                debug!("guesstimated total revised to {}", estimate);
                let _ = events.send(StageEvent::GuesstimatedTotal(estimate)).await;
            }
        }

        let doc = if config.ignore_blanks {
            remove_blanks(&raw.doc)
        } else {
            raw.doc
        };

        let projected = match config.format {
            FileFormat::Csv => projection.project_csv_row(doc),
            _ => projection.project_document(doc),
        };
        match projected {
            Ok(doc) => batch.push(doc),
            Err(cast) => {
                warn!("skipping record: {}", cast);
                summary.docs_failed += 1;
                let _ = events.send(StageEvent::RecordFailed).await;
                if config.stop_on_errors {
                    return Err(cast.into());
                }
                continue;
            }
        }

        if batch.len() >= BATCH_SIZE {
            flush_batch(sink, &mut batch, config, events, cancel, &mut summary).await?;
        }
    }

    if !batch.is_empty() && !cancel.is_cancelled() {
        flush_batch(sink, &mut batch, config, events, cancel, &mut summary).await?;
    }

    Ok(summary)
}

/// Spawn the blocking parser thread feeding the raw-record channel.
///
/// The thread stops on cancellation, end of input, a fatal parse error,
/// or the consumer hanging up. `blocking_send` on the bounded channel is
/// the backpressure point.
fn spawn_producer(config: &JobConfig, raw_tx: mpsc::Sender<Result<RawRecord>>, cancel: CancellationToken) {
    let path = config.file_path.clone();
    let format = config.format;
    let delimiter = config.delimiter;

    tokio::task::spawn_blocking(move || {
        let file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(error) => {
                let _ = raw_tx.blocking_send(Err(error.into()));
                return;
            }
        };
        let mut parser = make_parser(Box::new(file), format, delimiter);

        loop {
            if cancel.is_cancelled() {
                debug!("producer detached by cancellation");
                break;
            }
            match parser.next_record() {
                Ok(Some(record)) => {
                    if raw_tx.blocking_send(Ok(record)).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    let fatal = !is_record_error(&error);
                    if raw_tx.blocking_send(Err(error)).is_err() || fatal {
                        break;
                    }
                }
            }
        }
    });
}

/// Write the accumulated batch through the sink and record the outcome.
///
/// Outcomes landing after cancellation was latched are discarded: the
/// write itself is allowed to finish, but it no longer counts.
async fn flush_batch(
    sink: &mut Box<dyn BulkSink>,
    batch: &mut Vec<Document>,
    config: &JobConfig,
    events: &mpsc::Sender<StageEvent>,
    cancel: &CancellationToken,
    summary: &mut PipelineSummary,
) -> Result<()> {
    let docs = std::mem::take(batch);
    let ordered = config.stop_on_errors;
    let outcome = sink.write_batch(docs, ordered).await?;

    if cancel.is_cancelled() {
        debug!("discarding batch outcome after cancellation");
        return Ok(());
    }

    summary.docs_written += outcome.written;
    summary.docs_failed += outcome.failed;
    let _ = events
        .send(StageEvent::DocsWritten {
            written: outcome.written,
            failed: outcome.failed,
        })
        .await;

    if config.stop_on_errors {
        if let Some(message) = outcome.first_error {
            return Err(MongoportError::Generic(message));
        }
    }
    Ok(())
}
