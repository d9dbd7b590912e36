//! The export pipeline.
//!
//! source cursor → project → serialize → file. The total is known
//! exactly upfront from the source's count query, so export progress is
//! `records emitted / total`. Cancellation finalizes the partial file and
//! closes the cursor, as a canceled export must not leak server-side
//! resources.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::collection::DocumentSource;
use crate::config::JobConfig;
use crate::error::Result;
use crate::import::Projection;
use crate::job::PipelineSummary;
use crate::job::events::StageEvent;

pub mod writers;

pub use writers::{CsvFileWriter, FormatWriter, JsonFileWriter, JsonLinesFileWriter};

/// Run one export job to completion, cancellation or failure.
pub(crate) async fn run_export_pipeline(
    config: JobConfig,
    mut source: Box<dyn DocumentSource>,
    events: mpsc::Sender<StageEvent>,
    cancel: CancellationToken,
) -> Result<PipelineSummary> {
    let result = drive_export(&config, &mut source, &events, &cancel).await;
    // The cursor must not outlive the job, success or not
    let _ = source.close().await;
    result
}

async fn drive_export(
    config: &JobConfig,
    source: &mut Box<dyn DocumentSource>,
    events: &mpsc::Sender<StageEvent>,
    cancel: &CancellationToken,
) -> Result<PipelineSummary> {
    let total = source.count().await?;
    let _ = events.send(StageEvent::ExactTotal(total)).await;
    info!("exporting {} documents", total);

    let projection = Projection::compile(&config.fields);
    let mut writer = writers::make_writer(config).await?;
    let mut summary = PipelineSummary::default();

    loop {
        if cancel.is_cancelled() {
            debug!("export canceled, finalizing partial file");
            writer.finalize().await?;
            return Ok(summary);
        }

        let batch = match source.next_batch().await? {
            Some(batch) => batch,
            None => break,
        };

        let projected: Vec<_> = batch
            .iter()
            .map(|doc| projection.project_export(doc))
            .collect();
        let written = writer.write_batch(&projected).await? as u64;

        if !cancel.is_cancelled() {
            summary.docs_written += written;
            let _ = events
                .send(StageEvent::DocsWritten { written, failed: 0 })
                .await;
        }
    }

    writer.finalize().await?;
    let bytes_out = writer.file_size().await?;
    info!(
        "export wrote {} documents ({} bytes)",
        summary.docs_written, bytes_out
    );
    Ok(summary)
}
