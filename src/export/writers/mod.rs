//! Format writers for export.
//!
//! A [`FormatWriter`] receives already-projected documents and owns the
//! serialization to one output format. CSV flattens nested documents to
//! dot-path columns; the JSON formats write canonical extended JSON so
//! typed values survive a round trip back through import.

use async_trait::async_trait;
use bson::Document;
use tokio::fs::File;
use tokio::io::BufWriter;

use crate::config::{FileFormat, JobConfig};
use crate::error::Result;

pub mod csv;
pub mod json;

pub use csv::CsvFileWriter;
pub use json::{JsonFileWriter, JsonLinesFileWriter};

/// Trait for writing documents to different file formats.
#[async_trait]
pub trait FormatWriter: Send {
    /// Write a batch of documents.
    ///
    /// # Returns
    /// * `Result<usize>` - Number of documents written
    async fn write_batch(&mut self, docs: &[Document]) -> Result<usize>;

    /// Finalize the output (flush buffers, close array framing).
    async fn finalize(&mut self) -> Result<()>;

    /// Current size of the output file in bytes.
    async fn file_size(&self) -> Result<u64>;
}

/// Construct the writer matching the job's format.
pub(crate) async fn make_writer(config: &JobConfig) -> Result<Box<dyn FormatWriter>> {
    let path = &config.file_path;
    Ok(match config.format {
        FileFormat::Csv => {
            // Explicitly selected fields fix the column order upfront;
            // otherwise columns appear in first-seen order
            let mut specs: Vec<_> = config.fields.iter().filter(|f| f.included).collect();
            specs.sort_by_key(|f| f.order);
            let headers = specs.into_iter().map(|f| f.path.clone()).collect();
            Box::new(CsvFileWriter::new(path, config.delimiter, headers).await?)
        }
        FileFormat::Json => Box::new(JsonFileWriter::new(path).await?),
        FileFormat::JsonLines => Box::new(JsonLinesFileWriter::new(path).await?),
    })
}

/// Create a buffered file writer.
pub(crate) async fn create_writer(path: &std::path::Path) -> Result<BufWriter<File>> {
    let file = File::create(path).await?;
    Ok(BufWriter::with_capacity(512 * 1024, file))
}
