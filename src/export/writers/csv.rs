//! CSV writer for export.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bson::Document;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::codec;
use crate::error::{MongoportError, Result};

use super::{FormatWriter, create_writer};

/// Writer for CSV output.
///
/// Documents are flattened to dot-path columns through the codec. The
/// header union grows as new paths appear; columns discovered after the
/// header row has been written are appended, and earlier rows simply
/// lack those cells.
pub struct CsvFileWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    delimiter: u8,
    headers: Vec<String>,
    headers_written: bool,
    written: u64,
}

impl CsvFileWriter {
    /// Create a CSV writer.
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `delimiter` - Field delimiter
    /// * `headers` - Columns fixed upfront by the field selection; may
    ///   be empty, in which case columns appear in first-seen order
    pub async fn new(path: &Path, delimiter: u8, headers: Vec<String>) -> Result<Self> {
        let writer = create_writer(path).await?;
        debug!("created CSV writer for {}", path.display());
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            delimiter,
            headers,
            headers_written: false,
            written: 0,
        })
    }

    fn collect_headers(&mut self, rows: &[Vec<(String, String)>]) {
        for row in rows {
            for (path, _) in row {
                if !self.headers.contains(path) {
                    if self.headers_written {
                        warn!("column '{}' appeared after the header row", path);
                    }
                    self.headers.push(path.clone());
                }
            }
        }
    }

    /// Serialize the batch (and the header row on the first call) with
    /// proper quoting, then hand the bytes to the async file writer.
    fn encode_batch(&mut self, rows: &[Vec<(String, String)>]) -> Result<Vec<u8>> {
        let mut encoder = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(Vec::new());

        if !self.headers_written {
            encoder
                .write_record(&self.headers)
                .map_err(MongoportError::from)?;
            self.headers_written = true;
        }

        for row in rows {
            let record: Vec<&str> = self
                .headers
                .iter()
                .map(|header| {
                    row.iter()
                        .find(|(path, _)| path == header)
                        .map(|(_, value)| value.as_str())
                        .unwrap_or("")
                })
                .collect();
            encoder.write_record(&record).map_err(MongoportError::from)?;
        }

        encoder.flush()?;
        encoder
            .into_inner()
            .map_err(|e| MongoportError::Generic(e.to_string()))
    }
}

#[async_trait]
impl FormatWriter for CsvFileWriter {
    async fn write_batch(&mut self, docs: &[Document]) -> Result<usize> {
        let rows: Vec<_> = docs.iter().map(codec::flatten_document).collect();
        self.collect_headers(&rows);

        let bytes = self.encode_batch(&rows)?;
        self.writer.write_all(&bytes).await?;
        self.written += docs.len() as u64;
        Ok(docs.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        // A fieldless export of zero documents still gets its header row
        if !self.headers_written && !self.headers.is_empty() {
            let bytes = self.encode_batch(&[])?;
            self.writer.write_all(&bytes).await?;
        }
        self.writer.flush().await?;
        debug!("CSV writer finalized after {} documents", self.written);
        Ok(())
    }

    async fn file_size(&self) -> Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }
}
