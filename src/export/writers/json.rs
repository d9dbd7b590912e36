//! JSON array and JSON lines writers for export.
//!
//! Both emit canonical extended JSON, so object ids, dates, decimals and
//! the rest deserialize back to the same typed values on import.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bson::{Bson, Document};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::error::Result;

use super::{FormatWriter, create_writer};

fn encode_document(doc: &Document) -> Result<String> {
    let ejson = Bson::Document(doc.clone()).into_canonical_extjson();
    serde_json::to_string(&ejson)
        .map_err(|e| crate::error::MongoportError::Generic(e.to_string()))
}

/// Writer for a single JSON array of objects.
pub struct JsonFileWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl JsonFileWriter {
    /// Create a JSON array writer.
    pub async fn new(path: &Path) -> Result<Self> {
        let writer = create_writer(path).await?;
        debug!("created JSON writer for {}", path.display());
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            written: 0,
        })
    }
}

#[async_trait]
impl FormatWriter for JsonFileWriter {
    async fn write_batch(&mut self, docs: &[Document]) -> Result<usize> {
        for doc in docs {
            let prefix = if self.written == 0 { "[" } else { "," };
            self.writer.write_all(prefix.as_bytes()).await?;
            self.writer.write_all(encode_document(doc)?.as_bytes()).await?;
            self.written += 1;
        }
        Ok(docs.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        if self.written == 0 {
            self.writer.write_all(b"[]\n").await?;
        } else {
            self.writer.write_all(b"]\n").await?;
        }
        self.writer.flush().await?;
        debug!("JSON writer finalized after {} documents", self.written);
        Ok(())
    }

    async fn file_size(&self) -> Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }
}

/// Writer for JSON lines: one object per line.
pub struct JsonLinesFileWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl JsonLinesFileWriter {
    /// Create a JSON lines writer.
    pub async fn new(path: &Path) -> Result<Self> {
        let writer = create_writer(path).await?;
        debug!("created JSONL writer for {}", path.display());
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            written: 0,
        })
    }
}

#[async_trait]
impl FormatWriter for JsonLinesFileWriter {
    async fn write_batch(&mut self, docs: &[Document]) -> Result<usize> {
        for doc in docs {
            self.writer.write_all(encode_document(doc)?.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
            self.written += 1;
        }
        Ok(docs.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.writer.flush().await?;
        debug!("JSONL writer finalized after {} documents", self.written);
        Ok(())
    }

    async fn file_size(&self) -> Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }
}
