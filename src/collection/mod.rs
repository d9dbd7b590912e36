//! Abstract sink/source boundary around the database.
//!
//! The pipeline core never touches the driver directly: imports write
//! through [`BulkSink`] and exports read through [`DocumentSource`]. The
//! MongoDB implementations live in [`mongo`]; tests substitute in-memory
//! fakes.

use async_trait::async_trait;
use bson::Document;

use crate::error::Result;

pub mod mongo;

pub use mongo::{MongoBulkSink, MongoDocumentSource, connect};

/// Number of documents accumulated per bulk write or cursor batch.
pub const BATCH_SIZE: usize = 1000;

/// Outcome of one bulk write.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Documents successfully written in this batch.
    pub written: u64,

    /// Documents rejected by the server in this batch.
    pub failed: u64,

    /// Message of the first write error, if any. The import policy
    /// decides whether this is fatal.
    pub first_error: Option<String>,
}

/// Destination for batches of typed documents (import).
#[async_trait]
pub trait BulkSink: Send {
    /// Write one batch.
    ///
    /// With `ordered` set, writes stop at the first failure and the
    /// outcome reflects only the documents before it. Unordered writes
    /// attempt every document and report per-batch totals.
    ///
    /// Per-document write failures are reported in the outcome; an `Err`
    /// return means the batch failed wholesale (network, auth) and is
    /// always fatal.
    async fn write_batch(&mut self, batch: Vec<Document>, ordered: bool)
    -> Result<BatchOutcome>;
}

/// Forward-only producer of documents plus an upfront count (export).
#[async_trait]
pub trait DocumentSource: Send {
    /// Exact number of documents the source will produce.
    async fn count(&mut self) -> Result<u64>;

    /// Fetch the next batch, or `None` when exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<Document>>>;

    /// Release underlying resources. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
