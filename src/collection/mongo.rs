//! MongoDB-backed sink and source implementations.

use async_trait::async_trait;
use bson::Document;
use futures::stream::TryStreamExt;
use mongodb::options::{FindOptions, InsertManyOptions};
use mongodb::{Client, Collection, Cursor};
use tracing::{debug, info, warn};

use crate::error::Result;

use super::{BATCH_SIZE, BatchOutcome, BulkSink, DocumentSource};

/// Connect a client and resolve a collection handle.
///
/// # Arguments
/// * `uri` - MongoDB connection URI
/// * `database` - Database name
/// * `collection` - Collection name
pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Collection<Document>> {
    let client = Client::with_uri_str(uri).await?;
    Ok(client.database(database).collection(collection))
}

/// Import sink writing through `insertMany`.
pub struct MongoBulkSink {
    collection: Collection<Document>,
}

impl MongoBulkSink {
    /// Create a sink over a collection handle.
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }
}

#[async_trait]
impl BulkSink for MongoBulkSink {
    async fn write_batch(
        &mut self,
        batch: Vec<Document>,
        ordered: bool,
    ) -> Result<BatchOutcome> {
        let total = batch.len() as u64;
        debug!("writing batch of {} documents (ordered: {})", total, ordered);

        let options = InsertManyOptions::builder().ordered(ordered).build();
        let result = self
            .collection
            .insert_many(batch)
            .with_options(options)
            .await;

        match result {
            Ok(insert) => Ok(BatchOutcome {
                written: insert.inserted_ids.len() as u64,
                failed: 0,
                first_error: None,
            }),
            Err(err) => match err.kind.as_ref() {
                // Per-document write failures: count them and report the
                // first message, let the caller's policy decide
                mongodb::error::ErrorKind::InsertMany(insert_err)
                    if insert_err.write_errors.is_some() =>
                {
                    let write_errors = insert_err
                        .write_errors
                        .as_deref()
                        .unwrap_or_default();
                    let failed = write_errors.len() as u64;
                    let written = if ordered {
                        // Ordered writes stop at the first failure
                        write_errors
                            .first()
                            .map(|e| e.index as u64)
                            .unwrap_or(0)
                    } else {
                        total.saturating_sub(failed)
                    };
                    let first_error = write_errors.first().map(|e| e.message.clone());
                    warn!(
                        "batch had {} write errors ({} written)",
                        failed, written
                    );
                    Ok(BatchOutcome {
                        written,
                        failed,
                        first_error,
                    })
                }
                // Anything else (network, auth, write concern) is fatal
                _ => Err(err.into()),
            },
        }
    }
}

/// Export source over a `find` cursor with an upfront count.
pub struct MongoDocumentSource {
    collection: Collection<Document>,
    filter: Document,
    projection: Option<Document>,
    cursor: Option<Cursor<Document>>,
    closed: bool,
    fetched: u64,
}

impl MongoDocumentSource {
    /// Create a source over a collection handle.
    ///
    /// # Arguments
    /// * `collection` - Collection to read
    /// * `filter` - Query filter (empty matches everything)
    /// * `projection` - Optional server-side projection
    pub fn new(
        collection: Collection<Document>,
        filter: Document,
        projection: Option<Document>,
    ) -> Self {
        Self {
            collection,
            filter,
            projection,
            cursor: None,
            closed: false,
            fetched: 0,
        }
    }
}

#[async_trait]
impl DocumentSource for MongoDocumentSource {
    async fn count(&mut self) -> Result<u64> {
        let count = self
            .collection
            .count_documents(self.filter.clone())
            .await?;
        debug!("source count: {}", count);
        Ok(count)
    }

    async fn next_batch(&mut self) -> Result<Option<Vec<Document>>> {
        if self.closed {
            return Ok(None);
        }

        if self.cursor.is_none() {
            let options = FindOptions::builder()
                .projection(self.projection.clone())
                .build();
            let cursor = self
                .collection
                .find(self.filter.clone())
                .with_options(options)
                .await?;
            self.cursor = Some(cursor);
        }

        let cursor = match self.cursor.as_mut() {
            Some(c) => c,
            None => return Ok(None),
        };

        let mut batch = Vec::with_capacity(BATCH_SIZE);
        for _ in 0..BATCH_SIZE {
            match cursor.try_next().await {
                Ok(Some(doc)) => batch.push(doc),
                Ok(None) => break,
                Err(e) => {
                    self.cursor = None;
                    self.closed = true;
                    return Err(e.into());
                }
            }
        }

        if batch.is_empty() {
            debug!("source exhausted after {} documents", self.fetched);
            self.cursor = None;
            self.closed = true;
            Ok(None)
        } else {
            self.fetched += batch.len() as u64;
            Ok(Some(batch))
        }
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.cursor = None;
            self.closed = true;
            info!("closed export source after {} documents", self.fetched);
        }
        Ok(())
    }
}
