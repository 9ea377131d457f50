//! Schemaless document store: keyed collections, merge writes guarded by
//! version preconditions, optimistic transactions and live queries.
//!
//! Two backends are provided:
//! - [`MemoryDocumentStore`] keeps everything in process.
//! - [`FileDocumentStore`] wraps the memory backend and persists to a JSON file.

mod document;
mod file;
mod memory;
mod query;
mod subscription;
mod transaction;

use async_trait::async_trait;
use thiserror::Error;

pub use document::{Document, Fields, Precondition, Write};
pub use file::FileDocumentStore;
pub use memory::{CommitFault, MemoryDocumentStore};
pub use query::{Direction, OrderBy, Query};
pub use subscription::{QueryEvent, QuerySubscription};
pub use transaction::{TransactionOptions, run_transaction};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A write precondition did not hold.
    #[error("write conflict on {collection}/{id}")]
    Conflict { collection: String, id: String },
    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Optimistic transaction gave up after repeated conflicts.
    #[error("transaction aborted after {attempts} attempts: {last}")]
    TransactionAborted {
        attempts: u32,
        #[source]
        last: Box<StoreError>,
    },
    /// The store has been shut down.
    #[error("store closed")]
    Closed,
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Document store interface shared by every backend.
///
/// All writes merge top-level fields into the stored document. Listeners are
/// fed from the same state as reads, so a committed write is visible to
/// `get` before its live query update is delivered.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Apply a merge write. Returns the document version after the write.
    async fn commit(&self, write: Write) -> Result<u64, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Subscribe to a query. The current result is delivered first, then every
    /// changed result until the subscription is dropped.
    fn listen(&self, query: Query) -> Result<QuerySubscription, StoreError>;

    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
