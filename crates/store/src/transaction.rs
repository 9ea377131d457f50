//! Optimistic single-document transactions.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::document::{Document, Fields, Precondition, Write};
use crate::{DocumentStore, StoreError};

/// Retry policy for [`run_transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    /// Attempts before giving up, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub initial_backoff_ms: u64,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 10,
        }
    }
}

impl TransactionOptions {
    /// Retry immediately; useful under test.
    pub fn without_backoff(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
        }
    }
}

/// Read-modify-write of one document.
///
/// `update` sees the current document (or `None`) and returns the fields to
/// merge. The write commits only if the document is still at the version that
/// was read; otherwise the whole read-modify-write is retried, so `update` may
/// run more than once. Returns the committed version.
pub async fn run_transaction<F>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    options: &TransactionOptions,
    mut update: F,
) -> Result<u64, StoreError>
where
    F: FnMut(Option<&Document>) -> Fields + Send,
{
    let max_attempts = options.max_attempts.max(1);
    let mut backoff = Duration::from_millis(options.initial_backoff_ms);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let current = store.get(collection, id).await?;
        let precondition = match &current {
            Some(doc) => Precondition::Version(doc.version),
            None => Precondition::Missing,
        };
        let fields = update(current.as_ref());
        let write = Write::merge(collection, id, fields).with_precondition(precondition);

        match store.commit(write).await {
            Ok(version) => {
                trace!(collection, id, attempt, version, "transaction committed");
                return Ok(version);
            }
            Err(e) if e.is_conflict() && attempt < max_attempts => {
                metrics::counter!("flourish_store_transaction_retries_total").increment(1);
                debug!(collection, id, attempt, ?backoff, "transaction conflict, retrying");
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
                backoff = backoff.saturating_mul(2);
            }
            Err(e) if e.is_conflict() => {
                return Err(StoreError::TransactionAborted {
                    attempts: attempt,
                    last: Box::new(e),
                });
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use serde_json::{Value, json};

    use super::*;
    use crate::memory::{CommitFault, MemoryDocumentStore};

    fn increment(doc: Option<&Document>) -> Fields {
        let current = doc
            .and_then(|d| d.field("count"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let mut fields = Fields::new();
        fields.insert("count".to_string(), json!(current + 1));
        fields
    }

    #[tokio::test]
    async fn test_creates_missing_document() {
        let store = MemoryDocumentStore::new();
        let version = run_transaction(&store, "c", "doc", &TransactionOptions::default(), increment)
            .await
            .unwrap();
        assert_eq!(version, 1);

        let doc = store.get("c", "doc").await.unwrap().unwrap();
        assert_eq!(doc.field("count"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_retries_conflicts() {
        let store = MemoryDocumentStore::new();
        store.fail_next_commits(3, CommitFault::Conflict);

        let mut calls = 0;
        run_transaction(&store, "c", "doc", &TransactionOptions::without_backoff(5), |doc| {
            calls += 1;
            increment(doc)
        })
        .await
        .unwrap();

        assert_eq!(calls, 4);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_aborts_after_max_attempts() {
        let store = MemoryDocumentStore::new();
        store.fail_next_commits(3, CommitFault::Conflict);

        let result = run_transaction(
            &store,
            "c",
            "doc",
            &TransactionOptions::without_backoff(3),
            increment,
        )
        .await;

        assert_matches!(result, Err(StoreError::TransactionAborted { attempts: 3, .. }));
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_is_not_retried() {
        let store = MemoryDocumentStore::new();
        store.fail_next_commits(1, CommitFault::Unavailable);

        let result = run_transaction(
            &store,
            "c",
            "doc",
            &TransactionOptions::without_backoff(5),
            increment,
        )
        .await;
        assert_matches!(result, Err(StoreError::Unavailable(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryDocumentStore::new());
        let options = TransactionOptions {
            max_attempts: 1_000,
            initial_backoff_ms: 0,
        };

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    run_transaction(store.as_ref(), "c", "doc", &options, increment).await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let doc = store.get("c", "doc").await.unwrap().unwrap();
        assert_eq!(doc.field("count"), Some(&json!(32)));
    }
}
