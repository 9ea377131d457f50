//! Score ledger: absolute point writes and renames against the shared store.

use std::sync::Arc;

use flourish_primitives::{LEADERBOARD_COLLECTION, RecordPresence, UserId, fields};
use flourish_store::{
    Document, DocumentStore, Fields, StoreError, TransactionOptions, Write, run_transaction,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::identity::IdentityProvider;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("user is not authenticated")]
    NotAuthenticated,
    /// The write could not be committed; retrying is up to the caller.
    #[error("failed to write score record: {0}")]
    StoreWriteFailed(#[source] StoreError),
    #[error("failed to read score record: {0}")]
    StoreReadFailed(#[source] StoreError),
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Collection holding one document per user.
    pub collection: String,
    /// Retry policy for point writes.
    pub transaction: TransactionOptions,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            collection: LEADERBOARD_COLLECTION.to_string(),
            transaction: TransactionOptions::default(),
        }
    }
}

/// Outcome of [`ScoreLedger::rename_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// The name was blank after trimming; nothing was written.
    Unchanged,
}

/// Writes the caller's score record.
///
/// Point totals are absolute: each call overwrites `points` with the value
/// given. Callers must pass a total derived from the latest known balance and
/// await one write before issuing the next for the same user.
pub struct ScoreLedger {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    config: LedgerConfig,
}

impl ScoreLedger {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            identity,
            config,
        }
    }

    pub fn with_defaults(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self::new(store, identity, LedgerConfig::default())
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn user_id(&self) -> Result<UserId, LedgerError> {
        self.identity
            .current_user_id()
            .ok_or(LedgerError::NotAuthenticated)
    }

    /// Set the caller's points to `total` in one atomic read-modify-write.
    ///
    /// A non-empty `display_name` is stored as given. Without one, a record
    /// that has no display name yet gets `"flower "` plus the first four
    /// characters of the user id. Returns the total written.
    pub async fn record_points(
        &self,
        total: u64,
        display_name: Option<&str>,
    ) -> Result<u64, LedgerError> {
        let user_id = self.user_id()?;
        let supplied = display_name.filter(|name| !name.is_empty());

        let result = run_transaction(
            self.store.as_ref(),
            &self.config.collection,
            user_id.as_str(),
            &self.config.transaction,
            |current| score_update(&user_id, current, total, supplied),
        )
        .await;

        match result {
            Ok(version) => {
                metrics::counter!("flourish_ledger_writes_total").increment(1);
                debug!(%user_id, total, version, "recorded points");
                Ok(total)
            }
            Err(e) => {
                metrics::counter!("flourish_ledger_write_failures_total").increment(1);
                warn!(%user_id, total, error = %e, "failed to record points");
                Err(LedgerError::StoreWriteFailed(e))
            }
        }
    }

    /// Change the caller's display name without touching points.
    ///
    /// A name that is blank after trimming is skipped silently and reported
    /// as [`RenameOutcome::Unchanged`]; otherwise the name is stored as given.
    pub async fn rename_user(&self, new_name: &str) -> Result<RenameOutcome, LedgerError> {
        let user_id = self.user_id()?;

        if new_name.trim().is_empty() {
            debug!(%user_id, "blank display name, skipping rename");
            return Ok(RenameOutcome::Unchanged);
        }

        let mut update = Fields::new();
        update.insert(
            fields::DISPLAY_NAME.to_string(),
            Value::String(new_name.to_string()),
        );

        match self
            .store
            .commit(Write::merge(&self.config.collection, user_id.as_str(), update))
            .await
        {
            Ok(_) => {
                metrics::counter!("flourish_ledger_writes_total").increment(1);
                debug!(%user_id, new_name, "renamed user");
                Ok(RenameOutcome::Renamed)
            }
            Err(e) => {
                metrics::counter!("flourish_ledger_write_failures_total").increment(1);
                warn!(%user_id, error = %e, "failed to rename user");
                Err(LedgerError::StoreWriteFailed(e))
            }
        }
    }

    /// Read the caller's record.
    pub async fn current_record(&self) -> Result<RecordPresence, LedgerError> {
        let user_id = self.user_id()?;
        let doc = self
            .store
            .get(&self.config.collection, user_id.as_str())
            .await
            .map_err(LedgerError::StoreReadFailed)?;
        Ok(RecordPresence::from_fields(user_id, doc.as_ref().map(|d| &d.fields)))
    }
}

/// Fields merged by a point write, given the record as currently stored.
fn score_update(
    user_id: &UserId,
    current: Option<&Document>,
    total: u64,
    supplied_name: Option<&str>,
) -> Fields {
    let mut update = Fields::new();
    update.insert(fields::POINTS.to_string(), Value::from(total));

    if let Some(name) = supplied_name {
        update.insert(fields::DISPLAY_NAME.to_string(), Value::String(name.to_string()));
        return update;
    }

    let has_name = match RecordPresence::from_fields(user_id.clone(), current.map(|d| &d.fields)) {
        RecordPresence::Absent => false,
        RecordPresence::Present(record) => record.display_name.is_some(),
        RecordPresence::Malformed(e) => {
            debug!(error = %e, "overwriting malformed score record");
            current
                .and_then(|d| d.field(fields::DISPLAY_NAME))
                .is_some_and(Value::is_string)
        }
    };

    if !has_name {
        update.insert(
            fields::DISPLAY_NAME.to_string(),
            Value::String(user_id.fallback_display_name()),
        );
    }

    update
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use flourish_primitives::UserScoreRecord;
    use flourish_store::{CommitFault, MemoryDocumentStore};
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::identity::StaticIdentity;

    const UID: &str = "Qm7xLa9Zp";

    fn ledger_for(store: &MemoryDocumentStore, identity: StaticIdentity) -> ScoreLedger {
        let config = LedgerConfig {
            transaction: TransactionOptions::without_backoff(5),
            ..Default::default()
        };
        ScoreLedger::new(Arc::new(store.clone()), Arc::new(identity), config)
    }

    fn signed_in(store: &MemoryDocumentStore) -> ScoreLedger {
        ledger_for(store, StaticIdentity::signed_in(UID))
    }

    async fn stored(store: &MemoryDocumentStore) -> Document {
        store
            .get(LEADERBOARD_COLLECTION, UID)
            .await
            .unwrap()
            .expect("record should exist")
    }

    async fn seed(store: &MemoryDocumentStore, value: serde_json::Value) {
        let serde_json::Value::Object(fields) = value else {
            panic!("expected object");
        };
        store
            .commit(Write::merge(LEADERBOARD_COLLECTION, UID, fields))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_write_sets_fallback_name() {
        let store = MemoryDocumentStore::new();
        let ledger = signed_in(&store);

        assert_eq!(ledger.record_points(25, None).await.unwrap(), 25);

        let doc = stored(&store).await;
        assert_eq!(doc.field("points"), Some(&json!(25)));
        assert_eq!(doc.field("displayName"), Some(&json!("flower Qm7x")));
    }

    #[tokio::test]
    async fn test_supplied_name_wins() {
        let store = MemoryDocumentStore::new();
        let ledger = signed_in(&store);

        ledger.record_points(10, None).await.unwrap();
        ledger.record_points(12, Some("moss")).await.unwrap();

        let doc = stored(&store).await;
        assert_eq!(doc.field("displayName"), Some(&json!("moss")));
        assert_eq!(doc.field("points"), Some(&json!(12)));
    }

    #[tokio::test]
    async fn test_existing_name_preserved() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({ "points": 3, "displayName": "fern" })).await;

        let ledger = signed_in(&store);
        ledger.record_points(40, None).await.unwrap();
        ledger.record_points(41, Some("")).await.unwrap();

        let doc = stored(&store).await;
        assert_eq!(doc.field("displayName"), Some(&json!("fern")));
        assert_eq!(doc.field("points"), Some(&json!(41)));
    }

    #[tokio::test]
    async fn test_fallback_for_existing_record_without_name() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({ "points": 3 })).await;

        signed_in(&store).record_points(4, None).await.unwrap();

        let doc = stored(&store).await;
        assert_eq!(doc.field("displayName"), Some(&json!("flower Qm7x")));
    }

    #[tokio::test]
    async fn test_points_overwrite_not_increment() {
        let store = MemoryDocumentStore::new();
        let ledger = signed_in(&store);

        ledger.record_points(50, None).await.unwrap();
        ledger.record_points(20, None).await.unwrap();

        assert_eq!(stored(&store).await.field("points"), Some(&json!(20)));
    }

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let store = MemoryDocumentStore::new();
        let ledger = signed_in(&store);

        ledger.record_points(33, Some("ivy")).await.unwrap();
        let once = stored(&store).await;
        ledger.record_points(33, Some("ivy")).await.unwrap();
        let twice = stored(&store).await;

        assert_eq!(once.fields, twice.fields);
    }

    #[tokio::test]
    async fn test_untouched_fields_survive() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({ "points": 1, "displayName": "a", "theme": "desert" })).await;

        signed_in(&store).record_points(2, None).await.unwrap();

        assert_eq!(stored(&store).await.field("theme"), Some(&json!("desert")));
    }

    #[tokio::test]
    async fn test_malformed_record_is_repaired() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({ "points": "many", "displayName": "kept" })).await;

        let ledger = signed_in(&store);
        assert_matches!(ledger.current_record().await, Ok(RecordPresence::Malformed(_)));

        ledger.record_points(9, None).await.unwrap();
        assert_matches!(
            ledger.current_record().await,
            Ok(RecordPresence::Present(UserScoreRecord { points: 9, ref display_name, .. }))
                if display_name.as_deref() == Some("kept")
        );
    }

    #[tokio::test]
    async fn test_malformed_name_replaced_by_fallback() {
        let store = MemoryDocumentStore::new();
        seed(&store, json!({ "points": 1, "displayName": 17 })).await;

        signed_in(&store).record_points(2, None).await.unwrap();

        assert_eq!(stored(&store).await.field("displayName"), Some(&json!("flower Qm7x")));
    }

    #[tokio::test]
    async fn test_rename() {
        let store = MemoryDocumentStore::new();
        let ledger = signed_in(&store);
        ledger.record_points(7, None).await.unwrap();

        assert_eq!(ledger.rename_user("  rose  ").await.unwrap(), RenameOutcome::Renamed);

        let doc = stored(&store).await;
        assert_eq!(doc.field("displayName"), Some(&json!("  rose  ")));
        assert_eq!(doc.field("points"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn test_blank_rename_is_noop() {
        let store = MemoryDocumentStore::new();
        let ledger = signed_in(&store);
        ledger.record_points(7, Some("lily")).await.unwrap();
        let commits = store.commit_count();

        assert_eq!(ledger.rename_user("   ").await.unwrap(), RenameOutcome::Unchanged);
        assert_eq!(ledger.rename_user("").await.unwrap(), RenameOutcome::Unchanged);

        assert_eq!(store.commit_count(), commits);
        assert_eq!(stored(&store).await.field("displayName"), Some(&json!("lily")));
    }

    #[tokio::test]
    async fn test_rename_creates_record_without_points() {
        let store = MemoryDocumentStore::new();
        let ledger = signed_in(&store);

        ledger.rename_user("sage").await.unwrap();

        let doc = stored(&store).await;
        assert_eq!(doc.field("displayName"), Some(&json!("sage")));
        assert!(doc.field("points").is_none());
    }

    #[tokio::test]
    async fn test_unauthenticated_calls_fail_without_writing() {
        let store = MemoryDocumentStore::new();
        let ledger = ledger_for(&store, StaticIdentity::signed_out());

        assert_matches!(ledger.record_points(5, None).await, Err(LedgerError::NotAuthenticated));
        assert_matches!(ledger.rename_user("x").await, Err(LedgerError::NotAuthenticated));
        assert_matches!(ledger.rename_user("  ").await, Err(LedgerError::NotAuthenticated));
        assert_matches!(ledger.current_record().await, Err(LedgerError::NotAuthenticated));
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failures_surface() {
        let store = MemoryDocumentStore::new();
        let ledger = signed_in(&store);

        store.fail_next_commits(1, CommitFault::Unavailable);
        assert_matches!(
            ledger.record_points(5, None).await,
            Err(LedgerError::StoreWriteFailed(StoreError::Unavailable(_)))
        );

        store.fail_next_commits(5, CommitFault::Conflict);
        assert_matches!(
            ledger.record_points(5, None).await,
            Err(LedgerError::StoreWriteFailed(StoreError::TransactionAborted { attempts: 5, .. }))
        );

        store.fail_next_commits(1, CommitFault::Unavailable);
        assert_matches!(
            ledger.rename_user("x").await,
            Err(LedgerError::StoreWriteFailed(_))
        );

        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_conflicts_within_budget_are_retried() {
        let store = MemoryDocumentStore::new();
        let ledger = signed_in(&store);

        store.fail_next_commits(2, CommitFault::Conflict);
        assert_eq!(ledger.record_points(8, None).await.unwrap(), 8);
        assert_eq!(stored(&store).await.field("points"), Some(&json!(8)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_never_interleave() {
        let store = MemoryDocumentStore::new();
        let config = LedgerConfig {
            transaction: TransactionOptions::without_backoff(1_000),
            ..Default::default()
        };
        let ledger = Arc::new(ScoreLedger::new(
            Arc::new(store.clone()),
            Arc::new(StaticIdentity::signed_in(UID)),
            config,
        ));

        let handles: Vec<_> = (0..16u64)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    let name = format!("n{i}");
                    ledger.record_points(i, Some(&name)).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Last writer wins, and both fields come from the same writer.
        let record = ledger.current_record().await.unwrap();
        let record = record.record().unwrap();
        assert_eq!(record.display_name, Some(format!("n{}", record.points)));
    }

    proptest! {
        #[test]
        fn test_recorded_points_read_back(points in any::<u64>(), name in proptest::option::of("[a-z]{0,8}")) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let store = MemoryDocumentStore::new();
                let ledger = signed_in(&store);

                ledger.record_points(points, name.as_deref()).await.unwrap();

                let presence = ledger.current_record().await.unwrap();
                let record = presence.record().unwrap();
                prop_assert_eq!(record.points, points);
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
