//! The live feed: one store subscription driving one observer.

use std::sync::Arc;

use flourish_primitives::{LEADERBOARD_COLLECTION, fields};
use flourish_store::{Direction, DocumentStore, Query, QueryEvent, QuerySubscription};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::LeaderboardError;
use crate::observer::LeaderboardObserver;
use crate::snapshot::LeaderboardSnapshot;

/// Leaderboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Collection holding the score records.
    pub collection: String,
    /// Number of ranked entries kept.
    pub limit: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            collection: LEADERBOARD_COLLECTION.to_string(),
            limit: 10,
        }
    }
}

impl LeaderboardConfig {
    fn query(&self) -> Query {
        Query::collection(self.collection.clone())
            .order_by(fields::POINTS, Direction::Descending)
            .limit(self.limit)
    }
}

/// Delivery state shared with the running task.
///
/// Every delivery happens with this lock held and only while the task's
/// generation is current, so bumping the generation under the lock cuts off
/// an old task before its next callback.
#[derive(Default)]
struct FeedState {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Live top-N leaderboard.
///
/// At most one subscription is active. Dropping the feed stops it.
pub struct LeaderboardFeed {
    store: Arc<dyn DocumentStore>,
    config: LeaderboardConfig,
    state: Arc<Mutex<FeedState>>,
}

impl LeaderboardFeed {
    pub fn new(store: Arc<dyn DocumentStore>, config: LeaderboardConfig) -> Self {
        Self {
            store,
            config,
            state: Arc::default(),
        }
    }

    pub fn with_defaults(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(store, LeaderboardConfig::default())
    }

    pub fn config(&self) -> &LeaderboardConfig {
        &self.config
    }

    /// One-shot ranked read.
    pub async fn fetch(&self) -> Result<LeaderboardSnapshot, LeaderboardError> {
        let docs = self
            .store
            .query(&self.config.query())
            .await
            .map_err(LeaderboardError::Read)?;
        Ok(LeaderboardSnapshot::from_documents(docs))
    }

    /// Subscribe and start delivering snapshots to `observer`.
    ///
    /// Any previous subscription is torn down first; once this returns the
    /// previous observer receives nothing more. The current ranking is
    /// delivered first, then a new snapshot whenever it changes. Must be
    /// called from within a tokio runtime.
    pub fn start_listening(
        &self,
        observer: impl LeaderboardObserver + 'static,
    ) -> Result<(), LeaderboardError> {
        let handle = Handle::try_current().map_err(|_| LeaderboardError::NoRuntime)?;
        let subscription = self
            .store
            .listen(self.config.query())
            .map_err(LeaderboardError::Subscription)?;

        let mut state = self.state.lock();
        if let Some(previous) = state.task.take() {
            previous.abort();
            debug!("replacing leaderboard subscription");
        }
        state.generation += 1;

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        state.task = Some(handle.spawn(run_feed(subscription, observer, shared, generation)));

        debug!(generation, collection = %self.config.collection, limit = self.config.limit, "leaderboard listening");
        Ok(())
    }

    /// Release the subscription. No callback runs after this returns.
    pub fn stop_listening(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        if let Some(task) = state.task.take() {
            task.abort();
            debug!("leaderboard stopped listening");
        }
    }

    /// Whether a subscription is active. Becomes false if the store ends the
    /// live query.
    pub fn is_listening(&self) -> bool {
        self.state
            .lock()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for LeaderboardFeed {
    fn drop(&mut self) {
        self.stop_listening();
    }
}

async fn run_feed<O: LeaderboardObserver>(
    mut subscription: QuerySubscription,
    observer: O,
    state: Arc<Mutex<FeedState>>,
    generation: u64,
) {
    while let Some(event) = subscription.next().await {
        if !deliver(&state, generation, event, &observer) {
            trace!(generation, "stale leaderboard task exiting");
            return;
        }
    }
    debug!(generation, "leaderboard subscription closed by store");
}

/// Hand one event to the observer. Returns false if the task is stale.
fn deliver<O: LeaderboardObserver>(
    state: &Mutex<FeedState>,
    generation: u64,
    event: QueryEvent,
    observer: &O,
) -> bool {
    let state = state.lock();
    if state.generation != generation {
        return false;
    }

    match event {
        Ok(docs) => {
            let snapshot = LeaderboardSnapshot::from_documents(docs);
            metrics::counter!("flourish_leaderboard_snapshots_total").increment(1);
            trace!(entries = snapshot.len(), dropped = snapshot.dropped(), "leaderboard snapshot");
            observer.on_snapshot(snapshot);
        }
        Err(e) => observer.on_error(&LeaderboardError::Subscription(e)),
    }

    drop(state);
    true
}
