//! Live leaderboard over the shared score collection.
//!
//! [`LeaderboardFeed`] keeps one live query on the store, ordered by points
//! descending and limited to the configured size, and pushes a ranked
//! [`LeaderboardSnapshot`] to a [`LeaderboardObserver`] whenever the result
//! changes. It never writes; score updates reach it only through the store.

mod feed;
mod observer;
mod snapshot;

use flourish_store::StoreError;
use thiserror::Error;

pub use feed::{LeaderboardConfig, LeaderboardFeed};
pub use observer::{ChannelObserver, LeaderboardEvent, LeaderboardObserver};
pub use snapshot::{LeaderboardEntry, LeaderboardSnapshot};

#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// The live query failed. The feed keeps its last snapshot and does not
    /// reconnect on its own.
    #[error("leaderboard subscription error: {0}")]
    Subscription(#[source] StoreError),
    #[error("failed to read leaderboard: {0}")]
    Read(#[source] StoreError),
    #[error("no tokio runtime available to drive the leaderboard feed")]
    NoRuntime,
}
