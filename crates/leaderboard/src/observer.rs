//! Snapshot observers.

use auto_impl::auto_impl;
use tokio::sync::mpsc;
use tracing::warn;

use crate::LeaderboardError;
use crate::snapshot::LeaderboardSnapshot;

/// Receives deliveries from a [`crate::LeaderboardFeed`].
///
/// Callbacks run on the feed's delivery task while the feed's delivery lock is
/// held, so they must not call back into the same feed.
#[auto_impl(&, Box, Arc)]
pub trait LeaderboardObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: LeaderboardSnapshot);

    fn on_error(&self, error: &LeaderboardError) {
        warn!(%error, "leaderboard feed error");
    }
}

/// Event forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardEvent {
    Snapshot(LeaderboardSnapshot),
    /// Rendered subscription error.
    Error(String),
}

/// Forwards deliveries into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<LeaderboardEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LeaderboardEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LeaderboardObserver for ChannelObserver {
    fn on_snapshot(&self, snapshot: LeaderboardSnapshot) {
        let _ = self.tx.send(LeaderboardEvent::Snapshot(snapshot));
    }

    fn on_error(&self, error: &LeaderboardError) {
        let _ = self.tx.send(LeaderboardEvent::Error(error.to_string()));
    }
}
