//! Ranked leaderboard snapshots.

use flourish_primitives::{UserId, UserScoreRecord};
use flourish_store::Document;
use serde::Serialize;
use tracing::warn;

/// Label shown for users that never picked a display name.
const ANONYMOUS_LABEL: &str = "anonymous flower";

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub points: u64,
}

impl LeaderboardEntry {
    /// Name to display, marked when the row belongs to `me`.
    pub fn label(&self, me: Option<&UserId>) -> String {
        let name = self.display_name.as_deref().unwrap_or(ANONYMOUS_LABEL);
        if me == Some(&self.user_id) {
            format!("{name} (me)")
        } else {
            name.to_string()
        }
    }
}

impl From<UserScoreRecord> for LeaderboardEntry {
    fn from(record: UserScoreRecord) -> Self {
        Self {
            user_id: record.user_id,
            display_name: record.display_name,
            points: record.points,
        }
    }
}

/// Top entries by points, highest first, ties by user id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LeaderboardSnapshot {
    entries: Vec<LeaderboardEntry>,
    dropped: usize,
}

impl LeaderboardSnapshot {
    /// Build from an already-ordered query result. Documents that do not
    /// decode as score records are skipped and counted.
    pub fn from_documents(docs: Vec<Document>) -> Self {
        let mut entries = Vec::with_capacity(docs.len());
        let mut dropped = 0;

        for doc in docs {
            match UserScoreRecord::from_fields(UserId::new(doc.id), &doc.fields) {
                Ok(record) => entries.push(record.into()),
                Err(e) => {
                    warn!(error = %e, "dropping malformed leaderboard record");
                    dropped += 1;
                }
            }
        }

        if dropped > 0 {
            metrics::counter!("flourish_leaderboard_dropped_records_total")
                .increment(dropped as u64);
        }

        Self { entries, dropped }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-based rank of `user_id`, if listed.
    pub fn rank_of(&self, user_id: &UserId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| &entry.user_id == user_id)
            .map(|idx| idx + 1)
    }

    /// Number of malformed documents left out.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
