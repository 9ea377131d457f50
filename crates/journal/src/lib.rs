//! The local journal: scored entries, a per-category tally and the streak.

mod streak;
mod tally;

use chrono::{DateTime, TimeZone, Utc};
use flourish_oracle::Category;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub use streak::streak;
pub use tally::CategoryTally;

/// One submitted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub points: u32,
    /// `None` when classification failed.
    pub category: Option<Category>,
    pub recorded_at: DateTime<Utc>,
}

/// Entries in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    tally: CategoryTally,
    next_id: u64,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry, counting it in the tally when it has a category.
    pub fn append(
        &mut self,
        title: impl Into<String>,
        body: impl Into<String>,
        points: u32,
        category: Option<Category>,
        recorded_at: DateTime<Utc>,
    ) -> JournalEntry {
        if let Some(category) = category {
            self.tally.increment(category);
        }

        let id = self.next_id;
        self.next_id += 1;
        trace!(id, points, ?category, "journal entry appended");

        let entry = JournalEntry {
            id,
            title: title.into(),
            body: body.into(),
            points,
            category,
            recorded_at,
        };
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tally(&self) -> &CategoryTally {
        &self.tally
    }

    /// Sum of points over all entries.
    pub fn total_points(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.points)).sum()
    }

    /// Consecutive days with entries, counted back from the latest one.
    pub fn streak<Tz: TimeZone>(&self, tz: &Tz) -> u32 {
        streak(self.entries.iter().map(|e| e.recorded_at), tz)
    }
}
