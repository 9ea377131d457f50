//! Shared identifiers and the per-user score record.

mod record;
mod user;

pub use record::{MalformedRecord, RecordPresence, UserScoreRecord, fields};
pub use user::UserId;

/// Collection holding one score document per user.
pub const LEADERBOARD_COLLECTION: &str = "leaderboard";
