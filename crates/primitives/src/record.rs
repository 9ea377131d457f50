//! The persisted score record and its decoding from schemaless documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::UserId;

/// Field names of a score document as stored.
pub mod fields {
    pub const POINTS: &str = "points";
    pub const DISPLAY_NAME: &str = "displayName";
}

/// One user's score as held by the shared store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScoreRecord {
    pub user_id: UserId,
    pub points: u64,
    pub display_name: Option<String>,
}

/// Document fields that could not be read as a [`UserScoreRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed score record for {user_id}: {reason}")]
pub struct MalformedRecord {
    pub user_id: UserId,
    pub reason: String,
}

#[derive(Deserialize)]
struct StoredScore {
    points: u64,
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
}

impl UserScoreRecord {
    /// Decode from raw document fields. Unknown fields are ignored.
    pub fn from_fields(
        user_id: UserId,
        fields: &Map<String, Value>,
    ) -> Result<Self, MalformedRecord> {
        match serde_json::from_value::<StoredScore>(Value::Object(fields.clone())) {
            Ok(stored) => Ok(Self {
                user_id,
                points: stored.points,
                display_name: stored.display_name,
            }),
            Err(e) => Err(MalformedRecord {
                user_id,
                reason: e.to_string(),
            }),
        }
    }
}

/// Result of looking a record up: missing, readable, or present but unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPresence {
    Absent,
    Present(UserScoreRecord),
    Malformed(MalformedRecord),
}

impl RecordPresence {
    /// Classify an optional document body.
    pub fn from_fields(user_id: UserId, fields: Option<&Map<String, Value>>) -> Self {
        match fields {
            None => Self::Absent,
            Some(fields) => match UserScoreRecord::from_fields(user_id, fields) {
                Ok(record) => Self::Present(record),
                Err(e) => Self::Malformed(e),
            },
        }
    }

    pub fn record(&self) -> Option<&UserScoreRecord> {
        match self {
            Self::Present(record) => Some(record),
            _ => None,
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_decode_full_record() {
        let fields = object(json!({ "points": 42, "displayName": "fern" }));
        let record = UserScoreRecord::from_fields(UserId::new("u1"), &fields).unwrap();
        assert_eq!(record.points, 42);
        assert_eq!(record.display_name.as_deref(), Some("fern"));
    }

    #[test]
    fn test_decode_without_display_name() {
        let fields = object(json!({ "points": 3, "extra": true }));
        let record = UserScoreRecord::from_fields(UserId::new("u1"), &fields).unwrap();
        assert_eq!(record.points, 3);
        assert!(record.display_name.is_none());
    }

    #[test]
    fn test_decode_rejects_bad_points() {
        for bad in [json!({ "points": -1 }), json!({ "points": "ten" }), json!({})] {
            let fields = object(bad);
            assert!(UserScoreRecord::from_fields(UserId::new("u1"), &fields).is_err());
        }
    }

    #[test]
    fn test_presence() {
        let id = UserId::new("u1");
        assert_eq!(RecordPresence::from_fields(id.clone(), None), RecordPresence::Absent);

        let good = object(json!({ "points": 1 }));
        assert_matches!(
            RecordPresence::from_fields(id.clone(), Some(&good)),
            RecordPresence::Present(UserScoreRecord { points: 1, .. })
        );

        let bad = object(json!({ "points": 1, "displayName": 7 }));
        let presence = RecordPresence::from_fields(id, Some(&bad));
        assert_matches!(presence, RecordPresence::Malformed(_));
        assert!(presence.exists());
        assert!(presence.record().is_none());
    }
}
