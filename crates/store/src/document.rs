//! Documents and merge writes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level fields of a document.
pub type Fields = Map<String, Value>;

/// A stored document with its commit version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    /// 1 on creation, incremented by every committed write.
    pub version: u64,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Condition a write must satisfy to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precondition {
    #[default]
    None,
    /// The document must not exist yet.
    Missing,
    /// The document must exist at exactly this version.
    Version(u64),
}

impl Precondition {
    pub(crate) fn holds(&self, current: Option<u64>) -> bool {
        match (self, current) {
            (Self::None, _) => true,
            (Self::Missing, None) => true,
            (Self::Version(expected), Some(actual)) => *expected == actual,
            _ => false,
        }
    }
}

/// Merge write against a single document.
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub collection: String,
    pub id: String,
    pub fields: Fields,
    pub precondition: Precondition,
}

impl Write {
    pub fn merge(collection: impl Into<String>, id: impl Into<String>, fields: Fields) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            fields,
            precondition: Precondition::None,
        }
    }

    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition() {
        assert!(Precondition::None.holds(None));
        assert!(Precondition::None.holds(Some(3)));
        assert!(Precondition::Missing.holds(None));
        assert!(!Precondition::Missing.holds(Some(1)));
        assert!(Precondition::Version(2).holds(Some(2)));
        assert!(!Precondition::Version(2).holds(Some(3)));
        assert!(!Precondition::Version(2).holds(None));
    }
}
