//! Opaque user identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of id characters used in the generated display name.
const FALLBACK_PREFIX_CHARS: usize = 4;

/// Stable identifier assigned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `"flower "` followed by the first four characters of the id.
    pub fn fallback_display_name(&self) -> String {
        let prefix: String = self.0.chars().take(FALLBACK_PREFIX_CHARS).collect();
        format!("flower {prefix}")
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}
