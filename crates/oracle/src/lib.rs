//! Scoring oracles: classify a journaled action and score it from 5 to 20.
//!
//! [`ChatCompletionOracle`] asks a hosted chat-completion model;
//! [`KeywordOracle`] is a deterministic offline stand-in.

mod category;
mod chat;
mod keyword;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub use category::Category;
pub use chat::ChatCompletionOracle;
pub use keyword::KeywordOracle;

/// Lowest score an action can receive.
pub const MIN_SCORE: u32 = 5;
/// Highest score an action can receive.
pub const MAX_SCORE: u32 = 20;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("oracle returned no content")]
    EmptyResponse,
    #[error("could not read a score from {0:?}")]
    Unparseable(String),
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
    #[error("no API key configured")]
    MissingApiKey,
}

/// A journaled action as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntry {
    pub title: String,
    pub body: String,
}

impl ActionEntry {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// `"title: body"`, as quoted to the oracle.
    pub fn text(&self) -> String {
        format!("{}: {}", self.title, self.body)
    }
}

/// Classifies and scores actions. Either call may be slow or fail.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn classify(&self, entry: &ActionEntry) -> Result<Category, OracleError>;

    /// Score in `MIN_SCORE..=MAX_SCORE`.
    async fn score(&self, entry: &ActionEntry) -> Result<u32, OracleError>;
}

/// Clamp a raw score into range, warning when it was outside.
pub fn clamp_score(raw: i64) -> u32 {
    let clamped = raw.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE));
    if clamped != raw {
        warn!(raw, clamped, "oracle score out of range");
    }
    u32::try_from(clamped).unwrap_or(MIN_SCORE)
}

/// Oracle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Chat-completion endpoint.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Use the keyword oracle even when an API key is set.
    pub offline: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4".to_string(),
            api_key: None,
            timeout_secs: 30,
            offline: false,
        }
    }
}

/// Pick the oracle `config` asks for, falling back to [`KeywordOracle`] when
/// offline or without an API key.
pub fn build_oracle(config: &OracleConfig) -> Result<Arc<dyn ScoringOracle>, OracleError> {
    if config.offline {
        info!("using offline keyword oracle");
        return Ok(Arc::new(KeywordOracle));
    }
    match ChatCompletionOracle::new(config) {
        Ok(oracle) => Ok(Arc::new(oracle)),
        Err(OracleError::MissingApiKey) => {
            info!("no oracle API key configured, using offline keyword oracle");
            Ok(Arc::new(KeywordOracle))
        }
        Err(e) => Err(e),
    }
}
