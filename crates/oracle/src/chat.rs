//! Chat-completion backed oracle.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{ActionEntry, Category, OracleConfig, OracleError, ScoringOracle, clamp_score};

const SCORE_PROMPT: &str = "Give (only) a number between 5 and 20 for the eco-friendly action \
    described in this journal entry, on a scale of if 5 is recycling, 10 is carpooling, 15 is \
    thrifting, and 20 is volunteering and picking up trash or invasive plants: ";

const CLASSIFY_PROMPT: &str = "please categorize this entry into one category of environmentally \
    friendly actions (categories are: recycling, reusing/repurposing, reducing waste, gardening, \
    or other). only return the category name in all lowercase letters exactly as given above. \
    here is the entry: ";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Oracle backed by an OpenAI-style chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionOracle {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatCompletionOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(OracleError::MissingApiKey)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
        })
    }

    /// Send one system prompt and return the trimmed reply.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "system",
                content: prompt,
            }],
        };

        trace!(endpoint = %self.endpoint, model = %self.model, "sending chat completion");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(OracleError::EmptyResponse)
    }
}

#[async_trait]
impl ScoringOracle for ChatCompletionOracle {
    async fn classify(&self, entry: &ActionEntry) -> Result<Category, OracleError> {
        let reply = self
            .complete(&format!("{CLASSIFY_PROMPT}{}", entry.text()))
            .await?;
        let category = parse_category(&reply)?;
        debug!(%category, "classified action");
        Ok(category)
    }

    async fn score(&self, entry: &ActionEntry) -> Result<u32, OracleError> {
        let reply = self
            .complete(&format!("{SCORE_PROMPT}{}", entry.text()))
            .await?;
        let score = parse_score(&reply)?;
        debug!(score, "scored action");
        Ok(score)
    }
}

fn parse_category(reply: &str) -> Result<Category, OracleError> {
    let label = reply.trim().trim_end_matches('.');
    label
        .parse()
        .map_err(|_| OracleError::UnknownCategory(label.to_string()))
}

fn parse_score(reply: &str) -> Result<u32, OracleError> {
    reply
        .trim()
        .parse::<i64>()
        .map(clamp_score)
        .map_err(|_| OracleError::Unparseable(reply.to_string()))
}
