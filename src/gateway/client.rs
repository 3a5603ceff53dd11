//! Anthropic Messages API client for natural-language pattern ranking
//!
//! The external service is asked to rank candidate pattern summaries
//! against the user's query and answer with a JSON array of pattern ids.
//! Cost is estimated ahead of the call from the serialized prompt size;
//! there is no post-hoc billing reconciliation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OrgMineError, Result};
use crate::schema::PatternSummary;

/// Claude Haiku pricing, USD per million tokens
pub const COST_PER_MTOK_INPUT: f64 = 0.25;
pub const COST_PER_MTOK_OUTPUT: f64 = 1.25;

/// Short response keeps the output-side cost bounded
pub const MAX_RESPONSE_TOKENS: u32 = 256;

/// At most this many candidate summaries are considered per query
pub const MAX_CANDIDATES: usize = 100;

/// At most this many candidate rows are serialized into the prompt
pub const MAX_PROMPT_ROWS: usize = 50;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Client for the external query-ranking service
pub struct QueryClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl QueryClient {
    /// Build a client with the given credential and per-request timeout
    pub fn new(api_key: String, model: String, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OrgMineError::ExternalUnavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, api_key, model })
    }

    /// Ask the external service to rank candidates against the query
    ///
    /// Returns pattern ids ordered by relevance; unknown ids are dropped
    /// by the caller. Every failure mode (transport, status, shape) maps
    /// to `ExternalUnavailable` so the gateway can fall back.
    pub async fn rank_patterns(&self, query: &str, prompt: &str) -> Result<Vec<i64>> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_RESPONSE_TOKENS,
            messages: vec![Message { role: "user", content: prompt }],
        };

        let response = self
            .http
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| OrgMineError::ExternalUnavailable {
                message: format!("query \"{query}\": {e}"),
            })?;

        if !response.status().is_success() {
            return Err(OrgMineError::ExternalUnavailable {
                message: format!("query \"{query}\": HTTP {}", response.status()),
            });
        }

        let body: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| OrgMineError::ExternalUnavailable {
                    message: format!("malformed response: {e}"),
                })?;

        let text = body
            .content
            .first()
            .map(|block| block.text.as_str())
            .unwrap_or_default();

        parse_id_array(text).ok_or_else(|| OrgMineError::ExternalUnavailable {
            message: "response contained no id array".to_string(),
        })
    }
}

/// Build the ranking prompt from candidate summaries
pub fn build_prompt(query: &str, candidates: &[PatternSummary]) -> String {
    let rows: Vec<String> = candidates
        .iter()
        .take(MAX_PROMPT_ROWS)
        .map(|p| {
            format!(
                "ID {}: {} | {} | Tags: {} | Complexity: {}",
                p.id,
                p.name,
                p.category,
                p.tags.iter().take(5).cloned().collect::<Vec<_>>().join(", "),
                p.complexity_score,
            )
        })
        .collect();

    format!(
        "You are a metadata pattern search assistant.\n\n\
         User query: \"{query}\"\n\n\
         Available patterns (ID, name, category, tags, complexity):\n{}\n\n\
         Respond ONLY with a JSON array of pattern IDs that best match the query, \
         ordered by relevance.\nReturn at most 10 IDs. If no patterns match, return \
         an empty array.\n\nExample response: [42, 17, 93, 8]\n\nYour response:",
        rows.join("\n"),
    )
}

/// Estimate the cost of one call from the serialized prompt size
///
/// Input tokens are approximated as bytes/4; the output side assumes the
/// full response budget is used.
pub fn estimate_cost(prompt: &str) -> f64 {
    let input_tokens = (prompt.len() / 4) as f64;
    input_tokens / 1_000_000.0 * COST_PER_MTOK_INPUT
        + MAX_RESPONSE_TOKENS as f64 / 1_000_000.0 * COST_PER_MTOK_OUTPUT
}

/// Extract a JSON id array from free-form response text
pub fn parse_id_array(text: &str) -> Option<Vec<i64>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
