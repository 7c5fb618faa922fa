//! LLM client, the single point of entry for all Claude API calls in
//! ResumeForge.
//!
//! ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
//! All LLM interactions MUST go through this module.
//!
//! Model: claude-sonnet-4-5 (hardcoded, do not make configurable to prevent
//! drift)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls in ResumeForge.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Task-level AI interface consumed by the dispatch and batch-processing
/// paths. Implemented by `LlmClient` in production and by scripted doubles
/// in tests.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Produces bullet-point suggestions for a resume's experience section
    /// from a job description. Non-bullet lines in the model output are
    /// discarded; an output with no recognizable bullets yields an empty
    /// list, not an error.
    async fn generate_suggestions(&self, job_description: &str) -> Result<Vec<String>, LlmError>;

    /// Returns a corrected/improved version of the given text.
    async fn correct_text(&self, text: &str) -> Result<String, LlmError>;

    /// Identifier recorded on cache entries produced by this backend.
    fn model(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // Try to parse error message
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl AiBackend for LlmClient {
    async fn generate_suggestions(&self, job_description: &str) -> Result<Vec<String>, LlmError> {
        let prompt =
            prompts::SUGGESTIONS_PROMPT_TEMPLATE.replace("{job_description}", job_description);
        let response = self.call(&prompt, prompts::SUGGESTIONS_SYSTEM).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(parse_suggestion_lines(text))
    }

    async fn correct_text(&self, text: &str) -> Result<String, LlmError> {
        let prompt = prompts::CORRECTION_PROMPT_TEMPLATE.replace("{text}", text);
        let response = self.call(&prompt, prompts::CORRECTION_SYSTEM).await?;
        let corrected = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(corrected.trim().to_string())
    }

    fn model(&self) -> &str {
        MODEL
    }
}

/// Keeps only lines the model formatted as bullets (`*` or `-` prefix),
/// with the marker stripped and surrounding whitespace trimmed.
pub fn parse_suggestion_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('*') || line.starts_with('-'))
        .map(|line| line[1..].trim_start_matches('\t').trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suggestion_lines_keeps_bullets_only() {
        let text = "Here are some suggestions:\n\
                    - Led a cross-functional team of 8 engineers\n\
                    * Reduced deployment time by 40%\n\
                    These should help your resume stand out.";

        let lines = parse_suggestion_lines(text);
        assert_eq!(
            lines,
            vec![
                "Led a cross-functional team of 8 engineers",
                "Reduced deployment time by 40%",
            ]
        );
    }

    #[test]
    fn test_parse_suggestion_lines_strips_markers_and_tabs() {
        let text = "-\tShipped v2 of the billing pipeline\n-   Cut infra cost by 30%";
        let lines = parse_suggestion_lines(text);
        assert_eq!(
            lines,
            vec!["Shipped v2 of the billing pipeline", "Cut infra cost by 30%"]
        );
    }

    #[test]
    fn test_parse_suggestion_lines_handles_indented_bullets() {
        let text = "  - Indented bullet\n\t* Tab-indented bullet";
        let lines = parse_suggestion_lines(text);
        assert_eq!(lines, vec!["Indented bullet", "Tab-indented bullet"]);
    }

    #[test]
    fn test_parse_suggestion_lines_no_bullets_yields_empty() {
        let text = "I could not identify concrete achievements in this description.";
        assert!(parse_suggestion_lines(text).is_empty());
    }

    #[test]
    fn test_parse_suggestion_lines_drops_empty_bullets() {
        let text = "- \n- Real content";
        assert_eq!(parse_suggestion_lines(text), vec!["Real content"]);
    }
}
