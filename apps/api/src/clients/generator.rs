//! HTTP content generator — the single point of entry for all model calls.
//!
//! ARCHITECTURAL RULE: no other module may call the model API directly.
//! All generation and remote scoring goes through this client.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clients::{ContentGenerator, GeneratedDraft, TextStyleAnalyzer};
use crate::models::voice::VoiceVector;

const API_VERSION: &str = "2023-06-01";
/// Hardcoded to prevent accidental model drift between scoring and generation.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
const MAX_RETRIES: u32 = 3;

const GENERATION_SYSTEM: &str = "You are a ghostwriter for professional social posts. \
Return ONLY valid JSON: {\"body\": string, \"raw_hook_score\": int 0-100, \"suggestions\": [string]}.";

const SCORING_SYSTEM: &str = "You rate social posts for engagement potential. \
Return ONLY valid JSON: {\"raw_hook_score\": int 0-100}.";

const STYLE_SYSTEM: &str = "You analyze writing style across five dimensions, each 0-10. \
Return ONLY valid JSON: {\"formal\": number, \"bold\": number, \"empathetic\": number, \
\"complexity\": number, \"brevity\": number}.";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Model returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ModelRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ModelMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ModelMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl ModelResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct DraftPayload {
    body: String,
    raw_hook_score: i32,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ScorePayload {
    raw_hook_score: i32,
}

/// Messages-API client with bounded exponential-backoff retry on 429/5xx.
#[derive(Clone)]
pub struct HttpGenerator {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpGenerator {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_url,
            api_key,
        }
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, GeneratorError> {
        let request_body = ModelRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![ModelMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<GeneratorError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Generator call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(GeneratorError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Generator API returned {}: {}", status, body);
                last_error = Some(GeneratorError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GeneratorError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let model_response: ModelResponse = response.json().await?;
            let text = model_response.text().ok_or(GeneratorError::EmptyContent)?;
            let text = strip_json_fences(text);

            debug!("Generator call succeeded ({} chars)", text.len());
            return serde_json::from_str(text).map_err(GeneratorError::Parse);
        }

        Err(last_error.unwrap_or(GeneratorError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    async fn generate(
        &self,
        prompt: &str,
        source_type: &str,
        personalization: Option<&str>,
    ) -> Result<GeneratedDraft> {
        let mut full_prompt = format!("Source type: {source_type}\n\n{prompt}");
        if let Some(ctx) = personalization {
            full_prompt.push_str("\n\nWriter profile:\n");
            full_prompt.push_str(ctx);
        }

        let payload: DraftPayload = self.call_json(&full_prompt, GENERATION_SYSTEM).await?;
        Ok(GeneratedDraft {
            body: payload.body,
            raw_hook_score: payload.raw_hook_score.clamp(0, 100),
            suggestions: payload.suggestions,
            model: MODEL.to_string(),
        })
    }

    async fn score(&self, text: &str) -> Result<i32> {
        let payload: ScorePayload = self.call_json(text, SCORING_SYSTEM).await?;
        Ok(payload.raw_hook_score.clamp(0, 100))
    }
}

#[async_trait]
impl TextStyleAnalyzer for HttpGenerator {
    async fn analyze(&self, samples: &[String]) -> Result<VoiceVector> {
        let prompt = samples.join("\n\n---\n\n");
        let vector: VoiceVector = self.call_json(&prompt, STYLE_SYSTEM).await?;
        Ok(vector.clamped())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"raw_hook_score\": 70}\n```";
        assert_eq!(strip_json_fences(input), "{\"raw_hook_score\": 70}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"raw_hook_score\": 70}";
        assert_eq!(strip_json_fences(input), input);
    }

    #[test]
    fn test_draft_payload_defaults_suggestions() {
        let parsed: DraftPayload =
            serde_json::from_str("{\"body\": \"hi\", \"raw_hook_score\": 55}").unwrap();
        assert!(parsed.suggestions.is_empty());
    }
}
