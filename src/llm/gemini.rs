//! Google Gemini provider implementation

use super::types::{LlmMessage, MessageRole, TurnReply, Usage};
use super::{ConversationHandle, ConversationService, LlmError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection settings for the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    /// Model name as the API knows it (e.g. `gemini-pro`)
    pub model: String,
    /// API root, without the version segment
    pub base_url: String,
    /// Transport timeout for a single request
    pub timeout: Duration,
}

/// Gemini `generateContent` client
pub struct GeminiChat {
    client: Client,
    api_key: String,
    endpoint: String,
    model_id: String,
}

impl GeminiChat {
    pub fn new(settings: &GeminiSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            settings.base_url.trim_end_matches('/'),
            settings.model
        );

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            endpoint,
            model_id: settings.model.clone(),
        })
    }

    fn translate_request(history: &[LlmMessage], text: &str) -> GeminiRequest {
        let contents = history
            .iter()
            .chain(std::iter::once(&LlmMessage::user(text)))
            .map(|msg| GeminiContent {
                role: Some(
                    match msg.role {
                        MessageRole::User => "user",
                        MessageRole::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart {
                    text: msg.text.clone(),
                }],
            })
            .collect();

        GeminiRequest { contents }
    }

    fn normalize_response(resp: GeminiResponse) -> Result<TurnReply, LlmError> {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(LlmError::blocked(format!("Prompt blocked: {reason}")));
        }

        let usage = resp.usage_metadata.map_or_else(Usage::default, |u| Usage {
            input_tokens: u64::from(u.prompt_token_count),
            output_tokens: u64::from(u.candidates_token_count),
        });

        let Some(candidate) = resp.candidates.into_iter().next() else {
            return Ok(TurnReply {
                text: String::new(),
                usage,
            });
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty()
            && matches!(
                candidate.finish_reason.as_deref(),
                Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")
            )
        {
            let reason = candidate.finish_reason.unwrap_or_default();
            return Err(LlmError::blocked(format!("Response blocked: {reason}")));
        }

        Ok(TurnReply { text, usage })
    }

    fn classify_status(status: reqwest::StatusCode, body: &str) -> LlmError {
        if let Ok(error_resp) = serde_json::from_str::<GeminiErrorResponse>(body) {
            let message = error_resp.error.message;
            return match status.as_u16() {
                400 => LlmError::invalid_request(format!("Invalid request: {message}")),
                401 | 403 => LlmError::auth(format!("Authentication failed: {message}")),
                429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
                500..=599 => LlmError::server_error(format!("Server error: {message}")),
                _ => LlmError::invalid_request(format!("HTTP {status}: {message}")),
            };
        }
        LlmError::unknown(format!("HTTP {status} error: {body}"))
    }
}

#[async_trait]
impl ConversationService for GeminiChat {
    async fn send_turn(
        &self,
        handle: &ConversationHandle,
        text: &str,
    ) -> Result<TurnReply, LlmError> {
        let gemini_request = Self::translate_request(handle.history(), text);

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::timeout(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_status(status, &body));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> GeminiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_endpoint_from_settings() {
        let chat = GeminiChat::new(&GeminiSettings {
            api_key: "k".to_string(),
            model: "gemini-pro".to_string(),
            base_url: "https://example.test/".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        assert_eq!(
            chat.endpoint,
            "https://example.test/v1beta/models/gemini-pro:generateContent"
        );
        assert_eq!(chat.model_id(), "gemini-pro");
    }

    #[test]
    fn test_request_replays_history_then_new_turn() {
        let mut handle = ConversationHandle::new();
        handle.record_exchange("hi", "hello!");

        let request = GeminiChat::translate_request(handle.history(), "what's up?");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "hi" }] },
                    { "role": "model", "parts": [{ "text": "hello!" }] },
                    { "role": "user", "parts": [{ "text": "what's up?" }] }
                ]
            })
        );
    }

    #[test]
    fn test_normalize_joins_text_parts() {
        let resp = parse(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello, " }, { "text": "world" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 4, "candidatesTokenCount": 2, "totalTokenCount": 6 }
        }));

        let reply = GeminiChat::normalize_response(resp).unwrap();
        assert_eq!(reply.text, "Hello, world");
        assert_eq!(reply.usage.input_tokens, 4);
        assert_eq!(reply.usage.output_tokens, 2);
    }

    #[test]
    fn test_normalize_no_candidates_is_empty_reply() {
        let reply = GeminiChat::normalize_response(parse(json!({}))).unwrap();
        assert!(reply.text.is_empty());
    }

    #[test]
    fn test_blocked_prompt_is_provider_error() {
        let resp = parse(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));

        let err = GeminiChat::normalize_response(resp).unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Blocked);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn test_safety_finish_without_text_is_blocked() {
        let resp = parse(json!({ "candidates": [{ "finishReason": "SAFETY" }] }));

        let err = GeminiChat::normalize_response(resp).unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::Blocked);
    }

    #[test]
    fn test_status_classification() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;

        let err = GeminiChat::classify_status(reqwest::StatusCode::BAD_REQUEST, body);
        assert_eq!(err.kind, LlmErrorKind::InvalidRequest);
        assert!(err.message.contains("API key not valid"));

        let err = GeminiChat::classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(err.kind, LlmErrorKind::RateLimit);

        let err = GeminiChat::classify_status(reqwest::StatusCode::FORBIDDEN, body);
        assert_eq!(err.kind, LlmErrorKind::Auth);

        let err = GeminiChat::classify_status(reqwest::StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(err.kind, LlmErrorKind::Unknown);
    }
}
