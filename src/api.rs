//! Gemini API interaction.
//!
//! This module provides a thin interface over the Google Generative Language
//! `generateContent` endpoint. Each run makes exactly one call; there is no
//! retry layer, and any failure is reported to the caller as an [`ApiError`].
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`GeminiClient`]: [`AskAsync`] implementation backed by `reqwest`

use crate::config::GeminiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Google Generative Language API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Errors returned by the language-model backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The prompt was blocked or no candidate carried text.
    #[error("empty response: {0}")]
    Empty(String),
}

/// Trait for async LLM interaction.
///
/// Implementors send a prompt to a language model and return its text answer.
pub trait AskAsync {
    /// Send `prompt` and return the model's text response.
    async fn ask(&self, prompt: &str) -> Result<String, ApiError>;
}

/// Gemini `generateContent` client.
#[derive(Debug)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", GEMINI_API_BASE, self.model)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl<'a> GenerateRequest<'a> {
    fn from_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, ApiError> {
    let response: GenerateResponse = serde_json::from_str(body)?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ApiError::Empty(format!("prompt blocked: {reason}")));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Empty("no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(ApiError::Empty(format!("no text (finish reason: {reason})")));
    }
    Ok(text)
}

/// Pull the human-readable message out of a Google error body, if there is one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

impl AskAsync for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &str) -> Result<String, ApiError> {
        let t0 = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let elapsed_ms = t0.elapsed().as_millis();

        if !status.is_success() {
            warn!(elapsed_ms, status = status.as_u16(), "Gemini call failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let text = extract_text(&body)?;
        info!(elapsed_ms, bytes = text.len(), "Gemini call succeeded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let json = serde_json::to_value(GenerateRequest::from_prompt("hello")).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_endpoint_includes_model() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: "k".to_string(),
            model: "gemini-2.5-flash".to_string(),
        });
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "<div>"}, {"text": "hi</div>"}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10}
        }"#;
        assert_eq!(extract_text(body).unwrap(), "<div>hi</div>");
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = extract_text(body).unwrap_err();
        assert!(matches!(err, ApiError::Empty(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn test_extract_text_no_candidates() {
        assert!(matches!(extract_text(r#"{"candidates": []}"#), Err(ApiError::Empty(_))));
    }

    #[test]
    fn test_extract_text_malformed() {
        assert!(matches!(extract_text("not json"), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(error_message(body), "API key not valid");
        assert_eq!(error_message("plain"), "plain");
    }
}
