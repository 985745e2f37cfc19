//! Hosted generative-language client
//!
//! Sends a plain-text prompt to the `generateContent` endpoint and returns the
//! concatenated text of the first candidate.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::ResponseGenerator;
use crate::{Error, Result};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for the hosted generative-language API
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client; a missing key fails each request, not construction
    #[must_use]
    pub fn new(api_key: Option<SecretString>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the API base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Model name used for requests
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ResponseGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let Some(api_key) = self.api_key.as_ref().filter(|k| !k.expose_secret().is_empty()) else {
            return Err(Error::Config("Gemini API key not configured".to_string()));
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending prompt");

        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Gemini request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Gemini API error");
            return Err(classify_failure(status.as_u16(), &body));
        }

        let result: GenerateResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Gemini response");
            e
        })?;

        let text: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Ai("empty response from model".to_string()));
        }

        tracing::debug!(reply_chars = text.len(), "received reply");
        Ok(text)
    }
}

/// Map a non-success response to an error, separating the overload class
///
/// Overload is HTTP 503, an `UNAVAILABLE` status, or a message mentioning
/// that the model is overloaded.
#[must_use]
pub fn classify_failure(status: u16, body: &str) -> Error {
    let (message, api_status) = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| (e.error.message, e.error.status))
        .unwrap_or_else(|_| (body.to_string(), String::new()));

    let overloaded = status == 503
        || api_status == "UNAVAILABLE"
        || message.to_lowercase().contains("overloaded");

    let detail = format!("Gemini API error {status}: {message}");
    if overloaded {
        Error::Overloaded(detail)
    } else {
        Error::Ai(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_before_network() {
        let client = GeminiClient::new(None, DEFAULT_MODEL).with_base_url("http://127.0.0.1:9");
        let err = client.generate("hi").await.unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn empty_key_counts_as_missing() {
        let client = GeminiClient::new(Some(SecretString::from(String::new())), DEFAULT_MODEL);
        assert!(client.generate("hi").await.unwrap_err().is_config());
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new(None, "gemini-2.5-flash").with_base_url("http://localhost:8080/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn service_unavailable_is_overload() {
        let body = r#"{"error": {"code": 503, "message": "The model is overloaded. Please try again later.", "status": "UNAVAILABLE"}}"#;
        assert!(classify_failure(503, body).is_overloaded());
    }

    #[test]
    fn overloaded_message_is_overload() {
        assert!(classify_failure(500, "model overloaded").is_overloaded());
    }

    #[test]
    fn rate_limit_is_plain_failure() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = classify_failure(429, body);
        assert!(!err.is_overloaded());
        assert!(err.to_string().contains("Quota exceeded"));
    }

    #[test]
    fn parses_candidate_text() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "Four"}, {"text": "."}], "role": "model"}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(text, "Four.");
    }
}
