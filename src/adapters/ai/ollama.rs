//! Locally hosted model server (Ollama `/api/generate`).

use crate::adapters::ai::http::{http_client, parse_body, send_for_text};
use crate::domain::DomainError;
use crate::ports::SummaryProvider;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

const NAME: &str = "ollama";

/// Default model when none is configured.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    /// * `base_url` - Server root, e.g. "http://localhost:11434"
    /// * `model` - Model tag; `None` uses [`DEFAULT_OLLAMA_MODEL`]
    pub fn new(base_url: impl Into<String>, model: Option<String>) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait::async_trait]
impl SummaryProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn summarize(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        info!(model = %self.model, prompt_len = prompt.len(), "sending prompt to ollama");

        let request = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            });

        let body = send_for_text(NAME, request, cancel).await?;
        let parsed: GenerateResponse = parse_body(NAME, &body)?;

        if let Some(err) = parsed.error.filter(|e| !e.is_empty()) {
            return Err(DomainError::provider(NAME, format!("ollama error: {}", err)));
        }
        if parsed.response.trim().is_empty() {
            return Err(DomainError::provider(NAME, "empty response"));
        }
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(Matcher::PartialJson(json!({
                "model": "qwen2",
                "prompt": "Summarize this",
                "stream": false
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response":"A short summary","done":true}"#)
            .create_async()
            .await;

        let provider = OllamaProvider::new(server.url(), Some("qwen2".into()));
        let out = provider
            .summarize("Summarize this", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, "A short summary");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_field_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(r#"{"error":"model 'x' not found"}"#)
            .create_async()
            .await;

        let provider = OllamaProvider::new(format!("{}/", server.url()), None);
        let err = provider
            .summarize("p", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model 'x' not found"));
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/generate")
            .with_status(200)
            .with_body(r#"{"response":"  ","done":true}"#)
            .create_async()
            .await;

        let provider = OllamaProvider::new(server.url(), None);
        let err = provider
            .summarize("p", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Provider { .. }));
    }
}
