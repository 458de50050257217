//! Google Gemini `generateContent` adapter. API key goes in the query string.

use crate::adapters::ai::http::{http_client, parse_body, send_for_text};
use crate::domain::DomainError;
use crate::ports::SummaryProvider;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

const NAME: &str = "gemini";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self::with_base_url(GEMINI_BASE_URL, api_key, model)
    }

    /// Point at a different host (proxies, tests).
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i32,
}

#[async_trait::async_trait]
impl SummaryProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn summarize(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        info!(model = %self.model, prompt_len = prompt.len(), "sending prompt to gemini");

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest {
                contents: vec![Content {
                    parts: vec![Part {
                        text: prompt.to_string(),
                    }],
                }],
            });

        let body = send_for_text(NAME, request, cancel).await?;
        let parsed: GenerateResponse = parse_body(NAME, &body)?;

        if let Some(err) = parsed.error {
            return Err(DomainError::provider(
                NAME,
                format!("gemini error: {} (code: {})", err.message, err.code),
            ));
        }
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider(NAME, "no candidates in response"))?;
        let part = candidate
            .content
            .parts
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider(NAME, "no parts in response content"))?;
        Ok(part.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_content_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [{"text": "prompt"}]}]
            })))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"summary"}]}}]}"#)
            .create_async()
            .await;

        let provider = GeminiProvider::with_base_url(server.url(), "secret", None);
        let out = provider
            .summarize("prompt", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, "summary");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_candidates_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", Matcher::Any)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let provider = GeminiProvider::with_base_url(server.url(), "k", Some("m".into()));
        let err = provider
            .summarize("p", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no candidates"));
    }

    #[tokio::test]
    async fn test_error_envelope_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", Matcher::Any)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error":{"message":"quota exceeded","code":429}}"#)
            .create_async()
            .await;

        let provider = GeminiProvider::with_base_url(server.url(), "k", None);
        let err = provider
            .summarize("p", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded (code: 429)"));
    }
}
