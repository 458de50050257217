//! Anthropic Messages API adapter.

use crate::adapters::ai::http::{http_client, parse_body, send_for_text};
use crate::domain::DomainError;
use crate::ports::SummaryProvider;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

const NAME: &str = "anthropic";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-haiku-4-5-20251001";

pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self::with_base_url(ANTHROPIC_BASE_URL, api_key, model)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            client: http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    error: Option<AnthropicError>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

#[async_trait::async_trait]
impl SummaryProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn summarize(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        info!(model = %self.model, prompt_len = prompt.len(), "sending prompt to anthropic");

        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&MessagesRequest {
                model: &self.model,
                max_tokens: MAX_TOKENS,
                messages: vec![RequestMessage {
                    role: "user",
                    content: prompt,
                }],
            });

        let body = send_for_text(NAME, request, cancel).await?;
        let parsed: MessagesResponse = parse_body(NAME, &body)?;

        if let Some(err) = parsed.error {
            return Err(DomainError::provider(
                NAME,
                format!("anthropic: {} ({})", err.message, err.kind),
            ));
        }
        if parsed.content.is_empty() {
            return Err(DomainError::provider(NAME, "no content in response"));
        }
        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| DomainError::provider(NAME, "no text content in response"))
    }
}
