//! OpenAI-compatible chat completions adapter.
//!
//! Works with the OpenAI API, Azure OpenAI and any server exposing the same
//! `/chat/completions` shape. The key may be empty for local gateways.

use crate::adapters::ai::http::{http_client, parse_body, send_for_text};
use crate::domain::DomainError;
use crate::ports::SummaryProvider;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const NAME: &str = "openai";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// # Arguments
    /// * `api_url` - Full endpoint (e.g., "https://api.openai.com/v1/chat/completions")
    /// * `api_key` - Bearer key, may be empty
    /// * `model` - Model name; `None` uses [`DEFAULT_OPENAI_MODEL`]
    pub fn new(api_url: String, api_key: String, model: Option<String>) -> Self {
        Self {
            client: http_client(),
            api_url,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait::async_trait]
impl SummaryProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn summarize(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        info!(model = %self.model, prompt_len = prompt.len(), "sending prompt to openai-compatible API");

        let mut request = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&ChatRequest {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                temperature: 0.3,
            });
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let body = send_for_text(NAME, request, cancel).await?;
        let parsed: ChatResponse = parse_body(NAME, &body)?;

        let summary = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DomainError::provider(NAME, "no response choices returned"))?;

        debug!(summary_len = summary.len(), "openai summarization complete");
        Ok(summary)
    }
}
