//! Summary provider adapters. Each implements `SummaryProvider`.
//!
//! `build_provider` picks one from configuration.

pub mod anthropic;
pub mod gemini;
pub mod http;
pub mod mock_adapter;
pub mod ollama;
pub mod openai_adapter;
pub mod sampling;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use mock_adapter::MockProvider;
pub use ollama::OllamaProvider;
pub use openai_adapter::OpenAiProvider;
pub use sampling::SamplingProvider;

use crate::domain::DomainError;
use crate::ports::{HostSampler, SummaryProvider};
use crate::shared::AppConfig;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderName {
    Sampling,
    Ollama,
    Gemini,
    Anthropic,
    OpenAi,
    Mock,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sampling => "sampling",
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sampling" => Ok(Self::Sampling),
            "ollama" => Ok(Self::Ollama),
            "gemini" => Ok(Self::Gemini),
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            other => Err(DomainError::Config(format!(
                "unknown provider {:?} (expected sampling, ollama, gemini, anthropic, openai or mock)",
                other
            ))),
        }
    }
}

/// Build the configured provider.
///
/// `host` is the hosting client's sampling channel, when there is one. Hosted providers
/// require their API key to be configured.
pub fn build_provider(
    config: &AppConfig,
    host: Option<Arc<dyn HostSampler>>,
) -> Result<Arc<dyn SummaryProvider>, DomainError> {
    let name = config.provider_name()?;
    let model = config.model();
    info!(provider = %name, model = ?model, "configuring summary provider");

    let provider: Arc<dyn SummaryProvider> = match name {
        ProviderName::Sampling => {
            let sampler = host.ok_or_else(|| {
                DomainError::Config(
                    "provider \"sampling\" needs a host that supports sampling; \
                     set TG_DIGEST_PROVIDER to another provider"
                        .to_string(),
                )
            })?;
            Arc::new(SamplingProvider::new(sampler))
        }
        ProviderName::Ollama => Arc::new(OllamaProvider::new(
            config.ollama_url_or_default(),
            model,
        )),
        ProviderName::Gemini => {
            let key = required_key(config.gemini_api_key(), "GEMINI_API_KEY")?;
            Arc::new(GeminiProvider::new(key, model))
        }
        ProviderName::Anthropic => {
            let key = required_key(config.anthropic_api_key(), "ANTHROPIC_API_KEY")?;
            Arc::new(AnthropicProvider::new(key, model))
        }
        ProviderName::OpenAi => Arc::new(OpenAiProvider::new(
            config.openai_api_url_or_default(),
            config.openai_api_key().unwrap_or_default(),
            model,
        )),
        ProviderName::Mock => Arc::new(MockProvider::new()),
    };
    Ok(provider)
}

fn required_key(key: Option<String>, var: &str) -> Result<String, DomainError> {
    key.filter(|k| !k.trim().is_empty())
        .ok_or_else(|| DomainError::Config(format!("{} is not set", var)))
}
