//! Application configuration. API credentials, paths, summarization provider settings.

use crate::adapters::ai::ProviderName;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default approximate token budget per summarization batch.
pub const DEFAULT_BATCH_TOKENS: usize = 8000;

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Tuning constants passed to each component instead of being hard-coded.
///
/// Tests build this with small values (e.g. a zero rate-limit interval).
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    /// Page size used by rolling summarization.
    pub summary_page_size: i32,
    /// Page size used by bulk export and by `fetch_all` when the caller passes none.
    pub export_page_size: i32,
    /// Interval between heartbeat progress notifications.
    pub heartbeat_interval: Duration,
    /// Minimum spacing between outbound history requests.
    pub rate_limit_interval: Duration,
    /// Approximate token budget per summarization batch.
    pub batch_tokens: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            summary_page_size: 50,
            export_page_size: 100,
            heartbeat_interval: Duration::from_secs(5),
            rate_limit_interval: Duration::from_secs(1),
            batch_tokens: DEFAULT_BATCH_TOKENS,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub api_id: Option<i32>,
    pub session_path: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Summarization
    // ─────────────────────────────────────────────────────────────────────────
    /// Provider name: sampling, ollama, gemini, anthropic, openai or mock. Read from TG_DIGEST_PROVIDER.
    #[serde(default)]
    pub provider: Option<String>,

    /// Provider-specific model name. Read from TG_DIGEST_MODEL.
    #[serde(default)]
    pub model: Option<String>,

    /// Ollama base URL. Read from TG_DIGEST_OLLAMA_URL or OLLAMA_URL.
    #[serde(default)]
    pub ollama_url: Option<String>,

    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible endpoint. Defaults to OpenAI chat completions.
    #[serde(default)]
    pub openai_api_url: Option<String>,

    /// Approximate tokens per batch. Read from TG_DIGEST_BATCH_TOKENS.
    #[serde(default)]
    pub batch_tokens: Option<usize>,

    // ─────────────────────────────────────────────────────────────────────────
    // Export
    // ─────────────────────────────────────────────────────────────────────────
    /// Comma-separated directories that export may write into. Read from TG_DIGEST_ALLOWED_PATHS.
    #[serde(default)]
    pub allowed_paths: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Tuning
    // ─────────────────────────────────────────────────────────────────────────
    /// Milliseconds between history requests (default 1000). Read from TG_DIGEST_RATE_LIMIT_MS.
    #[serde(default)]
    pub rate_limit_ms: Option<u64>,

    /// Heartbeat interval in seconds (default 5). Read from TG_DIGEST_HEARTBEAT_SECS.
    #[serde(default)]
    pub heartbeat_secs: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("TG_DIGEST"));
        if let Ok(path) = std::env::var("TG_DIGEST_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;
        // Numeric overrides are parsed by hand so a malformed value is ignored instead of failing the load.
        if let Ok(s) = std::env::var("TG_DIGEST_BATCH_TOKENS") {
            if let Ok(n) = s.parse::<usize>() {
                cfg.batch_tokens = Some(n);
            }
        }
        if let Ok(s) = std::env::var("TG_DIGEST_RATE_LIMIT_MS") {
            if let Ok(ms) = s.parse::<u64>() {
                cfg.rate_limit_ms = Some(ms);
            }
        }
        if let Ok(s) = std::env::var("TG_DIGEST_HEARTBEAT_SECS") {
            if let Ok(n) = s.parse::<u64>() {
                cfg.heartbeat_secs = Some(n);
            }
        }
        Ok(cfg)
    }

    /// Tuning derived from config. Unset values keep their defaults.
    pub fn tuning(&self) -> Tuning {
        let mut t = Tuning::default();
        if let Some(n) = self.batch_tokens.filter(|n| *n > 0) {
            t.batch_tokens = n;
        }
        if let Some(ms) = self.rate_limit_ms {
            t.rate_limit_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.heartbeat_secs.filter(|s| *s > 0) {
            t.heartbeat_interval = Duration::from_secs(secs);
        }
        t
    }

    pub fn api_id(&self) -> i32 {
        self.api_id
            .or_else(|| {
                std::env::var("TELEGRAM_API_ID")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or(0)
    }

    pub fn session_path_or_default(&self) -> PathBuf {
        self.session_path
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./session.db"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Provider Configuration Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the configured provider. Defaults to host sampling.
    pub fn provider_name(&self) -> Result<ProviderName, crate::domain::DomainError> {
        match self.provider.as_deref() {
            Some(raw) => raw.parse(),
            None => Ok(ProviderName::Sampling),
        }
    }

    pub fn model(&self) -> Option<String> {
        self.model.clone().filter(|m| !m.is_empty())
    }

    pub fn ollama_url_or_default(&self) -> String {
        self.ollama_url
            .clone()
            .or_else(|| std::env::var("OLLAMA_URL").ok())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
    }

    /// Returns the Gemini key from config or GEMINI_API_KEY env.
    pub fn gemini_api_key(&self) -> Option<String> {
        self.gemini_api_key
            .clone()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
    }

    /// Returns the Anthropic key from config or ANTHROPIC_API_KEY env.
    pub fn anthropic_api_key(&self) -> Option<String> {
        self.anthropic_api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }

    /// Returns the OpenAI key from config or OPENAI_API_KEY env.
    pub fn openai_api_key(&self) -> Option<String> {
        self.openai_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }

    pub fn openai_api_url_or_default(&self) -> String {
        self.openai_api_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Export Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Directories export may write into. Defaults to the platform data dir.
    pub fn allowed_paths(&self) -> Vec<PathBuf> {
        let configured: Vec<PathBuf> = self
            .allowed_paths
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        if configured.is_empty() {
            vec![default_backup_dir()]
        } else {
            configured
        }
    }
}

/// Platform data dir + `tg-digest/backups` (e.g. `~/.local/share/tg-digest/backups`).
pub fn default_backup_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tg-digest")
        .join("backups")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_defaults() {
        let t = AppConfig::default().tuning();
        assert_eq!(t, Tuning::default());
        assert_eq!(t.batch_tokens, 8000);
        assert_eq!(t.heartbeat_interval, Duration::from_secs(5));
        assert_eq!(t.rate_limit_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_tuning_overrides_ignore_zero() {
        let cfg = AppConfig {
            batch_tokens: Some(0),
            heartbeat_secs: Some(2),
            rate_limit_ms: Some(0),
            ..AppConfig::default()
        };
        let t = cfg.tuning();
        assert_eq!(t.batch_tokens, DEFAULT_BATCH_TOKENS);
        assert_eq!(t.heartbeat_interval, Duration::from_secs(2));
        assert_eq!(t.rate_limit_interval, Duration::ZERO);
    }

    #[test]
    fn test_allowed_paths_parsing() {
        let cfg = AppConfig {
            allowed_paths: Some(" /tmp/a, ,/tmp/b ".into()),
            ..AppConfig::default()
        };
        assert_eq!(
            cfg.allowed_paths(),
            vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")]
        );
        assert_eq!(AppConfig::default().allowed_paths(), vec![default_backup_dir()]);
    }

    #[test]
    fn test_provider_name_validation() {
        let cfg = AppConfig {
            provider: Some("gemini".into()),
            ..AppConfig::default()
        };
        assert_eq!(cfg.provider_name().unwrap(), ProviderName::Gemini);
        let bad = AppConfig {
            provider: Some("gpt".into()),
            ..AppConfig::default()
        };
        assert!(bad.provider_name().is_err());
        assert_eq!(
            AppConfig::default().provider_name().unwrap(),
            ProviderName::Sampling
        );
    }
}
