//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{DomainError, FetchOptions, FetchResult};
use tokio_util::sync::CancellationToken;

/// One bounded history request against the messaging platform.
///
/// Implementations resolve the chat, throttle through the shared rate limiter, issue a single
/// page request and decode it. Messages come back newest first.
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_page(&self, chat_id: i64, opts: &FetchOptions)
        -> Result<FetchResult, DomainError>;

    /// Display name of a chat (user name or group/channel title), if it can be looked up.
    async fn chat_name(&self, chat_id: i64) -> Result<Option<String>, DomainError>;
}

/// Maps an opaque chat id to a platform-addressable handle.
///
/// The handle type is adapter-specific; the core only needs resolution to succeed or fail.
#[async_trait::async_trait]
pub trait PeerResolver: Send + Sync {
    type Peer: Clone + Send + Sync;

    async fn resolve(&self, chat_id: i64) -> Result<Self::Peer, DomainError>;
}

/// Text-generation backend used by rolling summarization.
#[async_trait::async_trait]
pub trait SummaryProvider: Send + Sync {
    /// Short backend name used in logs and error context.
    fn name(&self) -> &'static str;

    /// Generate text for `prompt`. Implementations must stop their underlying request as soon
    /// as `cancel` fires and return `DomainError::Cancelled`.
    async fn summarize(&self, prompt: &str, cancel: &CancellationToken)
        -> Result<String, DomainError>;
}

/// Model-access channel of the hosting client (e.g. an MCP host's sampling endpoint).
#[async_trait::async_trait]
pub trait HostSampler: Send + Sync {
    /// Ask the host to complete a single user message. Returns the host's raw content value.
    async fn create_message(
        &self,
        prompt: &str,
        max_tokens: u32,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, DomainError>;
}
