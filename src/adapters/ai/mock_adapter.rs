//! Mock summary provider for running the pipeline without a model.
//!
//! Returns a canned summary after a simulated delay.

use crate::domain::DomainError;
use crate::ports::SummaryProvider;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

const NAME: &str = "mock";

pub struct MockProvider {
    /// Simulated latency per request.
    delay: Duration,
}

impl MockProvider {
    /// Create a mock provider with the default delay (100ms).
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(100),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SummaryProvider for MockProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn summarize(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        info!(prompt_len = prompt.len(), "[MOCK] simulating summarization");

        tokio::select! {
            _ = cancel.cancelled() => return Err(DomainError::cancelled(NAME)),
            _ = tokio::time::sleep(self.delay) => {}
        }

        let lines = prompt.lines().filter(|l| l.starts_with('[')).count();
        Ok(format!(
            "[MOCK] Summary of {} message lines. A real provider would describe the \
             discussion, decisions and open questions here.",
            lines
        ))
    }
}
