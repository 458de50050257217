//! Delegates generation to the hosting client's model (sampling request).

use crate::domain::DomainError;
use crate::ports::{HostSampler, SummaryProvider};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

const NAME: &str = "sampling";
const SAMPLING_MAX_TOKENS: u32 = 2000;

pub struct SamplingProvider {
    sampler: Arc<dyn HostSampler>,
}

impl SamplingProvider {
    pub fn new(sampler: Arc<dyn HostSampler>) -> Self {
        Self { sampler }
    }

    /// Hosts answer with either a bare string, a `{ "type": "text", "text": ... }` block or
    /// something else entirely; the last case is passed through as JSON text.
    fn content_text(content: Value) -> String {
        match content {
            Value::String(s) => s,
            Value::Object(mut map) => match map.remove("text") {
                Some(Value::String(s)) => s,
                Some(other) => {
                    map.insert("text".to_string(), other);
                    Value::Object(map).to_string()
                }
                None => Value::Object(map).to_string(),
            },
            other => other.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl SummaryProvider for SamplingProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn summarize(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String, DomainError> {
        info!(prompt_len = prompt.len(), "requesting host sampling");

        let content = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DomainError::cancelled(NAME)),
            res = self.sampler.create_message(prompt, SAMPLING_MAX_TOKENS, cancel) => {
                res.map_err(|e| e.context("sampling request failed"))?
            }
        };
        Ok(Self::content_text(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeSampler {
        reply: Value,
        seen: Mutex<Vec<(String, u32)>>,
    }

    #[async_trait::async_trait]
    impl HostSampler for FakeSampler {
        async fn create_message(
            &self,
            prompt: &str,
            max_tokens: u32,
            _cancel: &CancellationToken,
        ) -> Result<Value, DomainError> {
            self.seen
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_tokens));
            Ok(self.reply.clone())
        }
    }

    fn provider(reply: Value) -> (SamplingProvider, Arc<FakeSampler>) {
        let sampler = Arc::new(FakeSampler {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        (SamplingProvider::new(sampler.clone()), sampler)
    }

    #[tokio::test]
    async fn test_text_block_content() {
        let (p, sampler) = provider(json!({"type": "text", "text": "digest"}));
        let out = p.summarize("hello", &CancellationToken::new()).await.unwrap();
        assert_eq!(out, "digest");
        assert_eq!(
            sampler.seen.lock().unwrap().as_slice(),
            &[("hello".to_string(), 2000)]
        );
    }

    #[test]
    fn test_content_text_shapes() {
        assert_eq!(SamplingProvider::content_text(json!("plain")), "plain");
        assert_eq!(SamplingProvider::content_text(json!(42)), "42");
        let image = SamplingProvider::content_text(json!({"type": "image"}));
        assert!(image.contains("image"));
    }

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let (p, sampler) = provider(json!("never"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = p.summarize("x", &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(sampler.seen.lock().unwrap().is_empty());
    }
}
