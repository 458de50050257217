//! HTTP plumbing shared by the hosted/local provider adapters.

use crate::domain::DomainError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Inference on large batches can take minutes.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Client with the provider timeout applied.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(PROVIDER_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build HTTP client with timeout, using defaults");
            reqwest::Client::new()
        })
}

/// Error bodies are echoed into messages; keep them short.
pub fn truncate_body(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Send `request` and return the body of a 2xx response.
///
/// The exchange races `cancel`; when cancellation wins, the in-flight request future is
/// dropped, which closes the connection.
pub async fn send_for_text(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
) -> Result<String, DomainError> {
    let exchange = async {
        let response = request
            .send()
            .await
            .map_err(|e| DomainError::provider(provider, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DomainError::provider(provider, format!("reading response: {}", e)))?;

        if !status.is_success() {
            warn!(provider, status = %status, body = %truncate_body(&body), "provider returned error");
            return Err(DomainError::provider(
                provider,
                format!(
                    "{} returned status {}: {}",
                    provider,
                    status.as_u16(),
                    truncate_body(&body)
                ),
            ));
        }
        debug!(provider, body_len = body.len(), "provider response received");
        Ok(body)
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DomainError::cancelled(provider)),
        res = exchange => res,
    }
}

/// Decode a provider JSON body.
pub fn parse_body<T: DeserializeOwned>(provider: &'static str, body: &str) -> Result<T, DomainError> {
    serde_json::from_str(body).map_err(|e| {
        DomainError::provider(provider, format!("unmarshaling response: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_token_wins_before_request() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        // Port 9 (discard) on localhost; the request is never awaited to completion.
        let req = http_client().post("http://127.0.0.1:9/never");
        let err = send_for_text("test", req, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_non_success_status_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/x")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let req = http_client().post(format!("{}/x", server.url()));
        let err = send_for_text("test", req, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Provider { .. }));
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn test_parse_body_malformed() {
        let err = parse_body::<serde_json::Value>("test", "{not json").unwrap_err();
        assert!(err.to_string().contains("unmarshaling response"));
    }
}
