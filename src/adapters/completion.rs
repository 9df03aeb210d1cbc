//! HTTP client for the text-generation backend.
//!
//! Endpoint: POST <endpoint> with `{"message": ...}`, answering `{"reply": ...}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::CompletionBackend;

/// Request body sent to the backend
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    message: &'a str,
}

/// Expected response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub reply: String,
}

impl ReplyPayload {
    /// Validate a response body against the reply schema
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| Error::Backend(format!("Response does not match reply schema: {}", e)))
    }
}

/// Backend reached over HTTP
pub struct HttpCompletionBackend {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpCompletionBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletionBackend {
    async fn complete(&self, message: &str) -> Result<String> {
        debug!(endpoint = %self.endpoint, "Requesting completion");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&CompletionRequest { message })
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Backend unreachable: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Backend(format!("Failed to read backend response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Backend(format!(
                "Backend returned {}: {}",
                status,
                body.trim()
            )));
        }

        Ok(ReplyPayload::parse(&body)?.reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_reply() {
        let payload = ReplyPayload::parse(r#"{"reply": "ok"}"#).unwrap();
        assert_eq!(payload.reply, "ok");
    }

    #[test]
    fn test_parse_rejects_missing_reply() {
        assert!(matches!(ReplyPayload::parse("{}"), Err(Error::Backend(_))));
    }

    #[test]
    fn test_parse_rejects_wrong_type() {
        assert!(matches!(
            ReplyPayload::parse(r#"{"reply": 42}"#),
            Err(Error::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_backend_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP
        let backend = HttpCompletionBackend::new("http://127.0.0.1:9/complete");
        let result = backend.complete("hi").await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }
}
