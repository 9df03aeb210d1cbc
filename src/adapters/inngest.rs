//! Orchestrator client: event submission and function registration.
//!
//! Events:       POST {base_url}/e/{event_key}
//! Registration: POST {base_url}/fn/register (Bearer signing key, if set)

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::Registration;
use crate::domain::Event;
use crate::error::{Error, Result};

use super::{EventEmitter, Registrar};

pub const DEFAULT_BASE_URL: &str = "https://inn.gs";

/// HTTP client for the orchestrator
pub struct InngestClient {
    base_url: String,
    event_key: String,
    signing_key: Option<String>,
    client: reqwest::Client,
}

impl InngestClient {
    pub fn new(base_url: impl Into<String>, event_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            event_key: event_key.into(),
            signing_key: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_signing_key(mut self, signing_key: impl Into<String>) -> Self {
        self.signing_key = Some(signing_key.into());
        self
    }

    fn event_url(&self) -> String {
        format!("{}/e/{}", self.base_url.trim_end_matches('/'), self.event_key)
    }

    fn register_url(&self) -> String {
        format!("{}/fn/register", self.base_url.trim_end_matches('/'))
    }
}

/// Stamp an event with an id and the current time where missing.
///
/// The orchestrator deduplicates on `id`, so a retried submit of the same
/// stamped event is not delivered twice.
pub fn stamp(mut event: Event) -> Event {
    if event.id.is_none() {
        event.id = Some(Uuid::new_v4().to_string());
    }
    if event.ts.is_none() {
        event.ts = Some(Utc::now().timestamp_millis());
    }
    event
}

#[async_trait]
impl EventEmitter for InngestClient {
    async fn submit(&self, event: Event) -> Result<()> {
        let event = stamp(event);
        debug!(name = %event.name, "Submitting event");

        let response = self
            .client
            .post(self.event_url())
            .json(&[&event])
            .send()
            .await
            .map_err(|e| Error::Publish(format!("Failed to send event '{}': {}", event.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Publish(format!(
                "Orchestrator rejected event '{}' ({}): {}",
                event.name, status, text
            )));
        }

        info!(name = %event.name, "Event submitted");
        Ok(())
    }
}

#[async_trait]
impl Registrar for InngestClient {
    async fn register(&self, registration: &Registration) -> Result<()> {
        let mut request = self.client.post(self.register_url()).json(registration);
        if let Some(ref key) = self.signing_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Registration(format!("Failed to reach orchestrator: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Registration(format!(
                "Orchestrator rejected registration ({}): {}",
                status, text
            )));
        }

        info!(
            url = %registration.url,
            functions = registration.functions.len(),
            "Registered functions"
        );
        Ok(())
    }
}
