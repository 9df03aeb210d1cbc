//! Discord REST client for reactions and replies.
//!
//! Only the three calls the message workflow needs. The gateway connection
//! that delivers inbound messages lives outside this crate.

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

use super::ChatPlatform;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Discord Bot API client
pub struct DiscordClient {
    token: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
    message_reference: MessageReference<'a>,
}

#[derive(Debug, Serialize)]
struct MessageReference<'a> {
    message_id: &'a str,
    fail_if_not_exists: bool,
}

impl DiscordClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: api_base.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build an API URL from raw path segments (each segment is percent-encoded)
    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| Error::Config(format!("Invalid Discord API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("Discord API base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn reaction_url(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<Url> {
        self.api_url(&[
            "channels",
            channel_id,
            "messages",
            message_id,
            "reactions",
            emoji,
            "@me",
        ])
    }

    async fn reaction_call(&self, method: Method, url: Url) -> Result<StatusCode> {
        let response = self
            .client
            .request(method, url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| Error::Platform(format!("Discord request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(status);
        }

        let text = response.text().await.unwrap_or_default();
        Err(Error::Platform(format!("Discord error ({}): {}", status, text)))
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        let url = self.reaction_url(channel_id, message_id, emoji)?;
        let status = self.reaction_call(Method::PUT, url).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(Error::Platform(format!(
                "Message {} not found in channel {}",
                message_id, channel_id
            )));
        }
        Ok(())
    }

    async fn remove_own_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<()> {
        let url = self.reaction_url(channel_id, message_id, emoji)?;
        let status = self.reaction_call(Method::DELETE, url).await?;
        if status == StatusCode::NOT_FOUND {
            debug!(%channel_id, %message_id, "Reaction already absent");
        }
        Ok(())
    }

    async fn send_reply(&self, channel_id: &str, message_id: &str, content: &str) -> Result<()> {
        let url = self.api_url(&["channels", channel_id, "messages"])?;

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&CreateMessage {
                content,
                message_reference: MessageReference {
                    message_id,
                    fail_if_not_exists: true,
                },
            })
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("Discord request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(Error::Delivery(format!("Discord rejected reply ({}): {}", status, text)))
        }
    }
}
