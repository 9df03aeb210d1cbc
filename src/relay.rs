//! Gateway glue: turns inbound chat messages into orchestrator events.
//!
//! Messages from bots and messages that do not mention this bot are ignored.
//! Mention tokens are stripped from the content before it is submitted.

use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::adapters::EventEmitter;
use crate::domain::{Author, ChatMessage, MessageReceived};
use crate::error::Result;

/// Matches `<@123>` and `<@!123>` user mentions with the spaces and tabs
/// on either side
fn mention_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([ \t]*)<@!?\d+>([ \t]*)").expect("mention pattern is valid")
    })
}

/// Remove every user mention token and trim the result.
///
/// Spaces and tabs around a removed mention collapse to one space; a mention
/// with no horizontal whitespace around it is removed outright. Newlines are
/// never touched.
pub fn strip_mentions(content: &str) -> String {
    mention_pattern()
        .replace_all(content, |caps: &Captures| {
            if caps[1].is_empty() && caps[2].is_empty() {
                ""
            } else {
                " "
            }
        })
        .trim()
        .to_string()
}

/// A message as delivered by the chat gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub mentioned_user_ids: Vec<String>,
    #[serde(default)]
    pub is_from_bot: bool,
}

/// What the relay did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    FromBot,
    NotMentioned,
    Submitted,
}

/// Forwards bot mentions to the orchestrator
pub struct MessageRelay {
    bot_id: String,
    emitter: Arc<dyn EventEmitter>,
}

impl MessageRelay {
    pub fn new(bot_id: impl Into<String>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            bot_id: bot_id.into(),
            emitter,
        }
    }

    #[instrument(skip(self, message), fields(message_id = %message.id))]
    pub async fn relay(&self, message: InboundMessage) -> Result<RelayOutcome> {
        if message.is_from_bot {
            info!("Message from bot; ignoring");
            return Ok(RelayOutcome::FromBot);
        }

        if !message.mentioned_user_ids.iter().any(|id| *id == self.bot_id) {
            info!("Message did not mention bot");
            return Ok(RelayOutcome::NotMentioned);
        }

        info!("Message to bot received; sending event");
        let event = MessageReceived {
            message: ChatMessage {
                channel_id: message.channel_id,
                id: message.id,
                content: strip_mentions(&message.content),
            },
        }
        .into_event(Author {
            author_id: message.author_id,
        })?;

        self.emitter.submit(event).await?;
        Ok(RelayOutcome::Submitted)
    }
}
