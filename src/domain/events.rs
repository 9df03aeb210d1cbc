//! Events exchanged with the orchestrator.
//!
//! An [`Event`] is immutable once submitted. Its `name` selects which
//! workflows it triggers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Emitted by the relay when a message mentions the bot
pub const MESSAGE_RECEIVED: &str = "inngestabot/message.received";

/// Emitted once a reply has been produced for a prompt
pub const REPLY_GENERATED: &str = "inngestabot/reply.generated";

/// A named event with its data and originating-user attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,

    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub user: Map<String, Value>,

    /// Orchestrator-assigned id (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Submission time in epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
}

impl Event {
    /// Create an event with empty data and user maps
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Map::new(),
            user: Map::new(),
            id: None,
            ts: None,
        }
    }

    /// Build an event from serializable data and user payloads.
    ///
    /// Both payloads must serialize to JSON objects.
    pub fn from_parts<D: Serialize, U: Serialize>(
        name: impl Into<String>,
        data: &D,
        user: &U,
    ) -> Result<Self> {
        Ok(Self {
            data: into_object(serde_json::to_value(data)?, "data")?,
            user: into_object(serde_json::to_value(user)?, "user")?,
            ..Self::new(name)
        })
    }

    /// Deserialize the `data` map into a typed payload
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    /// Deserialize the `user` map into a typed payload
    pub fn user_as<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.user.clone()))?)
    }
}

fn into_object(value: Value, field: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Internal(format!(
            "Event {} must be a JSON object, got {}",
            field, other
        ))),
    }
}

/// Reference to a chat message in a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub channel_id: String,
    pub id: String,
    pub content: String,
}

/// `data` of a [`MESSAGE_RECEIVED`] event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceived {
    pub message: ChatMessage,
}

/// `data` of a [`REPLY_GENERATED`] event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyGenerated {
    pub prompt: String,
    pub reply: String,
}

/// `user` attribution shared by both bot events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub author_id: String,
}

impl MessageReceived {
    pub fn into_event(self, author: Author) -> Result<Event> {
        Event::from_parts(MESSAGE_RECEIVED, &self, &author)
    }
}

impl ReplyGenerated {
    pub fn into_event(self, author: Author) -> Result<Event> {
        Event::from_parts(REPLY_GENERATED, &self, &author)
    }
}
