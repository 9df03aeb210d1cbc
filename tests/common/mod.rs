//! Recording fakes for the external collaborators.
//!
//! Every fake appends a line to a shared call log so tests can assert on
//! the exact order and count of side effects.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use inngestabot::adapters::completion::ReplyPayload;
use inngestabot::adapters::{ChatPlatform, CompletionBackend, EventEmitter, Registrar};
use inngestabot::core::{Registration, WorkflowRegistry};
use inngestabot::domain::Event;
use inngestabot::workflows::build_registry;
use inngestabot::{Error, Result};

pub const REACTION: &str = "🤔";

/// Shared, ordered log of side-effecting calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

/// Chat platform that tracks reactions and records calls
pub struct FakeChat {
    log: CallLog,
    reactions: Mutex<Vec<(String, String)>>,
    reject_send: Option<String>,
}

impl FakeChat {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            reactions: Mutex::new(Vec::new()),
            reject_send: None,
        }
    }

    /// Reject every send with a delivery error
    pub fn rejecting_sends(log: CallLog, reason: &str) -> Self {
        Self {
            reject_send: Some(reason.to_string()),
            ..Self::new(log)
        }
    }

    pub fn has_reaction(&self, channel_id: &str, message_id: &str) -> bool {
        self.reactions
            .lock()
            .unwrap()
            .contains(&(channel_id.to_string(), message_id.to_string()))
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        self.log
            .push(format!("add_reaction({},{},{})", channel_id, message_id, emoji));
        self.reactions
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message_id.to_string()));
        Ok(())
    }

    async fn remove_own_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<()> {
        self.log.push(format!(
            "remove_own_reaction({},{},{})",
            channel_id, message_id, emoji
        ));
        // Absent reaction is not an error
        self.reactions
            .lock()
            .unwrap()
            .retain(|r| *r != (channel_id.to_string(), message_id.to_string()));
        Ok(())
    }

    async fn send_reply(&self, channel_id: &str, message_id: &str, content: &str) -> Result<()> {
        self.log
            .push(format!("send_reply({},{},{})", channel_id, message_id, content));
        match self.reject_send {
            Some(ref reason) => Err(Error::Delivery(reason.clone())),
            None => Ok(()),
        }
    }
}

/// Backend that answers with a fixed raw JSON body
pub struct FakeBackend {
    log: CallLog,
    body: Option<Value>,
}

impl FakeBackend {
    pub fn replying(log: CallLog, reply: &str) -> Self {
        Self::with_body(log, json!({ "reply": reply }))
    }

    pub fn with_body(log: CallLog, body: Value) -> Self {
        Self {
            log,
            body: Some(body),
        }
    }

    pub fn unreachable(log: CallLog) -> Self {
        Self { log, body: None }
    }
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    async fn complete(&self, message: &str) -> Result<String> {
        self.log.push(format!("complete({})", message));
        match self.body {
            Some(ref body) => Ok(ReplyPayload::parse(&body.to_string())?.reply),
            None => Err(Error::Backend("connection refused".to_string())),
        }
    }
}

/// Emitter that keeps submitted events
#[derive(Default)]
pub struct RecordingEmitter {
    pub events: Mutex<Vec<Event>>,
    pub fail: bool,
}

impl RecordingEmitter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn submitted(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventEmitter for RecordingEmitter {
    async fn submit(&self, event: Event) -> Result<()> {
        if self.fail {
            return Err(Error::Publish("orchestrator offline".to_string()));
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Registrar that keeps registrations, or rejects them
#[derive(Default)]
pub struct RecordingRegistrar {
    pub registrations: Mutex<Vec<Registration>>,
    pub reject: bool,
}

#[async_trait]
impl Registrar for RecordingRegistrar {
    async fn register(&self, registration: &Registration) -> Result<()> {
        if self.reject {
            return Err(Error::Registration("401 Unauthorized".to_string()));
        }
        self.registrations
            .lock()
            .unwrap()
            .push(registration.clone());
        Ok(())
    }
}

/// Registry wired to the given fakes
pub fn registry(chat: Arc<FakeChat>, backend: FakeBackend) -> WorkflowRegistry {
    build_registry(chat, Arc::new(backend), REACTION).unwrap()
}

/// The event from the end-to-end scenario
pub fn message_event(content: &str) -> Event {
    serde_json::from_value(json!({
        "name": "inngestabot/message.received",
        "data": {"message": {"channelId": "c1", "id": "m1", "content": content}},
        "user": {"authorId": "u1"}
    }))
    .unwrap()
}
