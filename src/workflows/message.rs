//! Reply to a chat message that mentions the bot.
//!
//! Steps, in order: add the thinking reaction, generate a reply, send it,
//! remove the reaction. A failure while generating or sending stops the run
//! and leaves the reaction in place.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use crate::adapters::{ChatPlatform, CompletionBackend};
use crate::core::{StepRunner, WorkflowDefinition, WorkflowHandler};
use crate::domain::{Event, MessageReceived, MESSAGE_RECEIVED};
use crate::error::Result;

pub const WORKFLOW_NAME: &str = "Handle Inngestabot message";

pub const STEP_ADD_REACTION: &str = "add-reaction";
pub const STEP_GENERATE_REPLY: &str = "generate-reply";
pub const STEP_SEND_REPLY: &str = "send-reply";
pub const STEP_REMOVE_REACTION: &str = "remove-reaction";

/// Handler for [`MESSAGE_RECEIVED`] events
pub struct MessageWorkflow {
    chat: Arc<dyn ChatPlatform>,
    backend: Arc<dyn CompletionBackend>,
    reaction: String,
}

impl MessageWorkflow {
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        backend: Arc<dyn CompletionBackend>,
        reaction: impl Into<String>,
    ) -> Self {
        Self {
            chat,
            backend,
            reaction: reaction.into(),
        }
    }

    /// Wrap this handler in its workflow definition
    pub fn into_definition(self) -> WorkflowDefinition {
        WorkflowDefinition::new(WORKFLOW_NAME, MESSAGE_RECEIVED, Arc::new(self))
    }
}

#[async_trait]
impl WorkflowHandler for MessageWorkflow {
    #[instrument(skip_all, fields(run_id = %steps.run_id()))]
    async fn handle(&self, event: &Event, steps: &mut StepRunner) -> Result<Value> {
        let MessageReceived { message } = event.data_as()?;
        let (channel_id, message_id) = (message.channel_id.as_str(), message.id.as_str());

        steps
            .run(STEP_ADD_REACTION, || {
                self.chat.add_reaction(channel_id, message_id, &self.reaction)
            })
            .await?;

        let reply: String = steps
            .run(STEP_GENERATE_REPLY, || self.backend.complete(&message.content))
            .await?;

        steps
            .run(STEP_SEND_REPLY, || {
                self.chat.send_reply(channel_id, message_id, &reply)
            })
            .await?;

        // No-op on the platform side if the reaction is already gone
        steps
            .run(STEP_REMOVE_REACTION, || {
                self.chat
                    .remove_own_reaction(channel_id, message_id, &self.reaction)
            })
            .await?;

        Ok(json!({ "reply": reply }))
    }
}
