//! Adapter interfaces for external systems.
//!
//! Adapters wrap every side-effecting collaborator of a workflow: the chat
//! platform, the completion backend, and the orchestrator. Workflows only see
//! the traits, so tests can swap in recording fakes.

pub mod completion;
pub mod discord;
pub mod inngest;

use async_trait::async_trait;

use crate::core::Registration;
use crate::domain::Event;
use crate::error::Result;

pub use completion::HttpCompletionBackend;
pub use discord::DiscordClient;
pub use inngest::InngestClient;

/// Chat platform side effects used by workflows
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Attach a reaction from the bot to a message
    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()>;

    /// Remove the bot's own reaction; succeeds if it is already absent
    async fn remove_own_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<()>;

    /// Post `content` into the channel as a reply to `message_id`.
    ///
    /// Not idempotent: calling twice posts twice.
    async fn send_reply(&self, channel_id: &str, message_id: &str, content: &str) -> Result<()>;
}

/// Text-generation backend
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Produce a reply for a user message
    async fn complete(&self, message: &str) -> Result<String>;
}

/// Publishes events to the orchestrator
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Fire-and-forget submit; transport failures surface as `Error::Publish`
    async fn submit(&self, event: Event) -> Result<()>;
}

/// Reports this app's workflows to the orchestrator
#[async_trait]
pub trait Registrar: Send + Sync {
    async fn register(&self, registration: &Registration) -> Result<()>;
}
