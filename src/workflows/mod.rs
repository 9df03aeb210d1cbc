//! Workflows served by this app.

pub mod message;

use std::sync::Arc;

use crate::adapters::{ChatPlatform, CompletionBackend};
use crate::core::WorkflowRegistry;
use crate::error::Result;

pub use message::{MessageWorkflow, WORKFLOW_NAME};

/// Build the registry of every workflow this app serves
pub fn build_registry(
    chat: Arc<dyn ChatPlatform>,
    backend: Arc<dyn CompletionBackend>,
    reaction: &str,
) -> Result<WorkflowRegistry> {
    let mut registry = WorkflowRegistry::new();
    registry.register(MessageWorkflow::new(chat, backend, reaction).into_definition())?;
    Ok(registry)
}
