//! Domain types for the bot.
//!
//! This module contains the core data structures:
//! - Events: named payloads exchanged with the orchestrator
//! - Run: one workflow execution and its report

pub mod events;
pub mod run;

// Re-export commonly used types
pub use events::{
    Author, ChatMessage, Event, MessageReceived, ReplyGenerated, MESSAGE_RECEIVED,
    REPLY_GENERATED,
};
pub use run::{derive_run_id, RunReport, RunState, WorkflowRun};
