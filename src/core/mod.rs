//! Durable step-execution engine.
//!
//! This module contains:
//! - StepMemo: per-run record of step outcomes
//! - StepRunner: memoized sequential step execution
//! - Workflow: definitions and the trigger registry
//! - Protocol: register/invoke/view adapter for the orchestrator

pub mod memo;
pub mod protocol;
pub mod step;
pub mod workflow;

// Re-export commonly used types
pub use memo::{StepMemo, StepOutcome};
pub use protocol::{
    AdapterSettings, InvokeBody, ProtocolAction, ProtocolAdapter, ProtocolRequest,
    ProtocolResponse, Registration,
};
pub use step::StepRunner;
pub use workflow::{
    slugify, RegistrationDescriptor, WorkflowDefinition, WorkflowHandler, WorkflowRegistry,
};
