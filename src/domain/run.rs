//! Workflow run context.
//!
//! A run is ephemeral: it lives for one invoke call. The orchestrator keeps
//! the memo between calls, so resuming a run means passing that memo back in.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::StepMemo;
use crate::error::StepFailure;

use super::events::Event;

/// One execution of a workflow for a specific event
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub run_id: String,
    pub event: Event,
    pub memo: StepMemo,
}

impl WorkflowRun {
    pub fn new(run_id: impl Into<String>, event: Event, memo: StepMemo) -> Self {
        Self {
            run_id: run_id.into(),
            event,
            memo,
        }
    }

    /// Create a run whose id is derived from the event itself
    pub fn for_event(event: Event, memo: StepMemo) -> Self {
        let run_id = derive_run_id(&event);
        Self::new(run_id, event, memo)
    }
}

/// Derive a stable run id from an event (first 16 hex chars of SHA256).
///
/// The same event always maps to the same run id.
pub fn derive_run_id(event: &Event) -> String {
    let encoded = serde_json::to_vec(event).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    hex::encode(&digest[..8])
}

/// Final state of a run after one invoke
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Handler ran to completion
    Completed { result: Value },

    /// A step failed; the rest of the handler was skipped
    Failed {
        step: Option<String>,
        failure: StepFailure,
    },
}

/// Everything the orchestrator needs back from an invoke
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub state: RunState,
    pub memo: StepMemo,

    /// Steps whose work actually executed during this invoke
    pub steps_executed: Vec<String>,
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.state, RunState::Completed { .. })
    }
}
