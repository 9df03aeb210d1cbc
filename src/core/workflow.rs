//! Workflow definitions and the registry that maps triggers to them.
//!
//! The registry is built once at startup and is read-only afterwards, so it
//! can be shared between concurrent runs behind an `Arc` without locking.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::domain::{Event, RunReport, RunState, WorkflowRun};
use crate::error::{Error, Result};

use super::step::StepRunner;

/// The step sequence of a workflow
#[async_trait]
pub trait WorkflowHandler: Send + Sync {
    /// Drive the workflow's steps for one triggering event
    async fn handle(&self, event: &Event, steps: &mut StepRunner) -> Result<Value>;
}

/// A named workflow and the event that triggers it
#[derive(Clone)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub trigger: String,
    handler: Arc<dyn WorkflowHandler>,
}

impl std::fmt::Debug for WorkflowDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

impl WorkflowDefinition {
    /// Create a definition; the id is the slug of `name`
    pub fn new(
        name: impl Into<String>,
        trigger: impl Into<String>,
        handler: Arc<dyn WorkflowHandler>,
    ) -> Self {
        let name = name.into();
        Self {
            id: slugify(&name),
            name,
            trigger: trigger.into(),
            handler,
        }
    }

    pub fn descriptor(&self) -> RegistrationDescriptor {
        RegistrationDescriptor {
            id: self.id.clone(),
            name: self.name.clone(),
            trigger_event_name: self.trigger.clone(),
        }
    }

    /// Run the handler for one run, capturing the outcome in a report
    #[instrument(skip(self, run), fields(workflow = %self.id, run_id = %run.run_id))]
    pub async fn execute(&self, run: WorkflowRun) -> RunReport {
        let WorkflowRun {
            run_id,
            event,
            memo,
        } = run;

        let mut steps = StepRunner::new(run_id.clone(), memo);
        let result = self.handler.handle(&event, &mut steps).await;
        let (memo, steps_executed, failed_step) = steps.into_parts();

        let state = match result {
            Ok(result) => {
                info!(executed = steps_executed.len(), "Run completed");
                RunState::Completed { result }
            }
            Err(e) => {
                warn!(step = ?failed_step, error = %e, "Run failed");
                RunState::Failed {
                    step: failed_step,
                    failure: e.to_failure(),
                }
            }
        };

        RunReport {
            run_id,
            state,
            memo,
            steps_executed,
        }
    }
}

/// Discovery metadata for a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDescriptor {
    pub id: String,
    pub name: String,
    pub trigger_event_name: String,
}

/// Registration-ordered set of workflow definitions
#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
    definitions: Vec<WorkflowDefinition>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition; names must be unique
    pub fn register(&mut self, definition: WorkflowDefinition) -> Result<()> {
        if self
            .definitions
            .iter()
            .any(|d| d.name == definition.name || d.id == definition.id)
        {
            return Err(Error::DuplicateWorkflowName(definition.name));
        }
        self.definitions.push(definition);
        Ok(())
    }

    /// Definitions triggered by `event_name`, in registration order
    pub fn lookup_by_trigger(&self, event_name: &str) -> Vec<&WorkflowDefinition> {
        self.definitions
            .iter()
            .filter(|d| d.trigger == event_name)
            .collect()
    }

    /// Resolve a function id (slug or exact name)
    pub fn get(&self, fn_id: &str) -> Option<&WorkflowDefinition> {
        self.definitions
            .iter()
            .find(|d| d.id == fn_id || d.name == fn_id)
    }

    pub fn descriptors(&self) -> Vec<RegistrationDescriptor> {
        self.definitions.iter().map(|d| d.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Lowercase, alphanumeric words joined by '-'
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
