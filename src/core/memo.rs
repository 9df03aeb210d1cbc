//! Per-run record of finished steps.
//!
//! The memo is append-only for the lifetime of a run. It serializes as a
//! plain JSON object so the orchestrator can store it and hand it back on
//! the next invoke.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result, StepFailure};

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    Completed(Value),
    Failed(StepFailure),
}

impl StepOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Map of step name to recorded outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepMemo {
    outcomes: BTreeMap<String, StepOutcome>,
}

impl StepMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step: &str) -> Option<&StepOutcome> {
        self.outcomes.get(step)
    }

    /// Record a step outcome.
    ///
    /// Re-recording an identical outcome is a no-op. Recording a different
    /// outcome for a step that already has one fails with
    /// [`Error::DuplicateStep`].
    pub fn record(&mut self, step: &str, outcome: StepOutcome) -> Result<()> {
        match self.outcomes.get(step) {
            Some(existing) if *existing == outcome => Ok(()),
            Some(_) => Err(Error::DuplicateStep {
                step: step.to_string(),
            }),
            None => {
                self.outcomes.insert(step.to_string(), outcome);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Iterate over recorded steps in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StepOutcome)> {
        self.outcomes.iter().map(|(k, v)| (k.as_str(), v))
    }
}
