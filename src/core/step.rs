//! Memoized, sequential step execution.
//!
//! Each named step runs its work at most once per run. Completed results and
//! failures are both written to the [`StepMemo`] before the runner returns, so
//! replaying the run with that memo skips straight past finished steps.

use std::future::Future;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::error::{Error, Result};

use super::memo::{StepMemo, StepOutcome};

/// Runs the steps of a single workflow run against its memo
#[derive(Debug)]
pub struct StepRunner {
    run_id: String,
    memo: StepMemo,

    /// Steps whose work was invoked by this runner
    executed: Vec<String>,

    /// Step that produced the error the handler is propagating
    failed_step: Option<String>,
}

impl StepRunner {
    pub fn new(run_id: impl Into<String>, memo: StepMemo) -> Self {
        Self {
            run_id: run_id.into(),
            memo,
            executed: Vec::new(),
            failed_step: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn memo(&self) -> &StepMemo {
        &self.memo
    }

    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    /// Run a named step.
    ///
    /// A memoized `Completed` result is returned without calling `work`; a
    /// memoized `Failed` outcome is raised again without calling `work`.
    /// Otherwise `work` runs once and its outcome is recorded.
    #[instrument(skip(self, work), fields(run_id = %self.run_id))]
    pub async fn run<T, F, Fut>(&mut self, step: &str, work: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.memo.get(step) {
            Some(StepOutcome::Completed(value)) => {
                debug!("Step already completed, using memoized result");
                return serde_json::from_value(value.clone()).map_err(|e| {
                    self.failed_step = Some(step.to_string());
                    Error::from(e)
                });
            }
            Some(StepOutcome::Failed(failure)) => {
                debug!(error = %failure.message, "Step previously failed, raising memoized failure");
                self.failed_step = Some(step.to_string());
                return Err(failure.clone().into());
            }
            None => {}
        }

        let started = Instant::now();
        self.executed.push(step.to_string());

        let outcome = work()
            .await
            .and_then(|value| Ok((serde_json::to_value(&value)?, value)));
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((encoded, value)) => {
                self.memo.record(step, StepOutcome::Completed(encoded))?;
                info!(duration_ms, "Step completed");
                Ok(value)
            }
            Err(e) => {
                self.failed_step = Some(step.to_string());
                self.memo.record(step, StepOutcome::Failed(e.to_failure()))?;
                error!(duration_ms, error = %e, "Step failed");
                Err(e)
            }
        }
    }

    /// Consume the runner, returning the updated memo and executed steps
    pub fn into_parts(self) -> (StepMemo, Vec<String>, Option<String>) {
        (self.memo, self.executed, self.failed_step)
    }
}
