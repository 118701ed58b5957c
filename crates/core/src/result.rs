//! Execution records - per-step results and run outcomes.

use crate::{RunId, StepError, Time};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum StepStatus {
    /// Tool returned a value
    Success,
    /// Resolution or invocation failed
    Failed(StepError),
}

/// Record of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Zero-based position in the workflow
    pub index: usize,

    /// Application called
    pub app: String,

    /// Function called
    pub function: String,

    /// Tool output (`null` when the step failed)
    pub output: Value,

    /// Success or failure
    #[serde(flatten)]
    pub status: StepStatus,

    /// When the step started
    pub started_at: Time,

    /// Execution duration
    pub duration: std::time::Duration,
}

impl StepResult {
    /// Whether the step succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.status, StepStatus::Success)
    }

    /// Failure cause, if the step failed.
    pub fn error(&self) -> Option<&StepError> {
        match &self.status {
            StepStatus::Success => None,
            StepStatus::Failed(e) => Some(e),
        }
    }
}

/// Ordered results of every attempted step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionTrace(Vec<StepResult>);

impl ExecutionTrace {
    /// Wrap results that are already in step order.
    pub fn new(results: Vec<StepResult>) -> Self {
        Self(results)
    }

    /// All results.
    pub fn results(&self) -> &[StepResult] {
        &self.0
    }

    /// Result for step `index`.
    pub fn get(&self, index: usize) -> Option<&StepResult> {
        self.0.get(index)
    }

    /// Number of attempted steps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no step was attempted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indices of failed steps.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.index)
            .collect()
    }

    /// Iterate over results.
    pub fn iter(&self) -> std::slice::Iter<'_, StepResult> {
        self.0.iter()
    }
}

impl IntoIterator for ExecutionTrace {
    type Item = StepResult;
    type IntoIter = std::vec::IntoIter<StepResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step was attempted
    Completed,
    /// Halted at a failed step
    Failed {
        /// Index of the failed step
        index: usize,
        /// Failure cause
        error: StepError,
    },
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Run identifier
    pub run_id: RunId,

    /// Name of the executed workflow
    pub workflow: String,

    /// Terminal status
    pub status: RunStatus,

    /// Per-step results
    pub trace: ExecutionTrace,
}

impl RunOutcome {
    /// Whether the run completed (step failures tolerated by policy still
    /// count as completed).
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    /// Whether every attempted step succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.is_completed() && self.trace.iter().all(StepResult::is_success)
    }

    /// Output of the last attempted step if it succeeded.
    pub fn final_output(&self) -> Option<&Value> {
        self.trace
            .results()
            .last()
            .filter(|r| r.is_success())
            .map(|r| &r.output)
    }
}
