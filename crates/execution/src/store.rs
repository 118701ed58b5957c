//! Append-only record of step results for one run.

use toolflow_core::{ExecutionTrace, StepResult};

/// Errors from the results store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResultsStoreError {
    /// A result arrived for a step other than the next one.
    #[error("result for step {got} appended out of order; expected step {expected}")]
    OutOfOrder {
        /// Next index the store accepts
        expected: usize,
        /// Index of the rejected result
        got: usize,
    },
}

/// Step results of a single run, addressable by step index.
///
/// Results can only be appended in step order and never change afterwards,
/// so a reader at step `i` sees exactly the results of steps `0..i`.
#[derive(Debug, Default)]
pub struct ResultsStore {
    results: Vec<StepResult>,
}

impl ResultsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of the next step.
    pub fn append(&mut self, result: StepResult) -> Result<(), ResultsStoreError> {
        let expected = self.results.len();
        if result.index != expected {
            return Err(ResultsStoreError::OutOfOrder {
                expected,
                got: result.index,
            });
        }
        self.results.push(result);
        Ok(())
    }

    /// Result of step `index`, if recorded.
    pub fn get(&self, index: usize) -> Option<&StepResult> {
        self.results.get(index)
    }

    /// Index the next appended result must carry.
    pub fn next_index(&self) -> usize {
        self.results.len()
    }

    /// Number of recorded results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate over results in step order.
    pub fn iter(&self) -> std::slice::Iter<'_, StepResult> {
        self.results.iter()
    }

    /// Copy the results into a trace.
    pub fn to_trace(&self) -> ExecutionTrace {
        ExecutionTrace::new(self.results.clone())
    }

    /// Consume the store into a trace.
    pub fn into_trace(self) -> ExecutionTrace {
        ExecutionTrace::new(self.results)
    }
}
