//! Batch execution - one independent run per input item.

use crate::executor::{execute, ExecutorError, ExecutorOptions};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use toolflow_core::{RunOutcome, RunStatus, StepError, Workflow, WorkflowInput};
use toolflow_tools::ToolInvoker;
use tracing::{error, info, warn};

/// Configuration for batch runs.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Step-level policy applied inside every item's run
    pub step: ExecutorOptions,
    /// Record failed items and keep going instead of aborting the batch
    pub continue_on_fail: bool,
    /// Maximum number of items in flight
    pub concurrency: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            step: ExecutorOptions::default(),
            continue_on_fail: false,
            concurrency: 1,
        }
    }
}

/// Result for one input item, paired with its position in the batch.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    /// Position of the input item
    pub item_index: usize,
    /// What happened
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Outcome of one item.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// The run reached `Completed`
    Completed(RunOutcome),
    /// The run halted at a failed step
    Failed(ItemFailure),
}

impl ItemOutcome {
    /// The underlying run, whichever way it ended.
    pub fn run(&self) -> &RunOutcome {
        match self {
            ItemOutcome::Completed(run) => run,
            ItemOutcome::Failed(failure) => &failure.run,
        }
    }
}

/// Error record for an item that failed.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    /// Failure message
    pub error: String,
    /// Step that failed
    pub failed_step: usize,
    /// The partial run
    pub run: RunOutcome,
}

/// Errors that abort a batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// An item failed and `continue_on_fail` is off.
    #[error("item {item_index} failed at step {step}: {error}")]
    ItemFailed {
        /// Failed item
        item_index: usize,
        /// Failed step within the item
        step: usize,
        /// Failure cause
        #[source]
        error: StepError,
    },

    /// An executor was misused.
    #[error("item {item_index}: {source}")]
    Executor {
        /// Affected item
        item_index: usize,
        /// Underlying error
        source: ExecutorError,
    },
}

/// Runs a workflow once per input item.
///
/// Items share nothing but the workflow and the invoker; each gets a fresh
/// executor and results store. Up to `concurrency` items run at once and
/// results are returned in input order.
pub struct BatchRunner {
    invoker: Arc<dyn ToolInvoker>,
    options: BatchOptions,
}

impl BatchRunner {
    /// Create a new batch runner.
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self {
            invoker,
            options: BatchOptions::default(),
        }
    }

    /// Set the options.
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Run `workflow` for every input.
    ///
    /// When an item halts and `continue_on_fail` is off, the batch stops:
    /// items still in flight are dropped and nothing further is started.
    pub async fn run(
        &self,
        workflow: &Workflow,
        inputs: Vec<WorkflowInput>,
    ) -> Result<Vec<ItemResult>, BatchError> {
        let total = inputs.len();
        let concurrency = self.options.concurrency.max(1);
        info!(
            workflow = workflow.name(),
            items = total,
            concurrency,
            "Starting batch"
        );

        let mut runs = stream::iter(inputs.into_iter().enumerate())
            .map(|(item_index, input)| {
                let invoker = Arc::clone(&self.invoker);
                let options = self.options.step.clone();
                async move {
                    let outcome = execute(invoker, workflow, &input, options).await;
                    (item_index, outcome)
                }
            })
            .buffered(concurrency);

        let mut results = Vec::with_capacity(total);
        while let Some((item_index, outcome)) = runs.next().await {
            let run = outcome.map_err(|source| BatchError::Executor { item_index, source })?;

            let outcome = match run.status.clone() {
                RunStatus::Completed => ItemOutcome::Completed(run),
                RunStatus::Failed { index, error } => {
                    if !self.options.continue_on_fail {
                        error!(item = item_index, step = index, "Aborting batch: {}", error);
                        return Err(BatchError::ItemFailed {
                            item_index,
                            step: index,
                            error,
                        });
                    }
                    warn!(item = item_index, step = index, "Item failed: {}", error);
                    ItemOutcome::Failed(ItemFailure {
                        error: error.to_string(),
                        failed_step: index,
                        run,
                    })
                }
            };

            results.push(ItemResult {
                item_index,
                outcome,
            });
        }

        info!(items = results.len(), "Batch finished");
        Ok(results)
    }
}
