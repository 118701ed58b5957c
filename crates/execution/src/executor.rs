//! The chain executor - runs a workflow's steps in order.

use crate::placeholder::{resolve, ResolutionContext};
use crate::{ResultsStore, ResultsStoreError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use toolflow_core::{
    RunId, RunOutcome, RunStatus, StepError, StepResult, StepSpec, StepStatus, Workflow,
    WorkflowInput,
};
use toolflow_tools::ToolInvoker;
use tracing::{debug, info, warn};

/// Configuration for the chain executor.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Keep running later steps after a step fails
    pub continue_on_failure: bool,
}

/// Where an executor is in its lifecycle.
///
/// ```text
/// Idle → Running(i) → Completed | Failed(i, error)
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExecutorState {
    /// Not started
    #[default]
    Idle,
    /// Executing step `i`
    Running(usize),
    /// Every step was attempted
    Completed,
    /// Halted at a failed step
    Failed {
        /// Failed step
        index: usize,
        /// Failure cause
        error: StepError,
    },
}

impl ExecutorState {
    /// Whether the executor has finished a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutorState::Completed | ExecutorState::Failed { .. })
    }
}

/// Misuse of an executor. Step failures are never reported this way.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// `run` called on an executor that is not idle.
    #[error("executor is not idle ({0:?}); call reset() before running again")]
    NotIdle(ExecutorState),

    /// The results store rejected a result.
    #[error(transparent)]
    Store(#[from] ResultsStoreError),
}

/// Runs one workflow once.
///
/// Each step's parameters are resolved against the workflow input and the
/// results of earlier steps, then handed to the [`ToolInvoker`]. Steps run
/// one at a time; the next step starts only after the previous call
/// returns.
pub struct ChainExecutor {
    invoker: Arc<dyn ToolInvoker>,
    options: ExecutorOptions,
    state: ExecutorState,
    store: ResultsStore,
}

impl ChainExecutor {
    /// Create a new executor.
    pub fn new(invoker: Arc<dyn ToolInvoker>) -> Self {
        Self {
            invoker,
            options: ExecutorOptions::default(),
            state: ExecutorState::Idle,
            store: ResultsStore::new(),
        }
    }

    /// Set the options.
    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &ExecutorState {
        &self.state
    }

    /// Results recorded so far.
    pub fn results(&self) -> &ResultsStore {
        &self.store
    }

    /// Clear recorded results and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = ExecutorState::Idle;
        self.store = ResultsStore::new();
    }

    /// Execute every step of `workflow`.
    ///
    /// Resolution and invocation failures are recorded in the trace. With
    /// `continue_on_failure` unset the run stops at the first failed step;
    /// otherwise every step is attempted.
    pub async fn run(
        &mut self,
        workflow: &Workflow,
        input: &WorkflowInput,
    ) -> Result<RunOutcome, ExecutorError> {
        if self.state != ExecutorState::Idle {
            return Err(ExecutorError::NotIdle(self.state.clone()));
        }

        let run_id = RunId::new();
        let started = Instant::now();
        info!(
            run_id = %run_id,
            workflow = workflow.name(),
            steps = workflow.len(),
            "Starting workflow run"
        );

        for (index, step) in workflow.steps().iter().enumerate() {
            self.state = ExecutorState::Running(index);

            let result = self.execute_step(run_id, index, step, input).await;
            let failure = result.error().cloned();
            self.store.append(result)?;

            if let Some(error) = failure {
                if !self.options.continue_on_failure {
                    self.state = ExecutorState::Failed { index, error };
                    break;
                }
            }
        }

        if !self.state.is_terminal() {
            self.state = ExecutorState::Completed;
        }

        let status = match &self.state {
            ExecutorState::Failed { index, error } => RunStatus::Failed {
                index: *index,
                error: error.clone(),
            },
            _ => RunStatus::Completed,
        };

        info!(
            run_id = %run_id,
            attempted = self.store.len(),
            completed = matches!(status, RunStatus::Completed),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Workflow run finished"
        );

        Ok(RunOutcome {
            run_id,
            workflow: workflow.name().to_string(),
            status,
            trace: self.store.to_trace(),
        })
    }

    /// Resolve and invoke a single step.
    async fn execute_step(
        &self,
        run_id: RunId,
        index: usize,
        step: &StepSpec,
        input: &WorkflowInput,
    ) -> StepResult {
        let started_at = chrono::Utc::now();
        let start = Instant::now();

        let ctx = ResolutionContext::new(input, &self.store, index);
        let outcome = match resolve(&step.parameters, &ctx) {
            Ok(parameters) => {
                debug!(
                    run_id = %run_id,
                    step = index,
                    app = %step.app,
                    function = %step.function,
                    "Invoking tool"
                );
                self.invoker
                    .invoke(&step.app, &step.function, parameters)
                    .await
                    .map_err(StepError::from)
            }
            Err(e) => Err(StepError::from(e)),
        };

        let (output, status) = match outcome {
            Ok(output) => (output, StepStatus::Success),
            Err(error) => {
                warn!(
                    run_id = %run_id,
                    step = index,
                    tool = %step.tool_name(),
                    "Step failed: {}",
                    error
                );
                (Value::Null, StepStatus::Failed(error))
            }
        };

        StepResult {
            index,
            app: step.app.clone(),
            function: step.function.clone(),
            output,
            status,
            started_at,
            duration: start.elapsed(),
        }
    }
}

/// Run `workflow` once on a fresh executor.
pub async fn execute(
    invoker: Arc<dyn ToolInvoker>,
    workflow: &Workflow,
    input: &WorkflowInput,
    options: ExecutorOptions,
) -> Result<RunOutcome, ExecutorError> {
    ChainExecutor::new(invoker)
        .with_options(options)
        .run(workflow, input)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolflow_core::{InvocationErrorKind, ResolutionError, WorkflowBuilder};
    use toolflow_tools::InMemoryToolBackend;

    fn deployment() -> Workflow {
        let mut builder = WorkflowBuilder::new("deploy");
        builder
            .add_step("github", "get_repository", json!({ "repo": "user/repo" }))
            .unwrap()
            .add_step(
                "vercel",
                "create_deployment",
                json!({ "project": "my-app", "git_url": "{{steps.0.clone_url}}" }),
            )
            .unwrap();
        builder.build().unwrap()
    }

    fn backend() -> InMemoryToolBackend {
        InMemoryToolBackend::new()
            .with_output("github", "get_repository", json!({ "clone_url": "https://x/y.git" }))
            .with_handler("vercel", "create_deployment", |params| {
                Ok(json!({ "url": "https://deploy/123", "received": params.clone() }))
            })
            .with_echo("slack", "send_message")
    }

    fn options(continue_on_failure: bool) -> ExecutorOptions {
        ExecutorOptions { continue_on_failure }
    }

    #[tokio::test]
    async fn test_chained_output_reaches_next_step() {
        let backend = Arc::new(backend());
        let outcome = execute(backend.clone(), &deployment(), &WorkflowInput::new(), options(false))
            .await
            .unwrap();

        assert!(outcome.all_succeeded());
        assert_eq!(outcome.trace.len(), 2);

        let calls = backend.calls().await;
        assert_eq!(calls[1].app_name, "vercel");
        assert_eq!(
            calls[1].parameters,
            json!({ "project": "my-app", "git_url": "https://x/y.git" })
        );
    }

    #[tokio::test]
    async fn test_halts_on_remote_failure() {
        let backend = Arc::new(
            backend().with_failure(
                "github",
                "get_repository",
                InvocationErrorKind::RemoteFailure,
                "repository archived",
            ),
        );

        let mut executor = ChainExecutor::new(backend.clone());
        let outcome = executor
            .run(&deployment(), &WorkflowInput::new())
            .await
            .unwrap();

        assert_eq!(outcome.trace.len(), 1);
        match &outcome.status {
            RunStatus::Failed { index, error } => {
                assert_eq!(*index, 0);
                assert_eq!(error.invocation_kind(), Some(InvocationErrorKind::RemoteFailure));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(backend.call_count().await, 1);
        assert!(matches!(executor.state(), ExecutorState::Failed { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_continue_on_failure_attempts_every_step() {
        let backend = Arc::new(
            backend().with_failure("github", "get_repository", InvocationErrorKind::Transport, "timeout"),
        );
        let mut builder = WorkflowBuilder::new("notify");
        builder
            .add_step("github", "get_repository", json!({}))
            .unwrap()
            .add_step("vercel", "create_deployment", json!({ "git_url": "{{steps.0.clone_url}}" }))
            .unwrap()
            .add_step("slack", "send_message", json!({ "text": "done" }))
            .unwrap();
        let workflow = builder.build().unwrap();

        let outcome = execute(backend.clone(), &workflow, &WorkflowInput::new(), options(true))
            .await
            .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.trace.len(), 3);
        assert_eq!(outcome.trace.failed_indices(), vec![0, 1]);
        assert_eq!(
            outcome.trace.get(1).unwrap().error(),
            Some(&StepError::Resolution(ResolutionError::FailedStep { referenced: 0 }))
        );
        assert!(outcome.trace.get(2).unwrap().is_success());

        // Step 1 never reached the backend.
        let apps: Vec<_> = backend.calls().await.into_iter().map(|c| c.app_name).collect();
        assert_eq!(apps, vec!["github", "slack"]);
    }

    #[tokio::test]
    async fn test_forward_reference_fails_the_step() {
        let backend = Arc::new(backend());
        let mut builder = WorkflowBuilder::new("forward");
        builder
            .add_step("slack", "send_message", json!({ "text": "{{steps.1.url}}" }))
            .unwrap()
            .add_step("vercel", "create_deployment", json!({}))
            .unwrap();
        let workflow = builder.build().unwrap();

        let outcome = execute(backend.clone(), &workflow, &WorkflowInput::new(), options(false))
            .await
            .unwrap();

        assert_eq!(
            outcome.status,
            RunStatus::Failed {
                index: 0,
                error: ResolutionError::ForwardReference { step: 0, referenced: 1 }.into(),
            }
        );
        assert_eq!(backend.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_input_placeholders() {
        let backend = Arc::new(InMemoryToolBackend::new().with_echo("brave_search", "search"));
        let mut builder = WorkflowBuilder::new("search");
        builder
            .add_step("brave_search", "search", json!({ "query": "{{input.query}}", "label": "q={{input.query}}" }))
            .unwrap();
        let workflow = builder.build().unwrap();
        let input = WorkflowInput::new().with("query", 42);

        let outcome = execute(backend, &workflow, &input, options(false)).await.unwrap();
        assert_eq!(
            outcome.final_output(),
            Some(&json!({ "query": 42, "label": "q=42" }))
        );
    }

    #[tokio::test]
    async fn test_trace_indices_match_positions() {
        let backend = Arc::new(
            InMemoryToolBackend::new()
                .with_echo("a", "ok")
                .with_failure("a", "bad", InvocationErrorKind::Validation, "nope"),
        );
        let mut builder = WorkflowBuilder::new("mixed");
        for function in ["ok", "bad", "ok", "bad", "ok"] {
            builder.add_step("a", function, json!({})).unwrap();
        }
        let workflow = builder.build().unwrap();

        let outcome = execute(backend, &workflow, &WorkflowInput::new(), options(true))
            .await
            .unwrap();
        assert_eq!(outcome.trace.len(), workflow.len());
        for (k, result) in outcome.trace.iter().enumerate() {
            assert_eq!(result.index, k);
        }
    }

    #[tokio::test]
    async fn test_empty_workflow_completes() {
        let backend = Arc::new(InMemoryToolBackend::new());
        let workflow = WorkflowBuilder::new("empty").build().unwrap();

        let mut executor = ChainExecutor::new(backend);
        let outcome = executor.run(&workflow, &WorkflowInput::new()).await.unwrap();
        assert!(outcome.is_completed());
        assert!(outcome.trace.is_empty());
        assert_eq!(executor.state(), &ExecutorState::Completed);
    }

    #[tokio::test]
    async fn test_executor_is_single_use_until_reset() {
        let backend = Arc::new(backend());
        let workflow = deployment();
        let mut executor = ChainExecutor::new(backend);

        executor.run(&workflow, &WorkflowInput::new()).await.unwrap();
        assert_eq!(executor.results().len(), 2);

        let err = executor.run(&workflow, &WorkflowInput::new()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::NotIdle(ExecutorState::Completed)));

        executor.reset();
        assert_eq!(executor.state(), &ExecutorState::Idle);
        assert!(executor.results().is_empty());

        let again = executor.run(&workflow, &WorkflowInput::new()).await.unwrap();
        assert_eq!(again.trace.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_found_failure() {
        let backend = Arc::new(InMemoryToolBackend::new());
        let mut builder = WorkflowBuilder::new("unknown");
        builder.add_step("nowhere", "nothing", json!({})).unwrap();
        let workflow = builder.build().unwrap();

        let outcome = execute(backend, &workflow, &WorkflowInput::new(), options(false))
            .await
            .unwrap();
        let error = outcome.trace.get(0).unwrap().error().unwrap();
        assert_eq!(error.invocation_kind(), Some(InvocationErrorKind::NotFound));
        assert_eq!(outcome.trace.get(0).unwrap().output, Value::Null);
    }
}
