//! Workflow definition and builder.

use crate::{BuildError, StepSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A frozen, ordered chain of tool calls.
///
/// Steps are addressed by zero-based position; `{{steps.N...}}` placeholders
/// refer to the output of the Nth step. A `Workflow` has no mutation API, so
/// the same value can be executed any number of times with the same result
/// ordering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow name
    #[serde(default)]
    name: String,

    /// Steps in execution order
    #[serde(default)]
    steps: Vec<StepSpec>,
}

impl Workflow {
    /// Start building a new workflow.
    pub fn builder(name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    pub(crate) fn from_parts(name: String, steps: Vec<StepSpec>) -> Self {
        Self { name, steps }
    }

    /// Workflow name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    /// Step at `index`, if any.
    pub fn step(&self, index: usize) -> Option<&StepSpec> {
        self.steps.get(index)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the workflow has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Accumulates steps before a workflow is frozen.
///
/// ```
/// use serde_json::json;
/// use toolflow_core::WorkflowBuilder;
///
/// let mut builder = WorkflowBuilder::new("deploy");
/// builder
///     .add_step("github", "get_repository", json!({ "repo": "user/repo" }))?
///     .add_step("vercel", "create_deployment", json!({ "git_url": "{{steps.0.clone_url}}" }))?;
/// let workflow = builder.build()?;
/// assert_eq!(workflow.len(), 2);
/// # Ok::<(), toolflow_core::BuildError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkflowBuilder {
    name: String,
    steps: Vec<StepSpec>,
    frozen: Option<Workflow>,
}

impl WorkflowBuilder {
    /// Create a new, empty builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            frozen: None,
        }
    }

    /// Append a step.
    ///
    /// App and function names are not checked here; an unknown tool only
    /// surfaces when the step is invoked.
    pub fn add_step(
        &mut self,
        app: impl Into<String>,
        function: impl Into<String>,
        parameters: Value,
    ) -> Result<&mut Self, BuildError> {
        self.push(StepSpec::new(app, function, parameters))
    }

    /// Append an already constructed step.
    pub fn push(&mut self, step: StepSpec) -> Result<&mut Self, BuildError> {
        if self.frozen.is_some() {
            return Err(BuildError::Frozen {
                workflow: self.name.clone(),
                tool: step.tool_name(),
            });
        }
        self.steps.push(step);
        Ok(self)
    }

    /// Number of steps added so far.
    pub fn len(&self) -> usize {
        self.frozen.as_ref().map_or(self.steps.len(), Workflow::len)
    }

    /// Whether no step has been added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `build` has been called.
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Freeze the step list and produce the workflow.
    ///
    /// Calling `build` again returns an identical workflow.
    pub fn build(&mut self) -> Result<Workflow, BuildError> {
        if let Some(workflow) = &self.frozen {
            return Ok(workflow.clone());
        }

        let workflow = Workflow::from_parts(self.name.clone(), std::mem::take(&mut self.steps));
        self.frozen = Some(workflow.clone());
        Ok(workflow)
    }
}
