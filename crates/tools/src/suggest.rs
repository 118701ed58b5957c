//! Workflow suggestions from a free-text description.

use crate::{CatalogError, FunctionDescriptor, ToolCatalog};
use serde::{Deserialize, Serialize};
use serde_json::json;
use toolflow_core::{BuildError, WorkflowBuilder};
use tracing::debug;

/// Default number of tools proposed for a description.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// One proposed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedStep {
    /// One-based position
    pub step: usize,
    /// Application name
    pub app: String,
    /// Function name
    pub function: String,
    /// What the function does
    pub description: Option<String>,
    /// Whether parameters have been configured
    pub ready: bool,
}

/// Candidate tools and a draft step list for a described workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSuggestion {
    /// The description that was searched for
    pub description: String,
    /// Raw search results
    pub suggested_tools: Vec<FunctionDescriptor>,
    /// Draft steps in search order
    pub workflow_steps: Vec<SuggestedStep>,
    /// Next action for the caller
    pub message: String,
}

impl WorkflowSuggestion {
    /// Start a builder with one step per suggestion and empty parameters.
    pub fn to_builder(&self, name: impl Into<String>) -> Result<WorkflowBuilder, BuildError> {
        let mut builder = WorkflowBuilder::new(name);
        for step in &self.workflow_steps {
            builder.add_step(step.app.clone(), step.function.clone(), json!({}))?;
        }
        Ok(builder)
    }
}

/// Search the catalog for tools matching `description` and draft a workflow.
pub async fn suggest_workflow<C>(
    catalog: &C,
    description: &str,
    limit: usize,
) -> Result<WorkflowSuggestion, CatalogError>
where
    C: ToolCatalog + ?Sized,
{
    let tools = catalog.search_functions(description, limit).await?;
    debug!("{} candidate tools for '{}'", tools.len(), description);

    let workflow_steps = tools
        .iter()
        .enumerate()
        .map(|(index, tool)| SuggestedStep {
            step: index + 1,
            app: tool.app_name.clone(),
            function: tool.name.clone(),
            description: tool.about().map(str::to_string),
            ready: false,
        })
        .collect();

    Ok(WorkflowSuggestion {
        description: description.to_string(),
        suggested_tools: tools,
        workflow_steps,
        message: "Configure parameters for each step to build the workflow".to_string(),
    })
}
