//! Step specification - one tool call in a chain.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single tool invocation within a workflow.
///
/// `parameters` is stored verbatim; placeholder strings such as
/// `{{steps.0.clone_url}}` are only interpreted at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Application that exposes the tool (e.g. `github`)
    pub app: String,

    /// Function to call on the application (e.g. `get_repository`)
    pub function: String,

    /// Raw parameter tree
    #[serde(default = "empty_parameters")]
    pub parameters: Value,
}

fn empty_parameters() -> Value {
    Value::Object(Default::default())
}

impl StepSpec {
    /// Create a new step specification.
    pub fn new(app: impl Into<String>, function: impl Into<String>, parameters: Value) -> Self {
        Self {
            app: app.into(),
            function: function.into(),
            parameters,
        }
    }

    /// Qualified tool name, `app.function`.
    pub fn tool_name(&self) -> String {
        format!("{}.{}", self.app, self.function)
    }
}
