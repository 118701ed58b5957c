//! Tool abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolflow_core::InvocationError;

/// Executes a named function on a named application.
///
/// Implementations classify failures into [`InvocationError`] kinds and must
/// not retry on the executor's behalf; any retry policy lives in the
/// transport.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke `app.function` with already resolved parameters.
    async fn invoke(
        &self,
        app: &str,
        function: &str,
        parameters: Value,
    ) -> Result<Value, InvocationError>;
}

/// Read-only discovery of apps and functions.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    /// List all available apps.
    async fn list_apps(&self) -> Result<Vec<AppDescriptor>, CatalogError>;

    /// List the functions of one app.
    async fn list_functions(&self, app: &str) -> Result<Vec<FunctionDescriptor>, CatalogError>;

    /// Search functions relevant to a free-text query.
    async fn search_functions(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FunctionDescriptor>, CatalogError>;
}

/// Errors from catalog lookups.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Backend could not be reached
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with a non-success status
    #[error("catalog returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Response could not be decoded
    #[error("invalid catalog response: {0}")]
    Decode(String),
}

/// An application exposed by the tool backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// App identifier used in step specs
    pub name: String,

    /// Human friendly name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AppDescriptor {
    /// Display name if present, otherwise the identifier.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A callable function of an app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Owning app
    #[serde(default)]
    pub app_name: String,

    /// Function identifier used in step specs
    #[serde(alias = "function_name")]
    pub name: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Short summary, used when no description is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// JSON schema of the parameters, if the backend publishes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl FunctionDescriptor {
    /// Description, falling back to the summary.
    pub fn about(&self) -> Option<&str> {
        self.description.as_deref().or(self.summary.as_deref())
    }
}

/// Wire form of a single tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Application name
    pub app_name: String,

    /// Function name
    pub function_name: String,

    /// Resolved parameters
    pub parameters: Value,
}

impl ToolCall {
    /// Create a new call.
    pub fn new(app: &str, function: &str, parameters: Value) -> Self {
        Self {
            app_name: app.to_string(),
            function_name: function.to_string(),
            parameters,
        }
    }
}
