//! In-memory tool backend.
//!
//! Registered tools answer from closures or canned values, and every call is
//! recorded so callers can assert on what was actually invoked.

use crate::{AppDescriptor, CatalogError, FunctionDescriptor, ToolCall, ToolCatalog, ToolInvoker};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use toolflow_core::{InvocationError, InvocationErrorKind};

type Handler = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

enum Behaviour {
    /// Run a handler; `Err` becomes a remote failure
    Handler(Handler),
    /// Always fail with this kind and cause
    Fail(InvocationErrorKind, String),
}

struct RegisteredTool {
    descriptor: FunctionDescriptor,
    behaviour: Behaviour,
}

/// Tool backend held entirely in memory.
#[derive(Default)]
pub struct InMemoryToolBackend {
    tools: Vec<RegisteredTool>,
    calls: Mutex<Vec<ToolCall>>,
}

impl InMemoryToolBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool computed from its parameters.
    pub fn with_handler<F>(mut self, app: &str, function: &str, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.register(app, function, Behaviour::Handler(Arc::new(handler)));
        self
    }

    /// Register a tool that always returns `output`.
    pub fn with_output(self, app: &str, function: &str, output: Value) -> Self {
        self.with_handler(app, function, move |_| Ok(output.clone()))
    }

    /// Register a tool that echoes its parameters back.
    pub fn with_echo(self, app: &str, function: &str) -> Self {
        self.with_handler(app, function, |parameters| Ok(parameters.clone()))
    }

    /// Register a tool that always fails.
    pub fn with_failure(
        mut self,
        app: &str,
        function: &str,
        kind: InvocationErrorKind,
        cause: impl Into<String>,
    ) -> Self {
        self.register(app, function, Behaviour::Fail(kind, cause.into()));
        self
    }

    /// Attach a description to the most recently registered tool.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        if let Some(tool) = self.tools.last_mut() {
            tool.descriptor.description = Some(description.into());
        }
        self
    }

    /// Calls received so far, in order.
    pub async fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().await.clone()
    }

    /// Number of calls received so far.
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    fn register(&mut self, app: &str, function: &str, behaviour: Behaviour) {
        // Re-registering replaces the previous behaviour.
        self.tools
            .retain(|t| !(t.descriptor.app_name == app && t.descriptor.name == function));
        self.tools.push(RegisteredTool {
            descriptor: FunctionDescriptor {
                app_name: app.to_string(),
                name: function.to_string(),
                description: None,
                summary: None,
                parameters: None,
            },
            behaviour,
        });
    }

    fn find(&self, app: &str, function: &str) -> Option<&RegisteredTool> {
        self.tools
            .iter()
            .find(|t| t.descriptor.app_name == app && t.descriptor.name == function)
    }
}

#[async_trait]
impl ToolInvoker for InMemoryToolBackend {
    async fn invoke(
        &self,
        app: &str,
        function: &str,
        parameters: Value,
    ) -> Result<Value, InvocationError> {
        self.calls
            .lock()
            .await
            .push(ToolCall::new(app, function, parameters.clone()));

        let Some(tool) = self.find(app, function) else {
            return Err(InvocationError::not_found(
                app,
                function,
                format!("no tool registered as {}.{}", app, function),
            ));
        };

        match &tool.behaviour {
            Behaviour::Handler(handler) => handler(&parameters)
                .map_err(|cause| InvocationError::remote_failure(app, function, cause)),
            Behaviour::Fail(kind, cause) => {
                Err(InvocationError::new(app, function, *kind, cause.clone()))
            }
        }
    }
}

#[async_trait]
impl ToolCatalog for InMemoryToolBackend {
    async fn list_apps(&self) -> Result<Vec<AppDescriptor>, CatalogError> {
        let mut names: Vec<&str> = self
            .tools
            .iter()
            .map(|t| t.descriptor.app_name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();

        Ok(names
            .into_iter()
            .map(|name| AppDescriptor {
                name: name.to_string(),
                display_name: None,
                description: None,
            })
            .collect())
    }

    async fn list_functions(&self, app: &str) -> Result<Vec<FunctionDescriptor>, CatalogError> {
        Ok(self
            .tools
            .iter()
            .filter(|t| t.descriptor.app_name == app)
            .map(|t| t.descriptor.clone())
            .collect())
    }

    async fn search_functions(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FunctionDescriptor>, CatalogError> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        let mut scored: Vec<(usize, &FunctionDescriptor)> = self
            .tools
            .iter()
            .map(|t| {
                let haystack = format!(
                    "{} {} {}",
                    t.descriptor.app_name,
                    t.descriptor.name,
                    t.descriptor.about().unwrap_or_default()
                )
                .to_lowercase();
                let hits = terms.iter().filter(|term| haystack.contains(term.as_str())).count();
                (hits, &t.descriptor)
            })
            .filter(|(hits, _)| *hits > 0)
            .collect();

        // Stable sort keeps registration order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, d)| d.clone())
            .collect())
    }
}
