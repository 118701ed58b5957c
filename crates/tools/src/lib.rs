//! Tool Integration
//!
//! The boundary between the chain executor and the applications it calls:
//! an invocation port, a read-only catalog, an HTTP binding for a tool
//! backend and an in-memory backend for tests and dry runs.

#![warn(missing_docs)]

pub mod r#trait;
pub mod config;
pub mod http;
pub mod memory;
pub mod suggest;

pub use r#trait::{
    AppDescriptor, CatalogError, FunctionDescriptor, ToolCall, ToolCatalog, ToolInvoker,
};
pub use config::BackendConfig;
pub use http::HttpToolBackend;
pub use memory::InMemoryToolBackend;
pub use suggest::{suggest_workflow, SuggestedStep, WorkflowSuggestion, DEFAULT_SUGGESTION_LIMIT};
