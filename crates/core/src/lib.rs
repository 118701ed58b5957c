//! Toolflow core data models.
//!
//! This crate defines the values that flow through a tool chain: step
//! specifications, frozen workflows, workflow input, per-step results and
//! the error taxonomy shared by the executor and the tool backends.

#![warn(missing_docs)]

// Identities
mod id;

// Composition
mod step;
mod workflow;
mod input;

// Execution records
mod result;
mod error;

pub mod templates;

// Re-exports
pub use id::RunId;

pub use step::StepSpec;
pub use workflow::{Workflow, WorkflowBuilder};
pub use input::WorkflowInput;

pub use result::{ExecutionTrace, RunOutcome, RunStatus, StepResult, StepStatus};
pub use error::{
    BuildError, InvocationError, InvocationErrorKind, ResolutionError, StepError,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
