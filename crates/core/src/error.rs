//! Error taxonomy shared by the builder, the resolver and tool backends.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Misuse of the workflow builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A step was added after `build()` froze the workflow.
    #[error("workflow '{workflow}' is frozen; cannot add step {tool}")]
    Frozen {
        /// Workflow name
        workflow: String,
        /// Qualified name of the rejected step
        tool: String,
    },
}

/// A placeholder that cannot be satisfied from the current run state.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionError {
    /// Reference to the current step or a later one.
    #[error("step {step} cannot reference steps.{referenced}: only earlier steps are visible")]
    ForwardReference {
        /// Step being resolved
        step: usize,
        /// Referenced index
        referenced: usize,
    },

    /// Referenced step has no recorded result.
    #[error("steps.{referenced} has no recorded result")]
    StepNotFound {
        /// Referenced index
        referenced: usize,
    },

    /// Referenced step failed, so it has no output.
    #[error("steps.{referenced} failed and has no output")]
    FailedStep {
        /// Referenced index
        referenced: usize,
    },

    /// Field path does not exist on the referenced value.
    #[error("path '{path}' not found in {root}")]
    MissingPath {
        /// `steps.N` or `input.name`
        root: String,
        /// Dot-separated path that failed to resolve
        path: String,
    },

    /// Workflow input has no value with this name.
    #[error("input '{name}' was not provided")]
    MissingInput {
        /// Input name
        name: String,
    },

    /// Placeholder text is not a recognised reference.
    #[error("invalid placeholder '{{{{{placeholder}}}}}': {reason}")]
    InvalidPlaceholder {
        /// Text between the braces
        placeholder: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Classification of a failed tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationErrorKind {
    /// Unknown app or function
    NotFound,
    /// Parameters rejected by the tool
    Validation,
    /// Network, timeout or backend availability problem
    Transport,
    /// Tool ran and reported a business-logic failure
    RemoteFailure,
}

impl std::fmt::Display for InvocationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationErrorKind::NotFound => write!(f, "not found"),
            InvocationErrorKind::Validation => write!(f, "validation"),
            InvocationErrorKind::Transport => write!(f, "transport"),
            InvocationErrorKind::RemoteFailure => write!(f, "remote failure"),
        }
    }
}

/// A tool call that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{app}.{function} failed ({kind}): {cause}")]
pub struct InvocationError {
    /// Application name
    pub app: String,
    /// Function name
    pub function: String,
    /// Error classification
    pub kind: InvocationErrorKind,
    /// Human readable cause
    pub cause: String,
}

impl InvocationError {
    /// Create a new invocation error.
    pub fn new(
        app: impl Into<String>,
        function: impl Into<String>,
        kind: InvocationErrorKind,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            app: app.into(),
            function: function.into(),
            kind,
            cause: cause.into(),
        }
    }

    /// Unknown app or function.
    pub fn not_found(app: &str, function: &str, cause: impl Into<String>) -> Self {
        Self::new(app, function, InvocationErrorKind::NotFound, cause)
    }

    /// Parameters rejected.
    pub fn validation(app: &str, function: &str, cause: impl Into<String>) -> Self {
        Self::new(app, function, InvocationErrorKind::Validation, cause)
    }

    /// Transport failure.
    pub fn transport(app: &str, function: &str, cause: impl Into<String>) -> Self {
        Self::new(app, function, InvocationErrorKind::Transport, cause)
    }

    /// Tool reported failure.
    pub fn remote_failure(app: &str, function: &str, cause: impl Into<String>) -> Self {
        Self::new(app, function, InvocationErrorKind::RemoteFailure, cause)
    }
}

/// Why a single step failed. Recorded in the trace, never thrown past the
/// executor.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum StepError {
    /// Parameters could not be resolved
    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    /// Tool call failed
    #[error("invocation failed: {0}")]
    Invocation(#[from] InvocationError),
}

impl StepError {
    /// Invocation error kind, if the failure came from the tool call.
    pub fn invocation_kind(&self) -> Option<InvocationErrorKind> {
        match self {
            StepError::Invocation(e) => Some(e.kind),
            StepError::Resolution(_) => None,
        }
    }
}
