//! Execution layer - placeholder resolution, step results and the chain
//! executor.

#![warn(missing_docs)]

pub mod placeholder;
pub mod store;
pub mod executor;
pub mod batch;

pub use placeholder::{references, resolve, Reference, ResolutionContext};
pub use store::{ResultsStore, ResultsStoreError};
pub use executor::{execute, ChainExecutor, ExecutorError, ExecutorOptions, ExecutorState};
pub use batch::{BatchError, BatchOptions, BatchRunner, ItemFailure, ItemOutcome, ItemResult};
