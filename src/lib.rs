//! scriptseq library
//!
//! Runs a fixed, ordered list of scripts through an external interpreter,
//! one at a time, and halts the whole pipeline on the first failure.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod pipeline_state;
pub mod process_guard;
pub mod report;
pub mod runner;
pub mod sanity;
pub mod script;

// Re-export main types for convenience
pub use config::{PipelineFile, RunnerConfig};
pub use error::RunnerError;
pub use executor::{InterpreterExecutor, ScriptExecutor};
pub use pipeline_state::{PipelineState, PipelineTracker, TransitionError};
pub use report::{ConsoleReporter, RecordingReporter, Reporter};
pub use runner::{CompletedScript, RunSummary, Runner};
pub use script::{ExecutionResult, ScriptRef};
