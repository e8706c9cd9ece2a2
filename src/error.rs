//! Error handling module for scriptseq
//!
//! Every failure that can halt a pipeline is a `RunnerError` variant, and each
//! variant maps to exactly one process exit status. Errors travel up with `?`
//! to `main`, which is the only place that terminates the process.

use crate::pipeline_state::TransitionError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit status for configuration errors (missing directory, missing script, bad pipeline file).
pub const CONFIG_ERROR_EXIT: i32 = 1;

/// Exit status when a child exceeded its timeout. Same convention as `timeout(1)`.
pub const TIMEOUT_EXIT: i32 = 124;

/// Exit status when the interpreter could not be launched at all.
pub const LAUNCH_FAILURE_EXIT: i32 = 127;

/// Base added to a signal number when a child was killed by that signal.
pub const SIGNAL_EXIT_BASE: i32 = 128;

/// Main error type for scriptseq
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The configured scripts directory is absent or not a directory
    #[error("Configuration error: the directory '{}' does not exist", .0.display())]
    MissingDirectory(PathBuf),

    /// A script in the list does not resolve to a regular file
    #[error("Configuration error: {} does not exist", .0.display())]
    MissingScript(PathBuf),

    /// Invalid configuration values or an unreadable pipeline file
    #[error("Configuration error: {0}")]
    Config(String),

    /// The interpreter could not be spawned (not found, permission denied, ...)
    #[error("Failed to launch interpreter '{}': {source}", interpreter.display())]
    ChildLaunch {
        interpreter: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The child was spawned but waiting on it failed
    #[error("Failed waiting for {script}: {source}")]
    ChildWait {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// The child ran and returned a non-zero exit code
    #[error("{script} exited with code {code}")]
    NonZeroExit { script: String, code: i32 },

    /// The child was killed by a signal and has no exit code
    #[error("{script} was terminated by signal {}", signal.map_or_else(|| "unknown".to_string(), |s| s.to_string()))]
    Terminated { script: String, signal: Option<i32> },

    /// The runner itself received a terminating signal while a child ran
    #[error("Interrupted by signal {signal} while running {script}")]
    Interrupted { script: String, signal: i32 },

    /// The child ran longer than the configured timeout
    #[error("{script} timed out after {}s", after.as_secs())]
    Timeout { script: String, after: Duration },

    /// The pipeline state machine rejected a transition
    #[error("Pipeline state error: {0}")]
    State(#[from] TransitionError),
}

/// Result type alias for scriptseq operations
pub type Result<T> = std::result::Result<T, RunnerError>;

impl RunnerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Process exit status this error should produce.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingDirectory(_) | Self::MissingScript(_) | Self::Config(_) => {
                CONFIG_ERROR_EXIT
            }
            Self::ChildLaunch { .. } => LAUNCH_FAILURE_EXIT,
            Self::NonZeroExit { code, .. } => *code,
            Self::Terminated { signal, .. } => signal.map_or(1, |s| SIGNAL_EXIT_BASE + s),
            Self::Interrupted { signal, .. } => SIGNAL_EXIT_BASE + signal,
            Self::Timeout { .. } => TIMEOUT_EXIT,
            Self::ChildWait { .. } | Self::State(_) => 1,
        }
    }

    /// True for errors raised before the failing step launched any child.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingDirectory(_) | Self::MissingScript(_) | Self::Config(_)
        )
    }

    /// True when the runner already printed a failure notice with the child's output.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            Self::NonZeroExit { .. } | Self::Terminated { .. } | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RunnerError::MissingDirectory(PathBuf::from("scripts"));
        assert_eq!(
            err.to_string(),
            "Configuration error: the directory 'scripts' does not exist"
        );

        let err = RunnerError::NonZeroExit {
            script: "b.x".into(),
            code: 3,
        };
        assert_eq!(err.to_string(), "b.x exited with code 3");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunnerError::config("empty").exit_code(), CONFIG_ERROR_EXIT);
        assert_eq!(
            RunnerError::MissingScript(PathBuf::from("scripts/a.R")).exit_code(),
            CONFIG_ERROR_EXIT
        );

        let launch = RunnerError::ChildLaunch {
            interpreter: PathBuf::from("/nope/Rscript"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(launch.exit_code(), LAUNCH_FAILURE_EXIT);

        let failed = RunnerError::NonZeroExit {
            script: "a.R".into(),
            code: 42,
        };
        assert_eq!(failed.exit_code(), 42);

        let killed = RunnerError::Terminated {
            script: "a.R".into(),
            signal: Some(9),
        };
        assert_eq!(killed.exit_code(), 137);

        let interrupted = RunnerError::Interrupted {
            script: "a.R".into(),
            signal: 15,
        };
        assert_eq!(interrupted.exit_code(), 143);
        assert!(!interrupted.is_reported());

        let slow = RunnerError::Timeout {
            script: "a.R".into(),
            after: Duration::from_secs(5),
        };
        assert_eq!(slow.exit_code(), TIMEOUT_EXIT);
    }

    #[test]
    fn test_launch_failure_is_distinct_from_nonzero_exit() {
        let launch = RunnerError::ChildLaunch {
            interpreter: PathBuf::from("Rscript"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!launch.is_reported());
        assert!(!launch.is_configuration());

        let failed = RunnerError::NonZeroExit {
            script: "a.R".into(),
            code: 1,
        };
        assert!(failed.is_reported());
        assert_ne!(launch.exit_code(), failed.exit_code());
    }
}
