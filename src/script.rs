//! Script references and per-invocation results.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// A script file name resolved against the scripts directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRef {
    name: String,
    path: PathBuf,
}

impl ScriptRef {
    /// Resolve `name` against `base_dir`.
    pub fn resolve(base_dir: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: base_dir.join(name),
        }
    }

    /// The name as it appears in the configured list.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path handed to the interpreter.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the path refers to an existing regular file (symlinks followed).
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Output of one script invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Standard output from the script.
    pub stdout: String,
    /// Standard error from the script.
    pub stderr: String,
    /// Exit code (None if terminated by signal or timeout).
    pub exit_code: Option<i32>,
    /// Signal that terminated the child, if any.
    pub signal: Option<i32>,
    /// Set when the child was killed for exceeding its timeout.
    pub timed_out: bool,
    /// Wall-clock time between spawn and reap.
    pub elapsed: Duration,
}

impl ExecutionResult {
    /// Exit code 0 and not killed for a timeout.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}
