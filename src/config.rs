//! Runner configuration.
//!
//! `RunnerConfig` is the only configuration the runner sees. It is assembled
//! once at startup from command-line flags and, optionally, a JSON pipeline
//! file, then passed down explicitly.

use crate::error::{Result, RunnerError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Interpreter used when neither the CLI nor the pipeline file names one.
pub const DEFAULT_INTERPRETER: &str = "Rscript";

/// Scripts directory used when neither the CLI nor the pipeline file names one.
pub const DEFAULT_SCRIPTS_DIR: &str = "scripts";

/// Everything the runner needs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Executable that runs each script
    pub interpreter: PathBuf,
    /// Directory the script names are resolved against
    pub scripts_dir: PathBuf,
    /// Script file names, in execution order
    pub scripts: Vec<String>,
    /// Per-script time limit; `None` waits forever
    pub timeout: Option<Duration>,
    /// Validate and report without launching anything
    pub dry_run: bool,
}

impl RunnerConfig {
    pub fn new(
        interpreter: impl Into<PathBuf>,
        scripts_dir: impl Into<PathBuf>,
        scripts: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            scripts_dir: scripts_dir.into(),
            scripts: scripts.into_iter().map(Into::into).collect(),
            timeout: None,
            dry_run: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reject configurations that can never run.
    ///
    /// Filesystem presence is not checked here; the runner does that in order.
    pub fn validate(&self) -> Result<()> {
        if self.interpreter.as_os_str().is_empty() {
            return Err(RunnerError::config("interpreter path is empty"));
        }
        if self.scripts.is_empty() {
            return Err(RunnerError::config("no scripts to run"));
        }
        for name in &self.scripts {
            if name.trim().is_empty() || Path::new(name).file_name().is_none() {
                return Err(RunnerError::config(format!(
                    "'{}' is not a script file name",
                    name
                )));
            }
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(RunnerError::config("timeout must be at least one second"));
        }
        Ok(())
    }
}

/// On-disk pipeline description.
///
/// ```json
/// {
///   "interpreter": "/usr/bin/Rscript",
///   "scripts_dir": "scripts",
///   "scripts": ["01_clean.R", "02_calc.R"],
///   "timeout_secs": 600
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts_dir: Option<PathBuf>,
    pub scripts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl PipelineFile {
    /// Load a pipeline description from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(path.as_ref()).map_err(|e| RunnerError::config(format!("{:#}", e)))
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline file {:?}", path))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse pipeline file {:?}", path))
    }
}

/// Values given on the command line. Each `Some` wins over the pipeline file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub interpreter: Option<PathBuf>,
    pub scripts_dir: Option<PathBuf>,
    pub scripts: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub dry_run: bool,
}

/// Merge the pipeline file (if any) with command-line overrides and defaults.
///
/// Positional scripts replace the file's list rather than extending it.
pub fn resolve(file: Option<PipelineFile>, overrides: ConfigOverrides) -> Result<RunnerConfig> {
    let file = file.unwrap_or_default();

    let scripts = if overrides.scripts.is_empty() {
        file.scripts
    } else {
        overrides.scripts
    };

    let config = RunnerConfig::new(
        overrides
            .interpreter
            .or(file.interpreter)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INTERPRETER)),
        overrides
            .scripts_dir
            .or(file.scripts_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRIPTS_DIR)),
        scripts,
    )
    .with_timeout(
        overrides
            .timeout_secs
            .or(file.timeout_secs)
            .map(Duration::from_secs),
    )
    .with_dry_run(overrides.dry_run);

    config.validate()?;
    Ok(config)
}
