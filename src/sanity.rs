//! Pre-flight checks for the `check` command
//!
//! Unlike the runner, which stops at the first missing script, the check
//! looks at the whole configuration and lists every problem at once. Nothing
//! is executed.

use crate::config::RunnerConfig;
use crate::report::Reporter;
use crate::script::ScriptRef;
use std::path::{Path, PathBuf};

/// Result of environment verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityCheckResult {
    pub scripts_dir_present: bool,
    /// Script names that do not resolve to a regular file, in list order
    pub missing_scripts: Vec<String>,
    /// Where the interpreter was found, if anywhere
    pub interpreter: Option<PathBuf>,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.scripts_dir_present && self.missing_scripts.is_empty() && self.interpreter.is_some()
    }
}

/// Perform all checks against `config`
pub fn verify_environment(config: &RunnerConfig) -> SanityCheckResult {
    let scripts_dir_present = config.scripts_dir.is_dir();
    let missing_scripts = if scripts_dir_present {
        config
            .scripts
            .iter()
            .filter(|name| !ScriptRef::resolve(&config.scripts_dir, name).exists())
            .cloned()
            .collect()
    } else {
        config.scripts.clone()
    };

    SanityCheckResult {
        scripts_dir_present,
        missing_scripts,
        interpreter: locate_interpreter(&config.interpreter),
    }
}

/// A path with more than one component is taken as-is; a bare name is looked up on `PATH`.
fn locate_interpreter(interpreter: &Path) -> Option<PathBuf> {
    if interpreter.components().count() > 1 {
        return interpreter.is_file().then(|| interpreter.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(interpreter))
        .find(|candidate| candidate.is_file())
}

/// Write a human-readable report of `result`.
pub fn report(result: &SanityCheckResult, config: &RunnerConfig, reporter: &dyn Reporter) {
    match &result.interpreter {
        Some(found) => reporter.line(&format!("✓ Interpreter: {}", found.display())),
        None => reporter.line(&format!(
            "✗ Interpreter not found: {}",
            config.interpreter.display()
        )),
    }

    if result.scripts_dir_present {
        reporter.line(&format!(
            "✓ Scripts directory: {}",
            config.scripts_dir.display()
        ));
    } else {
        reporter.line(&format!(
            "✗ Scripts directory missing: {}",
            config.scripts_dir.display()
        ));
    }

    for name in &config.scripts {
        let path = config.scripts_dir.join(name);
        if result.missing_scripts.contains(name) {
            reporter.line(&format!("  ✗ {}", path.display()));
        } else {
            reporter.line(&format!("  ✓ {}", path.display()));
        }
    }

    if result.is_ok() {
        reporter.line(&format!(
            "Pre-flight check passed: {} scripts ready.",
            config.scripts.len()
        ));
    } else {
        reporter.line("Pre-flight check failed.");
    }
}
