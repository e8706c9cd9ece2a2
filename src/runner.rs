//! Sequential Script Runner
//!
//! Runs the configured scripts one after another and stops at the first
//! failure. The loop never terminates the process itself; every failure comes
//! back as a `RunnerError` for the caller to turn into an exit status.
//!
//! Order of checks:
//! 1. configuration sanity (non-empty list, usable names)
//! 2. the scripts directory, once
//! 3. per script, in order: file present → execute → exit code

use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};
use crate::executor::ScriptExecutor;
use crate::pipeline_state::{PipelineState, PipelineTracker};
use crate::report::Reporter;
use crate::script::{ExecutionResult, ScriptRef};
use std::time::Duration;
use tracing::{debug, error, info};

/// One script that finished with exit code 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedScript {
    pub name: String,
    pub elapsed: Duration,
}

/// Outcome of a pipeline in which every script succeeded.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Scripts in the order they ran
    pub completed: Vec<CompletedScript>,
    /// True when nothing was actually executed
    pub dry_run: bool,
}

impl RunSummary {
    pub fn total_elapsed(&self) -> Duration {
        self.completed.iter().map(|s| s.elapsed).sum()
    }
}

/// Drives one pipeline run.
pub struct Runner<'a> {
    config: &'a RunnerConfig,
    executor: &'a dyn ScriptExecutor,
    reporter: &'a dyn Reporter,
}

impl<'a> Runner<'a> {
    pub fn new(
        config: &'a RunnerConfig,
        executor: &'a dyn ScriptExecutor,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            executor,
            reporter,
        }
    }

    /// Run every script in order. Returns at the first error.
    pub fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;

        let dir = &self.config.scripts_dir;
        if !dir.is_dir() {
            error!("Scripts directory {:?} is missing", dir);
            return Err(RunnerError::MissingDirectory(dir.clone()));
        }

        let mut tracker = PipelineTracker::new(self.config.scripts.len());
        let outcome = self.run_steps(&mut tracker);
        if outcome.is_err() {
            tracker.halt();
        }
        debug!("Pipeline {}", tracker.state());

        let summary = outcome?;
        self.reporter.pipeline_completed(&summary);
        Ok(summary)
    }

    fn run_steps(&self, tracker: &mut PipelineTracker) -> Result<RunSummary> {
        let mut summary = RunSummary {
            completed: Vec::with_capacity(self.config.scripts.len()),
            dry_run: self.config.dry_run,
        };

        for (index, name) in self.config.scripts.iter().enumerate() {
            tracker.enter(index)?;

            let script = ScriptRef::resolve(&self.config.scripts_dir, name);
            if !script.exists() {
                error!("Script {:?} is missing", script.path());
                return Err(RunnerError::MissingScript(script.path().to_path_buf()));
            }

            if self.config.dry_run {
                self.reporter.dry_run(&script, &self.config.interpreter);
                summary.completed.push(CompletedScript {
                    name: name.clone(),
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            let elapsed = self.run_one(&script)?;
            summary.completed.push(CompletedScript {
                name: name.clone(),
                elapsed,
            });
        }

        tracker.complete()?;
        debug_assert_eq!(tracker.state(), PipelineState::Completed);
        info!(
            "All {} scripts finished in {:.2?}",
            summary.completed.len(),
            summary.total_elapsed()
        );
        Ok(summary)
    }

    fn run_one(&self, script: &ScriptRef) -> Result<Duration> {
        info!("Running {}", script.name());
        self.reporter.script_started(script);

        let result = self.executor.execute(script)?;
        if result.success() {
            self.reporter.script_succeeded(script, &result);
            return Ok(result.elapsed);
        }

        self.reporter.script_failed(script, &result);
        Err(failure(script, &result, self.config.timeout))
    }
}

fn failure(script: &ScriptRef, result: &ExecutionResult, timeout: Option<Duration>) -> RunnerError {
    let name = script.name().to_string();
    if result.timed_out {
        error!("{} timed out", name);
        return RunnerError::Timeout {
            script: name,
            after: timeout.unwrap_or(result.elapsed),
        };
    }
    match result.exit_code {
        Some(code) => {
            error!("{} failed with exit code {}", name, code);
            RunnerError::NonZeroExit { script: name, code }
        }
        None => {
            error!("{} was terminated by signal {:?}", name, result.signal);
            RunnerError::Terminated {
                script: name,
                signal: result.signal,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RecordingReporter;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Returns canned exit codes by script name and records invocation order.
    #[derive(Default)]
    struct CannedExecutor {
        codes: HashMap<String, i32>,
        calls: RefCell<Vec<String>>,
    }

    impl CannedExecutor {
        fn with(codes: &[(&str, i32)]) -> Self {
            Self {
                codes: codes.iter().map(|(n, c)| (n.to_string(), *c)).collect(),
                calls: RefCell::default(),
            }
        }
    }

    impl ScriptExecutor for CannedExecutor {
        fn execute(&self, script: &ScriptRef) -> Result<ExecutionResult> {
            self.calls.borrow_mut().push(script.name().to_string());
            Ok(ExecutionResult {
                exit_code: Some(*self.codes.get(script.name()).unwrap_or(&0)),
                stderr: "boom\n".into(),
                ..Default::default()
            })
        }
    }

    fn dir_with(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        dir
    }

    #[test]
    fn test_all_scripts_run_in_order() {
        let dir = dir_with(&["a.x", "b.x", "c.x"]);
        let config = RunnerConfig::new("interp", dir.path(), ["a.x", "b.x", "c.x"]);
        let executor = CannedExecutor::default();
        let reporter = RecordingReporter::new();

        let summary = Runner::new(&config, &executor, &reporter).run().unwrap();

        assert_eq!(*executor.calls.borrow(), vec!["a.x", "b.x", "c.x"]);
        assert_eq!(summary.completed.len(), 3);
        assert!(reporter.contains("All scripts have been successfully executed."));
    }

    #[test]
    fn test_stops_at_first_failure() {
        let dir = dir_with(&["a.x", "b.x", "c.x"]);
        let config = RunnerConfig::new("interp", dir.path(), ["a.x", "b.x", "c.x"]);
        let executor = CannedExecutor::with(&[("b.x", 3)]);
        let reporter = RecordingReporter::new();

        let err = Runner::new(&config, &executor, &reporter).run().unwrap_err();

        assert_eq!(*executor.calls.borrow(), vec!["a.x", "b.x"]);
        assert_eq!(err.exit_code(), 3);
        assert!(reporter.contains("Error running b.x. Return code: 3"));
        assert!(!reporter.contains("All scripts have been successfully executed."));
    }

    #[test]
    fn test_missing_directory_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnerConfig::new("interp", dir.path().join("absent"), ["a.x"]);
        let executor = CannedExecutor::default();
        let reporter = RecordingReporter::new();

        let err = Runner::new(&config, &executor, &reporter).run().unwrap_err();

        assert!(matches!(err, RunnerError::MissingDirectory(_)));
        assert!(executor.calls.borrow().is_empty());
        assert!(reporter.lines().is_empty());
    }

    #[test]
    fn test_missing_script_blocks_later_scripts() {
        let dir = dir_with(&["b.x"]);
        let config = RunnerConfig::new("interp", dir.path(), ["a.x", "b.x"]);
        let executor = CannedExecutor::default();
        let reporter = RecordingReporter::new();

        let err = Runner::new(&config, &executor, &reporter).run().unwrap_err();

        assert!(matches!(err, RunnerError::MissingScript(ref p) if p.ends_with("a.x")));
        assert!(executor.calls.borrow().is_empty());
    }

    #[test]
    fn test_dry_run_executes_nothing() {
        let dir = dir_with(&["a.x", "b.x"]);
        let config = RunnerConfig::new("interp", dir.path(), ["a.x", "b.x"]).with_dry_run(true);
        let executor = CannedExecutor::default();
        let reporter = RecordingReporter::new();

        let summary = Runner::new(&config, &executor, &reporter).run().unwrap();

        assert!(summary.dry_run);
        assert!(executor.calls.borrow().is_empty());
        assert!(reporter.contains("[DRY RUN] Would run interp"));
        assert!(reporter.contains("nothing was executed"));
    }

    #[test]
    fn test_signal_and_timeout_map_to_distinct_errors() {
        let script = ScriptRef::resolve(std::path::Path::new("s"), "a.x");

        let killed = failure(
            &script,
            &ExecutionResult {
                signal: Some(9),
                ..Default::default()
            },
            None,
        );
        assert!(matches!(killed, RunnerError::Terminated { signal: Some(9), .. }));

        let slow = failure(
            &script,
            &ExecutionResult {
                timed_out: true,
                ..Default::default()
            },
            Some(Duration::from_secs(2)),
        );
        assert!(matches!(slow, RunnerError::Timeout { after, .. } if after == Duration::from_secs(2)));
    }
}
