//! Operator-facing progress messages.
//!
//! The wording of every notice lives in the provided methods of `Reporter`;
//! implementations only decide where a line goes.

use crate::runner::RunSummary;
use crate::script::{ExecutionResult, ScriptRef};
use std::cell::RefCell;
use std::path::Path;

pub trait Reporter {
    /// Emit one line of output.
    fn line(&self, text: &str);

    /// Emit captured child output verbatim, without doubling its final newline.
    fn block(&self, text: &str) {
        self.line(text.strip_suffix('\n').unwrap_or(text));
    }

    fn script_started(&self, script: &ScriptRef) {
        self.line(&format!("Running {}...", script.path().display()));
    }

    fn script_succeeded(&self, script: &ScriptRef, _result: &ExecutionResult) {
        self.line(&format!("Successfully finished {}.", script.name()));
    }

    fn script_failed(&self, script: &ScriptRef, result: &ExecutionResult) {
        let reason = if result.timed_out {
            format!("Timed out after {}s", result.elapsed.as_secs())
        } else if let Some(code) = result.exit_code {
            format!("Return code: {}", code)
        } else if let Some(signal) = result.signal {
            format!("Terminated by signal {}", signal)
        } else {
            "Terminated".to_string()
        };
        self.line(&format!("Error running {}. {}", script.name(), reason));
        self.line("Standard Output:");
        self.block(&result.stdout);
        self.line("Standard Error:");
        self.block(&result.stderr);
    }

    fn dry_run(&self, script: &ScriptRef, interpreter: &Path) {
        self.line(&format!(
            "[DRY RUN] Would run {} {}",
            interpreter.display(),
            script.path().display()
        ));
    }

    fn pipeline_completed(&self, summary: &RunSummary) {
        if summary.dry_run {
            self.line(&format!(
                "[DRY RUN] All {} scripts are present; nothing was executed.",
                summary.completed.len()
            ));
        } else {
            self.line("All scripts have been successfully executed.");
        }
    }
}

/// Prints every line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn line(&self, text: &str) {
        println!("{}", text);
    }
}

/// Keeps lines in memory. Used by tests and anything that wants the report as data.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: RefCell<Vec<String>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// True if some line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn line(&self, text: &str) {
        self.lines.borrow_mut().push(text.to_string());
    }
}
