//! Shared helpers for integration tests

#![allow(dead_code)]

use scriptseq::error::Result;
use scriptseq::{ExecutionResult, ScriptExecutor, ScriptRef};
use std::cell::RefCell;
use std::path::Path;
use tempfile::TempDir;

/// Executor that returns a planned exit code per script and records every call.
pub struct PlannedExecutor {
    plan: Vec<(String, i32)>,
    calls: RefCell<Vec<String>>,
}

impl PlannedExecutor {
    pub fn new(plan: &[(String, i32)]) -> Self {
        Self {
            plan: plan.to_vec(),
            calls: RefCell::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl ScriptExecutor for PlannedExecutor {
    fn execute(&self, script: &ScriptRef) -> Result<ExecutionResult> {
        self.calls.borrow_mut().push(script.name().to_string());
        let code = self
            .plan
            .iter()
            .find(|(name, _)| name == script.name())
            .map_or(0, |(_, code)| *code);
        Ok(ExecutionResult {
            exit_code: Some(code),
            ..Default::default()
        })
    }
}

/// Temp directory holding `(name, body)` shell scripts.
pub fn scripts_dir(scripts: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, body) in scripts {
        write_script(dir.path(), name, body);
    }
    dir
}

pub fn write_script(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).expect("Failed to write script");
}
