//! Script execution through an external interpreter.
//!
//! `ScriptExecutor` is the seam between the runner loop and the operating
//! system. `InterpreterExecutor` is the real implementation: it launches
//! `<interpreter> <script-path>`, captures both output streams, and blocks
//! until the child is reaped.

use crate::error::{Result, RunnerError};
use crate::process_guard::{self, CommandProcessGroup};
use crate::script::{ExecutionResult, ScriptRef};
use std::io::Read;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long a timed-out child gets between SIGTERM and SIGKILL.
const KILL_GRACE_PERIOD: Duration = Duration::from_secs(5);

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to keep reading output after a timed-out child was killed.
/// Descendants that left the process group may hold the pipes open forever.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Runs one script to completion.
///
/// Implementations must block until the script has finished. `Err` is
/// reserved for failures to run the script at all; a script that ran and
/// failed is an `Ok` result with a non-zero or missing exit code.
pub trait ScriptExecutor {
    fn execute(&self, script: &ScriptRef) -> Result<ExecutionResult>;
}

/// Executes scripts as `<interpreter> <script-path>` child processes.
#[derive(Debug, Clone)]
pub struct InterpreterExecutor {
    interpreter: PathBuf,
    timeout: Option<Duration>,
}

impl InterpreterExecutor {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout: None,
        }
    }

    /// Kill a child that runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn wait(&self, child: &mut Child) -> std::io::Result<(ExitStatus, bool)> {
        let Some(timeout) = self.timeout else {
            return child.wait().map(|status| (status, false));
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok((status, false));
            }
            if Instant::now() >= deadline {
                warn!("Child {} exceeded timeout of {:?}", child.id(), timeout);
                let status = process_guard::kill_child_group(child, KILL_GRACE_PERIOD)?;
                return Ok((status, true));
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }
}

impl ScriptExecutor for InterpreterExecutor {
    fn execute(&self, script: &ScriptRef) -> Result<ExecutionResult> {
        debug!(
            "Spawning {} {}",
            self.interpreter.display(),
            script.path().display()
        );

        let started = Instant::now();
        let mut child = Command::new(&self.interpreter)
            .arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .spawn()
            .map_err(|source| RunnerError::ChildLaunch {
                interpreter: self.interpreter.clone(),
                source,
            })?;

        let pid = child.id();
        process_guard::with_active_child(|active| active.set(pid));

        // Drain both pipes concurrently so a chatty child cannot fill one and stall.
        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());

        let waited = self.wait(&mut child);
        process_guard::with_active_child(|active| active.clear(pid));

        let (status, timed_out) = waited.map_err(|source| RunnerError::ChildWait {
            script: script.name().to_string(),
            source,
        })?;

        if let Some(signal) = process_guard::interrupted() {
            return Err(RunnerError::Interrupted {
                script: script.name().to_string(),
                signal,
            });
        }

        let drain_deadline = timed_out.then(|| Instant::now() + OUTPUT_DRAIN_GRACE);
        let result = ExecutionResult {
            stdout: stdout.collect("stdout", drain_deadline),
            stderr: stderr.collect("stderr", drain_deadline),
            exit_code: if timed_out { None } else { status.code() },
            signal: status.signal(),
            timed_out,
            elapsed: started.elapsed(),
        };

        info!(
            "{} finished in {:.2?} (exit code {:?})",
            script.name(),
            result.elapsed,
            result.exit_code
        );
        Ok(result)
    }
}

/// Output of one child pipe, filled by a reader thread.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

impl Capture {
    /// Wait for the reader to hit EOF, or until `deadline` if one is given,
    /// and return whatever was read.
    fn collect(self, stream: &str, deadline: Option<Instant>) -> String {
        let finished = match deadline {
            Some(deadline) => self
                .done
                .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .is_ok(),
            None => self.done.recv().is_ok(),
        };
        if !finished {
            warn!("Child {} was not fully captured; keeping what was read", stream);
        }

        let buf = self.buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn capture<R: Read + Send + 'static>(pipe: Option<R>) -> Capture {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done) = mpsc::channel();

    let sink = Arc::clone(&buf);
    thread::spawn(move || {
        if let Some(mut pipe) = pipe {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => sink
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("Failed reading child output: {}", e);
                        break;
                    }
                }
            }
        }
        // Receiver may be gone if the deadline already passed
        let _ = done_tx.send(());
    });

    Capture { buf, done }
}
