//! Child process lifecycle management
//!
//! The runner has at most one child alive at a time. That child is spawned as
//! the leader of its own process group, so anything the interpreter forks can
//! be signalled together. The active PID is published in a global slot so the
//! signal handler can take the child down before the runner exits.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::process::{Child, Command, ExitStatus};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static ACTIVE_CHILD: OnceLock<Arc<Mutex<ActiveChild>>> = OnceLock::new();

/// Signal number that interrupted the runner, 0 while none has arrived.
static INTERRUPTED_BY: AtomicI32 = AtomicI32::new(0);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long the main thread gets to report an interruption and exit on its
/// own before the signal thread exits for it.
const MAIN_EXIT_GRACE: Duration = Duration::from_secs(5);

/// Slot holding the PID of the child currently being waited on.
#[derive(Debug, Default)]
pub struct ActiveChild {
    pid: Option<u32>,
}

impl ActiveChild {
    /// Get or create the process-wide slot
    pub fn global() -> Arc<Mutex<ActiveChild>> {
        ACTIVE_CHILD
            .get_or_init(|| Arc::new(Mutex::new(ActiveChild::default())))
            .clone()
    }

    pub fn set(&mut self, pid: u32) {
        if let Some(previous) = self.pid.replace(pid) {
            warn!("Replacing active child {} with {}", previous, pid);
        }
        debug!("Tracking child process PID {}", pid);
    }

    /// Forget `pid` if it is the tracked child.
    pub fn clear(&mut self, pid: u32) {
        if self.pid == Some(pid) {
            self.pid = None;
            debug!("Released child process PID {}", pid);
        }
    }

    pub fn current(&self) -> Option<u32> {
        self.pid
    }

    /// Terminate the tracked child's process group, if any.
    pub fn terminate(&mut self, grace_period: Duration) {
        match self.pid.take() {
            Some(pid) => terminate_group(pid, grace_period),
            None => debug!("No active child to terminate"),
        }
    }
}

/// Run `f` with the global slot locked. A poisoned lock is still usable since
/// the slot holds plain data.
pub fn with_active_child<T>(f: impl FnOnce(&mut ActiveChild) -> T) -> T {
    let slot = ActiveChild::global();
    let mut guard = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

/// SIGTERM the process group led by `pgid`, wait up to `grace_period`, then SIGKILL.
///
/// Used when only the PID is known (signal handler). Liveness is judged from
/// `/proc`, so an unreaped zombie leader counts as gone.
pub fn terminate_group(pgid: u32, grace_period: Duration) {
    info!("Terminating child process group {}", pgid);
    if let Err(e) = send_signal_to_group(pgid, Signal::SIGTERM) {
        warn!("Failed to send SIGTERM to process group {}: {}", pgid, e);
        return;
    }

    let start = Instant::now();
    while start.elapsed() < grace_period {
        if !is_process_alive(pgid) {
            debug!("Process group {} exited after SIGTERM", pgid);
            return;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    warn!("Process group {} ignored SIGTERM, sending SIGKILL", pgid);
    if let Err(e) = send_signal_to_group(pgid, Signal::SIGKILL) {
        warn!("Failed to send SIGKILL to process group {}: {}", pgid, e);
    }
}

/// Stop a child we own: SIGTERM its group, give it `grace_period`, SIGKILL,
/// and reap it.
pub fn kill_child_group(child: &mut Child, grace_period: Duration) -> std::io::Result<ExitStatus> {
    let pgid = child.id();
    if let Err(e) = send_signal_to_group(pgid, Signal::SIGTERM) {
        warn!("Failed to send SIGTERM to process group {}: {}", pgid, e);
    }

    let start = Instant::now();
    while start.elapsed() < grace_period {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    warn!("Child {} still running after {:?}, sending SIGKILL", pgid, grace_period);
    if let Err(e) = send_signal_to_group(pgid, Signal::SIGKILL) {
        warn!("Failed to send SIGKILL to process group {}: {}", pgid, e);
        child.kill()?;
    }
    child.wait()
}

/// Negative PID addresses every process in the group.
fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
    signal::kill(Pid::from_raw(-(pgid as i32)), signal)
}

/// Check if a process is still alive (not dead or zombie)
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    // Field 3 of /proc/<pid>/stat is the state; Z and X are not running.
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        if let Some(state) = stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
        {
            return !matches!(state, "Z" | "X");
        }
    }

    true
}

/// Signal that interrupted the runner, if one has arrived.
pub fn interrupted() -> Option<i32> {
    match INTERRUPTED_BY.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Install handlers for SIGINT, SIGTERM and SIGHUP.
///
/// On delivery the signal is recorded and the active child's process group is
/// terminated. The executor then sees `interrupted()` and the main thread
/// exits with `128 + signal`. With no child running, or if the main thread
/// does not exit within a grace period, the signal thread exits itself.
/// Call once at program start.
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let signal_name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            info!("Received {}, stopping pipeline", signal_name);
            INTERRUPTED_BY.store(sig, Ordering::SeqCst);

            let had_child = with_active_child(|active| {
                let had_child = active.current().is_some();
                active.terminate(Duration::from_secs(3));
                had_child
            });
            if had_child {
                std::thread::sleep(MAIN_EXIT_GRACE);
                warn!("Main thread did not exit after {}, exiting", signal_name);
            }
            std::process::exit(crate::error::SIGNAL_EXIT_BASE + sig);
        }
    });

    Ok(())
}

/// Extension trait for `Command` to isolate children in their own process group
pub trait CommandProcessGroup {
    /// Make the child lead a new process group. On Linux the child also gets
    /// SIGTERM if the runner dies first.
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;

        self.process_group(0);

        #[cfg(target_os = "linux")]
        unsafe {
            self.pre_exec(|| {
                if nix::libc::prctl(nix::libc::PR_SET_PDEATHSIG, nix::libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        self
    }
}
