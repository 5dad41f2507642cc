// src/exec/command.rs

//! Single-command process supervision.
//!
//! A [`ManagedProcess`] owns at most one live OS process at a time. Every
//! call to [`ManagedProcess::execute`] first tears down the previous
//! instance, then spawns the command as the leader of a fresh process group
//! so that a single signal reaches the whole subprocess tree.

use std::fmt;
use std::fs::File;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use nix::sys::signal::{Signal, killpg};
use nix::unistd::{Pid, getpgid};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{Result, WatchrunError};

/// An executable plus its arguments, split once from a raw command string.
///
/// Arguments are discrete tokens; no shell is involved, so quoting and
/// expansion are not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Split a raw command string on whitespace. Returns `None` when the
    /// string contains no tokens.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut tokens = raw.split_whitespace().map(str::to_string);
        let program = tokens.next()?;
        Some(Self {
            program,
            args: tokens.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a supervised process ended, as far as the lifecycle is concerned.
///
/// A non-zero exit code is still `Exited`; whether that counts as failure is
/// the caller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    /// The process terminated on its own with this exit code.
    Exited(i32),
    /// The process was killed by one of the signals the supervisor itself
    /// sends during teardown.
    Killed,
}

/// Supervisor for one external command.
///
/// Invariant: at most one live process per instance. `execute` kills and
/// awaits any previous instance before spawning the next one; the
/// per-instance `running` lock is the only synchronization required.
pub struct ManagedProcess {
    spec: CommandSpec,
    teardown: Option<Duration>,
    output: Option<File>,

    /// Process-group id of the currently live process, if any.
    live: StdMutex<Option<Pid>>,
    /// Held for the duration of one `execute` call.
    running: Mutex<()>,
}

impl ManagedProcess {
    pub fn new(spec: CommandSpec) -> Self {
        Self {
            spec,
            teardown: None,
            output: None,
            live: StdMutex::new(None),
            running: Mutex::new(()),
        }
    }

    /// Kill the process if it is still running after `timeout`.
    pub fn with_teardown(mut self, timeout: Duration) -> Self {
        self.teardown = Some(timeout);
        self
    }

    /// Send the process stdout to `out` instead of inheriting ours.
    pub fn with_output(mut self, out: File) -> Self {
        self.output = Some(out);
        self
    }

    /// Run the command once, enforcing the single-instance invariant.
    ///
    /// Any previous instance is killed and its completion awaited before the
    /// new process is spawned as a process-group leader. A background watcher
    /// kills the group when `cancel` fires or when the configured teardown
    /// duration elapses, whichever comes first; that watcher is scoped to
    /// this call and wound down on return.
    pub async fn execute(&self, cancel: &CancellationToken) -> Result<ExitKind> {
        self.kill();
        let _running = self.running.lock().await;

        // Per-execution scope: fires on external cancellation, and is
        // cancelled automatically when this call returns.
        let scope = cancel.child_token();
        let _scope_guard = scope.clone().drop_guard();

        let mut cmd = Command::new(&self.spec.program);
        cmd.args(&self.spec.args);
        cmd.stdin(Stdio::null());
        if let Some(out) = &self.output {
            cmd.stdout(out.try_clone()?);
        }
        // The child leads its own process group.
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| WatchrunError::Spawn {
            command: self.spec.to_string(),
            source,
        })?;

        // Record the group id once, while the process is known to exist.
        let pgid = child
            .id()
            .and_then(|pid| getpgid(Some(Pid::from_raw(pid as i32))).ok())
            .filter(|pgid| pgid.as_raw() > 0);
        *self.live.lock().unwrap() = pgid;

        self.spawn_teardown_watcher(scope.clone(), pgid);

        let status = child.wait().await;
        *self.live.lock().unwrap() = None;

        self.classify(status?)
    }

    /// Signal the whole process group of the live process, if any.
    ///
    /// Idempotent: without a recorded live process this is a no-op. Refuses
    /// to signal the supervisor's own process group.
    pub fn kill(&self) {
        let Some(pgid) = *self.live.lock().unwrap() else {
            return;
        };
        terminate_group(pgid);
    }

    /// Kill the group when the execution scope is cancelled or the teardown
    /// duration elapses, whichever happens first.
    fn spawn_teardown_watcher(&self, scope: CancellationToken, pgid: Option<Pid>) {
        let teardown = self.teardown;
        let command = self.spec.to_string();

        tokio::spawn(async move {
            match teardown {
                Some(limit) => tokio::select! {
                    _ = scope.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        debug!(command = %command, "teardown timeout elapsed");
                    }
                },
                None => scope.cancelled().await,
            }

            if let Some(pgid) = pgid {
                terminate_group(pgid);
            }
        });
    }

    fn classify(&self, status: ExitStatus) -> Result<ExitKind> {
        if let Some(code) = status.code() {
            info!(command = %self.spec, code, "process exited");
            return Ok(ExitKind::Exited(code));
        }

        match status.signal() {
            Some(sig) if sig == Signal::SIGTERM as i32 || sig == Signal::SIGKILL as i32 => {
                info!(command = %self.spec, "process terminated during teardown");
                Ok(ExitKind::Killed)
            }
            Some(sig) => {
                warn!(command = %self.spec, signal = sig, "process killed by unexpected signal");
                Err(WatchrunError::UnexpectedSignal(sig))
            }
            // Neither an exit code nor a signal; treat as teardown.
            None => Ok(ExitKind::Killed),
        }
    }
}

impl fmt::Display for ManagedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.spec.fmt(f)
    }
}

/// Send SIGTERM to an entire process group. Returns whether a signal was
/// sent.
///
/// Refuses to signal the supervisor's own process group; a raced group-id
/// capture must never take the supervisor down with its child.
pub fn terminate_group(pgid: Pid) -> bool {
    match getpgid(None) {
        Ok(own) if own == pgid => {
            warn!("refusing to signal own process group");
            return false;
        }
        _ => {}
    }

    // The group may already be gone; that is fine.
    let _ = killpg(pgid, Signal::SIGTERM);
    true
}
