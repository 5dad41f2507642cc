// src/exec/runner.rs

//! Primary/secondary command composition.
//!
//! The dispatch loop talks to a [`Run`] capability instead of a concrete
//! runner. Production code uses [`CommandRunner`]; tests can provide their
//! own implementation that doesn't spawn real processes.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::{Result, WatchrunError};
use crate::exec::command::{ExitKind, ManagedProcess};

/// Capability of running one round of commands in response to a change.
pub trait Run: Send + Sync {
    fn run(&self, cancel: &CancellationToken) -> impl Future<Output = Result<()>> + Send;
}

/// Runs the primary command and, once it has succeeded, (re)starts the
/// secondary command in the background.
///
/// The secondary execution is fire-and-forget: it relies on
/// [`ManagedProcess`]'s single-instance guarantee to kill and replace a
/// still-running previous instance, and its failures are logged but never
/// surfaced to the caller.
pub struct CommandRunner {
    primary: Option<ManagedProcess>,
    secondary: Option<Arc<ManagedProcess>>,
}

impl CommandRunner {
    pub fn new(primary: Option<ManagedProcess>, secondary: Option<ManagedProcess>) -> Self {
        Self {
            primary,
            secondary: secondary.map(Arc::new),
        }
    }

    async fn run_primary(&self, cancel: &CancellationToken) -> Result<()> {
        let Some(primary) = &self.primary else {
            return Ok(());
        };

        match primary.execute(cancel).await? {
            ExitKind::Exited(code) if code != 0 => Err(WatchrunError::PrimaryFailed(code)),
            ExitKind::Exited(_) | ExitKind::Killed => Ok(()),
        }
    }

    fn run_secondary(&self, cancel: &CancellationToken) {
        let Some(secondary) = &self.secondary else {
            return;
        };

        let secondary = Arc::clone(secondary);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = secondary.execute(&cancel).await {
                warn!(command = %secondary, error = %err, "secondary command failed");
            }
        });
    }
}

impl Run for CommandRunner {
    async fn run(&self, cancel: &CancellationToken) -> Result<()> {
        self.run_primary(cancel).await?;
        self.run_secondary(cancel);
        Ok(())
    }
}
