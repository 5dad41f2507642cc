// src/engine/dispatch.rs

//! The dispatch loop: the one place that ties the event stream, admission
//! control and command execution together, and the one place that decides
//! when the supervisor stops.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::{ChangeEvent, ratelimit::RateLimiter};
use crate::errors::{Result, WatchrunError};
use crate::exec::Run;

/// Policy knobs for the loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchOptions {
    /// Stop after the first successful run triggered by an event.
    pub once: bool,
    /// Perform one run before consuming any events.
    pub immediate: bool,
}

/// Consumes change events, filters and rate-limits them, and drives the
/// runner — one fully resolved run at a time.
///
/// Runs are invoked synchronously, which is what serializes event bursts
/// into single executions: the loop does not look at the next event until
/// the current primary command has finished.
pub struct DispatchLoop<R: Run> {
    events: mpsc::Receiver<ChangeEvent>,
    limiter: RateLimiter,
    runner: R,
    options: DispatchOptions,
    cancel: CancellationToken,
}

impl<R: Run> DispatchLoop<R> {
    pub fn new(
        events: mpsc::Receiver<ChangeEvent>,
        limiter: RateLimiter,
        runner: R,
        options: DispatchOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            events,
            limiter,
            runner,
            options,
            cancel,
        }
    }

    /// Main loop. Returns when the shared token is cancelled (clean stop),
    /// after the single `once` run, or with the first fatal error: a failed
    /// run, or the event stream dying while the supervisor is still live.
    pub async fn run(mut self) -> Result<()> {
        info!("dispatch loop started");

        if self.options.immediate {
            self.runner.run(&self.cancel).await?;
        }

        loop {
            let Some(event) = self.events.recv().await else {
                if self.cancel.is_cancelled() {
                    info!("dispatch loop stopped");
                    return Ok(());
                }
                return Err(WatchrunError::WatchClosed);
            };

            if !event.op.is_interesting() {
                continue;
            }

            if let Err(err) = self.limiter.lease(1) {
                debug!(path = %event.path.display(), "event dropped: {err}");
                continue;
            }

            info!(op = ?event.op, path = %event.path.display(), "change detected");

            self.runner.run(&self.cancel).await?;

            if self.options.once {
                info!("single run completed, stopping");
                return Ok(());
            }
        }
    }
}
