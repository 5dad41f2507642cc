// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod watch;

use std::fs::OpenOptions;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cli::CliArgs;
use crate::config::Config;
use crate::engine::{DispatchLoop, DispatchOptions, RateLimiter};
use crate::errors::Result;
use crate::exec::{CommandRunner, CommandSpec, ManagedProcess};

/// One command run per window, however many events arrive in it.
const ADMISSION_LIMIT: u32 = 1;
const ADMISSION_INTERVAL: Duration = Duration::from_secs(1);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config validation
/// - the file watcher
/// - the command runner
/// - the dispatch loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = Config::from_args(args)?;
    info!(%cfg, "starting");

    let cancel = CancellationToken::new();

    // Ctrl-C → graceful shutdown.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("received interrupt, shutting down"),
                Err(err) => error!(error = %err, "failed to listen for interrupt"),
            }
            cancel.cancel();
        });
    }

    let (_watcher, events) = watch::spawn_watcher(&cfg.paths, cancel.clone())?;

    let runner = build_runner(&cfg)?;

    // Bursts of events come at about the same time: an IDE save plus a
    // format-on-save tool produce several writes for one logical change.
    let limiter = RateLimiter::new(ADMISSION_LIMIT, ADMISSION_INTERVAL);

    let options = DispatchOptions {
        once: cfg.once,
        immediate: cfg.immediate,
    };

    DispatchLoop::new(events, limiter, runner, options, cancel)
        .run()
        .await
}

fn build_runner(cfg: &Config) -> Result<CommandRunner> {
    let primary = cfg
        .primary
        .as_deref()
        .and_then(CommandSpec::parse)
        .map(|spec| {
            let process = ManagedProcess::new(spec);
            match cfg.teardown {
                Some(timeout) => process.with_teardown(timeout),
                None => process,
            }
        });

    let secondary = match cfg.secondary.as_deref().and_then(CommandSpec::parse) {
        Some(spec) => {
            let mut process = ManagedProcess::new(spec);
            if let Some(path) = &cfg.output {
                let file = OpenOptions::new().append(true).create(true).open(path)?;
                info!(file = %path.display(), "redirecting secondary command output");
                process = process.with_output(file);
            }
            Some(process)
        }
        None => None,
    };

    Ok(CommandRunner::new(primary, secondary))
}
