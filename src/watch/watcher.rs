// src/watch/watcher.rs

use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::{ChangeEvent, ChangeOp};
use crate::errors::Result;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Subscribe to the given paths and return a stream of change events.
///
/// Each path is watched non-recursively; recursive watching is expressed by
/// expanding directories up front (see [`walker`](crate::watch::walker)).
///
/// The stream closes when `cancel` fires (clean shutdown) or when the
/// underlying watcher reports an error (the consumer treats an un-cancelled
/// close as fatal).
pub fn spawn_watcher(
    paths: &[PathBuf],
    cancel: CancellationToken,
) -> Result<(WatcherHandle, mpsc::Receiver<ChangeEvent>)> {
    // Channel from the blocking notify callback into the async world.
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Err(err) = raw_tx.send(res) {
                // We can't log via tracing here easily, so fallback to stderr.
                eprintln!("watchrun: failed to forward notify event: {err}");
            }
        },
        Config::default(),
    )?;

    for path in paths {
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|err| err.add_path(path.clone()))?;
    }

    info!(paths = paths.len(), "file watcher started");

    let (events_tx, events_rx) = mpsc::channel::<ChangeEvent>(64);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutting down file watcher");
                    return;
                }
                raw = raw_rx.recv() => match raw {
                    Some(Ok(event)) => {
                        let op = change_op(&event.kind);
                        for path in event.paths {
                            if events_tx.send(ChangeEvent { op, path }).await.is_err() {
                                // Consumer is gone; nothing left to do.
                                return;
                            }
                        }
                    }
                    Some(Err(err)) => {
                        error!(error = %err, "file watch error");
                        return;
                    }
                    None => return,
                },
            }
        }
    });

    Ok((WatcherHandle { _inner: watcher }, events_rx))
}

fn change_op(kind: &EventKind) -> ChangeOp {
    match kind {
        EventKind::Create(_) => ChangeOp::Create,
        EventKind::Modify(ModifyKind::Name(_)) => ChangeOp::Rename,
        EventKind::Modify(ModifyKind::Metadata(_)) => ChangeOp::AttrChange,
        EventKind::Modify(_) => ChangeOp::Write,
        EventKind::Remove(_) => ChangeOp::Remove,
        _ => ChangeOp::Other,
    }
}
