// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchrunError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to spawn [{command}]: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The primary command ran to completion but reported failure; the
    /// secondary command is not started in that case.
    #[error("primary command failed with exit code {0}")]
    PrimaryFailed(i32),

    /// A watched process died from a signal the supervisor never sends.
    #[error("process terminated by unexpected signal {0}")]
    UnexpectedSignal(i32),

    #[error("change event stream closed unexpectedly")]
    WatchClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchrunError>;
