// src/watch/mod.rs

//! File watching.
//!
//! This module turns OS-level file notifications into the crate's
//! [`ChangeEvent`](crate::engine::ChangeEvent) stream and handles the
//! recursive expansion of watched directories. It does **not** decide what
//! a change means; that is the dispatch loop's job.

pub mod walker;
pub mod watcher;

pub use walker::expand_paths;
pub use watcher::{WatcherHandle, spawn_watcher};
