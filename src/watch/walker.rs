// src/watch/walker.rs

use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::Result;

// TODO: make the ignore list configurable from the CLI.
const IGNORED_DIRS: &[&str] = &[
    "**/.git",
    "**/.hg",
    "**/node_modules",
    "**/vendor",
    "**/target",
];

/// Expand the configured paths for `--recurse`: every directory is replaced
/// by itself plus all its sub-directories, skipping well-known ignore dirs.
/// Non-directory paths are kept as-is.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let ignored = ignored_set()?;

    let mut expanded = Vec::with_capacity(paths.len());
    for path in paths {
        collect(path, &ignored, &mut expanded)
            .with_context(|| format!("unable to walk the path {}", path.display()))?;
    }

    Ok(expanded)
}

fn collect(path: &Path, ignored: &GlobSet, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    if !std::fs::metadata(path)?.is_dir() {
        out.push(path.to_path_buf());
        return Ok(());
    }

    if ignored.is_match(path) {
        return Ok(());
    }

    out.push(path.to_path_buf());

    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            collect(&entry.path(), ignored, out)?;
        }
    }

    Ok(())
}

fn ignored_set() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in IGNORED_DIRS {
        builder.add(Glob::new(pattern).context("invalid ignore pattern")?);
    }
    Ok(builder.build().context("building ignore set")?)
}
