// src/config.rs

//! Validated runtime configuration.
//!
//! The CLI layer produces raw flags; this module turns them into plain,
//! already-validated values the rest of the crate consumes. All validation
//! failures are `WatchrunError::Config` and fatal before any watching or
//! command execution starts.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::CliArgs;
use crate::errors::{Result, WatchrunError};
use crate::watch::walker;

#[derive(Debug, Clone)]
pub struct Config {
    /// Files and directories to subscribe to. Already expanded when
    /// `recurse` was requested.
    pub paths: Vec<PathBuf>,

    pub primary: Option<String>,
    pub secondary: Option<String>,

    /// Kill the primary command after this duration.
    pub teardown: Option<Duration>,

    pub recurse: bool,
    pub once: bool,
    pub immediate: bool,

    /// Append secondary command stdout to this file.
    pub output: Option<PathBuf>,
}

impl Config {
    /// Build a validated configuration from parsed CLI arguments.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let mut cfg = Self {
            paths: args.paths,
            primary: none_if_blank(args.primary),
            secondary: none_if_blank(args.secondary),
            teardown: args.timeout,
            recurse: args.recurse,
            once: args.once,
            immediate: args.immediate,
            output: args.output,
        };

        validate(&cfg)?;

        if cfg.recurse {
            cfg.paths = walker::expand_paths(&cfg.paths)?;
        }

        Ok(cfg)
    }
}

fn validate(cfg: &Config) -> Result<()> {
    ensure_command_present(cfg)?;
    ensure_once_has_no_secondary(cfg)?;
    ensure_has_paths(cfg)?;
    Ok(())
}

fn ensure_command_present(cfg: &Config) -> Result<()> {
    if cfg.primary.is_none() && cfg.secondary.is_none() {
        return Err(WatchrunError::Config(
            "either the primary or the secondary command must be specified".to_string(),
        ));
    }
    Ok(())
}

fn ensure_once_has_no_secondary(cfg: &Config) -> Result<()> {
    // One-shot mode would exit while the background command keeps running.
    if cfg.once && cfg.secondary.is_some() {
        return Err(WatchrunError::Config(
            "a secondary command is not supported together with --once".to_string(),
        ));
    }
    Ok(())
}

fn ensure_has_paths(cfg: &Config) -> Result<()> {
    if cfg.paths.is_empty() {
        return Err(WatchrunError::Config(
            "at least one file or directory to watch must be specified".to_string(),
        ));
    }
    Ok(())
}

fn none_if_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = Vec::new();

        if let Some(primary) = &self.primary {
            tokens.push(format!("primary[{primary}]"));
        }
        if let Some(secondary) = &self.secondary {
            tokens.push(format!("secondary[{secondary}]"));
        }
        if let Some(teardown) = self.teardown {
            tokens.push(format!("timeout[{teardown:?}]"));
        }
        if self.recurse {
            tokens.push("recurse".to_string());
        }
        if self.once {
            tokens.push("once".to_string());
        }
        if self.immediate {
            tokens.push("immediate".to_string());
        }
        if let Some(output) = &self.output {
            tokens.push(format!("output[{}]", output.display()));
        }

        let paths: Vec<String> = self
            .paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        tokens.push(format!("paths[{}]", paths.join(",")));

        write!(f, "{}", tokens.join(" "))
    }
}

/// Parse a duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
