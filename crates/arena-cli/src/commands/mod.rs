//! Command handler modules for the `arena` CLI.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod challenge;
pub mod reconcile;

use anyhow::{Context, Result};
use arena_config::{ArenaConfig, LoadedConfig};
use serde_json::Value;
use std::fs;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load layered config from explicit `--config` paths, falling back to
/// `ARENA_CONFIG` (or built-in defaults) when none are given.
pub fn load_config(paths: &[String]) -> Result<(LoadedConfig, ArenaConfig)> {
    let loaded = if paths.is_empty() {
        arena_config::load_from_env()?
    } else {
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        arena_config::load_layered_yaml(&refs)?
    };
    let typed = loaded.typed()?;
    Ok((loaded, typed))
}

/// Read and parse a JSON file.
pub fn read_json_file(path: &str) -> Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("read json file: {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parse json file: {path}"))
}
