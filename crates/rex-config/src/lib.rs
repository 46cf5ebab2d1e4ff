//! Layered YAML configuration loading, canonicalization, and hashing.
//!
//! Mirrors this codebase's existing config-loading discipline: later layers
//! (e.g. environment overrides, pair bounds, runtime tuning) deep-merge over
//! earlier ones, the merged document is canonicalized (recursively sorted
//! object keys) before hashing so the same logical config always produces
//! the same `config_hash` regardless of source key order, and the result is
//! deserialized into a strongly-typed, validated [`AppConfig`].

pub mod app_config;
pub mod layered;

pub use app_config::{AppConfig, LadderRung, PriorityFee};
pub use layered::{load_layered_yaml, LoadedConfig};

use anyhow::Result;

/// Loads layered YAML config files and parses the result into a validated
/// [`AppConfig`] in one step. This is the entry point the CLI's `run` and
/// `dry-run` subcommands use.
pub fn load_app_config(paths: &[&str]) -> Result<(AppConfig, LoadedConfig)> {
    let loaded = load_layered_yaml(paths)?;
    let app_config = AppConfig::from_canonical_json(&loaded.config_json)?;
    Ok((app_config, loaded))
}
