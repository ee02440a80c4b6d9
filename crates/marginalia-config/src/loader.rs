// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./marginalia.toml` > `~/.config/marginalia/marginalia.toml`
//! > `/etc/marginalia/marginalia.toml` with environment variable overrides via
//! the `MARGINALIA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::MarginaliaConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/marginalia/marginalia.toml";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "marginalia.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/marginalia/marginalia.toml` (system-wide)
/// 3. `~/.config/marginalia/marginalia.toml` (user XDG config)
/// 4. `./marginalia.toml` (local directory)
/// 5. `MARGINALIA_*` environment variables
pub fn load_config() -> Result<MarginaliaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MarginaliaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MarginaliaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MarginaliaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MarginaliaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MarginaliaConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `<XDG config dir>/marginalia/marginalia.toml`, when a config dir exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("marginalia").join(LOCAL_CONFIG_FILE))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `MARGINALIA_STORAGE_DATABASE_PATH` must map to
/// `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("MARGINALIA_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to its dotted config key.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 5] = ["service", "storage", "blobs", "ingest", "watch"];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("blobs_base_url"), "blobs.base_url");
        assert_eq!(map_env_key("ingest_scratch_dir"), "ingest.scratch_dir");
        assert_eq!(map_env_key("watch_debounce_ms"), "watch.debounce_ms");
        assert_eq!(map_env_key("service_log_level"), "service.log_level");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("bogus_key"), "bogus_key");
    }
}
