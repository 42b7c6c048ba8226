// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ticketline.toml` > `~/.config/ticketline/ticketline.toml`
//! > `/etc/ticketline/ticketline.toml` with environment variable overrides via
//! the `TICKETLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TicketlineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ticketline/ticketline.toml` (system-wide)
/// 3. `~/.config/ticketline/ticketline.toml` (user XDG config)
/// 4. `./ticketline.toml` (local directory)
/// 5. `TICKETLINE_*` environment variables
pub fn load_config() -> Result<TicketlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TicketlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TicketlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TicketlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TicketlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TicketlineConfig::default()))
        .merge(Toml::file("/etc/ticketline/ticketline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ticketline/ticketline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("ticketline.toml"))
        .merge(env_provider())
}

/// Sections that `TICKETLINE_<SECTION>_<KEY>` variables may target.
const ENV_SECTIONS: [&str; 4] = ["agent", "storage", "intake", "media"];

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TICKETLINE_STORAGE_DATABASE_PATH` must map to
/// `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("TICKETLINE_").map(|key| nest_env_key(key.as_str()).into())
}

/// Map a prefix-stripped env key onto its dotted config path.
///
/// Figment hands the key to `map()` in its original case, so it is
/// lowercased here before the section is split off.
fn nest_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}
