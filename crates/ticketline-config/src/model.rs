// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Ticketline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use ticketline_core::Priority;

/// Top-level Ticketline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TicketlineConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation intake settings.
    #[serde(default)]
    pub intake: IntakeConfig,

    /// Media archive and message logging settings.
    #[serde(default)]
    pub media: MediaConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in greetings.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "ticketline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// When false the conversation still runs but tickets are not written.
    #[serde(default = "default_true")]
    pub enable_database_storage: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
            enable_database_storage: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("ticketline").join("ticketline.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("ticketline.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_true() -> bool {
    true
}

/// Conversation intake configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntakeConfig {
    /// Idle time after which a session is swept.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Messages older than this are treated as reconnect backlog.
    #[serde(default = "default_staleness_window_secs")]
    pub staleness_window_secs: u64,

    /// Size at which the recent-message record is trimmed.
    #[serde(default = "default_dedup_high_water")]
    pub dedup_high_water: usize,

    /// Size the recent-message record is trimmed down to.
    #[serde(default = "default_dedup_low_water")]
    pub dedup_low_water: usize,

    /// Upper bound on a single resolver call.
    #[serde(default = "default_resolver_timeout_secs")]
    pub resolver_timeout_secs: u64,

    /// Department menu, in display order. Must name seeded catalog entries.
    #[serde(default = "default_departments")]
    pub departments: Vec<String>,

    #[serde(default = "default_issue_title_min")]
    pub issue_title_min_len: usize,

    #[serde(default = "default_issue_title_max")]
    pub issue_title_max_len: usize,

    #[serde(default = "default_update_min")]
    pub update_min_len: usize,

    #[serde(default = "default_update_max")]
    pub update_max_len: usize,

    /// Priority assigned to tickets opened through chat.
    #[serde(default)]
    pub default_priority: Priority,
}

impl IntakeConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn staleness_window(&self) -> Duration {
        Duration::from_secs(self.staleness_window_secs)
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver_timeout_secs)
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: default_session_timeout_secs(),
            staleness_window_secs: default_staleness_window_secs(),
            dedup_high_water: default_dedup_high_water(),
            dedup_low_water: default_dedup_low_water(),
            resolver_timeout_secs: default_resolver_timeout_secs(),
            departments: default_departments(),
            issue_title_min_len: default_issue_title_min(),
            issue_title_max_len: default_issue_title_max(),
            update_min_len: default_update_min(),
            update_max_len: default_update_max(),
            default_priority: Priority::default(),
        }
    }
}

fn default_session_timeout_secs() -> u64 {
    30 * 60
}

fn default_staleness_window_secs() -> u64 {
    5 * 60
}

fn default_dedup_high_water() -> usize {
    1000
}

fn default_dedup_low_water() -> usize {
    500
}

fn default_resolver_timeout_secs() -> u64 {
    10
}

/// The seeded department catalog, in menu order.
pub fn default_departments() -> Vec<String> {
    [
        "Human Resources",
        "Finance",
        "Marketing",
        "Post Production",
        "Editing",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_issue_title_min() -> usize {
    5
}

fn default_issue_title_max() -> usize {
    100
}

fn default_update_min() -> usize {
    5
}

fn default_update_max() -> usize {
    500
}

/// Media archive and message logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Encrypt and archive inbound images.
    #[serde(default = "default_true")]
    pub enable_image_download: bool,

    /// Log the body of inbound text messages.
    #[serde(default = "default_true")]
    pub enable_text_logging: bool,

    /// Directory for encrypted media files.
    #[serde(default = "default_media_path")]
    pub storage_path: String,

    /// Passphrase the media key is derived from. Set it through
    /// `TICKETLINE_MEDIA_ENCRYPTION_KEY` rather than a config file.
    #[serde(default)]
    pub encryption_key: Option<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            enable_image_download: true,
            enable_text_logging: true,
            storage_path: default_media_path(),
            encryption_key: None,
        }
    }
}

fn default_media_path() -> String {
    "encrypted_media".to_string()
}
