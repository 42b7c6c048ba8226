// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: non-empty paths, a well-formed
//! department menu, ordered dedup watermarks, and sane length bounds.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::TicketlineConfig;

/// Number of entries in the department menu. Replies are the digits `1`..=`5`.
pub const DEPARTMENT_MENU_SIZE: usize = 5;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than stopping at the first.
pub fn validate_config(config: &TicketlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |key: &str, message: String| errors.push(ConfigError::validation(key, message));

    if !LOG_LEVELS.contains(&config.agent.log_level.to_ascii_lowercase().as_str()) {
        fail(
            "agent.log_level",
            format!(
                "agent.log_level `{}` is not one of {}",
                config.agent.log_level,
                LOG_LEVELS.join(", ")
            ),
        );
    }

    if config.storage.database_path.trim().is_empty() {
        fail(
            "storage.database_path",
            "storage.database_path must not be empty".to_string(),
        );
    }

    let intake = &config.intake;
    if intake.departments.len() != DEPARTMENT_MENU_SIZE {
        fail(
            "intake.departments",
            format!(
                "intake.departments must list exactly {DEPARTMENT_MENU_SIZE} entries, got {}",
                intake.departments.len()
            ),
        );
    }
    let mut seen = HashSet::new();
    for (i, name) in intake.departments.iter().enumerate() {
        if name.trim().is_empty() {
            fail(
                "intake.departments",
                format!("intake.departments[{i}] must not be empty"),
            );
        } else if !seen.insert(name.trim().to_lowercase()) {
            fail(
                "intake.departments",
                format!("duplicate department `{name}` in intake.departments"),
            );
        }
    }

    if intake.dedup_low_water == 0 || intake.dedup_low_water >= intake.dedup_high_water {
        fail(
            "intake.dedup_low_water",
            format!(
                "intake.dedup_low_water ({}) must be non-zero and below intake.dedup_high_water ({})",
                intake.dedup_low_water, intake.dedup_high_water
            ),
        );
    }

    for (key, value) in [
        ("session_timeout_secs", intake.session_timeout_secs),
        ("staleness_window_secs", intake.staleness_window_secs),
        ("resolver_timeout_secs", intake.resolver_timeout_secs),
    ] {
        if value == 0 {
            fail(
                &format!("intake.{key}"),
                format!("intake.{key} must be greater than zero"),
            );
        }
    }

    for (key, min, max) in [
        ("issue_title", intake.issue_title_min_len, intake.issue_title_max_len),
        ("update", intake.update_min_len, intake.update_max_len),
    ] {
        if min > max {
            fail(
                &format!("intake.{key}_min_len"),
                format!("intake.{key}_min_len ({min}) must not exceed intake.{key}_max_len ({max})"),
            );
        }
    }

    if config.media.storage_path.trim().is_empty() {
        fail(
            "media.storage_path",
            "media.storage_path must not be empty".to_string(),
        );
    }
    if let Some(key) = &config.media.encryption_key
        && key.trim().is_empty()
    {
        fail(
            "media.encryption_key",
            "media.encryption_key must not be blank when set".to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
