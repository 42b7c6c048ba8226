// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for Ticketline.
//!
//! TOML parsing with strict key checking, XDG file lookup, `TICKETLINE_*`
//! environment overrides, and miette diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use ticketline_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Database: {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::TicketlineConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Figment errors are converted into diagnostics carrying source spans when
/// the offending file can be located.
pub fn load_and_validate() -> Result<TicketlineConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)
                .map_err(|errors| diagnostic::locate(errors, &collect_toml_sources()))?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<TicketlineConfig, Vec<ConfigError>> {
    let sources = [("<inline>".to_string(), toml_content.to_string())];
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)
                .map_err(|errors| diagnostic::locate(errors, &sources))?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources)),
    }
}

/// Config files that exist, highest precedence first.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string("ticketline.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("ticketline.toml").display().to_string())
            .unwrap_or_else(|_| "ticketline.toml".to_string());
        sources.push((path, content));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("ticketline/ticketline.toml");
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push((path.display().to_string(), content));
        }
    }

    let system_path = std::path::Path::new("/etc/ticketline/ticketline.toml");
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push((system_path.display().to_string(), content));
    }

    sources
}
