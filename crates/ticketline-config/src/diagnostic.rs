// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config error reports.
//!
//! Figment extraction errors and validation failures both become
//! [`ConfigError`]s. Each one names a dotted key (`intake.departments`), and
//! [`locate`] finds that key in the TOML files that were loaded so miette can
//! underline it. Unknown keys get a "did you mean" from their own section, or
//! a pointer to the section they actually belong in.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Every config section and the keys it accepts, in file order.
pub const SECTIONS: &[(&str, &[&str])] = &[
    ("agent", &["name", "log_level"]),
    (
        "storage",
        &["database_path", "wal_mode", "enable_database_storage"],
    ),
    (
        "intake",
        &[
            "session_timeout_secs",
            "staleness_window_secs",
            "dedup_high_water",
            "dedup_low_water",
            "resolver_timeout_secs",
            "departments",
            "issue_title_min_len",
            "issue_title_max_len",
            "update_min_len",
            "update_max_len",
            "default_priority",
        ],
    ),
    (
        "media",
        &[
            "enable_image_download",
            "enable_text_logging",
            "storage_path",
            "encryption_key",
        ],
    ),
];

/// A configuration error rendered through miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(.section.as_deref()))]
    #[diagnostic(code(ticketline::config::unknown_key), help("{help}"))]
    UnknownKey {
        key: String,
        /// `None` for a top-level key, i.e. an unknown section.
        section: Option<String>,
        suggestion: Option<String>,
        help: String,
        #[label("not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(ticketline::config::invalid_type), help("{}", override_help(key)))]
    InvalidType {
        /// Dotted path, e.g. `intake.session_timeout_secs`.
        key: String,
        detail: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("{message}")]
    #[diagnostic(code(ticketline::config::validation), help("{}", override_help(key)))]
    Validation {
        /// Dotted path of the offending setting.
        key: String,
        message: String,
        #[label("this value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(ticketline::config::other))]
    Other(String),
}

impl ConfigError {
    /// A validation failure for the dotted `key`, not yet located in a file.
    pub fn validation(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            key: key.to_string(),
            message: message.into(),
            span: None,
            src: None,
        }
    }

    fn location_mut(
        &mut self,
    ) -> Option<(
        &str,
        &mut Option<SourceSpan>,
        &mut Option<NamedSource<String>>,
    )> {
        match self {
            ConfigError::InvalidType { key, span, src, .. }
            | ConfigError::Validation { key, span, src, .. } => Some((key.as_str(), span, src)),
            ConfigError::UnknownKey { .. } | ConfigError::Other(_) => None,
        }
    }
}

fn section_label(section: Option<&str>) -> String {
    match section {
        Some(s) => format!("[{s}]"),
        None => "the top level".to_string(),
    }
}

fn split_key(dotted: &str) -> (Option<&str>, &str) {
    match dotted.split_once('.') {
        Some((section, field)) => (Some(section), field),
        None => (None, dotted),
    }
}

fn override_help(key: &str) -> String {
    match split_key(key) {
        (Some(section), field) => format!(
            "set `{field}` under [{section}] in ticketline.toml, or override it with TICKETLINE_{}",
            key.replace('.', "_").to_ascii_uppercase()
        ),
        (None, field) => format!("check `{field}` in ticketline.toml"),
    }
}

/// Keys accepted by `section`, or the section names for the top level.
fn keys_for(section: Option<&str>) -> Vec<&'static str> {
    match section {
        None => SECTIONS.iter().map(|(name, _)| *name).collect(),
        Some(name) => SECTIONS
            .iter()
            .find(|(s, _)| *s == name)
            .map(|(_, keys)| keys.to_vec())
            .unwrap_or_default(),
    }
}

/// The other section that accepts `key`, if any.
fn home_section(key: &str, current: Option<&str>) -> Option<&'static str> {
    SECTIONS
        .iter()
        .find(|(name, keys)| Some(*name) != current && keys.contains(&key))
        .map(|(name, _)| *name)
}

fn unknown_key(key: &str, section: Option<&str>, valid: &[&str]) -> ConfigError {
    let suggestion = suggest_key(key, valid);
    let help = if let Some(home) = home_section(key, section) {
        format!("`{key}` belongs in the [{home}] section")
    } else if let Some(s) = &suggestion {
        format!("did you mean `{s}`?")
    } else if section.is_none() {
        let names: Vec<String> = valid.iter().map(|n| format!("[{n}]")).collect();
        format!("ticketline.toml may contain the sections {}", names.join(", "))
    } else {
        format!("{} accepts: {}", section_label(section), valid.join(", "))
    };
    ConfigError::UnknownKey {
        key: key.to_string(),
        section: section.map(str::to_string),
        suggestion,
        help,
        span: None,
        src: None,
    }
}

/// Convert a `figment::Error` into diagnostics and locate them in `sources`.
///
/// `sources` are `(path, content)` pairs, highest precedence first.
pub fn figment_to_config_errors(
    err: figment::Error,
    sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut errors = Vec::new();
    for error in err {
        let path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
        let origin = origin_file(&error);
        let mut config_error = match &error.kind {
            Kind::UnknownField(field, expected) => {
                let section = path.first().map(String::as_str);
                let valid = if expected.is_empty() {
                    keys_for(section)
                } else {
                    expected.to_vec()
                };
                let mut e = unknown_key(field, section, &valid);
                if let ConfigError::UnknownKey { span, src, .. } = &mut e {
                    (*span, *src) = find_in_sources(sources, origin.as_deref(), section, field);
                }
                e
            }
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                span: None,
                src: None,
            },
            _ => ConfigError::Other(error.to_string()),
        };
        if let Some((key, span, src)) = config_error.location_mut() {
            let (section, field) = split_key(key);
            (*span, *src) = find_in_sources(sources, origin.as_deref(), section, field);
        }
        errors.push(config_error);
    }
    errors
}

/// Attach source spans to errors that name a key, using the first source
/// that sets it.
pub fn locate(mut errors: Vec<ConfigError>, sources: &[(String, String)]) -> Vec<ConfigError> {
    for error in &mut errors {
        if let Some((key, span, src)) = error.location_mut()
            && span.is_none()
        {
            let (section, field) = split_key(key);
            (*span, *src) = find_in_sources(sources, None, section, field);
        }
    }
    errors
}

fn origin_file(error: &figment::Error) -> Option<String> {
    match error.metadata.as_ref()?.source.as_ref()? {
        figment::Source::File(path) => Some(path.display().to_string()),
        _ => None,
    }
}

fn find_in_sources(
    sources: &[(String, String)],
    origin: Option<&str>,
    section: Option<&str>,
    field: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let candidates = sources
        .iter()
        .filter(|(path, _)| origin.is_none_or(|o| o == path.as_str()));
    for (path, content) in candidates {
        if let Some(offset) = find_key_offset(content, section, field) {
            return (
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.clone())),
            );
        }
    }
    (None, None)
}

/// Byte offset of `field` as a key inside `[section]` (or before any header
/// when `section` is `None`).
///
/// Tracks the current table header line by line, so a key of the same name
/// in another section is never matched.
pub fn find_key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            current = header.split(']').next().map(str::trim);
        } else if current == section
            && let Some((key, _)) = trimmed.split_once('=')
            && key.trim_end() == field
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Suggest a similar key name using Jaro-Winkler string similarity.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
