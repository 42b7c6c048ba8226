// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ticketline doctor` command implementation.
//!
//! Runs diagnostic checks against the Ticketline environment to identify
//! configuration issues, database problems and media directory permissions.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use ticketline_config::model::TicketlineConfig;
use ticketline_core::{StorageAdapter, TicketlineError};
use ticketline_storage::SqliteStorage;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `ticketline doctor` command.
///
/// With `deep`, also runs the SQLite integrity check and reports heap usage.
pub async fn run_doctor(
    config: &TicketlineConfig,
    deep: bool,
    plain: bool,
) -> Result<(), TicketlineError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let mut results = vec![
        check_config(),
        check_database(&config.storage.database_path).await,
        check_departments(config).await,
        check_media_dir(config).await,
    ];

    if deep {
        results.push(check_db_integrity(&config.storage.database_path).await);
        results.push(check_memory_baseline());
    }

    println!();
    println!("  ticketline doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in &results {
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{}", format_line(result, use_color));
    }
    println!();

    if issues > 0 {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
        if !deep {
            println!("  Run with --deep for detailed diagnostics.");
        }
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Check configuration loads without errors.
fn check_config() -> CheckResult {
    let start = Instant::now();
    match ticketline_config::load_and_validate() {
        Ok(_) => CheckResult::new("Configuration", CheckStatus::Pass, "valid", start),
        Err(errors) => CheckResult::new(
            "Configuration",
            CheckStatus::Fail,
            format!("{} error(s)", errors.len()),
            start,
        ),
    }
}

/// Check the database file exists and migrates cleanly.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first run)"),
            start,
        );
    }

    let storage = SqliteStorage::new(ticketline_config::model::StorageConfig {
        database_path: db_path.to_string(),
        ..Default::default()
    });
    match storage.initialize().await {
        Ok(()) => {
            let _ = storage.close().await;
            CheckResult::new("Database", CheckStatus::Pass, "connected", start)
        }
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, format!("open failed: {e}"), start),
    }
}

/// Check the seeded department catalog matches the configured menu.
async fn check_departments(config: &TicketlineConfig) -> CheckResult {
    let start = Instant::now();
    if !Path::new(&config.storage.database_path).exists() {
        return CheckResult::new(
            "Departments",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Departments", CheckStatus::Fail, format!("{e}"), start);
    }
    let seeded = match storage.list_departments().await {
        Ok(d) => d,
        Err(e) => {
            return CheckResult::new("Departments", CheckStatus::Fail, format!("{e}"), start);
        }
    };
    let _ = storage.close().await;

    let missing: Vec<&str> = config
        .intake
        .departments
        .iter()
        .filter(|name| !seeded.iter().any(|d| d.name.eq_ignore_ascii_case(name.trim())))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        CheckResult::new(
            "Departments",
            CheckStatus::Pass,
            format!("{} seeded", seeded.len()),
            start,
        )
    } else {
        CheckResult::new(
            "Departments",
            CheckStatus::Fail,
            format!("not in database: {}", missing.join(", ")),
            start,
        )
    }
}

/// Check the media directory is writable when image archiving is on.
async fn check_media_dir(config: &TicketlineConfig) -> CheckResult {
    let start = Instant::now();
    let media = &config.media;
    if !media.enable_image_download {
        return CheckResult::new("Media archive", CheckStatus::Pass, "disabled", start);
    }
    if media.encryption_key.is_none() {
        return CheckResult::new(
            "Media archive",
            CheckStatus::Warn,
            "no media.encryption_key; images will not be archived",
            start,
        );
    }

    let dir = Path::new(&media.storage_path);
    let probe = dir.join(".ticketline-doctor");
    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await
    }
    .await;
    match result {
        Ok(()) => CheckResult::new(
            "Media archive",
            CheckStatus::Pass,
            format!("writable: {}", dir.display()),
            start,
        ),
        Err(e) => CheckResult::new(
            "Media archive",
            CheckStatus::Fail,
            format!("{} not writable: {e}", dir.display()),
            start,
        ),
    }
}

/// Deep check: SQLite integrity check.
async fn check_db_integrity(db_path: &str) -> CheckResult {
    let start = Instant::now();
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "DB integrity",
            CheckStatus::Warn,
            "database not found (skipped)",
            start,
        );
    }

    let conn = match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => conn,
        Err(e) => {
            return CheckResult::new(
                "DB integrity",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            );
        }
    };
    let result = conn
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare("PRAGMA integrity_check")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await;

    match result {
        Ok(rows) if rows.len() == 1 && rows[0] == "ok" => {
            CheckResult::new("DB integrity", CheckStatus::Pass, "ok", start)
        }
        Ok(rows) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("{} issue(s) found", rows.len()),
            start,
        ),
        Err(e) => CheckResult::new(
            "DB integrity",
            CheckStatus::Fail,
            format!("check failed: {e}"),
            start,
        ),
    }
}

/// Deep check: memory baseline via jemalloc.
fn check_memory_baseline() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new(
            "Memory baseline",
            CheckStatus::Warn,
            "jemalloc not available on MSVC",
            start,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> TicketlineConfig {
        let mut config = TicketlineConfig::default();
        config.storage.database_path = dir.path().join("doctor.db").to_string_lossy().into_owned();
        config.media.storage_path = dir.path().join("media").to_string_lossy().into_owned();
        config
    }

    #[test]
    fn plain_line_uses_bracket_tags() {
        let result = CheckResult {
            name: "Database".to_string(),
            status: CheckStatus::Warn,
            message: "not found".to_string(),
            duration: Duration::from_millis(3),
        };
        let line = format_line(&result, false);
        assert!(line.contains("[WARN]"));
        assert!(line.contains("not found (3ms)"));
    }

    #[tokio::test]
    async fn missing_database_warns() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let result = check_database(&config.storage.database_path).await;
        assert_eq!(result.status, CheckStatus::Warn);
        assert!(result.message.contains("not found"));
        assert_eq!(
            check_db_integrity(&config.storage.database_path).await.status,
            CheckStatus::Warn
        );
    }

    #[tokio::test]
    async fn initialized_database_passes_all_storage_checks() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await.unwrap();
        storage.close().await.unwrap();

        assert_eq!(
            check_database(&config.storage.database_path).await.status,
            CheckStatus::Pass
        );
        let departments = check_departments(&config).await;
        assert_eq!(departments.status, CheckStatus::Pass, "{}", departments.message);
        assert_eq!(
            check_db_integrity(&config.storage.database_path).await.status,
            CheckStatus::Pass
        );
    }

    #[tokio::test]
    async fn renamed_department_is_reported_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await.unwrap();
        storage.close().await.unwrap();

        config.intake.departments[0] = "Legal".to_string();
        let result = check_departments(&config).await;
        assert_eq!(result.status, CheckStatus::Fail);
        assert!(result.message.contains("Legal"));
    }

    #[tokio::test]
    async fn media_dir_checks_follow_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(&dir);

        assert_eq!(check_media_dir(&config).await.status, CheckStatus::Warn);

        config.media.encryption_key = Some("secret".to_string());
        let result = check_media_dir(&config).await;
        assert_eq!(result.status, CheckStatus::Pass, "{}", result.message);
        assert!(dir.path().join("media").is_dir());

        config.media.enable_image_download = false;
        assert_eq!(check_media_dir(&config).await.message, "disabled");
    }

    #[test]
    fn memory_baseline_reports() {
        let result = check_memory_baseline();
        assert!(result.status == CheckStatus::Pass || result.status == CheckStatus::Warn);
    }
}
