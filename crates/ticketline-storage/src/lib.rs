// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Ticketline.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer model via
//! `tokio-rusqlite`. Every write goes through one background thread, so each
//! query function can open its own transaction without SQLITE_BUSY retries.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use models::*;
