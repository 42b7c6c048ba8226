// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use ticketline_core::TicketlineError;
use tracing::debug;

/// Handle to the ticket database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run migrations.
    ///
    /// Parent directories are created as needed. `:memory:` is accepted for tests.
    pub async fn open(path: &str) -> Result<Self, TicketlineError> {
        if path != ":memory:"
            && let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(TicketlineError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(TicketlineError::storage)?;
        Self::from_connection(conn, path != ":memory:").await
    }

    async fn from_connection(
        conn: tokio_rusqlite::Connection,
        wal: bool,
    ) -> Result<Self, TicketlineError> {
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            conn.execute_batch(
                "PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e: tokio_rusqlite::Error<TicketlineError>| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => TicketlineError::storage(other),
            })?;

        debug!(wal, "database opened and migrated");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), TicketlineError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn
            .close()
            .await
            .map_err(TicketlineError::storage)?;
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into the crate-wide error type.
pub(crate) fn map_tr_err(err: tokio_rusqlite::Error<rusqlite::Error>) -> TicketlineError {
    match err {
        tokio_rusqlite::Error::Error(rusqlite::Error::QueryReturnedNoRows) => {
            TicketlineError::NotFound {
                entity: "row",
                id: String::new(),
            }
        }
        other => TicketlineError::storage(other),
    }
}
