// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Ticketline.

use thiserror::Error;

/// The primary error type used across all Ticketline adapter traits and core operations.
#[derive(Debug, Error)]
pub enum TicketlineError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (connection failure, malformed event, send failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A persisted entity was looked up by id and does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Caller supplied a value the domain rejects (unknown status, bad priority).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Media encryption or decryption failure.
    #[error("vault error: {0}")]
    Vault(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TicketlineError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TicketlineError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns `true` when the channel reported it can no longer deliver events.
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, TicketlineError::Channel { message, .. } if message.contains("closed"))
    }
}
