// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use async_trait::async_trait;

use crate::error::TicketlineError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for storage and persistence backends.
///
/// Manages the lifecycle of the database connection. Query-shaped access
/// for the intake flow goes through [`TicketResolver`](crate::TicketResolver).
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, seeding).
    async fn initialize(&self) -> Result<(), TicketlineError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), TicketlineError>;
}
