// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage and resolver traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use ticketline_config::model::StorageConfig;
use ticketline_core::types::{MediaRecord, StatusChange, TicketMessage, TicketStats};
use ticketline_core::{
    AdapterType, Department, HealthStatus, MediaIndex, PluginAdapter, Priority, SenderType, StorageAdapter,
    Ticket, TicketResolver, TicketStatus, TicketlineError,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, TicketlineError> {
        self.db.get().ok_or_else(|| TicketlineError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self, db: &Database) -> Result<(), TicketlineError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Ticket administration ---

    pub async fn get_ticket(&self, id: i64) -> Result<Option<Ticket>, TicketlineError> {
        queries::tickets::get_ticket(self.db()?, id).await
    }

    /// Newest tickets, optionally restricted to one status.
    pub async fn tickets_by_status(
        &self,
        status: Option<TicketStatus>,
        limit: i64,
    ) -> Result<Vec<Ticket>, TicketlineError> {
        queries::tickets::list_tickets(self.db()?, status, limit).await
    }

    /// Change a ticket's status and log the transition. Returns the old status.
    pub async fn update_ticket_status(
        &self,
        id: i64,
        status: TicketStatus,
        changed_by: Option<i64>,
    ) -> Result<TicketStatus, TicketlineError> {
        queries::tickets::update_status(self.db()?, id, status, changed_by).await
    }

    pub async fn assign_ticket(&self, id: i64, user_id: i64) -> Result<(), TicketlineError> {
        queries::tickets::assign(self.db()?, id, user_id).await
    }

    pub async fn ticket_stats_for_phone(&self, phone: &str) -> Result<TicketStats, TicketlineError> {
        queries::tickets::stats_for_phone(self.db()?, phone).await
    }

    pub async fn ticket_messages(&self, id: i64) -> Result<Vec<TicketMessage>, TicketlineError> {
        queries::messages::messages_for_ticket(self.db()?, id).await
    }

    pub async fn status_history(&self, id: i64) -> Result<Vec<StatusChange>, TicketlineError> {
        queries::tickets::status_history(self.db()?, id).await
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, TicketlineError> {
        queries::departments::list_departments(self.db()?).await
    }

    pub async fn create_user(
        &self,
        name: Option<&str>,
        email: &str,
        role: &str,
    ) -> Result<i64, TicketlineError> {
        queries::users::create_user(self.db()?, name, email, role).await
    }

    pub async fn media_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MediaRecord>, TicketlineError> {
        queries::media::media_for_conversation(self.db()?, conversation_id).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TicketlineError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TicketlineError> {
        if let Some(db) = self.db.get() {
            self.checkpoint(db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), TicketlineError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| TicketlineError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), TicketlineError> {
        let db = self.db()?;
        self.checkpoint(db).await
    }
}

#[async_trait]
impl TicketResolver for SqliteStorage {
    async fn list_open_tickets_for_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<Ticket>, TicketlineError> {
        queries::tickets::list_open_for_phone(self.db()?, phone).await
    }

    async fn department_for_phone(
        &self,
        phone: &str,
    ) -> Result<Option<Department>, TicketlineError> {
        queries::departments::department_for_phone(self.db()?, phone).await
    }

    async fn department_by_name(&self, name: &str) -> Result<Option<Department>, TicketlineError> {
        queries::departments::department_by_name(self.db()?, name).await
    }

    async fn ensure_sender(&self, phone: &str, department_id: i64) -> Result<i64, TicketlineError> {
        queries::senders::ensure_sender(self.db()?, phone, department_id).await
    }

    async fn create_ticket(
        &self,
        issue: &str,
        description: &str,
        sender_id: i64,
        priority: Priority,
    ) -> Result<i64, TicketlineError> {
        queries::tickets::create_ticket(self.db()?, issue, description, sender_id, priority).await
    }

    async fn append_message(
        &self,
        ticket_id: i64,
        sender_id: i64,
        text: &str,
    ) -> Result<i64, TicketlineError> {
        queries::messages::append_message(self.db()?, ticket_id, sender_id, SenderType::User, text)
            .await
    }

    async fn bind_phone_to_department(
        &self,
        phone: &str,
        department_id: i64,
    ) -> Result<(), TicketlineError> {
        queries::senders::bind_phone_to_department(self.db()?, phone, department_id).await?;
        Ok(())
    }
}

#[async_trait]
impl MediaIndex for SqliteStorage {
    async fn record_media(
        &self,
        conversation_id: &str,
        media_path: &str,
        caption: Option<&str>,
        received_at: i64,
    ) -> Result<i64, TicketlineError> {
        queries::media::record_media(self.db()?, conversation_id, media_path, caption, received_at)
            .await
    }
}
