// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end conversation testing.
//!
//! `TestHarness` assembles the intake stack with a mock channel and a temp
//! SQLite database. `send_text()` drives one message through the state
//! machine and returns what was replied.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use ticketline_config::model::{StorageConfig, TicketlineConfig};
use ticketline_core::types::Priority;
use ticketline_core::{StorageAdapter, TicketResolver, TicketlineError};
use ticketline_intake::{
    ConversationEngine, ConversationState, DedupFilter, InMemorySessionStore, IntakeLoop, Outcome,
    Responder, SessionStore,
};
use ticketline_storage::SqliteStorage;

use crate::failing_resolver::{FailingResolver, FailureMode, ResolverOp};
use crate::mock_channel::MockChannel;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: TicketlineConfig,
    resolver: Option<Arc<dyn TicketResolver>>,
    failing_op: Option<(ResolverOp, FailureMode)>,
    channel: Option<MockChannel>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: TicketlineConfig::default(),
            resolver: None,
            failing_op: None,
            channel: None,
        }
    }

    /// Adjust the configuration before the stack is built.
    pub fn configure(mut self, f: impl FnOnce(&mut TicketlineConfig)) -> Self {
        f(&mut self.config);
        self
    }

    /// Toggle `storage.enable_database_storage`.
    pub fn with_database_storage(mut self, enabled: bool) -> Self {
        self.config.storage.enable_database_storage = enabled;
        self
    }

    /// Route resolver calls somewhere other than the temp database.
    pub fn with_resolver(mut self, resolver: Arc<dyn TicketResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Make one resolver operation fail against the temp database; every
    /// other call still reaches it.
    pub fn failing_on(mut self, op: ResolverOp, mode: FailureMode) -> Self {
        self.failing_op = Some((op, mode));
        self
    }

    pub fn with_channel(mut self, channel: MockChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, TicketlineError> {
        let temp_dir = tempfile::TempDir::new().map_err(TicketlineError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            ..config.storage
        };
        config.media.storage_path = temp_dir.path().join("media").to_string_lossy().into_owned();

        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;

        let mut resolver = self
            .resolver
            .unwrap_or_else(|| Arc::clone(&storage) as Arc<dyn TicketResolver>);
        if let Some((op, mode)) = self.failing_op {
            resolver = Arc::new(FailingResolver::failing_on(op, mode, resolver));
        }
        let channel = Arc::new(self.channel.unwrap_or_default());
        let sessions = Arc::new(InMemorySessionStore::new(config.intake.session_timeout()));
        let engine = Arc::new(ConversationEngine::new(
            resolver,
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Responder::new(Arc::clone(&channel) as _),
            config.intake.clone(),
            config.storage.enable_database_storage,
        ));

        Ok(TestHarness {
            channel,
            storage,
            sessions,
            engine,
            config,
            now_ms: AtomicI64::new(chrono::Utc::now().timestamp_millis()),
            _temp_dir: temp_dir,
        })
    }
}

/// The result of sending one message through the engine.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub outcome: Outcome,
    /// Texts sent back to the conversation while handling the message.
    pub replies: Vec<String>,
}

impl Exchange {
    /// The single reply, or an empty string when none was sent.
    pub fn reply(&self) -> &str {
        self.replies.first().map(String::as_str).unwrap_or_default()
    }
}

/// A complete test environment with a mock channel and temp storage.
pub struct TestHarness {
    /// The mock channel replies are captured on.
    pub channel: Arc<MockChannel>,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub sessions: Arc<InMemorySessionStore>,
    pub engine: Arc<ConversationEngine>,
    pub config: TicketlineConfig,
    /// Clock handed to the engine. Starts at wall-clock time.
    now_ms: AtomicI64,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The transport conversation id used for `phone`.
    pub fn conversation_id(phone: &str) -> String {
        format!("{phone}@s.whatsapp.net")
    }

    pub fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    /// Move the harness clock forward.
    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now_ms.fetch_add(by, Ordering::SeqCst);
    }

    /// Send `text` from `phone` through the state machine.
    pub async fn send_text(&self, phone: &str, text: &str) -> Exchange {
        let conversation_id = Self::conversation_id(phone);
        let before = self.channel.sent_to(&conversation_id).await.len();
        let outcome = self
            .engine
            .handle_text(&conversation_id, text, self.now_ms())
            .await;
        let replies = self
            .channel
            .sent_to(&conversation_id)
            .await
            .split_off(before);
        Exchange { outcome, replies }
    }

    /// Current session state for `phone`, if any.
    pub async fn session_state(&self, phone: &str) -> Option<ConversationState> {
        self.sessions
            .get(phone)
            .await
            .ok()
            .flatten()
            .map(|s| s.state)
    }

    /// Bind `phone` to `department` and open a ticket directly in storage.
    pub async fn seed_open_ticket(
        &self,
        phone: &str,
        department: &str,
        issue: &str,
    ) -> Result<i64, TicketlineError> {
        let dept = self
            .storage
            .department_by_name(department)
            .await?
            .ok_or_else(|| TicketlineError::NotFound {
                entity: "department",
                id: department.to_string(),
            })?;
        self.storage.bind_phone_to_department(phone, dept.id).await?;
        let sender_id = self.storage.ensure_sender(phone, dept.id).await?;
        self.storage
            .create_ticket(issue, "seeded for test", sender_id, Priority::Medium)
            .await
    }

    /// An intake loop over the harness channel and engine, without media archiving.
    pub fn intake_loop(&self) -> IntakeLoop {
        IntakeLoop::new(
            Arc::clone(&self.channel) as _,
            Arc::clone(&self.engine),
            DedupFilter::from_config(&self.config.intake),
            None,
            self.config.media.enable_text_logging,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_message_from_unknown_phone_gets_department_menu() {
        let harness = TestHarness::builder().build().await.unwrap();
        let exchange = harness.send_text("5511999990000", "hello").await;
        assert_eq!(exchange.outcome, Outcome::Prompted);
        assert_eq!(exchange.replies.len(), 1);
        assert!(exchange.reply().contains("1. Human Resources"));
        assert_eq!(
            harness.session_state("5511999990000").await,
            Some(ConversationState::AwaitingDepartment)
        );
    }

    #[tokio::test]
    async fn seeded_ticket_is_open_for_phone() {
        let harness = TestHarness::builder().build().await.unwrap();
        let id = harness
            .seed_open_ticket("5511999990000", "Finance", "Invoice missing")
            .await
            .unwrap();
        let open = harness
            .storage
            .list_open_tickets_for_phone("5511999990000")
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, id);
        assert_eq!(open[0].creator_department, "Finance");
    }

    #[tokio::test]
    async fn advance_moves_the_clock() {
        let harness = TestHarness::builder().build().await.unwrap();
        let start = harness.now_ms();
        harness.advance(Duration::from_secs(2));
        assert_eq!(harness.now_ms() - start, 2000);
    }
}
