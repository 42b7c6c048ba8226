// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-phone conversation sessions and the store that holds them.
//!
//! A phone number with no session is in the implicit starting state. Every
//! other state is a variant of [`ConversationState`], which carries exactly the
//! data its next input handler needs.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use ticketline_core::TicketlineError;
use ticketline_core::types::{Department, Ticket};
use tracing::debug;

/// Where a conversation is in the intake flow.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationState {
    /// The department menu was sent; expecting a menu number.
    AwaitingDepartment,
    /// Expecting a one-line issue title for a new ticket.
    AwaitingIssueTitle { department: Department },
    /// Expecting "continue" or "new". `department` is the phone's current
    /// binding, reused if the user opens a new ticket.
    AwaitingTicketDecision {
        tickets: Vec<Ticket>,
        department: Option<Department>,
    },
    /// Expecting a 1-based index into `tickets`.
    AwaitingTicketSelection { tickets: Vec<Ticket> },
    /// Expecting the text to append to `ticket`.
    AwaitingTicketUpdate { ticket: Ticket },
}

impl ConversationState {
    pub fn name(&self) -> &'static str {
        match self {
            ConversationState::AwaitingDepartment => "awaiting_department",
            ConversationState::AwaitingIssueTitle { .. } => "awaiting_issue_title",
            ConversationState::AwaitingTicketDecision { .. } => "awaiting_ticket_decision",
            ConversationState::AwaitingTicketSelection { .. } => "awaiting_ticket_selection",
            ConversationState::AwaitingTicketUpdate { .. } => "awaiting_ticket_update",
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One in-progress conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub phone_number: String,
    pub state: ConversationState,
    /// The text that opened the flow; becomes the ticket description.
    pub pending_first_message: String,
    /// Unix milliseconds of the last message handled for this phone.
    pub last_activity_at: i64,
}

impl Session {
    pub fn new(
        phone_number: impl Into<String>,
        state: ConversationState,
        pending_first_message: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            phone_number: phone_number.into(),
            state,
            pending_first_message: pending_first_message.into(),
            last_activity_at: now_ms,
        }
    }

    /// Same session in a new state, with activity refreshed.
    pub fn advance(self, state: ConversationState, now_ms: i64) -> Self {
        Self {
            state,
            last_activity_at: now_ms,
            ..self
        }
    }

    pub fn selected_department_id(&self) -> Option<i64> {
        self.selected_department().map(|d| d.id)
    }

    pub fn selected_department_name(&self) -> Option<&str> {
        self.selected_department().map(|d| d.name.as_str())
    }

    fn selected_department(&self) -> Option<&Department> {
        match &self.state {
            ConversationState::AwaitingIssueTitle { department } => Some(department),
            ConversationState::AwaitingTicketDecision { department, .. } => department.as_ref(),
            _ => None,
        }
    }

    /// Open tickets captured when the user was asked to continue or start over.
    pub fn candidate_tickets(&self) -> &[Ticket] {
        match &self.state {
            ConversationState::AwaitingTicketDecision { tickets, .. }
            | ConversationState::AwaitingTicketSelection { tickets } => tickets,
            _ => &[],
        }
    }

    pub fn selected_ticket_id(&self) -> Option<i64> {
        match &self.state {
            ConversationState::AwaitingTicketUpdate { ticket } => Some(ticket.id),
            _ => None,
        }
    }

    pub fn is_expired(&self, now_ms: i64, timeout: Duration) -> bool {
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.last_activity_at) >= timeout_ms
    }
}

/// Keyed storage for sessions, one per phone number.
///
/// `put` fully replaces any prior session for the same phone.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, phone: &str) -> Result<Option<Session>, TicketlineError>;

    async fn put(&self, session: Session) -> Result<(), TicketlineError>;

    async fn delete(&self, phone: &str) -> Result<(), TicketlineError>;

    /// Remove every session idle for at least the store's timeout. Returns the
    /// number removed.
    async fn sweep_expired(&self, now_ms: i64) -> Result<usize, TicketlineError>;
}

/// Process-local session store backed by a concurrent map.
pub struct InMemorySessionStore {
    sessions: DashMap<String, Session>,
    timeout: Duration,
}

impl InMemorySessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, phone: &str) -> Result<Option<Session>, TicketlineError> {
        Ok(self.sessions.get(phone).map(|s| s.value().clone()))
    }

    async fn put(&self, session: Session) -> Result<(), TicketlineError> {
        self.sessions.insert(session.phone_number.clone(), session);
        Ok(())
    }

    async fn delete(&self, phone: &str) -> Result<(), TicketlineError> {
        self.sessions.remove(phone);
        Ok(())
    }

    async fn sweep_expired(&self, now_ms: i64) -> Result<usize, TicketlineError> {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !session.is_expired(now_ms, self.timeout));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "swept expired sessions");
        }
        Ok(removed)
    }
}
