// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Repository façade over departments, senders, and tickets.

use async_trait::async_trait;

use crate::error::TicketlineError;
use crate::types::{Department, Priority, Ticket};

/// The narrow set of persistence operations the intake flow depends on.
///
/// Every method is atomic: it either fully commits or leaves no trace.
#[async_trait]
pub trait TicketResolver: Send + Sync {
    /// Open and in-progress tickets created by any sender row of `phone`, newest first.
    async fn list_open_tickets_for_phone(&self, phone: &str)
    -> Result<Vec<Ticket>, TicketlineError>;

    /// The department `phone` was most recently bound to.
    async fn department_for_phone(&self, phone: &str)
    -> Result<Option<Department>, TicketlineError>;

    /// Case-insensitive catalog lookup.
    async fn department_by_name(&self, name: &str) -> Result<Option<Department>, TicketlineError>;

    /// Returns the sender id for `(phone, department_id)`, creating the row if needed.
    async fn ensure_sender(&self, phone: &str, department_id: i64) -> Result<i64, TicketlineError>;

    /// Creates a ticket and its first thread message in one transaction.
    async fn create_ticket(
        &self,
        issue: &str,
        description: &str,
        sender_id: i64,
        priority: Priority,
    ) -> Result<i64, TicketlineError>;

    /// Appends a user message to a ticket's thread.
    async fn append_message(
        &self,
        ticket_id: i64,
        sender_id: i64,
        text: &str,
    ) -> Result<i64, TicketlineError>;

    /// Makes `department_id` the current department for `phone`.
    async fn bind_phone_to_department(
        &self,
        phone: &str,
        department_id: i64,
    ) -> Result<(), TicketlineError>;
}
