// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A resolver that fails on demand, for exercising the apology path.
//!
//! [`FailingResolver::new`] fails every call. [`FailingResolver::failing_on`]
//! fails one operation and hands every other call to a working resolver, so a
//! conversation can get deep into the flow before the failure hits.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use ticketline_core::types::{Department, Priority, Ticket};
use ticketline_core::{TicketResolver, TicketlineError};

/// How a [`FailingResolver`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// The call returns an error.
    Error,
    /// The call hangs until the caller's timeout fires.
    Hang,
}

/// One [`TicketResolver`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverOp {
    ListOpenTickets,
    DepartmentForPhone,
    DepartmentByName,
    EnsureSender,
    CreateTicket,
    AppendMessage,
    BindPhoneToDepartment,
}

impl ResolverOp {
    fn name(self) -> &'static str {
        match self {
            ResolverOp::ListOpenTickets => "list_open_tickets_for_phone",
            ResolverOp::DepartmentForPhone => "department_for_phone",
            ResolverOp::DepartmentByName => "department_by_name",
            ResolverOp::EnsureSender => "ensure_sender",
            ResolverOp::CreateTicket => "create_ticket",
            ResolverOp::AppendMessage => "append_message",
            ResolverOp::BindPhoneToDepartment => "bind_phone_to_department",
        }
    }
}

pub struct FailingResolver {
    mode: FailureMode,
    /// When set, only this operation fails; the rest go to the inner resolver.
    only: Option<(ResolverOp, Arc<dyn TicketResolver>)>,
    calls: AtomicUsize,
}

impl FailingResolver {
    pub fn new(mode: FailureMode) -> Self {
        Self {
            mode,
            only: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(op: ResolverOp, mode: FailureMode, inner: Arc<dyn TicketResolver>) -> Self {
        Self {
            mode,
            only: Some((op, inner)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of failed (or hung) calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn passthrough(&self, op: ResolverOp) -> Option<&Arc<dyn TicketResolver>> {
        match &self.only {
            Some((target, inner)) if *target != op => Some(inner),
            _ => None,
        }
    }

    async fn fail<T>(&self, op: ResolverOp) -> Result<T, TicketlineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.mode == FailureMode::Hang {
            std::future::pending::<()>().await;
        }
        Err(TicketlineError::Internal(format!(
            "resolver unavailable: {}",
            op.name()
        )))
    }
}

#[async_trait]
impl TicketResolver for FailingResolver {
    async fn list_open_tickets_for_phone(&self, phone: &str) -> Result<Vec<Ticket>, TicketlineError> {
        match self.passthrough(ResolverOp::ListOpenTickets) {
            Some(inner) => inner.list_open_tickets_for_phone(phone).await,
            None => self.fail(ResolverOp::ListOpenTickets).await,
        }
    }

    async fn department_for_phone(
        &self,
        phone: &str,
    ) -> Result<Option<Department>, TicketlineError> {
        match self.passthrough(ResolverOp::DepartmentForPhone) {
            Some(inner) => inner.department_for_phone(phone).await,
            None => self.fail(ResolverOp::DepartmentForPhone).await,
        }
    }

    async fn department_by_name(&self, name: &str) -> Result<Option<Department>, TicketlineError> {
        match self.passthrough(ResolverOp::DepartmentByName) {
            Some(inner) => inner.department_by_name(name).await,
            None => self.fail(ResolverOp::DepartmentByName).await,
        }
    }

    async fn ensure_sender(&self, phone: &str, department_id: i64) -> Result<i64, TicketlineError> {
        match self.passthrough(ResolverOp::EnsureSender) {
            Some(inner) => inner.ensure_sender(phone, department_id).await,
            None => self.fail(ResolverOp::EnsureSender).await,
        }
    }

    async fn create_ticket(
        &self,
        issue: &str,
        description: &str,
        sender_id: i64,
        priority: Priority,
    ) -> Result<i64, TicketlineError> {
        match self.passthrough(ResolverOp::CreateTicket) {
            Some(inner) => {
                inner
                    .create_ticket(issue, description, sender_id, priority)
                    .await
            }
            None => self.fail(ResolverOp::CreateTicket).await,
        }
    }

    async fn append_message(
        &self,
        ticket_id: i64,
        sender_id: i64,
        text: &str,
    ) -> Result<i64, TicketlineError> {
        match self.passthrough(ResolverOp::AppendMessage) {
            Some(inner) => inner.append_message(ticket_id, sender_id, text).await,
            None => self.fail(ResolverOp::AppendMessage).await,
        }
    }

    async fn bind_phone_to_department(
        &self,
        phone: &str,
        department_id: i64,
    ) -> Result<(), TicketlineError> {
        match self.passthrough(ResolverOp::BindPhoneToDepartment) {
            Some(inner) => inner.bind_phone_to_department(phone, department_id).await,
            None => self.fail(ResolverOp::BindPhoneToDepartment).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Answers every call successfully with fixed data.
    struct StaticResolver;

    #[async_trait]
    impl TicketResolver for StaticResolver {
        async fn list_open_tickets_for_phone(&self, _: &str) -> Result<Vec<Ticket>, TicketlineError> {
            Ok(Vec::new())
        }
        async fn department_for_phone(&self, _: &str) -> Result<Option<Department>, TicketlineError> {
            Ok(None)
        }
        async fn department_by_name(&self, _: &str) -> Result<Option<Department>, TicketlineError> {
            Ok(None)
        }
        async fn ensure_sender(&self, _: &str, _: i64) -> Result<i64, TicketlineError> {
            Ok(7)
        }
        async fn create_ticket(
            &self,
            _: &str,
            _: &str,
            _: i64,
            _: Priority,
        ) -> Result<i64, TicketlineError> {
            Ok(42)
        }
        async fn append_message(&self, _: i64, _: i64, _: &str) -> Result<i64, TicketlineError> {
            Ok(1)
        }
        async fn bind_phone_to_department(&self, _: &str, _: i64) -> Result<(), TicketlineError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn error_mode_fails_every_call_and_counts() {
        let resolver = FailingResolver::new(FailureMode::Error);
        assert!(resolver.list_open_tickets_for_phone("1").await.is_err());
        assert!(resolver.ensure_sender("1", 1).await.is_err());
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn hang_mode_never_completes() {
        let resolver = FailingResolver::new(FailureMode::Hang);
        let result =
            tokio::time::timeout(Duration::from_millis(20), resolver.department_for_phone("1"))
                .await;
        assert!(result.is_err());
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn failing_on_passes_other_operations_through() {
        let resolver = FailingResolver::failing_on(
            ResolverOp::CreateTicket,
            FailureMode::Error,
            Arc::new(StaticResolver),
        );
        assert_eq!(resolver.ensure_sender("1", 1).await.unwrap(), 7);
        assert!(resolver.list_open_tickets_for_phone("1").await.unwrap().is_empty());
        assert_eq!(resolver.calls(), 0);

        let err = resolver
            .create_ticket("Printer broken", "", 7, Priority::Medium)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("create_ticket"));
        assert_eq!(resolver.calls(), 1);
    }
}
