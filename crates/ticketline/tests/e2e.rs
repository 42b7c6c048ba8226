// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end conversation tests.
//!
//! Each test drives the state machine through the test harness: a mock
//! channel for replies, a temp SQLite database for tickets.

use std::sync::Arc;
use std::time::Duration;

use ticketline_core::{SenderType, TicketResolver, TicketStatus};
use ticketline_intake::{ConversationState, Outcome, SessionStore, prompts};
use ticketline_test_utils::{FailingResolver, FailureMode, MockChannel, ResolverOp, TestHarness};

const PHONE: &str = "5511999990000";

async fn harness() -> TestHarness {
    TestHarness::builder().build().await.unwrap()
}

fn state_name(state: Option<ConversationState>) -> Option<&'static str> {
    state.map(|s| s.name())
}

#[tokio::test]
async fn new_user_opens_ticket_through_department_menu() {
    let h = harness().await;

    let menu = h.send_text(PHONE, "printer is broken").await;
    assert_eq!(menu.outcome, Outcome::Prompted);
    for (i, dept) in h.config.intake.departments.iter().enumerate() {
        assert!(menu.reply().contains(&format!("{}. {dept}", i + 1)));
    }
    assert_eq!(
        h.session_state(PHONE).await,
        Some(ConversationState::AwaitingDepartment)
    );

    let title_prompt = h.send_text(PHONE, "1").await;
    assert_eq!(title_prompt.outcome, Outcome::Prompted);
    assert!(title_prompt.reply().contains("Human Resources"));
    assert_eq!(
        state_name(h.session_state(PHONE).await),
        Some("awaiting_issue_title")
    );
    let bound = h.storage.department_for_phone(PHONE).await.unwrap().unwrap();
    assert_eq!(bound.name, "Human Resources");

    let created = h.send_text(PHONE, "Printer broken").await;
    assert_eq!(created.outcome, Outcome::Completed);
    assert!(h.session_state(PHONE).await.is_none());

    let open = h.storage.list_open_tickets_for_phone(PHONE).await.unwrap();
    assert_eq!(open.len(), 1);
    let ticket = &open[0];
    assert_eq!(ticket.issue, "Printer broken");
    assert_eq!(ticket.description.as_deref(), Some("printer is broken"));
    assert_eq!(ticket.creator_department, "Human Resources");
    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(created.reply(), prompts::ticket_created(ticket.id, "Human Resources"));

    let thread = h.storage.ticket_messages(ticket.id).await.unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].message, "Printer broken\n\nprinter is broken");
    assert_eq!(thread[0].sender_type, SenderType::User);
}

#[tokio::test]
async fn single_open_ticket_skips_selection() {
    let h = harness().await;
    let id = h
        .seed_open_ticket(PHONE, "Finance", "Invoice missing")
        .await
        .unwrap();

    let decision = h.send_text(PHONE, "hello again").await;
    assert!(decision.reply().contains(&format!("#{id}")));
    assert_eq!(
        state_name(h.session_state(PHONE).await),
        Some("awaiting_ticket_decision")
    );

    let prompt = h.send_text(PHONE, "1").await;
    assert!(prompt.reply().contains(&format!("#{id}")));
    assert_eq!(
        state_name(h.session_state(PHONE).await),
        Some("awaiting_ticket_update")
    );

    let appended = h.send_text(PHONE, "still broken").await;
    assert_eq!(appended.outcome, Outcome::Completed);
    assert_eq!(appended.reply(), prompts::update_appended(id));
    assert!(h.session_state(PHONE).await.is_none());

    let thread = h.storage.ticket_messages(id).await.unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[1].message, "still broken");
}

#[tokio::test]
async fn two_open_tickets_require_selection() {
    let h = harness().await;
    let older = h
        .seed_open_ticket(PHONE, "Finance", "Invoice missing")
        .await
        .unwrap();
    let newer = h
        .seed_open_ticket(PHONE, "Finance", "Expense report")
        .await
        .unwrap();

    h.send_text(PHONE, "hi").await;
    let selection = h.send_text(PHONE, "1").await;
    assert!(selection.reply().contains(&format!("1. *#{newer}*")));
    assert!(selection.reply().contains(&format!("2. *#{older}*")));
    assert_eq!(
        state_name(h.session_state(PHONE).await),
        Some("awaiting_ticket_selection")
    );

    let invalid = h.send_text(PHONE, "3").await;
    assert_eq!(invalid.outcome, Outcome::Reprompted);
    assert_eq!(
        state_name(h.session_state(PHONE).await),
        Some("awaiting_ticket_selection")
    );

    let prompt = h.send_text(PHONE, "2").await;
    assert!(prompt.reply().contains(&format!("#{older}")));

    let appended = h.send_text(PHONE, "adding the receipt number").await;
    assert_eq!(appended.outcome, Outcome::Completed);
    assert_eq!(h.storage.ticket_messages(older).await.unwrap().len(), 2);
    assert_eq!(h.storage.ticket_messages(newer).await.unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_range_department_reprompts_with_menu() {
    let h = harness().await;
    h.send_text(PHONE, "hello").await;

    for bad in ["9", "0", "finance", ""] {
        let retry = h.send_text(PHONE, bad).await;
        assert_eq!(retry.outcome, Outcome::Reprompted, "input {bad:?}");
        assert_eq!(
            retry.reply(),
            prompts::invalid_department(&h.config.intake.departments)
        );
        assert_eq!(
            h.session_state(PHONE).await,
            Some(ConversationState::AwaitingDepartment)
        );
    }
}

#[tokio::test]
async fn issue_title_length_bounds() {
    let h = harness().await;
    h.send_text(PHONE, "hello").await;
    h.send_text(PHONE, "2").await;

    assert_eq!(h.send_text(PHONE, "abcd").await.outcome, Outcome::Reprompted);
    assert_eq!(h.send_text(PHONE, &"x".repeat(101)).await.outcome, Outcome::Reprompted);
    assert_eq!(
        state_name(h.session_state(PHONE).await),
        Some("awaiting_issue_title")
    );
    // Surrounding whitespace is not counted; multibyte chars count once.
    assert_eq!(h.send_text(PHONE, "  éééé  ").await.outcome, Outcome::Reprompted);
    assert_eq!(h.send_text(PHONE, "ééééé").await.outcome, Outcome::Completed);

    h.send_text(PHONE, "hello").await;
    h.send_text(PHONE, "2").await;
    assert_eq!(h.send_text(PHONE, &"y".repeat(100)).await.outcome, Outcome::Completed);

    let open = h.storage.list_open_tickets_for_phone(PHONE).await.unwrap();
    assert_eq!(open.len(), 2);
}

#[tokio::test]
async fn update_length_bounds() {
    let h = harness().await;
    let id = h.seed_open_ticket(PHONE, "Marketing", "Banner").await.unwrap();
    h.send_text(PHONE, "hi").await;
    h.send_text(PHONE, "1").await;

    assert_eq!(h.send_text(PHONE, "abcd").await.outcome, Outcome::Reprompted);
    assert_eq!(h.send_text(PHONE, &"z".repeat(501)).await.outcome, Outcome::Reprompted);
    assert_eq!(
        state_name(h.session_state(PHONE).await),
        Some("awaiting_ticket_update")
    );
    assert_eq!(h.send_text(PHONE, &"z".repeat(500)).await.outcome, Outcome::Completed);

    h.send_text(PHONE, "hi").await;
    h.send_text(PHONE, "1").await;
    assert_eq!(h.send_text(PHONE, "abcde").await.outcome, Outcome::Completed);

    assert_eq!(h.storage.ticket_messages(id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn returning_user_skips_menu_and_reuses_department() {
    let h = harness().await;
    h.send_text(PHONE, "hello").await;
    h.send_text(PHONE, "4").await;
    h.send_text(PHONE, "Color grading request").await;

    // Open ticket exists: "2" opens a new one in the remembered department.
    h.send_text(PHONE, "another thing").await;
    let prompt = h.send_text(PHONE, "2").await;
    assert!(prompt.reply().contains("Post Production"));
    assert!(matches!(
        h.session_state(PHONE).await,
        Some(ConversationState::AwaitingIssueTitle { ref department }) if department.name == "Post Production"
    ));
    h.send_text(PHONE, "Audio sync issue").await;

    // Close both; the next contact goes straight to the title prompt.
    for t in h.storage.list_open_tickets_for_phone(PHONE).await.unwrap() {
        h.storage
            .update_ticket_status(t.id, TicketStatus::Closed, None)
            .await
            .unwrap();
    }
    let welcome = h.send_text(PHONE, "new problem").await;
    assert_eq!(welcome.reply(), prompts::issue_title_prompt("Post Production", true));
}

#[tokio::test]
async fn decision_accepts_legacy_tokens_and_rejects_other_text() {
    let h = harness().await;
    let id = h.seed_open_ticket(PHONE, "Editing", "Cut list").await.unwrap();
    h.send_text(PHONE, "hi").await;

    let invalid = h.send_text(PHONE, "maybe").await;
    assert_eq!(invalid.outcome, Outcome::Reprompted);
    assert_eq!(invalid.reply(), prompts::invalid_decision());

    let prompt = h.send_text(PHONE, "Continue_Existing").await;
    assert!(prompt.reply().contains(&format!("#{id}")));
}

#[tokio::test]
async fn idle_session_expires_after_timeout() {
    let h = harness().await;
    h.send_text(PHONE, "hello").await;
    h.send_text("5511888880000", "hello").await;

    h.advance(Duration::from_secs(29 * 60));
    h.send_text("5511888880000", "1").await;
    assert!(h.session_state(PHONE).await.is_some());

    h.advance(Duration::from_secs(60));
    let swept = h.sessions.sweep_expired(h.now_ms()).await.unwrap();
    assert_eq!(swept, 1);
    assert!(h.session_state(PHONE).await.is_none());
    assert!(h.session_state("5511888880000").await.is_some());

    // The stale "1" starts a fresh conversation instead of picking a department.
    let fresh = h.send_text(PHONE, "1").await;
    assert_eq!(fresh.reply(), prompts::department_menu(&h.config.intake.departments));
    assert!(h.storage.department_for_phone(PHONE).await.unwrap().is_none());
}

#[tokio::test]
async fn disabled_storage_acknowledges_without_writing() {
    let h = TestHarness::builder()
        .with_database_storage(false)
        .build()
        .await
        .unwrap();

    h.send_text(PHONE, "printer is broken").await;
    h.send_text(PHONE, "1").await;
    let done = h.send_text(PHONE, "Printer broken").await;
    assert_eq!(done.outcome, Outcome::Completed);
    assert_eq!(done.reply(), prompts::request_received());
    assert!(h.session_state(PHONE).await.is_none());

    assert!(h.storage.list_open_tickets_for_phone(PHONE).await.unwrap().is_empty());
    assert!(h.storage.department_for_phone(PHONE).await.unwrap().is_none());
}

#[tokio::test]
async fn resolver_error_apologizes_and_clears_session() {
    let resolver = Arc::new(FailingResolver::new(FailureMode::Error));
    let h = TestHarness::builder()
        .with_resolver(resolver.clone())
        .build()
        .await
        .unwrap();

    let reply = h.send_text(PHONE, "hello").await;
    assert_eq!(reply.outcome, Outcome::Failed);
    assert_eq!(reply.replies, vec![prompts::apology()]);
    assert!(h.session_state(PHONE).await.is_none());
    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn hanging_resolver_times_out() {
    let h = TestHarness::builder()
        .with_resolver(Arc::new(FailingResolver::new(FailureMode::Hang)))
        .configure(|c| c.intake.resolver_timeout_secs = 1)
        .build()
        .await
        .unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(5), h.send_text(PHONE, "hello"))
        .await
        .expect("engine did not enforce the resolver timeout");
    assert_eq!(reply.outcome, Outcome::Failed);
    assert_eq!(reply.reply(), prompts::apology());
}

async fn failing_on(op: ResolverOp) -> TestHarness {
    TestHarness::builder()
        .failing_on(op, FailureMode::Error)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn bind_failure_at_department_menu_clears_session() {
    let h = failing_on(ResolverOp::BindPhoneToDepartment).await;
    h.send_text(PHONE, "printer is broken").await;
    assert_eq!(
        h.session_state(PHONE).await,
        Some(ConversationState::AwaitingDepartment)
    );

    let reply = h.send_text(PHONE, "1").await;
    assert_eq!(reply.outcome, Outcome::Failed);
    assert_eq!(reply.replies, vec![prompts::apology()]);
    assert!(h.session_state(PHONE).await.is_none());
    assert!(h.storage.department_for_phone(PHONE).await.unwrap().is_none());
}

#[tokio::test]
async fn create_failure_at_issue_title_clears_session() {
    let h = failing_on(ResolverOp::CreateTicket).await;
    h.send_text(PHONE, "printer is broken").await;
    h.send_text(PHONE, "1").await;
    assert_eq!(
        state_name(h.session_state(PHONE).await),
        Some("awaiting_issue_title")
    );

    let reply = h.send_text(PHONE, "Printer broken").await;
    assert_eq!(reply.outcome, Outcome::Failed);
    assert_eq!(reply.replies, vec![prompts::apology()]);
    assert!(h.session_state(PHONE).await.is_none());
    assert!(h.storage.list_open_tickets_for_phone(PHONE).await.unwrap().is_empty());
}

#[tokio::test]
async fn append_failure_at_ticket_update_clears_session() {
    let h = failing_on(ResolverOp::AppendMessage).await;
    let id = h
        .seed_open_ticket(PHONE, "Finance", "Invoice missing")
        .await
        .unwrap();
    h.send_text(PHONE, "any news?").await;
    h.send_text(PHONE, "1").await;
    assert_eq!(
        state_name(h.session_state(PHONE).await),
        Some("awaiting_ticket_update")
    );

    let reply = h.send_text(PHONE, "still missing").await;
    assert_eq!(reply.outcome, Outcome::Failed);
    assert_eq!(reply.replies, vec![prompts::apology()]);
    assert!(h.session_state(PHONE).await.is_none());
    assert_eq!(h.storage.ticket_messages(id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn hanging_create_times_out_mid_flow() {
    let h = TestHarness::builder()
        .failing_on(ResolverOp::CreateTicket, FailureMode::Hang)
        .configure(|c| c.intake.resolver_timeout_secs = 1)
        .build()
        .await
        .unwrap();
    h.send_text(PHONE, "printer is broken").await;
    h.send_text(PHONE, "1").await;

    let reply = tokio::time::timeout(Duration::from_secs(5), h.send_text(PHONE, "Printer broken"))
        .await
        .expect("engine did not enforce the resolver timeout");
    assert_eq!(reply.outcome, Outcome::Failed);
    assert_eq!(reply.reply(), prompts::apology());
    assert!(h.session_state(PHONE).await.is_none());
}

#[tokio::test]
async fn failed_reply_does_not_roll_back_ticket() {
    let h = harness().await;
    h.send_text(PHONE, "printer is broken").await;
    h.send_text(PHONE, "1").await;

    h.channel.set_fail_sends(true);
    let done = h.send_text(PHONE, "Printer broken").await;
    assert_eq!(done.outcome, Outcome::Completed);
    assert!(done.replies.is_empty());

    assert_eq!(h.storage.list_open_tickets_for_phone(PHONE).await.unwrap().len(), 1);
    assert!(h.session_state(PHONE).await.is_none());
}

#[tokio::test]
async fn long_replies_are_truncated_to_channel_limit() {
    let h = TestHarness::builder()
        .with_channel(MockChannel::new().with_max_message_length(30))
        .build()
        .await
        .unwrap();

    let menu = h.send_text(PHONE, "hello").await;
    assert_eq!(menu.reply().chars().count(), 30);
}

#[tokio::test]
async fn corrupted_session_is_dropped_silently() {
    let h = harness().await;
    h.sessions
        .put(ticketline_intake::Session::new(
            PHONE,
            ConversationState::AwaitingTicketSelection { tickets: vec![] },
            "hi",
            h.now_ms(),
        ))
        .await
        .unwrap();

    let reply = h.send_text(PHONE, "1").await;
    assert_eq!(reply.outcome, Outcome::Dropped);
    assert!(reply.replies.is_empty());
    assert!(h.session_state(PHONE).await.is_none());
}

#[tokio::test]
async fn phones_do_not_share_sessions() {
    let h = harness().await;
    h.send_text("111", "hello").await;
    h.send_text("222", "hello").await;
    h.send_text("111", "2").await;

    assert_eq!(
        state_name(h.session_state("111").await),
        Some("awaiting_issue_title")
    );
    assert_eq!(
        h.session_state("222").await,
        Some(ConversationState::AwaitingDepartment)
    );
}
