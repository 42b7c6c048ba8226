// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation state machine.
//!
//! [`ConversationEngine::handle_text`] takes one admitted text message, looks
//! up the sender's session, and runs the handler for its state. Each handler
//! returns a [`Step`]: the reply to send and what happens to the session.
//!
//! Failure policy:
//! - invalid input re-prompts and keeps the state,
//! - resolver or session-store errors (including timeouts) send an apology and
//!   clear the session,
//! - a session whose state is missing the data its handler needs is cleared
//!   and the message dropped without a reply.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ticketline_config::model::IntakeConfig;
use ticketline_core::types::{Department, Ticket, phone_from_conversation_id};
use ticketline_core::{TicketResolver, TicketlineError};
use tracing::{debug, error, info, warn};

use crate::prompts;
use crate::responder::Responder;
use crate::session::{ConversationState, Session, SessionStore};

/// What [`ConversationEngine::handle_text`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Moved to a new state and sent its prompt.
    Prompted,
    /// Input was rejected; the state is unchanged.
    Reprompted,
    /// A ticket was created or updated; the session ended.
    Completed,
    /// The message was ignored.
    Dropped,
    /// A resolver or session-store error aborted the message.
    Failed,
}

enum Next {
    Stay,
    Goto(ConversationState),
    End,
}

struct Step {
    reply: String,
    next: Next,
    outcome: Outcome,
}

impl Step {
    fn goto(state: ConversationState, reply: String) -> Self {
        Self {
            reply,
            next: Next::Goto(state),
            outcome: Outcome::Prompted,
        }
    }

    fn stay(reply: String) -> Self {
        Self {
            reply,
            next: Next::Stay,
            outcome: Outcome::Reprompted,
        }
    }

    fn end(reply: String) -> Self {
        Self {
            reply,
            next: Next::End,
            outcome: Outcome::Completed,
        }
    }
}

/// Routes admitted text messages through the intake flow.
pub struct ConversationEngine {
    resolver: Arc<dyn TicketResolver>,
    sessions: Arc<dyn SessionStore>,
    responder: Responder,
    config: IntakeConfig,
    persist: bool,
}

impl ConversationEngine {
    /// `persist = false` runs the full flow but skips every ticket and
    /// department write.
    pub fn new(
        resolver: Arc<dyn TicketResolver>,
        sessions: Arc<dyn SessionStore>,
        responder: Responder,
        config: IntakeConfig,
        persist: bool,
    ) -> Self {
        Self {
            resolver,
            sessions,
            responder,
            config,
            persist,
        }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Handle one text message from `conversation_id` received at `now_ms`.
    pub async fn handle_text(&self, conversation_id: &str, text: &str, now_ms: i64) -> Outcome {
        let phone = phone_from_conversation_id(conversation_id);

        if let Err(e) = self.bounded(self.sessions.sweep_expired(now_ms)).await {
            warn!(error = %e, "session sweep failed");
        }

        match self.step(phone, text, now_ms).await {
            Ok(None) => Outcome::Dropped,
            Ok(Some((step, session))) => match self.commit(phone, step.next, session, now_ms).await {
                Ok(()) => {
                    self.responder.reply(conversation_id, step.reply).await;
                    step.outcome
                }
                Err(e) => self.fail(conversation_id, phone, e).await,
            },
            Err(e) => self.fail(conversation_id, phone, e).await,
        }
    }

    async fn step(
        &self,
        phone: &str,
        text: &str,
        now_ms: i64,
    ) -> Result<Option<(Step, Session)>, TicketlineError> {
        let input = text.trim();
        let Some(session) = self.bounded(self.sessions.get(phone)).await? else {
            let (state, reply) = self.start(phone).await?;
            let session = Session::new(phone, state.clone(), input, now_ms);
            return Ok(Some((Step::goto(state, reply), session)));
        };

        debug!(phone, state = %session.state, "continuing session");
        let step = match &session.state {
            ConversationState::AwaitingDepartment => self.on_department(phone, input).await?,
            ConversationState::AwaitingIssueTitle { department } => {
                self.on_issue_title(phone, department, &session.pending_first_message, input)
                    .await?
            }
            ConversationState::AwaitingTicketDecision {
                tickets,
                department,
            } => {
                if tickets.is_empty() {
                    return self.invariant_violation(&session).await;
                }
                self.on_decision(tickets, department.as_ref(), input)
            }
            ConversationState::AwaitingTicketSelection { tickets } => {
                if tickets.is_empty() {
                    return self.invariant_violation(&session).await;
                }
                on_selection(tickets, input)
            }
            ConversationState::AwaitingTicketUpdate { ticket } => {
                self.on_update(ticket, input).await?
            }
        };
        Ok(Some((step, session)))
    }

    /// Entry point for a phone with no session.
    async fn start(&self, phone: &str) -> Result<(ConversationState, String), TicketlineError> {
        let tickets = self
            .bounded(self.resolver.list_open_tickets_for_phone(phone))
            .await?;
        let department = self
            .bounded(self.resolver.department_for_phone(phone))
            .await?;

        if !tickets.is_empty() {
            let reply = prompts::ticket_decision(&tickets);
            return Ok((
                ConversationState::AwaitingTicketDecision {
                    tickets,
                    department,
                },
                reply,
            ));
        }
        Ok(self.department_or_title(department))
    }

    fn department_or_title(&self, department: Option<Department>) -> (ConversationState, String) {
        match department {
            Some(department) => {
                let reply = prompts::issue_title_prompt(&department.name, true);
                (ConversationState::AwaitingIssueTitle { department }, reply)
            }
            None => (
                ConversationState::AwaitingDepartment,
                prompts::department_menu(&self.config.departments),
            ),
        }
    }

    async fn on_department(&self, phone: &str, input: &str) -> Result<Step, TicketlineError> {
        let Some(name) = menu_choice(input, self.config.departments.len())
            .map(|i| self.config.departments[i].as_str())
        else {
            return Ok(Step::stay(prompts::invalid_department(
                &self.config.departments,
            )));
        };

        let department = self
            .bounded(self.resolver.department_by_name(name))
            .await?
            .ok_or_else(|| TicketlineError::NotFound {
                entity: "department",
                id: name.to_string(),
            })?;

        if self.persist {
            self.bounded(self.resolver.bind_phone_to_department(phone, department.id))
                .await?;
        }
        info!(phone, department = %department.name, "department selected");

        let reply = prompts::issue_title_prompt(&department.name, false);
        Ok(Step::goto(
            ConversationState::AwaitingIssueTitle { department },
            reply,
        ))
    }

    async fn on_issue_title(
        &self,
        phone: &str,
        department: &Department,
        description: &str,
        input: &str,
    ) -> Result<Step, TicketlineError> {
        match check_length(
            input,
            self.config.issue_title_min_len,
            self.config.issue_title_max_len,
        ) {
            Length::Fits => {}
            Length::TooShort => {
                return Ok(Step::stay(prompts::issue_title_too_short(
                    self.config.issue_title_min_len,
                )));
            }
            Length::TooLong(len) => {
                return Ok(Step::stay(prompts::issue_title_too_long(
                    self.config.issue_title_max_len,
                    len,
                )));
            }
        }

        if !self.persist {
            info!(phone, "ticket storage disabled; request acknowledged only");
            return Ok(Step::end(prompts::request_received()));
        }

        let sender_id = self
            .bounded(self.resolver.ensure_sender(phone, department.id))
            .await?;
        let ticket_id = self
            .bounded(self.resolver.create_ticket(
                input,
                description,
                sender_id,
                self.config.default_priority,
            ))
            .await?;
        info!(phone, ticket_id, department = %department.name, "ticket created");
        Ok(Step::end(prompts::ticket_created(ticket_id, &department.name)))
    }

    fn on_decision(
        &self,
        tickets: &[Ticket],
        department: Option<&Department>,
        input: &str,
    ) -> Step {
        match parse_decision(input) {
            Some(Decision::ContinueExisting) => match tickets {
                [ticket] => Step::goto(
                    ConversationState::AwaitingTicketUpdate {
                        ticket: ticket.clone(),
                    },
                    prompts::update_prompt(ticket),
                ),
                _ => Step::goto(
                    ConversationState::AwaitingTicketSelection {
                        tickets: tickets.to_vec(),
                    },
                    prompts::ticket_selection(tickets),
                ),
            },
            Some(Decision::CreateNew) => {
                let (state, reply) = self.department_or_title(department.cloned());
                Step::goto(state, reply)
            }
            None => Step::stay(prompts::invalid_decision()),
        }
    }

    async fn on_update(&self, ticket: &Ticket, input: &str) -> Result<Step, TicketlineError> {
        match check_length(input, self.config.update_min_len, self.config.update_max_len) {
            Length::Fits => {}
            Length::TooShort => {
                return Ok(Step::stay(prompts::update_too_short(self.config.update_min_len)));
            }
            Length::TooLong(len) => {
                return Ok(Step::stay(prompts::update_too_long(
                    self.config.update_max_len,
                    len,
                )));
            }
        }

        if !self.persist {
            return Ok(Step::end(prompts::request_received()));
        }

        self.bounded(
            self.resolver
                .append_message(ticket.id, ticket.created_by, input),
        )
        .await?;
        info!(ticket_id = ticket.id, "update appended");
        Ok(Step::end(prompts::update_appended(ticket.id)))
    }

    async fn commit(
        &self,
        phone: &str,
        next: Next,
        session: Session,
        now_ms: i64,
    ) -> Result<(), TicketlineError> {
        match next {
            Next::Stay => {
                let refreshed = Session {
                    last_activity_at: now_ms,
                    ..session
                };
                self.bounded(self.sessions.put(refreshed)).await
            }
            Next::Goto(state) => {
                debug!(phone, state = %state, "session advanced");
                self.bounded(self.sessions.put(session.advance(state, now_ms)))
                    .await
            }
            Next::End => self.bounded(self.sessions.delete(phone)).await,
        }
    }

    async fn fail(&self, conversation_id: &str, phone: &str, err: TicketlineError) -> Outcome {
        error!(phone, error = %err, "intake step failed; clearing session");
        if let Err(e) = self.bounded(self.sessions.delete(phone)).await {
            error!(phone, error = %e, "failed to clear session after error");
        }
        self.responder
            .reply(conversation_id, prompts::apology())
            .await;
        Outcome::Failed
    }

    async fn invariant_violation(
        &self,
        session: &Session,
    ) -> Result<Option<(Step, Session)>, TicketlineError> {
        error!(
            phone = %session.phone_number,
            state = %session.state,
            "session has no candidate tickets; dropping message"
        );
        self.bounded(self.sessions.delete(&session.phone_number))
            .await?;
        Ok(None)
    }

    /// Bound a resolver or store call by the configured timeout.
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, TicketlineError>>,
    ) -> Result<T, TicketlineError> {
        with_timeout(self.config.resolver_timeout(), fut).await
    }
}

async fn with_timeout<T>(
    duration: Duration,
    fut: impl Future<Output = Result<T, TicketlineError>>,
) -> Result<T, TicketlineError> {
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| TicketlineError::Timeout { duration })?
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Length {
    Fits,
    TooShort,
    /// Carries the measured length for the error reply.
    TooLong(usize),
}

/// Bounds are inclusive and counted in chars of already-trimmed input.
fn check_length(input: &str, min: usize, max: usize) -> Length {
    let len = input.chars().count();
    if len < min {
        Length::TooShort
    } else if len > max {
        Length::TooLong(len)
    } else {
        Length::Fits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    ContinueExisting,
    CreateNew,
}

fn parse_decision(input: &str) -> Option<Decision> {
    match input.to_ascii_lowercase().as_str() {
        "1" | "continue_existing" => Some(Decision::ContinueExisting),
        "2" | "create_new" => Some(Decision::CreateNew),
        _ => None,
    }
}

/// Parse a 1-based menu reply into a 0-based index below `len`.
fn menu_choice(input: &str, len: usize) -> Option<usize> {
    match input.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}

fn on_selection(tickets: &[Ticket], input: &str) -> Step {
    match menu_choice(input, tickets.len()) {
        Some(i) => {
            let ticket = tickets[i].clone();
            let reply = prompts::update_prompt(&ticket);
            Step::goto(ConversationState::AwaitingTicketUpdate { ticket }, reply)
        }
        None => Step::stay(prompts::invalid_selection(tickets)),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn decision_accepts_digits_and_legacy_tokens() {
        assert_eq!(parse_decision("1"), Some(Decision::ContinueExisting));
        assert_eq!(
            parse_decision("CONTINUE_EXISTING"),
            Some(Decision::ContinueExisting)
        );
        assert_eq!(parse_decision("2"), Some(Decision::CreateNew));
        assert_eq!(parse_decision("create_new"), Some(Decision::CreateNew));
        assert_eq!(parse_decision("3"), None);
        assert_eq!(parse_decision("yes"), None);
    }

    #[test]
    fn menu_choice_is_one_based_and_bounded() {
        assert_eq!(menu_choice("1", 5), Some(0));
        assert_eq!(menu_choice("5", 5), Some(4));
        assert_eq!(menu_choice("0", 5), None);
        assert_eq!(menu_choice("6", 5), None);
        assert_eq!(menu_choice("-1", 5), None);
        assert_eq!(menu_choice("two", 5), None);
        assert_eq!(menu_choice("", 5), None);
    }

    #[test]
    fn length_bounds_are_inclusive() {
        assert_eq!(check_length("abcd", 5, 100), Length::TooShort);
        assert_eq!(check_length("abcde", 5, 100), Length::Fits);
        assert_eq!(check_length(&"a".repeat(100), 5, 100), Length::Fits);
        assert_eq!(check_length(&"a".repeat(101), 5, 100), Length::TooLong(101));
        assert_eq!(check_length("ñññññ", 5, 5), Length::Fits);
    }

    proptest! {
        #[test]
        fn length_verdict_matches_char_count(s in "\\PC{0,600}", min in 0usize..50, span in 0usize..500) {
            let max = min + span;
            let len = s.chars().count();
            let verdict = check_length(&s, min, max);
            prop_assert_eq!(verdict == Length::Fits, (min..=max).contains(&len));
            prop_assert_eq!(verdict == Length::TooShort, len < min);
        }
    }

    #[tokio::test]
    async fn with_timeout_maps_elapsed_to_timeout_error() {
        let err = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, TicketlineError>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, TicketlineError::Timeout { .. }));
    }
}
