// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket thread messages. Append-only.

use rusqlite::params;
use ticketline_core::TicketlineError;

use crate::database::Database;
use crate::models::{MESSAGE_SELECT, SenderType, TicketMessage, message_from_row};

/// Append a message to a ticket's thread and touch the ticket's `updated_at`.
///
/// Returns the new message id, or `NotFound` when the ticket does not exist.
pub async fn append_message(
    db: &Database,
    ticket_id: i64,
    sender_id: i64,
    sender_type: SenderType,
    text: &str,
) -> Result<i64, TicketlineError> {
    let text = text.to_string();
    let id = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let touched = tx.execute(
                "UPDATE tickets SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![ticket_id],
            )?;
            if touched == 0 {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO ticket_messages (ticket_id, message, sender_id, sender_type)
                 VALUES (?1, ?2, ?3, ?4)",
                params![ticket_id, text, sender_id, sender_type.as_ref()],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(Some(id))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    id.ok_or_else(|| TicketlineError::NotFound {
        entity: "ticket",
        id: ticket_id.to_string(),
    })
}

/// A ticket's full thread, oldest first.
pub async fn messages_for_ticket(
    db: &Database,
    ticket_id: i64,
) -> Result<Vec<TicketMessage>, TicketlineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT} WHERE m.ticket_id = ?1 ORDER BY m.created_at ASC, m.id ASC"
            ))?;
            let rows = stmt.query_map(params![ticket_id], message_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use crate::queries::test_support::open_temp;
    use crate::queries::{senders, tickets};

    #[tokio::test]
    async fn append_keeps_thread_order() {
        let (_dir, db) = open_temp().await;
        let sender = senders::ensure_sender(&db, "15552000", 1).await.unwrap();
        let id = tickets::create_ticket(&db, "Leave request", "two days", sender, Priority::Low)
            .await
            .unwrap();

        append_message(&db, id, sender, SenderType::User, "any update?").await.unwrap();
        append_message(&db, id, sender, SenderType::Employee, "approved").await.unwrap();

        let thread = messages_for_ticket(&db, id).await.unwrap();
        let texts: Vec<&str> = thread.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, ["Leave request\n\ntwo days", "any update?", "approved"]);
        assert_eq!(thread[2].sender_type, SenderType::Employee);
        assert_eq!(thread[1].sender_phone, "15552000");
        assert_eq!(thread[1].department_name, "Human Resources");
    }

    #[tokio::test]
    async fn append_to_missing_ticket_is_not_found() {
        let (_dir, db) = open_temp().await;
        let sender = senders::ensure_sender(&db, "15552001", 1).await.unwrap();
        let err = append_message(&db, 404, sender, SenderType::User, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, TicketlineError::NotFound { .. }));
    }
}
