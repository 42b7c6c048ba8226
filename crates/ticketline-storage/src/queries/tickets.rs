// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket CRUD operations and the status audit trail.

use rusqlite::{OptionalExtension, params};
use ticketline_core::TicketlineError;

use crate::database::Database;
use crate::models::{
    Priority, SenderType, StatusChange, TICKET_SELECT, Ticket, TicketStats, TicketStatus,
    status_change_from_row, ticket_from_row,
};

/// Create a ticket and append its first thread message in one transaction.
///
/// The first message is the issue followed by the description, separated by a
/// blank line, attributed to the creating sender.
pub async fn create_ticket(
    db: &Database,
    issue: &str,
    description: &str,
    sender_id: i64,
    priority: Priority,
) -> Result<i64, TicketlineError> {
    let issue = issue.to_string();
    let description = description.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO tickets (issue, description, status, priority, created_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    issue,
                    description,
                    TicketStatus::Open.as_ref(),
                    priority.as_ref(),
                    sender_id
                ],
            )?;
            let ticket_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO ticket_messages (ticket_id, message, sender_id, sender_type)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    ticket_id,
                    format!("{issue}\n\n{description}"),
                    sender_id,
                    SenderType::User.as_ref()
                ],
            )?;
            tx.execute(
                "INSERT INTO ticket_status_logs (ticket_id, old_status, new_status)
                 VALUES (?1, NULL, ?2)",
                params![ticket_id, TicketStatus::Open.as_ref()],
            )?;
            tx.commit()?;
            Ok(ticket_id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a single ticket with its creator and assignee details.
pub async fn get_ticket(db: &Database, id: i64) -> Result<Option<Ticket>, TicketlineError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{TICKET_SELECT} WHERE t.id = ?1"),
                params![id],
                ticket_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Open and in-progress tickets raised from any sender row of `phone`, newest first.
pub async fn list_open_for_phone(
    db: &Database,
    phone: &str,
) -> Result<Vec<Ticket>, TicketlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{TICKET_SELECT}
                 WHERE s.phone_number = ?1 AND t.status IN ('open', 'in_progress')
                 ORDER BY t.created_at DESC, t.id DESC"
            ))?;
            let rows = stmt.query_map(params![phone], ticket_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Tickets in the given status, or all tickets, newest first.
pub async fn list_tickets(
    db: &Database,
    status: Option<TicketStatus>,
    limit: i64,
) -> Result<Vec<Ticket>, TicketlineError> {
    db.connection()
        .call(move |conn| {
            let mut tickets = Vec::new();
            match status {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "{TICKET_SELECT} WHERE t.status = ?1
                         ORDER BY t.created_at DESC, t.id DESC LIMIT ?2"
                    ))?;
                    for row in stmt.query_map(params![status.as_ref(), limit], ticket_from_row)? {
                        tickets.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "{TICKET_SELECT} ORDER BY t.created_at DESC, t.id DESC LIMIT ?1"
                    ))?;
                    for row in stmt.query_map(params![limit], ticket_from_row)? {
                        tickets.push(row?);
                    }
                }
            }
            Ok(tickets)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move a ticket to `status`, recording the change in the audit trail.
///
/// Setting the current status again is a no-op and writes no log row.
/// Returns the previous status.
pub async fn update_status(
    db: &Database,
    ticket_id: i64,
    status: TicketStatus,
    changed_by: Option<i64>,
) -> Result<TicketStatus, TicketlineError> {
    let previous = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: Option<String> = tx
                .query_row(
                    "SELECT status FROM tickets WHERE id = ?1",
                    params![ticket_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };
            if current != status.as_ref() {
                tx.execute(
                    "UPDATE tickets SET status = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![status.as_ref(), ticket_id],
                )?;
                tx.execute(
                    "INSERT INTO ticket_status_logs (ticket_id, old_status, new_status, changed_by)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![ticket_id, current, status.as_ref(), changed_by],
                )?;
            }
            tx.commit()?;
            Ok(Some(current))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    let previous = previous.ok_or_else(|| TicketlineError::NotFound {
        entity: "ticket",
        id: ticket_id.to_string(),
    })?;
    previous
        .parse::<TicketStatus>()
        .map_err(|e| TicketlineError::Internal(format!("corrupt ticket status `{previous}`: {e}")))
}

/// Assign a ticket to a staff user.
pub async fn assign(db: &Database, ticket_id: i64, user_id: i64) -> Result<(), TicketlineError> {
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tickets SET assigned_to = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![user_id, ticket_id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(TicketlineError::NotFound {
            entity: "ticket",
            id: ticket_id.to_string(),
        });
    }
    Ok(())
}

/// Per-status ticket counts across every sender row of `phone`.
pub async fn stats_for_phone(db: &Database, phone: &str) -> Result<TicketStats, TicketlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(t.status = 'open'), 0),
                        COALESCE(SUM(t.status = 'in_progress'), 0),
                        COALESCE(SUM(t.status = 'resolved'), 0),
                        COALESCE(SUM(t.status = 'closed'), 0)
                 FROM tickets t
                 JOIN senders s ON s.id = t.created_by
                 WHERE s.phone_number = ?1",
                params![phone],
                |row| {
                    Ok(TicketStats {
                        total: row.get(0)?,
                        open: row.get(1)?,
                        in_progress: row.get(2)?,
                        resolved: row.get(3)?,
                        closed: row.get(4)?,
                    })
                },
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The status audit trail of a ticket, oldest first.
pub async fn status_history(
    db: &Database,
    ticket_id: i64,
) -> Result<Vec<StatusChange>, TicketlineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, ticket_id, old_status, new_status, changed_by, created_at
                 FROM ticket_status_logs WHERE ticket_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![ticket_id], status_change_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
