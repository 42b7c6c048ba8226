// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities and their row mappers.
//!
//! The canonical types live in `ticketline-core::types` so they can cross the
//! resolver trait boundary. The mappers here assume the column order of the
//! `*_COLUMNS` constants they sit next to.

use std::str::FromStr;

use rusqlite::Row;
use rusqlite::types::Type;

pub use ticketline_core::types::{
    Department, MediaRecord, Priority, SenderType, StatusChange, Ticket, TicketMessage,
    TicketStats, TicketStatus, User,
};

/// Select list and joins shared by every ticket query.
pub(crate) const TICKET_SELECT: &str = "SELECT t.id, t.issue, t.description, t.status, t.priority,
        t.assigned_to, u.name, t.created_by, s.phone_number, d.name, t.created_at, t.updated_at
     FROM tickets t
     JOIN senders s ON s.id = t.created_by
     JOIN departments d ON d.id = s.department_id
     LEFT JOIN users u ON u.id = t.assigned_to";

pub(crate) const MESSAGE_SELECT: &str = "SELECT m.id, m.ticket_id, m.message, m.sender_id,
        m.sender_type, s.phone_number, d.name, m.created_at
     FROM ticket_messages m
     JOIN senders s ON s.id = m.sender_id
     JOIN departments d ON d.id = s.department_id";

/// Parse a TEXT column through `FromStr`, surfacing failures as conversion errors.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        issue: row.get(1)?,
        description: row.get(2)?,
        status: parse_column(row, 3)?,
        priority: parse_column(row, 4)?,
        assigned_to: row.get(5)?,
        assigned_user_name: row.get(6)?,
        created_by: row.get(7)?,
        creator_phone: row.get(8)?,
        creator_department: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<TicketMessage> {
    Ok(TicketMessage {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        message: row.get(2)?,
        sender_id: row.get(3)?,
        sender_type: parse_column(row, 4)?,
        sender_phone: row.get(5)?,
        department_name: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub(crate) fn status_change_from_row(row: &Row<'_>) -> rusqlite::Result<StatusChange> {
    let old: Option<String> = row.get(2)?;
    let old_status = old
        .map(|s| {
            s.parse::<TicketStatus>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
            })
        })
        .transpose()?;
    Ok(StatusChange {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        old_status,
        new_status: parse_column(row, 3)?,
        changed_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(crate) fn department_from_row(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
    })
}

pub(crate) fn media_from_row(row: &Row<'_>) -> rusqlite::Result<MediaRecord> {
    Ok(MediaRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        media_path: row.get(2)?,
        caption: row.get(3)?,
        received_at: row.get(4)?,
    })
}
