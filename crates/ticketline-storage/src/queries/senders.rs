// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender rows: one per (phone number, department) pair.

use rusqlite::{Connection, params};
use ticketline_core::TicketlineError;

use crate::database::Database;

/// Insert the `(phone, department_id)` row if missing and return its id.
pub(crate) fn ensure_sender_sync(
    conn: &Connection,
    phone: &str,
    department_id: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO senders (phone_number, department_id) VALUES (?1, ?2)
         ON CONFLICT (phone_number, department_id) DO NOTHING",
        params![phone, department_id],
    )?;
    conn.query_row(
        "SELECT id FROM senders WHERE phone_number = ?1 AND department_id = ?2",
        params![phone, department_id],
        |row| row.get(0),
    )
}

/// Idempotently resolve the sender id for `(phone, department_id)`.
pub async fn ensure_sender(
    db: &Database,
    phone: &str,
    department_id: i64,
) -> Result<i64, TicketlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| ensure_sender_sync(conn, &phone, department_id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Make `department_id` the current binding for `phone`.
///
/// The sender row is created if needed and moved ahead of every other
/// binding for the same phone.
pub async fn bind_phone_to_department(
    db: &Database,
    phone: &str,
    department_id: i64,
) -> Result<i64, TicketlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let sender_id = ensure_sender_sync(&tx, &phone, department_id)?;
            tx.execute(
                "UPDATE senders
                 SET binding_seq = (SELECT COALESCE(MAX(binding_seq), 0) + 1 FROM senders),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![sender_id],
            )?;
            tx.commit()?;
            Ok(sender_id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::open_temp;

    #[tokio::test]
    async fn ensure_sender_is_idempotent() {
        let (_dir, db) = open_temp().await;
        let a = ensure_sender(&db, "15550002", 1).await.unwrap();
        let b = ensure_sender(&db, "15550002", 1).await.unwrap();
        assert_eq!(a, b);
        let other = ensure_sender(&db, "15550002", 2).await.unwrap();
        assert_ne!(a, other);
    }

    #[tokio::test]
    async fn bind_returns_existing_sender_row() {
        let (_dir, db) = open_temp().await;
        let id = ensure_sender(&db, "15550003", 3).await.unwrap();
        assert_eq!(bind_phone_to_department(&db, "15550003", 3).await.unwrap(), id);
    }

    #[tokio::test]
    async fn unknown_department_is_rejected() {
        let (_dir, db) = open_temp().await;
        assert!(ensure_sender(&db, "15550004", 999).await.is_err());
    }
}
