// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff users that tickets are assigned to.

use rusqlite::{OptionalExtension, params};
use ticketline_core::TicketlineError;

use crate::database::Database;
use crate::models::{User, user_from_row};

/// Roles accepted by the `users.role` check constraint.
pub const ROLES: &[&str] = &["admin", "manager", "creator", "worker"];

/// Create a staff user. Returns the new user id.
pub async fn create_user(
    db: &Database,
    name: Option<&str>,
    email: &str,
    role: &str,
) -> Result<i64, TicketlineError> {
    if !ROLES.contains(&role) {
        return Err(TicketlineError::InvalidInput(format!(
            "unknown role `{role}`, expected one of {}",
            ROLES.join(", ")
        )));
    }
    let name = name.map(str::to_string);
    let email = email.trim().to_string();
    let role = role.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (name, email, role) VALUES (?1, ?2, ?3)",
                params![name, email, role],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_user(db: &Database, id: i64) -> Result<Option<User>, TicketlineError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, email, role FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::open_temp;

    #[tokio::test]
    async fn create_and_fetch_user() {
        let (_dir, db) = open_temp().await;
        let id = create_user(&db, Some("Ari"), " ari@example.com ", "admin").await.unwrap();
        let user = get_user(&db, id).await.unwrap().unwrap();
        assert_eq!(user.email, "ari@example.com");
        assert_eq!(user.role, "admin");
    }

    #[tokio::test]
    async fn duplicate_email_and_bad_role_are_rejected() {
        let (_dir, db) = open_temp().await;
        create_user(&db, None, "ops@example.com", "worker").await.unwrap();
        assert!(create_user(&db, None, "ops@example.com", "worker").await.is_err());
        let err = create_user(&db, None, "x@example.com", "intern").await.unwrap_err();
        assert!(matches!(err, TicketlineError::InvalidInput(_)));
    }
}
