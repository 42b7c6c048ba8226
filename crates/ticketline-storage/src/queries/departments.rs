// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Department catalog lookups.

use rusqlite::{OptionalExtension, params};
use ticketline_core::TicketlineError;

use crate::database::Database;
use crate::models::{Department, department_from_row};

/// All departments in catalog order.
pub async fn list_departments(db: &Database) -> Result<Vec<Department>, TicketlineError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM departments ORDER BY id ASC")?;
            let rows = stmt.query_map([], department_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Case-insensitive lookup by name. Surrounding whitespace is ignored.
pub async fn department_by_name(
    db: &Database,
    name: &str,
) -> Result<Option<Department>, TicketlineError> {
    let name = name.trim().to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name FROM departments WHERE name = ?1 COLLATE NOCASE",
                params![name],
                department_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The department `phone` was most recently bound to, if any.
pub async fn department_for_phone(
    db: &Database,
    phone: &str,
) -> Result<Option<Department>, TicketlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT d.id, d.name
                 FROM senders s
                 JOIN departments d ON d.id = s.department_id
                 WHERE s.phone_number = ?1
                 ORDER BY s.binding_seq DESC, s.id DESC
                 LIMIT 1",
                params![phone],
                department_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::senders;
    use crate::queries::test_support::open_temp;

    #[tokio::test]
    async fn catalog_is_seeded_in_menu_order() {
        let (_dir, db) = open_temp().await;
        let names: Vec<String> = list_departments(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            ["Human Resources", "Finance", "Marketing", "Post Production", "Editing"]
        );
    }

    #[tokio::test]
    async fn lookup_by_name_ignores_case() {
        let (_dir, db) = open_temp().await;
        let dept = department_by_name(&db, "  post PRODUCTION ").await.unwrap().unwrap();
        assert_eq!(dept.name, "Post Production");
        assert!(department_by_name(&db, "Legal").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_phone_has_no_department() {
        let (_dir, db) = open_temp().await;
        assert!(department_for_phone(&db, "15550001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn most_recent_binding_wins() {
        let (_dir, db) = open_temp().await;
        let hr = department_by_name(&db, "Human Resources").await.unwrap().unwrap();
        let finance = department_by_name(&db, "Finance").await.unwrap().unwrap();

        senders::bind_phone_to_department(&db, "15550001", hr.id).await.unwrap();
        senders::bind_phone_to_department(&db, "15550001", finance.id).await.unwrap();
        assert_eq!(
            department_for_phone(&db, "15550001").await.unwrap().unwrap(),
            finance
        );

        // Re-binding to an older department moves it back to the front.
        senders::bind_phone_to_department(&db, "15550001", hr.id).await.unwrap();
        assert_eq!(department_for_phone(&db, "15550001").await.unwrap().unwrap(), hr);
    }
}
