// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Index of encrypted media files written to disk.

use rusqlite::params;
use ticketline_core::TicketlineError;

use crate::database::Database;
use crate::models::{MediaRecord, media_from_row};

/// Record an archived media file. Returns the row id.
pub async fn record_media(
    db: &Database,
    conversation_id: &str,
    media_path: &str,
    caption: Option<&str>,
    received_at: i64,
) -> Result<i64, TicketlineError> {
    let conversation_id = conversation_id.to_string();
    let media_path = media_path.to_string();
    let caption = caption.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO media_archive (conversation_id, media_path, caption, received_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![conversation_id, media_path, caption, received_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Archived media for a conversation, oldest first.
pub async fn media_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<MediaRecord>, TicketlineError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, media_path, caption, received_at
                 FROM media_archive WHERE conversation_id = ?1 ORDER BY received_at ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], media_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::open_temp;

    #[tokio::test]
    async fn records_are_listed_per_conversation() {
        let (_dir, db) = open_temp().await;
        record_media(&db, "155@s.whatsapp.net", "m/a.enc", Some("receipt"), 2_000)
            .await
            .unwrap();
        record_media(&db, "155@s.whatsapp.net", "m/b.enc", None, 1_000).await.unwrap();
        record_media(&db, "999@s.whatsapp.net", "m/c.enc", None, 1_500).await.unwrap();

        let records = media_for_conversation(&db, "155@s.whatsapp.net").await.unwrap();
        let paths: Vec<&str> = records.iter().map(|r| r.media_path.as_str()).collect();
        assert_eq!(paths, ["m/b.enc", "m/a.enc"]);
        assert_eq!(records[1].caption.as_deref(), Some("receipt"));
    }
}
