// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Index of archived media files.

use async_trait::async_trait;

use crate::error::TicketlineError;

#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Record that an encrypted file for `conversation_id` was written to `media_path`.
    async fn record_media(
        &self,
        conversation_id: &str,
        media_path: &str,
        caption: Option<&str>,
        received_at: i64,
    ) -> Result<i64, TicketlineError>;
}
