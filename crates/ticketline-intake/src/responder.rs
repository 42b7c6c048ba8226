// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sends reply texts back through the channel.
//!
//! Send failures are logged and swallowed. By the time a reply goes out, any
//! ticket write it reports on is already committed.

use std::sync::Arc;

use ticketline_core::ChannelAdapter;
use ticketline_core::types::OutboundMessage;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Responder {
    channel: Arc<dyn ChannelAdapter>,
}

impl Responder {
    pub fn new(channel: Arc<dyn ChannelAdapter>) -> Self {
        Self { channel }
    }

    /// Send `text` to `conversation_id`. Returns whether the channel accepted it.
    pub async fn reply(&self, conversation_id: &str, text: String) -> bool {
        let content = match self.channel.capabilities().max_message_length {
            Some(max) => truncate_chars(text, max),
            None => text,
        };
        let out = OutboundMessage {
            conversation_id: conversation_id.to_string(),
            content,
        };
        match self.channel.send(out).await {
            Ok(id) => {
                debug!(conversation_id, message_id = %id.0, "reply sent");
                true
            }
            Err(e) => {
                warn!(conversation_id, error = %e, "failed to send reply");
                false
            }
        }
    }
}

fn truncate_chars(mut text: String, max: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max) {
        text.truncate(idx);
    }
    text
}
