// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with injectable inbound messages
//! and captured outbound messages for assertion in tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use ticketline_core::TicketlineError;
use ticketline_core::traits::adapter::PluginAdapter;
use ticketline_core::traits::channel::ChannelAdapter;
use ticketline_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundMessage, MessageId, OutboundMessage,
};

/// A mock chat channel for testing.
///
/// Provides two queues:
/// - **inbound**: Messages injected via `inject_message()` are returned by `receive()`
/// - **sent**: Messages passed to `send()` are captured and retrievable via `sent_messages()`
///
/// After [`close`](Self::close), `receive()` drains what is queued and then
/// reports the channel as closed.
pub struct MockChannel {
    inbound: Arc<Mutex<VecDeque<InboundMessage>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    notify: Arc<Notify>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
    next_id: AtomicU64,
    max_message_length: Option<usize>,
}

impl MockChannel {
    /// Create a new mock channel with empty queues.
    pub fn new() -> Self {
        Self {
            inbound: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            max_message_length: None,
        }
    }

    /// Report a maximum outbound length in [`ChannelCapabilities`].
    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = Some(max);
        self
    }

    /// Inject an inbound message into the receive queue.
    pub async fn inject_message(&self, msg: InboundMessage) {
        self.inbound.lock().await.push_back(msg);
        self.notify.notify_one();
    }

    /// Inject a text message stamped with the current time.
    pub async fn inject_text(&self, conversation_id: &str, message_id: &str, text: &str) {
        let now = chrono::Utc::now().timestamp_millis();
        self.inject_message(InboundMessage::text(conversation_id, message_id, text, now))
            .await;
    }

    /// Mark the transport as gone. Already-queued messages are still delivered.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Make every subsequent `send()` fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts sent to one conversation, in order.
    pub async fn sent_to(&self, conversation_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .map(|m| m.content.clone())
            .collect()
    }

    /// Get the count of sent messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Clear all sent messages.
    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TicketlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TicketlineError> {
        self.close();
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_images: true,
            max_message_length: self.max_message_length,
        }
    }

    async fn connect(&mut self) -> Result<(), TicketlineError> {
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, TicketlineError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TicketlineError::Channel {
                message: "mock send failure".to_string(),
                source: None,
            });
        }
        let id = format!("mock-msg-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().await.push(msg);
        Ok(MessageId(id))
    }

    async fn receive(&self) -> Result<InboundMessage, TicketlineError> {
        loop {
            {
                let mut queue = self.inbound.lock().await;
                if let Some(msg) = queue.pop_front() {
                    return Ok(msg);
                }
                if self.closed.load(Ordering::SeqCst) {
                    return Err(TicketlineError::Channel {
                        message: "mock channel closed".to_string(),
                        source: None,
                    });
                }
            }
            self.notify.notified().await;
        }
    }
}
