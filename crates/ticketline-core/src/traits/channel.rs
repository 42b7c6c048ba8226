// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for chat transport integrations.

use async_trait::async_trait;

use crate::error::TicketlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelCapabilities, InboundMessage, MessageId, OutboundMessage};

/// Adapter for a bidirectional chat transport.
///
/// Pairing, reconnection and raw protocol handling stay inside the adapter;
/// the intake loop only sees normalized [`InboundMessage`]s.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Establishes a connection to the transport.
    async fn connect(&mut self) -> Result<(), TicketlineError>;

    /// Sends a message through the channel.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, TicketlineError>;

    /// Receives the next inbound message from the channel.
    ///
    /// Returns a [`TicketlineError::Channel`] whose message contains "closed"
    /// once no further messages will arrive.
    async fn receive(&self) -> Result<InboundMessage, TicketlineError>;
}
