// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Ticketline crates.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Unique identifier for a message delivered by a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Storage,
}

// --- Channel types ---

/// Timestamps below this value are taken to be in seconds rather than milliseconds.
const SECONDS_CUTOFF: i64 = 100_000_000_000;

/// Normalizes a transport timestamp to milliseconds since the epoch.
///
/// Transports disagree on the unit; anything below 10^11 is treated as seconds.
pub fn normalize_timestamp_ms(ts: i64) -> i64 {
    if ts.abs() < SECONDS_CUTOFF {
        ts.saturating_mul(1000)
    } else {
        ts
    }
}

/// Derives the phone number from a transport conversation id.
///
/// `5511999990000:12@s.whatsapp.net` becomes `5511999990000`.
pub fn phone_from_conversation_id(conversation_id: &str) -> &str {
    let user = conversation_id
        .split_once('@')
        .map_or(conversation_id, |(user, _)| user);
    user.split_once(':').map_or(user, |(phone, _)| phone)
}

/// Content carried by an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Plain or extended text. May be empty.
    Text(String),
    /// An image, already downloaded by the transport.
    Image {
        data: Vec<u8>,
        caption: Option<String>,
    },
    /// Any other content type (stickers, reactions, locations...).
    Unsupported(String),
}

/// An inbound message received from a channel adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Transport message id.
    pub id: String,
    /// Opaque user identity assigned by the transport.
    pub conversation_id: String,
    pub content: MessageContent,
    /// Server timestamp in seconds or milliseconds.
    pub server_timestamp: i64,
    /// Whether the message was sent by this system's own account.
    pub from_self: bool,
}

impl InboundMessage {
    /// Convenience constructor for a text message.
    pub fn text(
        conversation_id: impl Into<String>,
        id: impl Into<String>,
        text: impl Into<String>,
        server_timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            content: MessageContent::Text(text.into()),
            server_timestamp,
            from_self: false,
        }
    }

    /// Phone number derived from the conversation id.
    pub fn phone_number(&self) -> &str {
        phone_from_conversation_id(&self.conversation_id)
    }

    /// Server timestamp normalized to milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        normalize_timestamp_ms(self.server_timestamp)
    }
}

/// An outbound message to be sent via a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub conversation_id: String,
    pub content: String,
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone)]
pub struct ChannelCapabilities {
    pub supports_images: bool,
    pub max_message_length: Option<usize>,
}

// --- Ticket domain types ---

/// A department from the fixed catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

/// Lifecycle status of a ticket.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Statuses a user can still add messages to.
    pub fn is_active(self) -> bool {
        matches!(self, TicketStatus::Open | TicketStatus::InProgress)
    }
}

/// Ticket priority.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Who authored a ticket message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    User,
    Employee,
    System,
}

/// A support ticket joined with its creator's phone and department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub issue: String,
    pub description: Option<String>,
    pub status: TicketStatus,
    pub priority: Priority,
    pub assigned_to: Option<i64>,
    pub assigned_user_name: Option<String>,
    /// Sender row that opened the ticket.
    pub created_by: i64,
    pub creator_phone: String,
    pub creator_department: String,
    pub created_at: String,
    pub updated_at: String,
}

/// An entry in a ticket's conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub id: i64,
    pub ticket_id: i64,
    pub message: String,
    pub sender_id: i64,
    pub sender_type: SenderType,
    pub sender_phone: String,
    pub department_name: String,
    pub created_at: String,
}

/// One row of a ticket's status audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: i64,
    pub ticket_id: i64,
    pub old_status: Option<TicketStatus>,
    pub new_status: TicketStatus,
    pub changed_by: Option<i64>,
    pub created_at: String,
}

/// Ticket counts for one phone number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStats {
    pub total: i64,
    pub open: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub closed: i64,
}

/// A staff member tickets can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub role: String,
}

/// An encrypted media file received from a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: i64,
    pub conversation_id: String,
    pub media_path: String,
    pub caption: Option<String>,
    pub received_at: i64,
}
