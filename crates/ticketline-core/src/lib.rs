// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Ticketline.
//!
//! This crate provides the trait definitions, error type, and domain types
//! shared by the storage, intake, and binary crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TicketlineError;
pub use types::{
    AdapterType, Department, HealthStatus, MessageContent, MessageId, Priority, SenderType,
    Ticket, TicketStatus,
};

pub use traits::{ChannelAdapter, MediaIndex, PluginAdapter, StorageAdapter, TicketResolver};
