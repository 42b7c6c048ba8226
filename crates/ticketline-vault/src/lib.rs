// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted media archive for Ticketline.
//!
//! Inbound images are sealed with AES-256-GCM under a key derived from the
//! configured passphrase and written to disk. Only the holder of the
//! passphrase can recover them.

pub mod crypto;
pub mod media;

pub use crypto::MediaKey;
pub use media::{MediaVault, sanitize_conversation_id};
