// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ticketline integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without a live chat transport.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock chat channel with message injection and capture
//! - [`FailingResolver`] - Resolver that errors or hangs on every call or on one operation
//! - [`TestHarness`] - Conversation engine over a temp SQLite database

pub mod failing_resolver;
pub mod harness;
pub mod mock_channel;

pub use failing_resolver::{FailingResolver, FailureMode, ResolverOp};
pub use harness::{Exchange, TestHarness, TestHarnessBuilder};
pub use mock_channel::MockChannel;
