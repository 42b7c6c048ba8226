// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission filter for inbound messages.
//!
//! Rejects echoes of our own messages, redeliveries of messages already seen,
//! and backlog older than the staleness window. The record of seen messages is
//! bounded: once it passes the high-water mark the oldest entries are evicted
//! down to the low-water mark. A redelivery of an evicted message is admitted
//! again.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use ticketline_config::model::IntakeConfig;
use ticketline_core::types::InboundMessage;

/// Outcome of [`DedupFilter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Reject(RejectReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    FromSelf,
    Duplicate,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MessageKey {
    conversation_id: String,
    message_id: String,
    timestamp_ms: i64,
}

#[derive(Default)]
struct Recent {
    seen: HashSet<MessageKey>,
    order: VecDeque<MessageKey>,
}

/// Bounded, thread-safe record of recently admitted messages.
pub struct DedupFilter {
    recent: Mutex<Recent>,
    staleness_ms: i64,
    high_water: usize,
    low_water: usize,
}

impl DedupFilter {
    pub fn new(staleness: Duration, high_water: usize, low_water: usize) -> Self {
        Self {
            recent: Mutex::new(Recent::default()),
            staleness_ms: i64::try_from(staleness.as_millis()).unwrap_or(i64::MAX),
            high_water,
            low_water: low_water.min(high_water),
        }
    }

    pub fn from_config(config: &IntakeConfig) -> Self {
        Self::new(
            config.staleness_window(),
            config.dedup_high_water,
            config.dedup_low_water,
        )
    }

    /// Decide whether `msg` may be processed, recording it when admitted.
    ///
    /// `now_ms` is the current wall-clock time in Unix milliseconds.
    pub fn check(&self, msg: &InboundMessage, now_ms: i64) -> Admission {
        if msg.from_self {
            return Admission::Reject(RejectReason::FromSelf);
        }

        let timestamp_ms = msg.timestamp_ms();
        if now_ms.saturating_sub(timestamp_ms) > self.staleness_ms {
            return Admission::Reject(RejectReason::Stale);
        }

        let key = MessageKey {
            conversation_id: msg.conversation_id.clone(),
            message_id: msg.id.clone(),
            timestamp_ms,
        };

        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        if !recent.seen.insert(key.clone()) {
            return Admission::Reject(RejectReason::Duplicate);
        }
        recent.order.push_back(key);

        if recent.order.len() > self.high_water {
            while recent.order.len() > self.low_water {
                if let Some(oldest) = recent.order.pop_front() {
                    recent.seen.remove(&oldest);
                }
            }
        }
        Admission::Admit
    }

    /// Number of messages currently remembered.
    pub fn len(&self) -> usize {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOW: i64 = 1_700_000_000_000;

    fn filter() -> DedupFilter {
        DedupFilter::new(Duration::from_secs(300), 1000, 500)
    }

    fn msg(id: &str, ts: i64) -> InboundMessage {
        InboundMessage::text("15550001@s.whatsapp.net", id, "hi", ts)
    }

    #[test]
    fn first_delivery_admitted_redelivery_rejected() {
        let f = filter();
        assert_eq!(f.check(&msg("a", NOW), NOW), Admission::Admit);
        assert_eq!(
            f.check(&msg("a", NOW), NOW),
            Admission::Reject(RejectReason::Duplicate)
        );
    }

    #[test]
    fn same_id_with_other_timestamp_is_distinct() {
        let f = filter();
        assert_eq!(f.check(&msg("a", NOW), NOW), Admission::Admit);
        assert_eq!(f.check(&msg("a", NOW - 1), NOW), Admission::Admit);
    }

    #[test]
    fn seconds_and_millis_timestamps_share_a_key() {
        let f = filter();
        assert_eq!(f.check(&msg("a", NOW / 1000), NOW), Admission::Admit);
        assert_eq!(
            f.check(&msg("a", NOW), NOW),
            Admission::Reject(RejectReason::Duplicate)
        );
    }

    #[test]
    fn own_messages_are_rejected() {
        let f = filter();
        let mut m = msg("a", NOW);
        m.from_self = true;
        assert_eq!(f.check(&m, NOW), Admission::Reject(RejectReason::FromSelf));
        assert!(f.is_empty());
    }

    #[test]
    fn staleness_boundary() {
        let f = filter();
        assert_eq!(f.check(&msg("edge", NOW - 300_000), NOW), Admission::Admit);
        assert_eq!(
            f.check(&msg("old", NOW - 300_001), NOW),
            Admission::Reject(RejectReason::Stale)
        );
    }

    #[test]
    fn record_is_trimmed_to_low_water_oldest_first() {
        let f = filter();
        for i in 0..=1000 {
            assert_eq!(f.check(&msg(&format!("m{i}"), NOW), NOW), Admission::Admit);
        }
        assert_eq!(f.len(), 500);
        // The newest entries survive; the oldest are forgotten.
        assert_eq!(
            f.check(&msg("m1000", NOW), NOW),
            Admission::Reject(RejectReason::Duplicate)
        );
        assert_eq!(f.check(&msg("m0", NOW), NOW), Admission::Admit);
    }

    proptest! {
        #[test]
        fn only_first_of_duplicates_is_admitted(ids in prop::collection::vec(0u8..20, 1..200)) {
            let f = filter();
            let mut seen = HashSet::new();
            for id in ids {
                let admitted = f.check(&msg(&id.to_string(), NOW), NOW) == Admission::Admit;
                prop_assert_eq!(admitted, seen.insert(id));
            }
        }

        #[test]
        fn stale_messages_never_admitted(age_ms in 300_001i64..10_000_000) {
            let f = filter();
            prop_assert_eq!(
                f.check(&msg("x", NOW - age_ms), NOW),
                Admission::Reject(RejectReason::Stale)
            );
        }
    }
}
