// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message intake for Ticketline.
//!
//! The [`IntakeLoop`] is the central coordinator that:
//! - Receives messages from a channel adapter
//! - Drops own, duplicate and stale deliveries through the [`DedupFilter`]
//! - Routes text to the [`ConversationEngine`] on one lane per phone number
//! - Archives images through the encrypted media vault
//! - Drains in-flight lanes on shutdown

pub mod dedup;
pub mod machine;
pub mod prompts;
pub mod responder;
pub mod session;
pub mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use ticketline_core::types::{InboundMessage, MessageContent};
use ticketline_core::{ChannelAdapter, MediaIndex, TicketlineError};
use ticketline_vault::MediaVault;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub use dedup::{Admission, DedupFilter, RejectReason};
pub use machine::{ConversationEngine, Outcome};
pub use responder::Responder;
pub use session::{ConversationState, InMemorySessionStore, Session, SessionStore};

/// A lane with nothing queued for this long shuts itself down.
const LANE_IDLE: Duration = Duration::from_secs(60);

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Encrypts inbound images and records where they were written.
pub struct MediaArchiver {
    vault: MediaVault,
    index: Option<Arc<dyn MediaIndex>>,
}

impl MediaArchiver {
    /// `index` is `None` when database storage is disabled; files are still written.
    pub fn new(vault: MediaVault, index: Option<Arc<dyn MediaIndex>>) -> Self {
        Self { vault, index }
    }

    pub async fn archive(
        &self,
        msg: &InboundMessage,
        data: &[u8],
        caption: Option<&str>,
    ) -> Result<PathBuf, TicketlineError> {
        let received_at = msg.timestamp_ms();
        let path = self
            .vault
            .archive(&msg.conversation_id, received_at, data)
            .await?;
        if let Some(index) = &self.index {
            index
                .record_media(
                    &msg.conversation_id,
                    &path.to_string_lossy(),
                    caption,
                    received_at,
                )
                .await?;
        }
        Ok(path)
    }
}

/// Handles admitted messages for a single lane.
struct Worker {
    engine: Arc<ConversationEngine>,
    media: Option<MediaArchiver>,
    log_text: bool,
}

impl Worker {
    async fn process(&self, msg: InboundMessage) {
        let conversation_id = msg.conversation_id.as_str();
        match &msg.content {
            MessageContent::Text(text) => {
                if text.trim().is_empty() {
                    debug!(conversation_id, "empty text dropped");
                    return;
                }
                if self.log_text {
                    info!(conversation_id, text = text.as_str(), "inbound text");
                } else {
                    debug!(conversation_id, chars = text.chars().count(), "inbound text");
                }
                let outcome = self.engine.handle_text(conversation_id, text, now_ms()).await;
                debug!(conversation_id, ?outcome, "text handled");
            }
            MessageContent::Image { data, caption } => match &self.media {
                Some(archiver) => match archiver.archive(&msg, data, caption.as_deref()).await {
                    Ok(path) => info!(conversation_id, path = %path.display(), "image archived"),
                    Err(e) => error!(conversation_id, error = %e, "image archiving failed"),
                },
                None => debug!(conversation_id, "image dropped, archiving disabled"),
            },
            MessageContent::Unsupported(kind) => {
                debug!(conversation_id, kind = kind.as_str(), "unsupported message dropped");
            }
        }
    }
}

type Lanes = DashMap<String, mpsc::UnboundedSender<InboundMessage>>;

/// Pulls messages off a channel and feeds them through intake.
///
/// Messages from one phone number are handled strictly in arrival order on a
/// dedicated lane. Different phone numbers run concurrently.
pub struct IntakeLoop {
    channel: Arc<dyn ChannelAdapter>,
    dedup: DedupFilter,
    worker: Arc<Worker>,
    lanes: Arc<Lanes>,
    tracker: TaskTracker,
    drain_timeout: Duration,
}

impl IntakeLoop {
    pub fn new(
        channel: Arc<dyn ChannelAdapter>,
        engine: Arc<ConversationEngine>,
        dedup: DedupFilter,
        media: Option<MediaArchiver>,
        log_text: bool,
    ) -> Self {
        info!(
            archiving = media.is_some(),
            log_text, "intake loop initialized"
        );
        Self {
            channel,
            dedup,
            worker: Arc::new(Worker {
                engine,
                media,
                log_text,
            }),
            lanes: Arc::new(DashMap::new()),
            tracker: TaskTracker::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// How long shutdown waits for queued messages. Defaults to 30 seconds.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Number of conversation lanes currently alive.
    pub fn active_lanes(&self) -> usize {
        self.lanes.len()
    }

    /// Runs until the channel closes or `cancel` fires, then drains every lane.
    ///
    /// Returns `true` when all queued messages were handled before the drain
    /// timeout.
    pub async fn run(&self, cancel: CancellationToken) -> bool {
        info!("intake loop running");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping intake loop");
                    break;
                }
                msg = self.channel.receive() => match msg {
                    Ok(inbound) => self.admit(inbound),
                    Err(e) if e.is_channel_closed() => {
                        info!("channel closed, stopping intake loop");
                        break;
                    }
                    Err(e) => warn!(error = %e, "channel receive error"),
                },
            }
        }

        let drained = shutdown::drain_lanes(&self.lanes, &self.tracker, self.drain_timeout).await;
        info!("intake loop stopped");
        drained
    }

    fn admit(&self, msg: InboundMessage) {
        match self.dedup.check(&msg, now_ms()) {
            Admission::Admit => self.dispatch(msg),
            Admission::Reject(reason) => debug!(
                conversation_id = msg.conversation_id.as_str(),
                message_id = msg.id.as_str(),
                %reason,
                "message not admitted"
            ),
        }
    }

    fn dispatch(&self, msg: InboundMessage) {
        let key = msg.phone_number().to_string();
        // The entry guard is held across the send so an idle lane cannot
        // retire between lookup and enqueue.
        let mut lane = self
            .lanes
            .entry(key.clone())
            .or_insert_with(|| self.spawn_lane(key.clone()));
        if let Err(mpsc::error::SendError(msg)) = lane.send(msg) {
            warn!(lane = key.as_str(), "conversation lane gone, restarting");
            let fresh = self.spawn_lane(key.clone());
            if fresh.send(msg).is_err() {
                error!(lane = key.as_str(), "new conversation lane rejected message");
            }
            *lane = fresh;
        }
    }

    fn spawn_lane(&self, key: String) -> mpsc::UnboundedSender<InboundMessage> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = Arc::clone(&self.worker);
        let lanes = Arc::clone(&self.lanes);
        debug!(lane = key.as_str(), "conversation lane opened");

        self.tracker.spawn(async move {
            loop {
                match tokio::time::timeout(LANE_IDLE, rx.recv()).await {
                    Ok(Some(msg)) => worker.process(msg).await,
                    Ok(None) => break,
                    Err(_) => {
                        if lanes.remove_if(&key, |_, _| rx.is_empty()).is_some() {
                            break;
                        }
                    }
                }
            }
            debug!(lane = key.as_str(), "conversation lane closed");
        });
        tx
    }
}
