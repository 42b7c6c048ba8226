// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stdio bridge channel.
//!
//! The chat transport (pairing, reconnects, media download) runs as a separate
//! process. It writes one JSON event per line to our stdin and reads one JSON
//! reply per line from our stdout:
//!
//! ```text
//! in:  {"conversation_id":"5511999990000@s.whatsapp.net","message_id":"ABC","text":"hi","server_timestamp":1700000000,"from_self":false}
//! in:  {"conversation_id":"...","message_id":"...","server_timestamp":1700000000,"image":{"data":"<base64>","caption":"receipt"}}
//! out: {"conversation_id":"5511999990000@s.whatsapp.net","text":"..."}
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use ticketline_core::traits::{ChannelAdapter, PluginAdapter};
use ticketline_core::types::{
    AdapterType, ChannelCapabilities, HealthStatus, InboundMessage, MessageContent, MessageId,
    OutboundMessage,
};
use ticketline_core::TicketlineError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

const MAX_MESSAGE_LENGTH: usize = 4096;

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Deserialize)]
struct BridgeEvent {
    conversation_id: String,
    message_id: String,
    #[serde(default)]
    text: Option<String>,
    server_timestamp: i64,
    #[serde(default)]
    from_self: bool,
    #[serde(default)]
    image: Option<BridgeImage>,
    /// Transport type name for anything that is neither text nor image.
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BridgeImage {
    data: String,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Serialize)]
struct BridgeReply<'a> {
    conversation_id: &'a str,
    text: &'a str,
}

/// Parse one input line. Blank lines yield `None`.
fn parse_event(line: &str) -> Result<Option<InboundMessage>, TicketlineError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let event: BridgeEvent = serde_json::from_str(line).map_err(|e| TicketlineError::Channel {
        message: format!("malformed bridge event: {e}"),
        source: Some(Box::new(e)),
    })?;

    let content = match (event.image, event.text) {
        (Some(image), _) => {
            let data = base64::engine::general_purpose::STANDARD
                .decode(image.data.as_bytes())
                .map_err(|e| TicketlineError::Channel {
                    message: format!("image data is not valid base64: {e}"),
                    source: Some(Box::new(e)),
                })?;
            MessageContent::Image {
                data,
                caption: image.caption,
            }
        }
        (None, Some(text)) => MessageContent::Text(text),
        (None, None) => {
            MessageContent::Unsupported(event.kind.unwrap_or_else(|| "unknown".to_string()))
        }
    };

    Ok(Some(InboundMessage {
        id: event.message_id,
        conversation_id: event.conversation_id,
        content,
        server_timestamp: event.server_timestamp,
        from_self: event.from_self,
    }))
}

/// Channel adapter speaking JSON lines over a reader/writer pair.
pub struct BridgeChannel {
    reader: StdMutex<Option<Reader>>,
    writer: Mutex<Writer>,
    inbound_tx: Option<mpsc::Sender<InboundMessage>>,
    inbound_rx: Mutex<mpsc::Receiver<InboundMessage>>,
    reader_handle: Option<tokio::task::JoinHandle<()>>,
    sent: AtomicU64,
}

impl BridgeChannel {
    pub fn new(
        reader: impl AsyncBufRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(100);
        Self {
            reader: StdMutex::new(Some(Box::new(reader))),
            writer: Mutex::new(Box::new(writer)),
            inbound_tx: Some(inbound_tx),
            inbound_rx: Mutex::new(inbound_rx),
            reader_handle: None,
            sent: AtomicU64::new(0),
        }
    }

    /// A bridge over this process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

async fn read_events(mut reader: Reader, tx: mpsc::Sender<InboundMessage>) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!("bridge input closed");
                break;
            }
            Ok(_) => match parse_event(&line) {
                Ok(Some(msg)) => {
                    if tx.send(msg).await.is_err() {
                        warn!("inbound channel closed, dropping bridge event");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping bridge event"),
            },
            Err(e) => {
                warn!(error = %e, "bridge read failed");
                break;
            }
        }
    }
}

#[async_trait]
impl PluginAdapter for BridgeChannel {
    fn name(&self) -> &str {
        "stdio-bridge"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TicketlineError> {
        match &self.reader_handle {
            Some(handle) if handle.is_finished() => {
                Ok(HealthStatus::Degraded("bridge input closed".to_string()))
            }
            Some(_) => Ok(HealthStatus::Healthy),
            None => Ok(HealthStatus::Unhealthy("not connected".to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), TicketlineError> {
        if let Some(handle) = &self.reader_handle {
            handle.abort();
        }
        self.writer
            .lock()
            .await
            .flush()
            .await
            .map_err(|e| TicketlineError::Channel {
                message: "bridge flush failed".to_string(),
                source: Some(Box::new(e)),
            })
    }
}

#[async_trait]
impl ChannelAdapter for BridgeChannel {
    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_images: true,
            max_message_length: Some(MAX_MESSAGE_LENGTH),
        }
    }

    async fn connect(&mut self) -> Result<(), TicketlineError> {
        // The sender moves into the reader task so the inbound queue closes
        // when input ends.
        let reader = self
            .reader
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let (Some(reader), Some(tx)) = (reader, self.inbound_tx.take()) else {
            return Ok(());
        };
        info!("bridge channel reading events");
        self.reader_handle = Some(tokio::spawn(read_events(reader, tx)));
        Ok(())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, TicketlineError> {
        let mut line = serde_json::to_string(&BridgeReply {
            conversation_id: &msg.conversation_id,
            text: &msg.content,
        })
        .map_err(|e| TicketlineError::Internal(format!("cannot encode reply: {e}")))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TicketlineError::Channel {
                message: "bridge write failed".to_string(),
                source: Some(Box::new(e)),
            })?;
        writer.flush().await.map_err(|e| TicketlineError::Channel {
            message: "bridge flush failed".to_string(),
            source: Some(Box::new(e)),
        })?;

        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(conversation_id = msg.conversation_id.as_str(), n, "reply written");
        Ok(MessageId(format!("bridge-{n}")))
    }

    async fn receive(&self) -> Result<InboundMessage, TicketlineError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| TicketlineError::Channel {
            message: "bridge inbound channel closed".into(),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_event() {
        let msg = parse_event(
            r#"{"conversation_id":"5511999990000@s.whatsapp.net","message_id":"A1","text":"hi","server_timestamp":1700000000}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(msg.id, "A1");
        assert_eq!(msg.phone_number(), "5511999990000");
        assert_eq!(msg.content, MessageContent::Text("hi".to_string()));
        assert_eq!(msg.timestamp_ms(), 1_700_000_000_000);
        assert!(!msg.from_self);
    }

    #[test]
    fn parses_image_event() {
        let msg = parse_event(
            r#"{"conversation_id":"1@s.whatsapp.net","message_id":"I1","server_timestamp":1,"image":{"data":"aGVsbG8=","caption":"receipt"}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            msg.content,
            MessageContent::Image {
                data: b"hello".to_vec(),
                caption: Some("receipt".to_string()),
            }
        );
    }

    #[test]
    fn event_without_text_or_image_is_unsupported() {
        let msg = parse_event(
            r#"{"conversation_id":"1@s.whatsapp.net","message_id":"S1","server_timestamp":1,"kind":"sticker"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(msg.content, MessageContent::Unsupported("sticker".to_string()));
    }

    #[test]
    fn blank_lines_are_skipped_and_garbage_rejected() {
        assert!(parse_event("   \n").unwrap().is_none());
        assert!(parse_event("{not json").is_err());
        assert!(
            parse_event(
                r#"{"conversation_id":"1","message_id":"x","server_timestamp":1,"image":{"data":"***"}}"#
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn round_trip_over_pipes() {
        let (mut input, input_rx) = tokio::io::duplex(4096);
        let (output_tx, output) = tokio::io::duplex(4096);
        let mut channel = BridgeChannel::new(BufReader::new(input_rx), output_tx);
        channel.connect().await.unwrap();

        input
            .write_all(
                b"{\"conversation_id\":\"9@s.whatsapp.net\",\"message_id\":\"m\",\"text\":\"hello\",\"server_timestamp\":5}\n\
                  garbage\n",
            )
            .await
            .unwrap();
        drop(input);

        let msg = channel.receive().await.unwrap();
        assert_eq!(msg.id, "m");
        let closed = channel.receive().await.unwrap_err();
        assert!(closed.is_channel_closed());

        let id = channel
            .send(OutboundMessage {
                conversation_id: "9@s.whatsapp.net".to_string(),
                content: "reply \"quoted\"".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(id.0, "bridge-1");

        let mut lines = BufReader::new(output).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["conversation_id"], "9@s.whatsapp.net");
        assert_eq!(value["text"], "reply \"quoted\"");
    }

    #[test]
    fn bridge_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BridgeChannel>();
        let _: std::sync::Arc<dyn ChannelAdapter> = std::sync::Arc::new(BridgeChannel::new(
            BufReader::new(tokio::io::empty()),
            tokio::io::sink(),
        ));
    }

    #[tokio::test]
    async fn health_reflects_connection() {
        let (_input, input_rx) = tokio::io::duplex(64);
        let mut channel = BridgeChannel::new(BufReader::new(input_rx), tokio::io::sink());
        assert!(matches!(
            channel.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
        channel.connect().await.unwrap();
        assert_eq!(channel.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
