//! WebSocket transport for relaycast.
//!
//! This crate provides a `RelayConnector` backed by `tokio-tungstenite`: one
//! outbound WebSocket session per publish attempt, speaking NIP-01 frames.

pub mod wire;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use relaycast_core::{RelayUrl, SignedEvent};
use relaycast_transport::{RelayAck, RelayConnection, RelayConnector, TransportError};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::wire::{encode_event_message, parse_relay_message, RelayMessage};

type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct WebSocketConnectorConfig {
    /// Upper bound on the closing handshake before the socket is dropped.
    pub close_timeout: Duration,
}

impl Default for WebSocketConnectorConfig {
    fn default() -> Self {
        Self {
            close_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebSocketConnectorMetrics {
    pub connect_ok: u64,
    pub connect_err: u64,
    pub events_sent: u64,
    pub acks_received: u64,
    pub frames_ignored: u64,
    pub sessions_closed: u64,
}

#[derive(Debug, Default)]
struct WebSocketConnectorMetricsInner {
    connect_ok: AtomicU64,
    connect_err: AtomicU64,
    events_sent: AtomicU64,
    acks_received: AtomicU64,
    frames_ignored: AtomicU64,
    sessions_closed: AtomicU64,
}

/// Opens NIP-01 sessions over `ws://` / `wss://`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    config: WebSocketConnectorConfig,
    metrics: Arc<WebSocketConnectorMetricsInner>,
}

impl WebSocketConnector {
    pub fn new(config: WebSocketConnectorConfig) -> Self {
        Self {
            config,
            metrics: Arc::default(),
        }
    }

    pub fn metrics_snapshot(&self) -> WebSocketConnectorMetrics {
        WebSocketConnectorMetrics {
            connect_ok: self.metrics.connect_ok.load(Ordering::Relaxed),
            connect_err: self.metrics.connect_err.load(Ordering::Relaxed),
            events_sent: self.metrics.events_sent.load(Ordering::Relaxed),
            acks_received: self.metrics.acks_received.load(Ordering::Relaxed),
            frames_ignored: self.metrics.frames_ignored.load(Ordering::Relaxed),
            sessions_closed: self.metrics.sessions_closed.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl RelayConnector for WebSocketConnector {
    async fn connect(
        &self,
        relay: &RelayUrl,
        timeout: Duration,
    ) -> Result<Box<dyn RelayConnection>, TransportError> {
        let stream = match tokio::time::timeout(timeout, connect_async(relay.as_str())).await {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(err)) => {
                self.metrics.connect_err.fetch_add(1, Ordering::Relaxed);
                return Err(TransportError::Connect(err.to_string()));
            }
            Err(_) => {
                self.metrics.connect_err.fetch_add(1, Ordering::Relaxed);
                return Err(TransportError::ConnectTimedOut);
            }
        };
        self.metrics.connect_ok.fetch_add(1, Ordering::Relaxed);
        info!("connected to {relay}");
        Ok(Box::new(WebSocketConnection {
            relay: relay.clone(),
            stream: Some(stream),
            close_timeout: self.config.close_timeout,
            metrics: Arc::clone(&self.metrics),
        }))
    }
}

struct WebSocketConnection {
    relay: RelayUrl,
    stream: Option<RelayStream>,
    close_timeout: Duration,
    metrics: Arc<WebSocketConnectorMetricsInner>,
}

impl WebSocketConnection {
    fn stream_mut(&mut self) -> Result<&mut RelayStream, TransportError> {
        self.stream
            .as_mut()
            .ok_or_else(|| TransportError::Closed("session already closed".to_string()))
    }
}

#[async_trait]
impl RelayConnection for WebSocketConnection {
    async fn send_event(&mut self, event: &SignedEvent) -> Result<(), TransportError> {
        let frame =
            encode_event_message(event).map_err(|err| TransportError::Send(err.to_string()))?;
        self.stream_mut()?
            .send(Message::Text(frame))
            .await
            .map_err(|err| TransportError::Send(err.to_string()))?;
        self.metrics.events_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn await_ack(
        &mut self,
        event_id: &str,
        deadline: Instant,
    ) -> Result<RelayAck, TransportError> {
        let relay = self.relay.clone();
        let metrics = Arc::clone(&self.metrics);
        let stream = self.stream_mut()?;
        loop {
            let frame = match tokio::time::timeout_at(deadline, stream.next()).await {
                Err(_) => return Err(TransportError::TimedOut),
                Ok(None) => return Err(TransportError::Closed("stream ended".to_string())),
                Ok(Some(Err(err))) => return Err(TransportError::Closed(err.to_string())),
                Ok(Some(Ok(frame))) => frame,
            };
            let text = match frame {
                Message::Text(text) => text,
                Message::Close(close) => {
                    let reason = close
                        .map(|c| c.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by relay".to_string());
                    return Err(TransportError::Closed(reason));
                }
                _ => continue,
            };
            match parse_relay_message(&text) {
                Ok(RelayMessage::Ok {
                    event_id: acked,
                    accepted,
                    message,
                }) if acked == event_id => {
                    metrics.acks_received.fetch_add(1, Ordering::Relaxed);
                    return Ok(if accepted {
                        RelayAck::Accepted { message }
                    } else {
                        RelayAck::Rejected { reason: message }
                    });
                }
                Ok(RelayMessage::Notice(notice)) => {
                    metrics.frames_ignored.fetch_add(1, Ordering::Relaxed);
                    info!("notice from {relay}: {notice}");
                }
                Ok(other) => {
                    metrics.frames_ignored.fetch_add(1, Ordering::Relaxed);
                    debug!("ignoring frame from {relay}: {other:?}");
                }
                Err(err) => {
                    metrics.frames_ignored.fetch_add(1, Ordering::Relaxed);
                    debug!("ignoring undecodable frame from {relay}: {err}");
                }
            }
        }
    }

    async fn close(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        // Counted up front: the stream is released even if this handshake is cancelled.
        self.metrics.sessions_closed.fetch_add(1, Ordering::Relaxed);
        if tokio::time::timeout(self.close_timeout, stream.close(None))
            .await
            .is_err()
        {
            debug!("closing handshake with {} timed out", self.relay);
        }
    }
}

impl Drop for WebSocketConnection {
    fn drop(&mut self) {
        // Dropping the stream tears down the socket without a closing handshake.
        if self.stream.take().is_some() {
            self.metrics.sessions_closed.fetch_add(1, Ordering::Relaxed);
            debug!("session with {} dropped without close", self.relay);
        }
    }
}
