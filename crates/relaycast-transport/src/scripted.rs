//! In-memory connector for tests and simulations.
//!
//! Every relay gets a queue of [`ScriptedStep`]s; each `connect` consumes the
//! next step, and the last step repeats once the queue is down to one entry.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relaycast_core::{RelayUrl, SignedEvent};
use tokio::time::Instant;

use crate::adapter::{RelayAck, RelayConnection, RelayConnector, TransportError};

/// Scripted relay behaviour for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedStep {
    /// Answers `OK true`.
    Accept,
    /// Answers `OK false` with the given reason.
    Reject(String),
    /// Accepts the session but never answers.
    Silent,
    /// Refuses the connection with the given reason.
    Refuse(String),
    /// Connection establishment never completes.
    Unreachable,
    /// Session opens but the publish request cannot be written.
    FailSend(String),
    /// Relay drops the session before answering.
    Disconnect,
    /// Waits before performing the inner step's response.
    Delayed(Duration, Box<ScriptedStep>),
    /// Connection establishment takes the given time, then the inner step applies.
    SlowConnect(Duration, Box<ScriptedStep>),
}

impl ScriptedStep {
    pub fn delayed(delay: Duration, step: ScriptedStep) -> Self {
        Self::Delayed(delay, Box::new(step))
    }

    pub fn slow_connect(handshake: Duration, step: ScriptedStep) -> Self {
        Self::SlowConnect(handshake, Box::new(step))
    }

    fn split(&self) -> (Duration, &ScriptedStep) {
        let mut delay = Duration::ZERO;
        let mut step = self;
        while let ScriptedStep::Delayed(extra, inner) = step {
            delay = delay.saturating_add(*extra);
            step = inner;
        }
        (delay, step)
    }
}

#[derive(Debug, Default)]
struct ScriptedInner {
    scripts: Mutex<HashMap<RelayUrl, VecDeque<ScriptedStep>>>,
    connect_attempts: Mutex<HashMap<RelayUrl, usize>>,
    sent: Mutex<HashMap<RelayUrl, Vec<String>>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

/// Connector whose relays follow pre-programmed steps.
///
/// Relays without a script refuse every connection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    inner: Arc<ScriptedInner>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs `relay`; the final step repeats for all later connections.
    pub fn script(&self, relay: &RelayUrl, steps: impl IntoIterator<Item = ScriptedStep>) {
        self.inner
            .scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(relay.clone(), steps.into_iter().collect());
    }

    /// Number of `connect` calls made for `relay`.
    pub fn connect_attempts(&self, relay: &RelayUrl) -> usize {
        self.inner
            .connect_attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(relay)
            .copied()
            .unwrap_or(0)
    }

    /// Event ids successfully written to `relay`, in send order.
    pub fn sent_event_ids(&self, relay: &RelayUrl) -> Vec<String> {
        self.inner
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(relay)
            .cloned()
            .unwrap_or_default()
    }

    /// Sessions handed out so far.
    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far (each counted once).
    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn next_step(&self, relay: &RelayUrl) -> ScriptedStep {
        *self
            .inner
            .connect_attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(relay.clone())
            .or_insert(0) += 1;

        let mut scripts = self.inner.scripts.lock().unwrap_or_else(|e| e.into_inner());
        let Some(queue) = scripts.get_mut(relay) else {
            return ScriptedStep::Refuse("no route to relay".to_string());
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(ScriptedStep::Accept)
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| ScriptedStep::Refuse("empty script".to_string()))
        }
    }
}

#[async_trait]
impl RelayConnector for ScriptedConnector {
    async fn connect(
        &self,
        relay: &RelayUrl,
        _timeout: Duration,
    ) -> Result<Box<dyn RelayConnection>, TransportError> {
        let mut step = self.next_step(relay);
        while let ScriptedStep::SlowConnect(handshake, inner) = step {
            tokio::time::sleep(handshake).await;
            step = *inner;
        }
        let (delay, base) = step.split();
        match base {
            ScriptedStep::Refuse(reason) => {
                tokio::time::sleep(delay).await;
                Err(TransportError::Connect(reason.clone()))
            }
            ScriptedStep::Unreachable => std::future::pending().await,
            _ => {
                self.inner.opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(ScriptedConnection {
                    relay: relay.clone(),
                    step: base.clone(),
                    delay,
                    inner: Arc::clone(&self.inner),
                    closed: false,
                }))
            }
        }
    }
}

struct ScriptedConnection {
    relay: RelayUrl,
    step: ScriptedStep,
    delay: Duration,
    inner: Arc<ScriptedInner>,
    closed: bool,
}

#[async_trait]
impl RelayConnection for ScriptedConnection {
    async fn send_event(&mut self, event: &SignedEvent) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed("session already closed".to_string()));
        }
        if let ScriptedStep::FailSend(reason) = &self.step {
            return Err(TransportError::Send(reason.clone()));
        }
        self.inner
            .sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(self.relay.clone())
            .or_default()
            .push(event.id.clone());
        Ok(())
    }

    async fn await_ack(
        &mut self,
        _event_id: &str,
        deadline: Instant,
    ) -> Result<RelayAck, TransportError> {
        let step = self.step.clone();
        let delay = self.delay;
        let response = async move {
            tokio::time::sleep(delay).await;
            match step {
                ScriptedStep::Accept => Ok(RelayAck::Accepted {
                    message: String::new(),
                }),
                ScriptedStep::Reject(reason) => Ok(RelayAck::Rejected { reason }),
                ScriptedStep::Disconnect => {
                    Err(TransportError::Closed("relay dropped the session".to_string()))
                }
                _ => std::future::pending().await,
            }
        };
        tokio::time::timeout_at(deadline, response)
            .await
            .unwrap_or(Err(TransportError::TimedOut))
    }

    async fn close(&mut self) {
        self.release();
    }
}

impl ScriptedConnection {
    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// A session dropped without `close` (e.g. a cancelled attempt) still counts as closed.
impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.release();
    }
}
