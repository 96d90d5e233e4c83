//! In-process message ports for Hop A.
//!
//! [`channel`] yields two connected endpoints. Each endpoint splits into a
//! cloneable [`PortSender`] and a single [`PortReceiver`]. Posting never waits
//! for the other side. Correlated requests park a oneshot in the endpoint's
//! pending table, and the receiver resolves it when a message with a matching
//! `replyTo` arrives. The receiver therefore has to be polled by some task for
//! [`PortSender::request`] to complete.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

use super::message::{Envelope, PluginMessage};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("The other context is no longer listening")]
    Closed,

    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply {
        expected: &'static str,
        got: &'static str,
    },
}

type PendingTable = Arc<Mutex<HashMap<Uuid, oneshot::Sender<Envelope>>>>;

fn lock(pending: &PendingTable) -> MutexGuard<'_, HashMap<Uuid, oneshot::Sender<Envelope>>> {
    // The table holds no invariants a panicking holder could break.
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sending half of an endpoint.
#[derive(Clone)]
pub struct PortSender {
    name: &'static str,
    tx: mpsc::UnboundedSender<Envelope>,
    pending: PendingTable,
}

impl PortSender {
    /// Fire-and-forget. Returns false if the peer has gone away.
    pub fn post(&self, envelope: impl Into<Envelope>) -> bool {
        let envelope = envelope.into();
        let kind = envelope.message.kind();
        match self.tx.send(envelope) {
            Ok(()) => true,
            Err(_) => {
                debug!("[{}] dropped {}: peer closed", self.name, kind);
                false
            }
        }
    }

    /// Answer `request`, echoing its correlation id if it had one.
    pub fn reply(&self, request: &Envelope, message: PluginMessage) -> bool {
        self.post(Envelope::reply(request, message))
    }

    /// Post a correlated request and wait for its reply.
    pub async fn request(
        &self,
        message: PluginMessage,
        timeout: Duration,
    ) -> Result<Envelope, BridgeError> {
        let envelope = Envelope::request(message);
        let Some(id) = envelope.correlation_id else {
            return Err(BridgeError::Closed);
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.pending).insert(id, reply_tx);

        debug!("[{}] request {} ({})", self.name, envelope.message.kind(), id);
        if !self.post(envelope) {
            lock(&self.pending).remove(&id);
            return Err(BridgeError::Closed);
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BridgeError::Closed),
            Err(_) => {
                lock(&self.pending).remove(&id);
                debug!("[{}] request {} timed out", self.name, id);
                Err(BridgeError::Timeout(timeout))
            }
        }
    }
}

/// Receiving half of an endpoint.
pub struct PortReceiver {
    name: &'static str,
    rx: mpsc::UnboundedReceiver<Envelope>,
    pending: PendingTable,
}

impl PortReceiver {
    /// Next message for this context's own loop.
    ///
    /// Replies to pending requests are delivered to their requester and not
    /// returned here. Returns `None` once the peer is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            let envelope = self.rx.recv().await?;

            if let Some(id) = envelope.reply_to {
                let waiter = lock(&self.pending).remove(&id);
                if let Some(waiter) = waiter {
                    debug!("[{}] reply {} for {}", self.name, envelope.message.kind(), id);
                    let _ = waiter.send(envelope);
                    continue;
                }
                debug!("[{}] late or unknown reply {}", self.name, id);
            }

            return Some(envelope);
        }
    }
}

impl Drop for PortReceiver {
    fn drop(&mut self) {
        // Wake any requester still waiting on this endpoint.
        lock(&self.pending).clear();
    }
}

/// One end of a Hop A channel.
pub struct MessagePort {
    sender: PortSender,
    receiver: PortReceiver,
}

impl MessagePort {
    pub fn sender(&self) -> PortSender {
        self.sender.clone()
    }

    pub fn split(self) -> (PortSender, PortReceiver) {
        (self.sender, self.receiver)
    }
}

/// Two connected endpoints: (sandbox side, UI side).
pub fn channel() -> (MessagePort, MessagePort) {
    let (to_ui, from_sandbox) = mpsc::unbounded_channel();
    let (to_sandbox, from_ui) = mpsc::unbounded_channel();

    let sandbox_pending = PendingTable::default();
    let ui_pending = PendingTable::default();

    let sandbox = MessagePort {
        sender: PortSender {
            name: "sandbox",
            tx: to_ui,
            pending: sandbox_pending.clone(),
        },
        receiver: PortReceiver {
            name: "sandbox",
            rx: from_ui,
            pending: sandbox_pending,
        },
    };

    let ui = MessagePort {
        sender: PortSender {
            name: "ui",
            tx: to_sandbox,
            pending: ui_pending.clone(),
        },
        receiver: PortReceiver {
            name: "ui",
            rx: from_sandbox,
            pending: ui_pending,
        },
    };

    (sandbox, ui)
}
