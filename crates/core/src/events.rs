//! Subscriber registry and event fan-out
//!
//! UI shells subscribe once and receive every state change worth rendering.
//! Delivery is fire-and-forget; subscribers that went away are pruned on the
//! next emit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;

use crate::session::{ConnectionStatus, PairingTicket};

/// Subscriber ID type
pub type SubscriberId = u64;

/// Global subscriber ID counter
static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Toast severity, mapped by shells onto their notification styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

/// State changes pushed to shells
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum AppEvent {
    /// The pairing state machine moved
    StatusChanged { status: ConnectionStatus },
    /// A fresh pairing ticket is ready to render as a QR code
    PairingReady { ticket: PairingTicket },
    /// The initial payload landed in the replica
    SnapshotLoaded {
        prompts: usize,
        categories: usize,
        tags: usize,
    },
    /// Replica contents changed; lists need re-rendering
    ReplicaChanged,
    /// Theme or locale preference was persisted
    PrefsChanged { theme: String, locale: String },
    /// One-line user notification
    Toast { level: ToastLevel, message: String },
}

/// Fan-out bus for `AppEvent`
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<HashMap<SubscriberId, Sender<AppEvent>>>>,
}

impl EventBus {
    /// Create a new bus with no subscribers
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a subscriber; the receiver end never blocks the bus
    pub fn subscribe(&self) -> (SubscriberId, Receiver<AppEvent>) {
        let id = NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = unbounded();

        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.insert(id, tx);

        (id, rx)
    }

    /// Remove a subscriber
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.remove(&id);
    }

    /// Get count of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    /// Broadcast an event to all subscribers
    ///
    /// Subscribers whose receiver was dropped are removed here.
    pub fn emit(&self, event: AppEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|_id, sender| sender.try_send(event.clone()).is_ok());
    }

    /// Shorthand for the most common event
    pub fn emit_toast(&self, level: ToastLevel, message: impl Into<String>) {
        self.emit(AppEvent::Toast {
            level,
            message: message.into(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
