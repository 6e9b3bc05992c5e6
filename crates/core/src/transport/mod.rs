//! Pairing transport seam
//!
//! The session layer sees a rendezvous channel: open it, advertise the peer
//! identifier it returns, then consume events until it closes. The bundled
//! implementation is a loopback WebSocket listener; anything that can carry
//! text frames to exactly one peer can stand in.

pub mod ws;

pub use ws::WsTransport;

use tokio::sync::mpsc;

use crate::errors::{CompanionError, Result};

/// Outbound half of an attached peer connection
#[derive(Debug, Clone)]
pub struct PeerLink {
    outbound: mpsc::UnboundedSender<String>,
}

impl PeerLink {
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> PeerLink {
        PeerLink { outbound }
    }

    /// Queue a text frame for the peer
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.outbound
            .send(text.into())
            .map_err(|_| CompanionError::Transport("peer connection is gone".to_string()))
    }
}

/// What a transport reports back to the session layer
#[derive(Debug)]
pub enum TransportEvent {
    /// A peer completed the handshake
    PeerConnected { link: PeerLink },
    /// Text frame from the peer, forwarded verbatim
    Data(String),
    /// The peer went away
    PeerClosed,
    /// The channel failed
    Failed(String),
}

/// Rendezvous channel used for pairing
pub trait Transport: Send + Sync {
    /// Scheme tag carried in the pairing ticket's `type` field
    fn scheme(&self) -> &'static str;

    /// Allocate the channel and return the peer identifier to advertise
    ///
    /// Events flow into `events` until the channel closes. Opening an
    /// already-open channel is an error; callers close first.
    fn open(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Result<String>;

    /// Tear down the listener and any live connection; safe to call twice
    fn close(&self);
}
