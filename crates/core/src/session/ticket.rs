//! Out-of-band pairing ticket
//!
//! The shell renders the encoded ticket as a QR code; the phone scans it and
//! dials the peer identifier with the scheme named in `type`.

use chrono::Utc;
use serde::Serialize;

use crate::errors::Result;

/// Pairing ticket advertised to the scanning app
#[derive(Debug, Clone, Serialize)]
pub struct PairingTicket {
    /// Rendezvous scheme the peer identifier belongs to
    #[serde(rename = "type")]
    pub scheme: String,
    #[serde(rename = "peerId")]
    pub peer_id: String,
    /// Issue time, epoch milliseconds
    pub timestamp: i64,
}

impl PairingTicket {
    pub fn new(scheme: &str, peer_id: impl Into<String>) -> PairingTicket {
        PairingTicket {
            scheme: scheme.to_string(),
            peer_id: peer_id.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// JSON form of the ticket, the exact string to encode as a QR code
    ///
    /// Shells without QR capability fall back to showing `peer_id` as text.
    pub fn encoded(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
