//! Wire payloads exchanged with the attached peer

use serde_json::Value;

use crate::model::Snapshot;

/// Ack sent to the peer as soon as it attaches
pub const ACK: &str = r#"{"status":"connected"}"#;

/// Try to read a text frame as the initial snapshot
///
/// Only payloads carrying a `prompts` field count; everything else (acks
/// echoed back, status chatter, malformed JSON) is not a snapshot.
pub fn parse_snapshot(text: &str) -> Option<Snapshot> {
    let value: Value = serde_json::from_str(text).ok()?;
    value.get("prompts")?;
    serde_json::from_value(value).ok()
}
