//! Control-surface payloads and the `room` stamping rule.
//!
//! Every frame the gateway delivers carries a `room` field: the originating
//! request id for point-to-point replies, or the channel name for fan-out
//! and notify deliveries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Payload for a channel fan-out publish.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BroadcastData {
    /// Channels to deliver to.
    pub channels: Vec<String>,
    /// Message body; `room` is stamped per channel at delivery time.
    pub payload: Value,
}

/// Payload for a point-to-point publish.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotifyData {
    /// Target connection.
    pub id: Uuid,
    /// Channels to stamp the payload with, one delivery each.
    pub channels: Vec<String>,
    /// Message body.
    pub payload: Value,
}

/// Payload for channel membership changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscribeData {
    /// Target connection.
    pub id: Uuid,
    /// Channel name.
    pub channel: String,
}

/// Return a copy of `payload` with its `room` field set.
///
/// Non-object payloads are returned unchanged; there is nowhere to put the
/// field and the frame is still deliverable as-is.
pub fn stamp_room(payload: &Value, room: &str) -> Value {
    let mut out = payload.clone();
    if let Some(obj) = out.as_object_mut() {
        let _ = obj.insert("room".into(), Value::String(room.into()));
    }
    out
}
