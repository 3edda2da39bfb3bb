//! Request envelope handed to the router for execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque request object built from an inbound client frame.
///
/// The gateway never interprets `payload`; it is parsed JSON passed through
/// to the router verbatim, tagged with the transport protocol it arrived on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestObject {
    /// Parsed client frame.
    pub payload: Value,
    /// Transport metadata slot (empty object unless the host fills it).
    pub metadata: Value,
    /// Protocol tag (e.g. `"websocket"`).
    pub protocol: String,
}

impl RequestObject {
    /// Build a request from a payload, metadata, and protocol tag.
    pub fn new(payload: Value, metadata: Value, protocol: impl Into<String>) -> Self {
        Self {
            payload,
            metadata,
            protocol: protocol.into(),
        }
    }
}
