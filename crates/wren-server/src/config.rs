//! Gateway configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for the gateway.
///
/// `port` is deliberately optional: a hosting system that omits it gets a
/// gateway in disabled mode rather than a startup abort.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to listen on. `None` forces disabled mode; `Some(0)` auto-assigns.
    pub port: Option<u16>,
    /// Capacity of each connection's outbound send queue.
    pub send_queue_size: usize,
    /// Interval between server-initiated Ping frames, in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this long without a Pong, in seconds.
    pub heartbeat_timeout_secs: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: None,
            send_queue_size: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 1024 * 1024,
        }
    }
}

/// Failure to load a configuration document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration document was provided at all.
    #[error("a configuration document is required")]
    Missing,
    /// The document exists but does not parse as a gateway config.
    #[error("invalid gateway configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

impl GatewayConfig {
    /// Load from a JSON document supplied by the hosting system.
    ///
    /// A `null` document is the fatal missing-configuration case; a document
    /// without a `port` loads fine and yields a disabled gateway.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Err(ConfigError::Missing);
        }
        Ok(serde_json::from_value(value.clone())?)
    }
}
