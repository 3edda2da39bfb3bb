//! The router collaborator — the application core behind the gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::request::RequestObject;

/// Close codes for rejected admissions start here; the router's status is
/// added on top (e.g. status 503 closes with 4503).
pub const REJECTION_CLOSE_BASE: u16 = 4000;

/// Opaque application-level identity for a client, issued by the router on
/// admission. Distinct from the transport socket; the gateway stores it and
/// hands it back on `execute` and `remove_connection` without looking inside.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionHandle(pub Value);

/// Admission rejection carrying a status code and a human-readable reason.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("connection rejected ({status}): {message}")]
pub struct AdmissionError {
    /// Router status code (e.g. 503).
    pub status: u16,
    /// Reason string, sent as the close frame reason.
    pub message: String,
}

impl AdmissionError {
    /// Build a rejection.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// WebSocket close code for this rejection: `4000 + status`.
    pub fn close_code(&self) -> u16 {
        REJECTION_CLOSE_BASE.saturating_add(self.status)
    }
}

/// Error returned by `Router::execute`.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The router refused the request.
    #[error("request refused: {message}")]
    Refused {
        /// Reason.
        message: String,
    },
    /// Unexpected router-side failure.
    #[error("router failure: {message}")]
    Internal {
        /// Description.
        message: String,
    },
}

/// The application router consumed by the gateway.
///
/// Admission always resolves exactly once: there is no cancel path and the
/// gateway enforces no timeout; a slow router leaves the connection pending.
#[async_trait]
pub trait Router: Send + Sync {
    /// Admit a new connection for `protocol` under the gateway-minted `id`.
    async fn new_connection(
        &self,
        protocol: &str,
        id: Uuid,
    ) -> Result<ConnectionHandle, AdmissionError>;

    /// Release an application connection handle.
    async fn remove_connection(&self, handle: ConnectionHandle);

    /// Execute a request on behalf of the connection behind `handle`.
    ///
    /// The returned value is the response document; it is expected to echo
    /// the originating request id in a `requestId` field.
    async fn execute(
        &self,
        request: RequestObject,
        handle: &ConnectionHandle,
    ) -> Result<Value, RouterError>;
}
