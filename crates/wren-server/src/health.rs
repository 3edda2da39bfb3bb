//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"` while intake is active, `"disabled"` otherwise.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Established connections.
    pub connections: usize,
    /// Channels with at least one member.
    pub channels: usize,
}

/// Build a health response from live counters.
pub fn health_check(
    start_time: Instant,
    disabled: bool,
    connections: usize,
    channels: usize,
) -> HealthResponse {
    HealthResponse {
        status: if disabled { "disabled" } else { "ok" }.into(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
        channels,
    }
}
