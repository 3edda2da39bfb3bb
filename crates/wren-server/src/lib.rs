//! # wren-server
//!
//! Axum WebSocket gateway multiplexing long-lived client connections into a
//! request/response and publish/subscribe facility.
//!
//! - HTTP endpoints: health check, WebSocket upgrade
//! - Connection lifecycle: router-gated admission, symmetric teardown
//! - Channel registry: reference-counted membership with fan-out broadcast
//! - Dispatch: inbound frames to the router, `room`-stamped responses back
//! - Heartbeat liveness and graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod websocket;
