//! # wren-core
//!
//! Wire-format types and the router collaborator interface shared between
//! the wren gateway and its hosting system.
//!
//! - `RequestObject`: opaque request envelope handed to the router
//! - `Router`: the application core that admits connections and executes
//!   requests
//! - Control-surface payloads: broadcast / notify / join / leave
//! - `room` stamping for delivered frames

#![deny(unsafe_code)]

pub mod request;
pub mod router;
pub mod types;

pub use request::RequestObject;
pub use router::{AdmissionError, ConnectionHandle, Router, RouterError};
pub use types::{stamp_room, BroadcastData, NotifyData, SubscribeData};
