//! Connection lifecycle, channel membership, dispatch, and fan-out delivery.

pub mod channels;
pub mod connection;
pub mod gateway;
pub mod session;
