//! The gateway aggregate — both registries behind one tagged state.
//!
//! `Active` holds the real registries; `Disabled` holds nothing and is
//! selected at construction (missing port, explicit flag) or on a fatal
//! listener fault. Callers dispatch on the tag instead of re-checking a
//! boolean in every method.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use wren_core::{
    stamp_room, AdmissionError, BroadcastData, ConnectionHandle, NotifyData, RequestObject,
    Router, SubscribeData,
};

use super::channels::ChannelRegistry;
use super::connection::ClientConnection;

/// Protocol tag handed to the router on admission and with every request.
pub const PROTOCOL: &str = "websocket";

/// One established connection: socket send path, router handle, and the
/// channels it has joined, in join order.
struct ConnectionEntry {
    conn: Arc<ClientConnection>,
    handle: ConnectionHandle,
    channels: Vec<String>,
}

/// The two linked registries. Two views of one bipartite membership
/// relation: every channel in an entry's `channels` list has that
/// connection as a member, and vice versa.
#[derive(Default)]
struct Registries {
    connections: HashMap<Uuid, ConnectionEntry>,
    channels: ChannelRegistry,
}

enum GatewayState {
    Active(Registries),
    Disabled,
}

/// Connection-lifecycle and channel-membership engine.
pub struct Gateway {
    state: RwLock<GatewayState>,
    router: Arc<dyn Router>,
}

impl Gateway {
    /// Create a gateway, disabled from the start when `disabled` is set.
    pub fn new(router: Arc<dyn Router>, disabled: bool) -> Self {
        let state = if disabled {
            GatewayState::Disabled
        } else {
            GatewayState::Active(Registries::default())
        };
        Self {
            state: RwLock::new(state),
            router,
        }
    }

    /// Whether the gateway is in disabled mode.
    pub async fn is_disabled(&self) -> bool {
        matches!(*self.state.read().await, GatewayState::Disabled)
    }

    /// Established connection count.
    pub async fn connection_count(&self) -> usize {
        match *self.state.read().await {
            GatewayState::Active(ref regs) => regs.connections.len(),
            GatewayState::Disabled => 0,
        }
    }

    /// Live channel count.
    pub async fn channel_count(&self) -> usize {
        match *self.state.read().await {
            GatewayState::Active(ref regs) => regs.channels.len(),
            GatewayState::Disabled => 0,
        }
    }

    /// Member count of a channel (0 for unknown channels).
    pub async fn channel_member_count(&self, channel: &str) -> usize {
        match *self.state.read().await {
            GatewayState::Active(ref regs) => regs.channels.member_count(channel),
            GatewayState::Disabled => 0,
        }
    }

    /// Channels a connection has joined, in join order.
    pub async fn joined_channels(&self, id: Uuid) -> Option<Vec<String>> {
        match *self.state.read().await {
            GatewayState::Active(ref regs) => {
                regs.connections.get(&id).map(|e| e.channels.clone())
            }
            GatewayState::Disabled => None,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Request admission from the router for a freshly accepted socket.
    ///
    /// The one suspension point of the subsystem: between this call and its
    /// resolution the connection is pending: no registry entry exists and
    /// no socket events are handled. Admission resolves exactly once; there
    /// is no cancel path and no timeout.
    pub(crate) async fn admit(&self, id: Uuid) -> Result<ConnectionHandle, AdmissionError> {
        if self.is_disabled().await {
            return Err(AdmissionError::new(503, "gateway is disabled"));
        }
        self.router.new_connection(PROTOCOL, id).await
    }

    /// Materialize the registry entry for an admitted connection.
    ///
    /// Returns the connection state to drive the session loop with, or
    /// `None` when the gateway went disabled while admission was in flight,
    /// in which case the router handle is released and no entry is created.
    pub(crate) async fn establish(
        &self,
        id: Uuid,
        handle: ConnectionHandle,
        tx: mpsc::Sender<Arc<String>>,
    ) -> Option<Arc<ClientConnection>> {
        let conn = Arc::new(ClientConnection::new(id, tx));
        {
            let mut state = self.state.write().await;
            if let GatewayState::Active(ref mut regs) = *state {
                let _ = regs.connections.insert(
                    id,
                    ConnectionEntry {
                        conn: conn.clone(),
                        handle,
                        channels: Vec::new(),
                    },
                );
                info!(%id, "connection established");
                return Some(conn);
            }
        }
        // Disabled during the pending window: leave no trace.
        warn!(%id, "gateway disabled during admission, dropping connection");
        self.router.remove_connection(handle).await;
        None
    }

    /// Tear down a connection. Idempotent: unknown ids are a no-op.
    ///
    /// Unwinds both registries symmetrically (every joined channel sees the
    /// same decrement-or-delete as an explicit leave), then releases the
    /// router handle.
    pub(crate) async fn disconnect(&self, id: Uuid) {
        let entry = {
            let mut state = self.state.write().await;
            match *state {
                GatewayState::Active(ref mut regs) => {
                    let Some(entry) = regs.connections.remove(&id) else {
                        return;
                    };
                    for channel in &entry.channels {
                        let _ = regs.channels.leave(channel, id);
                    }
                    entry
                }
                GatewayState::Disabled => return,
            }
        };
        info!(%id, channels = entry.channels.len(), "connection closed");
        self.router.remove_connection(entry.handle).await;
    }

    /// Fatal listener fault: disable intake and all public mutators.
    ///
    /// Established sockets are not closed, but the registries are torn down
    /// and every router handle released: fail closed for intake, fail open
    /// for existing links.
    pub(crate) async fn fault(&self, err: &(dyn std::error::Error + Sync + 'static)) {
        error!(error = %err, "listener fault, disabling gateway");
        let previous = {
            let mut state = self.state.write().await;
            mem::replace(&mut *state, GatewayState::Disabled)
        };
        if let GatewayState::Active(regs) = previous {
            for (id, entry) in regs.connections {
                debug!(%id, "releasing router handle after fault");
                self.router.remove_connection(entry.handle).await;
            }
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Route one inbound client frame through the router and write the
    /// `room`-stamped response back.
    ///
    /// Fail-quiet: malformed frames and unknown ids drop the single frame
    /// and nothing else. The response is only written if the entry and its
    /// socket still exist once the router call completes.
    pub(crate) async fn dispatch(&self, id: Uuid, raw: &str) {
        let payload: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(%id, error = %e, "dropping malformed frame");
                return;
            }
        };

        let handle = {
            let state = self.state.read().await;
            let GatewayState::Active(ref regs) = *state else {
                return;
            };
            let Some(entry) = regs.connections.get(&id) else {
                return;
            };
            entry.handle.clone()
        };

        let request = RequestObject::new(payload, json!({}), PROTOCOL);
        let mut response = match self.router.execute(request, &handle).await {
            Ok(r) => r,
            Err(e) => {
                warn!(%id, error = %e, "router refused frame");
                return;
            }
        };
        stamp_reply_room(&mut response);

        let frame = match serde_json::to_string(&response) {
            Ok(f) => Arc::new(f),
            Err(e) => {
                warn!(%id, error = %e, "failed to serialize router response");
                return;
            }
        };

        // The router call may outlive the connection's teardown.
        let state = self.state.read().await;
        if let GatewayState::Active(ref regs) = *state {
            if let Some(entry) = regs.connections.get(&id) {
                if !entry.conn.send(frame) {
                    debug!(%id, "response dropped, send queue unavailable");
                }
            }
        }
    }

    // ── Public control surface ───────────────────────────────────────

    /// Fan a payload out to every live member of each listed channel.
    ///
    /// The payload is serialized once per channel with `room` set to the
    /// channel name. Returns `false` and delivers nothing when disabled.
    pub async fn broadcast(&self, data: &BroadcastData) -> bool {
        let state = self.state.read().await;
        let GatewayState::Active(ref regs) = *state else {
            return false;
        };
        for channel in &data.channels {
            let Some(members) = regs.channels.members(channel) else {
                continue;
            };
            let stamped = stamp_room(&data.payload, channel);
            let frame = match serde_json::to_string(&stamped) {
                Ok(f) => Arc::new(f),
                Err(e) => {
                    warn!(channel, error = %e, "failed to serialize broadcast payload");
                    continue;
                }
            };
            for member in members {
                if let Some(entry) = regs.connections.get(member) {
                    if entry.conn.is_live() && !entry.conn.send(frame.clone()) {
                        debug!(%member, channel, "broadcast frame dropped");
                    }
                }
            }
        }
        true
    }

    /// Deliver a payload to one connection, once per listed channel.
    ///
    /// Quiet no-op for unknown or non-live ids; `false` only when disabled.
    pub async fn notify(&self, data: &NotifyData) -> bool {
        let state = self.state.read().await;
        let GatewayState::Active(ref regs) = *state else {
            return false;
        };
        let Some(entry) = regs.connections.get(&data.id) else {
            return true;
        };
        if !entry.conn.is_live() {
            return true;
        }
        for channel in &data.channels {
            let stamped = stamp_room(&data.payload, channel);
            match serde_json::to_string(&stamped) {
                Ok(f) => {
                    if !entry.conn.send(Arc::new(f)) {
                        debug!(id = %data.id, channel, "notify frame dropped");
                    }
                }
                Err(e) => warn!(channel, error = %e, "failed to serialize notify payload"),
            }
        }
        true
    }

    /// Add a connection to a channel.
    ///
    /// Creates the channel on first join; re-joining never double-counts.
    /// Quiet no-op for unknown ids; `false` only when disabled.
    pub async fn join_channel(&self, data: &SubscribeData) -> bool {
        let mut state = self.state.write().await;
        let GatewayState::Active(ref mut regs) = *state else {
            return false;
        };
        let Some(entry) = regs.connections.get_mut(&data.id) else {
            return true;
        };
        if regs.channels.join(&data.channel, data.id) {
            entry.channels.push(data.channel.clone());
            debug!(id = %data.id, channel = %data.channel, "joined channel");
        }
        true
    }

    /// Remove a connection from a channel, deleting the channel when the
    /// last member leaves.
    ///
    /// Quiet no-op for unknown id/channel/non-member; `false` only when
    /// disabled.
    pub async fn leave_channel(&self, data: &SubscribeData) -> bool {
        let mut state = self.state.write().await;
        let GatewayState::Active(ref mut regs) = *state else {
            return false;
        };
        let Some(entry) = regs.connections.get_mut(&data.id) else {
            return true;
        };
        if regs.channels.leave(&data.channel, data.id) {
            entry.channels.retain(|c| c != &data.channel);
            debug!(id = %data.id, channel = %data.channel, "left channel");
        }
        true
    }
}

/// Stamp a point-to-point reply: `room` carries the originating request id,
/// which the router echoes back as `requestId`.
fn stamp_reply_room(response: &mut Value) {
    if let Some(obj) = response.as_object_mut() {
        if let Some(request_id) = obj.get("requestId").cloned() {
            let _ = obj.insert("room".into(), request_id);
        }
    }
}
