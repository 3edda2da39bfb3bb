//! Per-client session — drives one socket from upgrade through teardown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use wren_core::AdmissionError;

use crate::config::GatewayConfig;
use super::gateway::Gateway;

/// Close frame for a rejected admission: code `4000 + status`, the router's
/// message as reason.
fn rejection_close(rejection: &AdmissionError) -> CloseFrame {
    CloseFrame {
        code: rejection.close_code(),
        reason: rejection.message.clone().into(),
    }
}

/// Run one client session.
///
/// 1. Mints the connection id and requests admission from the router;
///    the session's one suspension point. Nothing is wired until the router
///    answers; frames the client sends meanwhile sit unread in the
///    transport and are processed in order after establishment.
/// 2. On rejection, closes the socket with the coded diagnostic. No entry
///    was ever created.
/// 3. On success, materializes the registry entry, then runs the outbound
///    forwarder (with heartbeat pings) and the inbound dispatch loop.
/// 4. Unwinds through the gateway on socket close, error, or heartbeat
///    timeout.
pub async fn run_session(ws: WebSocket, gateway: Arc<Gateway>, config: GatewayConfig) {
    let id = Uuid::new_v4();
    let (mut ws_tx, mut ws_rx) = ws.split();

    let handle = match gateway.admit(id).await {
        Ok(handle) => handle,
        Err(rejection) => {
            warn!(%id, status = rejection.status, reason = %rejection.message, "admission rejected");
            let _ = ws_tx
                .send(Message::Close(Some(rejection_close(&rejection))))
                .await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<Arc<String>>(config.send_queue_size);
    let Some(conn) = gateway.establish(id, handle, tx).await else {
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    };

    let started = Instant::now();
    info!(%id, "client connected");
    counter!("ws_connections_total").increment(1);
    gauge!("ws_connections_active").increment(1.0);

    // Outbound forwarder with periodic pings. A client that stays silent
    // past the pong timeout is dropped; the token ends the inbound loop so
    // teardown runs without waiting for the peer to close.
    let stop = CancellationToken::new();
    let ping_interval = Duration::from_secs(config.heartbeat_interval_secs.max(1));
    let pong_timeout = Duration::from_secs(config.heartbeat_timeout_secs);
    let outbound_conn = conn.clone();
    let outbound_stop = stop.clone();
    let outbound = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        let _ = ticker.tick().await;
        loop {
            tokio::select! {
                frame = rx.recv() => {
                    match frame {
                        Some(frame) => {
                            if ws_tx.send(Message::Text(frame.as_str().into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > pong_timeout
                    {
                        warn!(id = %outbound_conn.id, "client unresponsive, dropping");
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
        outbound_stop.cancel();
    });

    // Inbound frames, in transport order, until the socket or the outbound
    // side gives up.
    loop {
        let msg = tokio::select! {
            msg = ws_rx.next() => msg,
            () = stop.cancelled() => {
                debug!(%id, "session cancelled by outbound side");
                break;
            }
        };
        let Some(Ok(msg)) = msg else { break };
        match msg {
            Message::Text(text) => {
                conn.mark_alive();
                gateway.dispatch(id, text.as_str()).await;
            }
            Message::Binary(data) => {
                conn.mark_alive();
                match std::str::from_utf8(&data) {
                    Ok(text) => gateway.dispatch(id, text).await,
                    Err(_) => debug!(%id, len = data.len(), "ignoring non-UTF8 binary frame"),
                }
            }
            Message::Ping(_) | Message::Pong(_) => conn.mark_alive(),
            Message::Close(_) => {
                debug!(%id, "client sent close frame");
                break;
            }
        }
    }

    gateway.disconnect(id).await;
    counter!("ws_disconnections_total").increment(1);
    gauge!("ws_connections_active").decrement(1.0);
    histogram!("ws_connection_duration_seconds").record(started.elapsed().as_secs_f64());
    outbound.abort();
    info!(%id, "session finished");
}
