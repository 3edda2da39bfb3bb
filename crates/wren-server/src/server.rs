//! `GatewayServer` — axum HTTP + WebSocket front end for the gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tracing::{error, info};

use wren_core::Router as AppRouter;

use crate::config::GatewayConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownSignal;
use crate::websocket::gateway::Gateway;
use crate::websocket::session;

/// Failure to start the listener.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The gateway is disabled; there is nothing to listen with.
    #[error("gateway is disabled, no listener started")]
    Disabled,
    /// Binding the socket failed.
    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared state for axum handlers.
#[derive(Clone)]
struct AppState {
    gateway: Arc<Gateway>,
    config: GatewayConfig,
    start_time: Instant,
}

/// The gateway host: owns the config, the gateway aggregate, and the
/// shutdown signal.
pub struct GatewayServer {
    config: GatewayConfig,
    gateway: Arc<Gateway>,
    shutdown: Arc<ShutdownSignal>,
    start_time: Instant,
}

impl GatewayServer {
    /// Build the server around a router collaborator.
    ///
    /// A config without a `port` is recoverable: the gateway comes up in
    /// disabled mode with a logged diagnostic instead of aborting.
    pub fn init(config: GatewayConfig, router: Arc<dyn AppRouter>, disabled: bool) -> Self {
        let disabled = if config.port.is_none() {
            if !disabled {
                error!("the 'port' setting is required, starting in disabled mode");
            }
            true
        } else {
            disabled
        };
        Self {
            gateway: Arc::new(Gateway::new(router, disabled)),
            config,
            shutdown: Arc::new(ShutdownSignal::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            gateway: self.gateway.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
        };
        Router::new()
            .route("/health", get(health_handler))
            .route("/ws", get(ws_handler))
            .with_state(state)
    }

    /// Bind the listener and spawn the serve task.
    ///
    /// A fault in the serve task flips the gateway into disabled mode; the
    /// serve task itself is not retried.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let Some(port) = self.config.port else {
            return Err(ServerError::Disabled);
        };
        if self.gateway.is_disabled().await {
            return Err(ServerError::Disabled);
        }

        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), port)).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();
        let gateway = self.gateway.clone();
        let serve = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = result {
                gateway.fault(&e).await;
            }
        });
        info!(%addr, "gateway listening");
        Ok((addr, serve))
    }

    /// The gateway aggregate (the public control surface lives here).
    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// The shutdown signal.
    pub fn shutdown(&self) -> &Arc<ShutdownSignal> {
        &self.shutdown
    }

    /// The active configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let resp = health::health_check(
        state.start_time,
        state.gateway.is_disabled().await,
        state.gateway.connection_count().await,
        state.gateway.channel_count().await,
    );
    Json(resp)
}

/// GET /ws — WebSocket upgrade. Refused outright while disabled: the
/// gateway accepts no new connections, whatever the admission outcome
/// would have been.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.gateway.is_disabled().await {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let gateway = state.gateway.clone();
    let config = state.config.clone();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| session::run_session(socket, gateway, config))
        .into_response()
}
