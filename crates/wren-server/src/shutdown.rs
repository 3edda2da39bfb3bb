//! Listener shutdown signalling via `CancellationToken`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How long to wait for the serve task before giving up on a clean stop.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Signals the listener (and anything holding a token clone) to stop.
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Create a fresh signal.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token for tasks that should observe shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Trigger shutdown. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger shutdown and wait for the serve task to finish.
    pub async fn drain(&self, serve: JoinHandle<()>) {
        self.trigger();
        if tokio::time::timeout(DRAIN_TIMEOUT, serve).await.is_err() {
            warn!("listener did not stop within {DRAIN_TIMEOUT:?}");
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
