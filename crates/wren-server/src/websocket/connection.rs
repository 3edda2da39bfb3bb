//! Per-client connection state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

/// A connected client from the gateway's point of view.
///
/// Owns the only send path to the client's socket write task; nothing else
/// in the system writes to the socket.
pub struct ClientConnection {
    /// Gateway-minted connection id.
    pub id: Uuid,
    /// Send queue feeding the socket write task.
    tx: mpsc::Sender<Arc<String>>,
    /// Whether the client has shown signs of life since the last check.
    pub is_alive: AtomicBool,
    /// When the last Pong (or any inbound activity) was seen.
    last_pong: Mutex<Instant>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Frames dropped because the send queue was full or closed.
    dropped_frames: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection around its send queue.
    pub fn new(id: Uuid, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            connected_at: now,
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Enqueue a serialized frame for delivery.
    ///
    /// Returns `false` (and counts the drop) when the queue is full or the
    /// write task is gone — the "socket not presently writable" case.
    pub fn send(&self, frame: Arc<String>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Whether the client is currently considered live.
    pub fn is_live(&self) -> bool {
        self.is_alive.load(Ordering::Relaxed)
    }

    /// Record a sign of life from the client.
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Time since the last sign of life.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag. Returns `true` if the client was
    /// alive since the previous check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection() -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(8);
        (ClientConnection::new(Uuid::new_v4(), tx), rx)
    }

    #[tokio::test]
    async fn send_delivers_frame() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send(Arc::new("hello".into())));
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn send_to_closed_queue_counts_drop() {
        let (tx, rx) = mpsc::channel(8);
        let conn = ClientConnection::new(Uuid::new_v4(), tx);
        drop(rx);
        assert!(!conn.send(Arc::new("hello".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_to_full_queue_returns_false() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new(Uuid::new_v4(), tx);
        assert!(conn.send(Arc::new("first".into())));
        assert!(!conn.send(Arc::new("second".into())));
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn starts_alive() {
        let (conn, _rx) = make_connection();
        assert!(conn.is_live());
    }

    #[test]
    fn check_alive_resets_flag() {
        let (conn, _rx) = make_connection();
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn mark_alive_refreshes_last_pong() {
        let (conn, _rx) = make_connection();
        std::thread::sleep(Duration::from_millis(10));
        let before = conn.last_pong_elapsed();
        conn.mark_alive();
        assert!(conn.last_pong_elapsed() < before);
    }
}
