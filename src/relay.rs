//! Player-view relay: fan-out of `scene:sync` frames from the DM to every
//! connected player socket.
//!
//! DESIGN
//! ======
//! The relay re-stamps every forwarded frame with its own monotonic `seq`.
//! Player views drop anything not newer than what they applied last, so a
//! DM page that reloads and starts counting from one again would otherwise
//! be ignored until it caught up. The latest frame is kept so a player that
//! connects late is brought up to date at once.

#[cfg(test)]
#[path = "relay_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use frames::{CodecError, decode_frame, encode_frame};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("not a scene sync frame: {0}")]
    NotSync(String),
}

#[derive(Clone)]
pub struct Relay {
    tx: broadcast::Sender<Arc<Vec<u8>>>,
    latest: Arc<RwLock<Option<Arc<Vec<u8>>>>>,
    seq: Arc<AtomicU64>,
}

impl Relay {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, latest: Arc::new(RwLock::new(None)), seq: Arc::new(AtomicU64::new(0)) }
    }

    /// Forward one encoded frame from the DM. Returns the relay sequence
    /// number it was stamped with.
    ///
    /// # Errors
    ///
    /// Rejects undecodable frames and anything other than `scene:sync`.
    pub async fn publish(&self, bytes: &[u8]) -> Result<u64, RelayError> {
        let mut frame = decode_frame(bytes)?;
        if !frame.is_scene_sync() {
            return Err(RelayError::NotSync(frame.syscall));
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        frame.seq = seq;
        let encoded = Arc::new(encode_frame(&frame));

        *self.latest.write().await = Some(Arc::clone(&encoded));
        // No subscribers is fine: the latest frame is replayed on connect.
        if self.tx.send(encoded).is_err() {
            debug!(seq, "relay: no players connected");
        }
        Ok(seq)
    }

    /// The most recent frame, for replay to a newly connected player.
    pub async fn latest(&self) -> Option<Arc<Vec<u8>>> {
        self.latest.read().await.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Vec<u8>>> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
