//! Player-view sync and the debounced-save timer.
//!
//! [`ViewSync`] pushes full [`PlayerSnapshot`]s as `scene:sync` frames over a
//! [`ViewerLink`]. The channel is one-way and best effort: with no viewer
//! attached, or a viewer that has gone away, a push is a silent no-op.
//!
//! [`Debouncer`] implements "save once after the edits stop": every touch
//! re-arms the deadline, and `poll` fires at most once per quiet period.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use frames::{Frame, SCENE_SYNC, encode_frame};
use tracing::warn;

use crate::consts::AUTOSAVE_DEBOUNCE_MS;
use crate::doc::new_id;
use crate::snapshot::PlayerSnapshot;

/// Error reported by a [`ViewerLink`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("viewer link is closed")]
    Closed,
    #[error("viewer link send failed: {0}")]
    Send(String),
}

/// Transport to one independently running player view (a websocket, a
/// `postMessage` channel, an in-process queue in tests).
pub trait ViewerLink {
    fn is_connected(&self) -> bool;

    /// Hand one encoded frame to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the transport rejects the frame.
    fn send(&mut self, frame: Vec<u8>) -> Result<(), SyncError>;
}

/// Sequenced snapshot pusher.
#[derive(Default)]
pub struct ViewSync {
    link: Option<Box<dyn ViewerLink>>,
    seq: u64,
}

impl ViewSync {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a viewer, replacing any previous one.
    pub fn attach(&mut self, link: Box<dyn ViewerLink>) {
        self.link = Some(link);
    }

    pub fn detach(&mut self) {
        self.link = None;
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.is_connected())
    }

    /// Sequence number of the last frame handed to the link.
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Push a snapshot. Returns whether a frame was handed to the link.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push(&mut self, snapshot: &PlayerSnapshot, now_ms: f64) -> bool {
        let Some(link) = self.link.as_mut() else {
            return false;
        };
        if !link.is_connected() {
            return false;
        }
        let data = match serde_json::to_value(snapshot) {
            Ok(data) => data,
            Err(err) => {
                warn!(error = %err, "sync: snapshot serialization failed");
                return false;
            }
        };
        self.seq += 1;
        let frame = Frame::new(new_id(), self.seq, now_ms as i64, SCENE_SYNC, data).with_from("dm");
        match link.send(encode_frame(&frame)) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, seq = self.seq, "sync: push dropped");
                false
            }
        }
    }
}

/// Trailing-edge debounce on a caller-supplied clock.
#[derive(Debug, Clone, PartialEq)]
pub struct Debouncer {
    pub delay_ms: f64,
    deadline: Option<f64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(AUTOSAVE_DEBOUNCE_MS)
    }
}

impl Debouncer {
    #[must_use]
    pub fn new(delay_ms: f64) -> Self {
        Self { delay_ms, deadline: None }
    }

    /// Re-arm: the deadline moves to `now + delay`.
    pub fn touch(&mut self, now_ms: f64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    #[must_use]
    pub fn deadline(&self) -> Option<f64> {
        self.deadline
    }

    /// Fire if the deadline has passed. Disarms on fire.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
