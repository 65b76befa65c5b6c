//! The player-facing projection.
//!
//! A `PlayerView` owns its own [`Scene`], fed only by `scene:sync` frames. It
//! never writes back. Frames older than the last applied one are dropped, so
//! a late delivery cannot roll the view back.

#[cfg(test)]
#[path = "viewer_test.rs"]
mod viewer_test;

use frames::{CodecError, Frame, decode_frame};
use tracing::debug;

use crate::camera::Size;
use crate::render::{DisplayList, render};
use crate::scene::{Change, Scene};
use crate::snapshot::PlayerSnapshot;

/// Error applying an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("sync payload is not a scene snapshot: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
pub struct PlayerView {
    pub scene: Scene,
    last_seq: Option<u64>,
}

impl PlayerView {
    #[must_use]
    pub fn new(container: Size) -> Self {
        let mut scene = Scene::new();
        scene.layout(container);
        Self { scene, last_seq: None }
    }

    /// The player window changed size.
    pub fn resize(&mut self, container: Size) -> Change {
        self.scene.layout(container)
    }

    /// Forget the last sequence number, e.g. after the DM side reconnects
    /// and starts counting from one again.
    pub fn reset_sequence(&mut self) {
        self.last_seq = None;
    }

    /// Decode and apply raw frame bytes. Returns whether the view changed.
    ///
    /// # Errors
    ///
    /// Fails for undecodable frames or payloads that are not snapshots.
    pub fn receive(&mut self, bytes: &[u8]) -> Result<bool, ViewerError> {
        let frame = decode_frame(bytes)?;
        self.apply_frame(&frame)
    }

    /// Apply a decoded frame. Non-sync and stale frames are ignored.
    ///
    /// # Errors
    ///
    /// Fails when a sync payload does not parse as a snapshot.
    pub fn apply_frame(&mut self, frame: &Frame) -> Result<bool, ViewerError> {
        if !frame.is_scene_sync() {
            return Ok(false);
        }
        if self.last_seq.is_some_and(|last| frame.seq <= last) {
            debug!(seq = frame.seq, last = ?self.last_seq, "viewer: stale frame dropped");
            return Ok(false);
        }
        let snapshot: PlayerSnapshot = serde_json::from_value(frame.data.clone())?;
        self.scene.apply_player_snapshot(&snapshot);
        self.last_seq = Some(frame.seq);
        Ok(true)
    }

    /// Render with the player flag set: fog is fully opaque.
    #[must_use]
    pub fn render(&self, now_ms: f64) -> DisplayList {
        render(&self.scene, now_ms, true)
    }
}
