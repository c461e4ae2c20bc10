//! In-process render backends for headless runs and CI.
//!
//! | Backend | Behaviour |
//! |---|---|
//! | [`RecordingRenderer`] | Stores the latest pose per body and counts updates. Clones share state. |
//! | [`TracingRenderer`]   | Emits one `trace!` event per pose. |
//! | [`NullRenderer`]      | Discards everything. |
//!
//! # Example
//!
//! ```rust
//! use inspectline_hal::{RecordingRenderer, RenderBackend};
//! use inspectline_types::{BodyId, Quaternion, Vec3};
//!
//! let recorder = RecordingRenderer::new();
//! let mut backend: Box<dyn RenderBackend> = Box::new(recorder.clone());
//!
//! backend
//!     .set_pose(BodyId::Pusher, Vec3::new(0.0, 0.235, 0.65), Quaternion::IDENTITY)
//!     .unwrap();
//!
//! assert_eq!(recorder.update_count(), 1);
//! assert!(recorder.pose(BodyId::Pusher).is_some());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use inspectline_types::{BodyId, LineError, Quaternion, Vec3};
use tracing::trace;

use crate::render::RenderBackend;

// ─────────────────────────────────────────────────────────────────────────────
// Recording backend
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recording {
    poses: HashMap<BodyId, (Vec3, Quaternion)>,
    updates: usize,
}

/// A backend that records the most recent pose of every body.
///
/// Cloning is cheap and every clone observes the same recording, so a test
/// can keep one clone while the line loop owns another.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingRenderer {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest pose pushed for `body`, if any.
    pub fn pose(&self, body: BodyId) -> Option<(Vec3, Quaternion)> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .poses
            .get(&body)
            .copied()
    }

    /// Total number of `set_pose` calls received.
    pub fn update_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .updates
    }
}

impl RenderBackend for RecordingRenderer {
    fn name(&self) -> &str {
        "recording"
    }

    fn set_pose(
        &mut self,
        body: BodyId,
        position: Vec3,
        orientation: Quaternion,
    ) -> Result<(), LineError> {
        let mut rec = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        rec.poses.insert(body, (position, orientation));
        rec.updates += 1;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing backend
// ─────────────────────────────────────────────────────────────────────────────

/// A backend that turns every pose into a `trace!` event. Enable with
/// `RUST_LOG=inspectline_hal=trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRenderer;

impl RenderBackend for TracingRenderer {
    fn name(&self) -> &str {
        "tracing"
    }

    fn set_pose(
        &mut self,
        body: BodyId,
        position: Vec3,
        _orientation: Quaternion,
    ) -> Result<(), LineError> {
        trace!(%body, x = position.x, y = position.y, z = position.z, "pose");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Null backend
// ─────────────────────────────────────────────────────────────────────────────

/// A backend that accepts and discards every pose.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl RenderBackend for NullRenderer {
    fn name(&self) -> &str {
        "null"
    }

    fn set_pose(&mut self, _: BodyId, _: Vec3, _: Quaternion) -> Result<(), LineError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
