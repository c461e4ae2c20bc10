//! Generic `RenderBackend` trait for whatever displays the line: a 3D
//! physics visualiser, a web canvas, or nothing at all.
//!
//! Backends are write-only from the core's point of view. Every call places
//! one body at an absolute pose; there is no incremental motion and no
//! read-back.

use inspectline_types::{BodyId, LineError, Quaternion, Vec3};

/// A display collaborator that accepts absolute body poses.
pub trait RenderBackend: Send {
    /// Stable identifier for this backend, used in logs.
    fn name(&self) -> &str;

    /// Place `body` at `position` with `orientation`.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::Render`] if the backend cannot apply the pose
    /// (e.g. the visualiser has disconnected).
    fn set_pose(
        &mut self,
        body: BodyId,
        position: Vec3,
        orientation: Quaternion,
    ) -> Result<(), LineError>;
}
