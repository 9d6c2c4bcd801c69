//! Capture-side seam. Backends live with the board code; tests use stubs.

/// A frame source opened at task start.
///
/// Opening is the backend's constructor returning `Option<Self>`: a missing
/// camera is not an error, the task runs without frames.
#[allow(async_fn_in_trait)]
pub trait VideoSource {
    type Frame;

    /// Request a capture geometry. Best effort: the backend may keep its own.
    fn set_geometry(&mut self, width: u16, height: u16);

    /// Capture the next frame into the backend's buffer. This is where the
    /// task yields to I/O; the rest of the iteration never blocks on the camera.
    /// Returns `true` when a complete frame is ready.
    async fn grab(&mut self) -> bool;

    /// The last grabbed frame. Invalidated by the next `grab`.
    fn retrieve(&self) -> Option<&Self::Frame>;
}
