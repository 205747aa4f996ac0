//! Render backend seam.
//!
//! The core never issues draw calls itself. It hands precompiled batch
//! handles to a [`RenderBackend`] during the render pass, and asks the same
//! backend to release a tile's handles when the cache evicts it.

use glam::DMat4;

use crate::material::Material;
use crate::tile::BatchHandle;

/// Consumer of batched fragments and owner of their GPU-side resources.
pub trait RenderBackend {
    /// Release the resources behind a batch handle. Called when the tile that
    /// owns it is evicted; the handle is never passed to `draw` afterwards.
    fn release(&mut self, handle: BatchHandle);

    /// Draw one fragment with the given material and tile transform.
    fn draw(&mut self, material: &Material, handle: BatchHandle, view_matrix: &DMat4);
}

/// A backend that draws nothing and holds no resources.
///
/// This is useful for headless elevation queries or for testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl NullBackend {
    /// Create a new no-op backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl RenderBackend for NullBackend {
    fn release(&mut self, _handle: BatchHandle) {}

    fn draw(&mut self, _material: &Material, _handle: BatchHandle, _view_matrix: &DMat4) {}
}
