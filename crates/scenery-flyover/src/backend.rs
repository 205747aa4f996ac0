//! A render backend that counts instead of drawing.

use std::collections::HashSet;

use glam::DMat4;
use scenery::{BatchHandle, Material, RenderBackend};

/// Tallies draw calls, material changes and released batches.
#[derive(Debug, Default)]
pub struct CountingBackend {
    draws: u64,
    material_changes: u64,
    released: HashSet<BatchHandle>,
    last_material: Option<String>,
}

impl CountingBackend {
    /// Create a backend with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragments drawn since the last [`reset_frame`](Self::reset_frame).
    #[must_use]
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Times the material changed between consecutive draws this frame.
    #[must_use]
    pub fn material_changes(&self) -> u64 {
        self.material_changes
    }

    /// Batches released so far.
    #[must_use]
    pub fn released(&self) -> usize {
        self.released.len()
    }

    /// Clear the per-frame counters.
    pub fn reset_frame(&mut self) {
        self.draws = 0;
        self.material_changes = 0;
        self.last_material = None;
    }
}

impl RenderBackend for CountingBackend {
    fn release(&mut self, handle: BatchHandle) {
        if !self.released.insert(handle) {
            tracing::warn!(?handle, "batch released twice");
        }
    }

    fn draw(&mut self, material: &Material, handle: BatchHandle, _view_matrix: &DMat4) {
        if self.released.contains(&handle) {
            tracing::warn!(?handle, "drawing a released batch");
        }
        if self.last_material.as_deref() != Some(material.name()) {
            self.material_changes += 1;
            self.last_material = Some(material.name().to_string());
        }
        self.draws += 1;
    }
}
