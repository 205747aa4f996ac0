//! Startup configuration.

use std::path::PathBuf;

use crate::elevation::HitPolicy;
use crate::error::{Error, Result};

/// Default number of cache slots (an 11 x 11 neighbourhood).
pub const DEFAULT_CACHE_CAPACITY: usize = 121;

/// Default window diameter in cells.
pub const DEFAULT_TILE_DIAMETER: usize = 7;

/// Default per-material fragment capacity per frame.
pub const DEFAULT_MAX_MATERIAL_FRAGMENTS: usize = 800;

/// Sizes and paths fixed for the lifetime of a tile manager.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneryConfig {
    /// Number of tile cache slots.
    pub cache_capacity: usize,
    /// Side length of the square window of cells kept loaded. Must be odd.
    pub tile_diameter: usize,
    /// Fragments each material can batch per frame.
    pub max_material_fragments: usize,
    /// Directory containing the `Scenery` tree.
    pub scenery_root: PathBuf,
    /// Which intersection the ground query reports.
    pub hit_policy: HitPolicy,
}

impl Default for SceneryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            tile_diameter: DEFAULT_TILE_DIAMETER,
            max_material_fragments: DEFAULT_MAX_MATERIAL_FRAGMENTS,
            scenery_root: PathBuf::from("."),
            hit_policy: HitPolicy::default(),
        }
    }
}

impl SceneryConfig {
    /// Set the cache capacity.
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the window diameter.
    #[must_use]
    pub fn with_tile_diameter(mut self, diameter: usize) -> Self {
        self.tile_diameter = diameter;
        self
    }

    /// Set the per-material fragment capacity.
    #[must_use]
    pub fn with_max_material_fragments(mut self, max: usize) -> Self {
        self.max_material_fragments = max;
        self
    }

    /// Set the scenery root directory.
    #[must_use]
    pub fn with_scenery_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scenery_root = root.into();
        self
    }

    /// Set the ground query hit policy.
    #[must_use]
    pub fn with_hit_policy(mut self, policy: HitPolicy) -> Self {
        self.hit_policy = policy;
        self
    }

    /// Check the settings are usable together.
    ///
    /// The cache must hold at least the whole window, otherwise loading the
    /// window would evict tiles it still needs.
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::config("cache capacity must be at least 1"));
        }
        if self.tile_diameter == 0 || self.tile_diameter % 2 == 0 {
            return Err(Error::config(format!(
                "tile diameter must be odd, got {}",
                self.tile_diameter
            )));
        }
        let window = self.tile_diameter * self.tile_diameter;
        if window > self.cache_capacity {
            return Err(Error::config(format!(
                "a {d} x {d} window needs {window} cache slots, only {} configured",
                self.cache_capacity,
                d = self.tile_diameter,
            )));
        }
        if self.max_material_fragments == 0 {
            return Err(Error::config("max material fragments must be at least 1"));
        }
        Ok(())
    }
}
