//! Terrain tile streaming around a moving viewpoint.
//!
//! The earth is divided into grid cells one eighth of a degree on a side.
//! This crate keeps the tiles for a square window of cells around the
//! viewpoint loaded, answers "how high is the ground under me?", and groups
//! visible geometry by material for a render backend.
//!
//! # Design principles
//!
//! - **Explicit ownership**: the cache, material registry and manager are
//!   plain values passed by reference, with no global state
//! - **Checked references**: fragments and window entries name tiles by
//!   slot and generation, so evicted tiles are detected rather than reused
//! - **Pluggable edges**: tile loading, visibility and drawing are traits
//!
//! # Example
//!
//! ```
//! use scenery::{
//!     AlwaysVisible, MaterialRegistry, NoTerrain, NullBackend, SceneryConfig, TileCache,
//!     TileManager, Viewpoint,
//! };
//!
//! let config = SceneryConfig::default().with_tile_diameter(3).with_cache_capacity(9);
//! let mut cache = TileCache::from_config(&config, NoTerrain)?;
//! let mut materials = MaterialRegistry::new(config.max_material_fragments);
//! let mut manager = TileManager::new(&config)?;
//! let mut backend = NullBackend;
//!
//! let viewpoint = Viewpoint::from_geodetic(-122.4, 37.6, 1_500.0);
//! manager.update(&mut cache, &materials, &mut backend, &viewpoint);
//! manager.render(&mut cache, &mut materials, &AlwaysVisible, &glam::DMat4::IDENTITY);
//! materials.render_batches(&cache, &mut backend);
//! assert_eq!(cache.resident_count(), 9);
//! # Ok::<(), scenery::Error>(())
//! ```

mod batch;
pub mod bucket;
mod cache;
mod config;
pub mod elevation;
mod error;
pub mod geo;
pub mod intersect;
mod loader;
mod manager;
mod material;
mod render;
mod tile;
mod visibility;

pub use batch::SortList;
pub use bucket::GridCell;
pub use cache::{CacheStats, TileCache, eviction_distance};
pub use config::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_MATERIAL_FRAGMENTS, DEFAULT_TILE_DIAMETER, SceneryConfig,
};
pub use elevation::{ElevationQuery, GroundHit, HitPolicy, Probe};
pub use error::{Error, Result};
pub use geo::Viewpoint;
pub use loader::{NoTerrain, TileLoader, TilePath, TileRequest};
pub use manager::{FrameStats, TileManager, WindowChange};
pub use material::{Material, MaterialId, MaterialRegistry};
pub use render::{NullBackend, RenderBackend};
pub use tile::{
    BatchHandle, Face, Fragment, FragmentGeometry, FragmentRef, Tile, TileGeometry, TileRef,
};
pub use visibility::{AlwaysVisible, Frustum, Visibility};
