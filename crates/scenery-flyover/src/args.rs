//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use scenery::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_MATERIAL_FRAGMENTS, DEFAULT_TILE_DIAMETER, HitPolicy,
    SceneryConfig,
};

/// Default starting latitude (San Francisco Bay).
pub const DEFAULT_LAT: f64 = 37.6188;

/// Default starting longitude (San Francisco Bay).
pub const DEFAULT_LON: f64 = -122.375;

#[derive(Debug, Parser)]
#[command(about = "Fly a great circle over procedural terrain and stream tiles around it")]
pub struct Args {
    /// Side length of the loaded window in cells (odd).
    #[arg(long, default_value_t = DEFAULT_TILE_DIAMETER)]
    pub diameter: usize,

    /// Number of tile cache slots.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub capacity: usize,

    /// Fragments each material can batch per frame.
    #[arg(long, default_value_t = DEFAULT_MAX_MATERIAL_FRAGMENTS)]
    pub max_fragments: usize,

    /// Material properties file. Built-in materials are used if omitted.
    #[arg(long)]
    pub materials: Option<PathBuf>,

    /// Starting latitude in degrees.
    #[arg(long, default_value_t = DEFAULT_LAT, allow_negative_numbers = true)]
    pub start_lat: f64,

    /// Starting longitude in degrees.
    #[arg(long, default_value_t = DEFAULT_LON, allow_negative_numbers = true)]
    pub start_lon: f64,

    /// Heading in degrees clockwise from north.
    #[arg(long, default_value_t = 90.0)]
    pub heading: f64,

    /// Ground speed in metres per frame.
    #[arg(long, default_value_t = 250.0)]
    pub speed: f64,

    /// Number of frames to fly.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,

    /// Height above the ground in metres.
    #[arg(long, default_value_t = 1_500.0)]
    pub altitude: f64,

    /// Report the nearest ground hit instead of the first in list order.
    #[arg(long)]
    pub nearest_hit: bool,
}

impl Args {
    /// The library configuration these arguments describe.
    pub fn config(&self) -> SceneryConfig {
        let policy = if self.nearest_hit {
            HitPolicy::Nearest
        } else {
            HitPolicy::FirstInListOrder
        };
        SceneryConfig::default()
            .with_tile_diameter(self.diameter)
            .with_cache_capacity(self.capacity)
            .with_max_material_fragments(self.max_fragments)
            .with_hit_policy(policy)
    }
}
