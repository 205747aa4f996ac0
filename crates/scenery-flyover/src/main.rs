//! Headless flyover over procedural terrain.
//!
//! Flies a great circle from the start position, streaming the tile window
//! around the aircraft, following the ground at a fixed height and culling
//! and batching every frame into a counting backend.

mod args;
mod backend;
mod flight;
mod terrain;

use std::process::ExitCode;

use clap::Parser;
use scenery::{Frustum, MaterialRegistry, TileCache, TileManager, WindowChange};

use crate::args::Args;
use crate::backend::CountingBackend;
use crate::flight::Flight;
use crate::terrain::{DEFAULT_MATERIALS, ProceduralTerrain};

/// Frames between progress reports.
const REPORT_INTERVAL: u32 = 100;

fn run(args: &Args) -> scenery::Result<()> {
    let config = args.config();
    config.validate()?;

    let mut materials = match &args.materials {
        Some(path) => MaterialRegistry::load(path, config.max_material_fragments)?,
        None => MaterialRegistry::parse(DEFAULT_MATERIALS, config.max_material_fragments)?,
    };
    let mut cache = TileCache::from_config(&config, ProceduralTerrain::new())?;
    let mut manager = TileManager::new(&config)?;
    let mut backend = CountingBackend::new();

    let mut flight = Flight::new(args.start_lon, args.start_lat, args.heading);
    let mut ground = 0.0;
    let projection = Flight::projection();

    tracing::info!(
        lon = args.start_lon,
        lat = args.start_lat,
        diameter = config.tile_diameter,
        capacity = config.cache_capacity,
        materials = materials.len(),
        "starting flyover"
    );

    for frame in 0..args.frames {
        let viewpoint = flight.viewpoint(ground + args.altitude);
        let change = manager.update(&mut cache, &materials, &mut backend, &viewpoint);
        if let Some(elevation) = manager.current_elevation() {
            ground = elevation;
        }
        if change != WindowChange::Unchanged {
            tracing::debug!(frame, ?change, ground, "entered new cell");
        }

        let view = flight.view(&viewpoint, manager.scenery_center());
        let frustum = Frustum::from_matrix(projection * view);
        backend.reset_frame();
        let stats = *manager.render(&mut cache, &mut materials, &frustum, &view);
        materials.render_batches(&cache, &mut backend);

        tracing::trace!(
            frame,
            draws = backend.draws(),
            material_changes = backend.material_changes(),
            triangles = stats.triangles_drawn,
            "frame rendered"
        );
        if frame % REPORT_INTERVAL == 0 {
            tracing::info!(
                frame,
                lon = flight.lon_deg,
                lat = flight.lat_deg,
                ground,
                tiles = stats.tiles_drawn,
                fragments = stats.fragments_drawn,
                culled_ratio = stats.visibility_ratio(),
                "flyover progress"
            );
        }

        flight.advance(args.speed);
    }

    let cache_stats = cache.stats();
    let resident_batches: usize = cache
        .iter_resident()
        .map(|(_, tile)| tile.fragments().iter().filter(|f| f.batch.is_some()).count())
        .sum();
    let live_batches = cache
        .loader()
        .batches_built()
        .saturating_sub(backend.released() as u64);
    if live_batches != resident_batches as u64 {
        tracing::warn!(live_batches, resident_batches, "batch bookkeeping mismatch");
    }

    tracing::info!(
        hits = cache_stats.hits,
        fills = cache_stats.fills,
        evictions = cache_stats.evictions,
        load_failures = cache_stats.load_failures,
        tiles_built = cache.loader().tiles_built(),
        resident = cache.resident_count(),
        released = backend.released(),
        "flyover finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "flyover failed");
            ExitCode::FAILURE
        }
    }
}
