//! End-to-end window behaviour over a real cache.

use scenery::{
    GridCell, MaterialRegistry, NoTerrain, NullBackend, SceneryConfig, TileCache, TileManager,
    Viewpoint, WindowChange,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn over(cell: GridCell) -> Viewpoint {
    let (lon, lat) = cell.center_lon_lat();
    Viewpoint::from_geodetic(lon, lat, 1_500.0)
}

fn setup(diameter: usize, capacity: usize) -> (TileCache<NoTerrain>, TileManager) {
    let config = SceneryConfig::default()
        .with_tile_diameter(diameter)
        .with_cache_capacity(capacity);
    (
        TileCache::from_config(&config, NoTerrain).unwrap(),
        TileManager::new(&config).unwrap(),
    )
}

fn expected_window(center: GridCell, diameter: i32) -> Vec<Option<GridCell>> {
    let half = diameter / 2;
    (-half..=half)
        .flat_map(|dy| (-half..=half).map(move |dx| Some(center.offset(dx, dy))))
        .collect()
}

#[test]
fn first_update_fills_every_window_cell() {
    init_tracing();
    let (mut cache, mut manager) = setup(3, 9);
    let materials = MaterialRegistry::new(8);
    let start = GridCell::containing(-122.36, 37.61);

    manager.update(&mut cache, &materials, &mut NullBackend, &over(start));

    assert_eq!(cache.stats().fills, 9);
    assert_eq!(cache.resident_count(), 9);
    assert_eq!(manager.window_cells(&cache), expected_window(start, 3));
}

#[test]
fn moving_east_loads_only_the_new_column() {
    init_tracing();
    let (mut cache, mut manager) = setup(3, 12);
    let materials = MaterialRegistry::new(8);
    let start = GridCell::containing(-122.36, 37.61);

    manager.update(&mut cache, &materials, &mut NullBackend, &over(start));
    let before = cache.stats();

    let east = start.offset(1, 0);
    let change = manager.update(&mut cache, &materials, &mut NullBackend, &over(east));
    assert_eq!(
        change,
        WindowChange::Scrolled {
            columns: 1,
            rows: 0
        }
    );

    let after = cache.stats();
    assert_eq!(after.fills - before.fills, 3);
    assert_eq!(after.evictions, 0);
    assert_eq!(manager.window_cells(&cache), expected_window(east, 3));
}

#[test]
fn scrolling_matches_reloading() {
    init_tracing();
    let materials = MaterialRegistry::new(8);
    let start = GridCell::containing(179.9, -12.3);

    // Walk a loop that crosses the antimeridian and moves diagonally.
    let path = [(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)];

    let (mut cache, mut manager) = setup(5, 128);
    manager.update(&mut cache, &materials, &mut NullBackend, &over(start));
    let mut cell = start;
    for (dx, dy) in path {
        cell = cell.offset(dx, dy);
        manager.update(&mut cache, &materials, &mut NullBackend, &over(cell));

        let (mut fresh_cache, mut fresh) = setup(5, 128);
        fresh.update(&mut fresh_cache, &materials, &mut NullBackend, &over(cell));

        assert_eq!(manager.window_cells(&cache), fresh.window_cells(&fresh_cache));
        assert_eq!(manager.window_cells(&cache), expected_window(cell, 5));
    }
}

#[test]
fn small_cache_still_holds_the_window() {
    init_tracing();
    let (mut cache, mut manager) = setup(3, 9);
    let materials = MaterialRegistry::new(8);
    let mut cell = GridCell::containing(8.5, 47.3);

    manager.update(&mut cache, &materials, &mut NullBackend, &over(cell));
    for _ in 0..20 {
        cell = cell.offset(1, 0);
        manager.update(&mut cache, &materials, &mut NullBackend, &over(cell));
        assert!(cache.resident_count() <= 9);
        assert_eq!(manager.window_cells(&cache), expected_window(cell, 3));
    }
}
