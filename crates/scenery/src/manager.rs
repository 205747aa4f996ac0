//! Sliding window of tiles around the viewpoint.
//!
//! The [`TileManager`] keeps a D x D square of cells centred on the cell
//! under the viewpoint resident in the [`TileCache`]. When the viewpoint
//! crosses into a neighbouring cell the window scrolls: entries shift by one
//! column or row and only the newly exposed edge is fetched. Larger jumps
//! reload the whole window.
//!
//! Each frame, [`TileManager::render`] culls the window against a
//! [`Visibility`] predicate and fills the material sort lists with the
//! fragments that survive.

use glam::{DMat4, DVec3};

use crate::bucket::GridCell;
use crate::cache::TileCache;
use crate::config::SceneryConfig;
use crate::elevation::{ElevationQuery, GroundHit};
use crate::error::Result;
use crate::geo::Viewpoint;
use crate::loader::TileLoader;
use crate::material::MaterialRegistry;
use crate::render::RenderBackend;
use crate::tile::{FragmentRef, TileRef};
use crate::visibility::Visibility;

/// What an [`update`](TileManager::update) did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowChange {
    /// The viewpoint stayed in the same cell.
    Unchanged,
    /// Every window entry was fetched again.
    Reloaded,
    /// The window shifted by at most one cell on each axis.
    Scrolled {
        /// Columns moved east (negative for west).
        columns: i64,
        /// Rows moved north (negative for south).
        rows: i64,
    },
}

/// Culling and batching counts for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Window tiles that passed the coarse cull.
    pub tiles_drawn: usize,
    /// Window tiles rejected by the coarse cull.
    pub tiles_culled: usize,
    /// Window entries whose tile had been evicted.
    pub stale_tiles: usize,
    /// Fragments appended to a sort list.
    pub fragments_drawn: usize,
    /// Fragments rejected by either cull.
    pub fragments_culled: usize,
    /// Visible fragments that did not fit in their material's sort list.
    pub fragments_dropped: usize,
    /// Triangles in drawn fragments.
    pub triangles_drawn: usize,
    /// Triangles in culled fragments.
    pub triangles_culled: usize,
}

impl FrameStats {
    /// Share of fragments culled this frame, or zero if there were none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn visibility_ratio(&self) -> f64 {
        let total = self.fragments_drawn + self.fragments_culled;
        if total == 0 {
            0.0
        } else {
            self.fragments_culled as f64 / total as f64
        }
    }
}

/// Keeps the window of tiles around the viewpoint loaded and batched.
#[derive(Debug)]
pub struct TileManager {
    diameter: usize,
    /// Row-major, row 0 is the southernmost.
    window: Vec<TileRef>,
    center: Option<GridCell>,
    query: ElevationQuery,
    ground: Option<GroundHit>,
    scenery_center: DVec3,
    stats: FrameStats,
}

impl TileManager {
    /// Create a manager with an empty window.
    pub fn new(config: &SceneryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            diameter: config.tile_diameter,
            window: Vec::with_capacity(config.tile_diameter * config.tile_diameter),
            center: None,
            query: ElevationQuery::new(config.hit_policy),
            ground: None,
            scenery_center: DVec3::ZERO,
            stats: FrameStats::default(),
        })
    }

    /// Side length of the window in cells.
    #[must_use]
    pub fn diameter(&self) -> usize {
        self.diameter
    }

    /// The cell under the viewpoint at the last update.
    #[must_use]
    pub fn center_cell(&self) -> Option<GridCell> {
        self.center
    }

    /// Window entries, row-major from the south-west corner.
    #[must_use]
    pub fn window(&self) -> &[TileRef] {
        &self.window
    }

    /// Cells currently named by the window, `None` for evicted entries.
    #[must_use]
    pub fn window_cells<L>(&self, cache: &TileCache<L>) -> Vec<Option<GridCell>> {
        self.window
            .iter()
            .map(|&tile| cache.resolve(tile).map(|t| t.cell))
            .collect()
    }

    /// Ground hit found by the last update.
    #[must_use]
    pub fn ground(&self) -> Option<&GroundHit> {
        self.ground.as_ref()
    }

    /// Ground altitude under the viewpoint at the last update.
    #[must_use]
    pub fn current_elevation(&self) -> Option<f64> {
        self.ground.map(|hit| hit.altitude)
    }

    /// Origin that tile offsets are measured from.
    #[must_use]
    pub fn scenery_center(&self) -> DVec3 {
        self.scenery_center
    }

    /// Counts from the last render.
    #[must_use]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// The elevation query used on update.
    #[must_use]
    pub fn query(&self) -> &ElevationQuery {
        &self.query
    }

    /// Bring the window up to date with the viewpoint.
    ///
    /// The first call clears the cache and loads the whole window. Later
    /// calls scroll the window when the viewpoint has moved to a
    /// neighbouring cell. The ground under the viewpoint is queried on every
    /// call.
    pub fn update<L, R>(
        &mut self,
        cache: &mut TileCache<L>,
        materials: &MaterialRegistry,
        backend: &mut R,
        viewpoint: &Viewpoint,
    ) -> WindowChange
    where
        L: TileLoader,
        R: RenderBackend + ?Sized,
    {
        let current = GridCell::containing(viewpoint.lon_deg, viewpoint.lat_deg);
        let mut loader = WindowLoader {
            cache,
            materials,
            backend,
            viewpoint: viewpoint.position,
        };

        let change = match self.center {
            None => {
                loader.cache.init(&mut *loader.backend);
                self.reload(&mut loader, current);
                WindowChange::Reloaded
            }
            Some(previous) if previous == current => WindowChange::Unchanged,
            Some(previous) => {
                let columns = previous.column_delta(&current);
                let rows = previous.row_delta(&current);
                if columns.abs() > 1 || rows.abs() > 1 {
                    tracing::info!(from = %previous, to = %current, "viewpoint jumped, reloading window");
                    self.reload(&mut loader, current);
                    WindowChange::Reloaded
                } else {
                    self.scroll(&mut loader, current, columns, rows);
                    WindowChange::Scrolled { columns, rows }
                }
            }
        };
        self.center = Some(current);

        if change != WindowChange::Unchanged {
            tracing::debug!(
                cell = %current,
                resident = loader.cache.resident_count(),
                ?change,
                "window updated"
            );
        }

        let cache = loader.cache;
        let center_slot = self.diameter / 2 * self.diameter + self.diameter / 2;
        if let Some(tile) = self.window.get(center_slot).and_then(|&t| cache.resolve(t)) {
            self.scenery_center = tile.center;
        }
        self.ground = self.query.ground_elevation(cache, viewpoint);
        change
    }

    /// Cull the window and fill the material sort lists for this frame.
    ///
    /// `view` is the frame's view matrix with the scenery centre as origin;
    /// each visible tile gets it translated by the tile's offset.
    pub fn render<L, V>(
        &mut self,
        cache: &mut TileCache<L>,
        materials: &mut MaterialRegistry,
        visibility: &V,
        view: &DMat4,
    ) -> &FrameStats
    where
        V: Visibility + ?Sized,
    {
        materials.init_transient_lists();
        let mut stats = FrameStats::default();

        for (index, &tile_ref) in self.window.iter().enumerate() {
            // Near the poles several window entries clamp to the same cell.
            if self.window[..index].contains(&tile_ref) {
                continue;
            }
            let Some(tile) = cache.resolve_mut(tile_ref) else {
                tracing::debug!(?tile_ref, "window names an evicted tile");
                stats.stale_tiles += 1;
                continue;
            };

            tile.update_offset(self.scenery_center);
            if !visibility.viewable(tile.offset, tile.bounding_radius) {
                stats.tiles_culled += 1;
                stats.fragments_culled += tile.fragments.len();
                stats.triangles_culled += tile.triangle_count();
                continue;
            }
            stats.tiles_drawn += 1;
            tile.update_view_matrix(view);

            for (fragment_index, fragment) in tile.fragments.iter().enumerate() {
                let offset = fragment.center - self.scenery_center;
                if !visibility.viewable(offset, fragment.bounding_radius) {
                    stats.fragments_culled += 1;
                    stats.triangles_culled += fragment.faces.len();
                    continue;
                }
                let Some(material) = fragment.material else {
                    continue;
                };
                let fragment_ref = FragmentRef {
                    tile: tile_ref,
                    fragment: fragment_index,
                };
                if materials.append_sort_list(material, fragment_ref) {
                    stats.fragments_drawn += 1;
                    stats.triangles_drawn += fragment.faces.len();
                } else {
                    stats.fragments_dropped += 1;
                }
            }
        }

        if stats.fragments_dropped > 0 {
            tracing::warn!(
                dropped = stats.fragments_dropped,
                capacity = materials.list_capacity(),
                "material sort lists full, fragments skipped this frame"
            );
        }

        self.stats = stats;
        &self.stats
    }

    fn reload<L, R>(&mut self, loader: &mut WindowLoader<'_, L, R>, center: GridCell)
    where
        L: TileLoader,
        R: RenderBackend + ?Sized,
    {
        self.window.clear();
        for row in 0..self.diameter {
            for column in 0..self.diameter {
                let cell = center.offset(self.edge(column), self.edge(row));
                let tile = loader.fetch(cell, &self.window);
                self.window.push(tile);
            }
        }
        tracing::info!(
            cell = %center,
            diameter = self.diameter,
            "loaded tile window"
        );
    }

    /// Shift the window by at most one cell on each axis around the new
    /// `center` and load the edges that came into view.
    ///
    /// Entries that stay in the window are never evicted by the edge loads.
    fn scroll<L, R>(
        &mut self,
        loader: &mut WindowLoader<'_, L, R>,
        center: GridCell,
        columns: i64,
        rows: i64,
    ) where
        L: TileLoader,
        R: RenderBackend + ?Sized,
    {
        let d = self.diameter;
        for entries in self.window.chunks_mut(d) {
            match columns {
                1 => entries.rotate_left(1),
                -1 => entries.rotate_right(1),
                _ => {}
            }
        }
        match rows {
            1 => self.window.rotate_left(d),
            -1 => self.window.rotate_right(d),
            _ => {}
        }

        let new_column = leading_edge(columns, d);
        let new_row = leading_edge(rows, d);
        let is_new = |index: usize| Some(index % d) == new_column || Some(index / d) == new_row;

        let mut keep: Vec<TileRef> = (0..self.window.len())
            .filter(|&index| !is_new(index))
            .map(|index| self.window[index])
            .collect();
        for index in (0..self.window.len()).filter(|&index| is_new(index)) {
            let cell = center.offset(self.edge(index % d), self.edge(index / d));
            let tile = loader.fetch(cell, &keep);
            keep.push(tile);
            self.window[index] = tile;
        }
    }

    /// Cell offset from the centre for a window column or row index.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn edge(&self, index: usize) -> i32 {
        index as i32 - (self.diameter / 2) as i32
    }
}

/// Window column or row index that comes into view when moving by `step`.
fn leading_edge(step: i64, diameter: usize) -> Option<usize> {
    match step {
        1 => Some(diameter - 1),
        -1 => Some(0),
        _ => None,
    }
}

/// Everything needed to fetch window cells during one update.
struct WindowLoader<'a, L, R: ?Sized> {
    cache: &'a mut TileCache<L>,
    materials: &'a MaterialRegistry,
    backend: &'a mut R,
    viewpoint: DVec3,
}

impl<L: TileLoader, R: RenderBackend + ?Sized> WindowLoader<'_, L, R> {
    fn fetch(&mut self, cell: GridCell, keep: &[TileRef]) -> TileRef {
        self.cache.fetch_keeping(
            cell,
            self.viewpoint,
            self.materials,
            &mut *self.backend,
            keep,
        )
    }
}
