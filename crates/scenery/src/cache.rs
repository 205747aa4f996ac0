//! Fixed-capacity tile cache.
//!
//! The cache owns every loaded [`Tile`] in a preallocated arena of slots.
//! A slot is either vacant or resident for exactly one [`GridCell`]. When all
//! slots are resident, the next load evicts the slot whose tile is farthest
//! from the viewpoint by [`eviction_distance`].
//!
//! Every fill bumps the slot's generation, so [`TileRef`]s taken before an
//! eviction stop resolving instead of silently pointing at another cell.

use std::path::{Path, PathBuf};

use glam::DVec3;

use crate::bucket::GridCell;
use crate::error::{Error, Result};
use crate::loader::{TileLoader, TilePath, TileRequest};
use crate::material::MaterialRegistry;
use crate::render::RenderBackend;
use crate::tile::{Fragment, FragmentRef, Tile, TileGeometry, TileRef};

/// Counters for cache activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Fetches answered by an already resident slot.
    pub hits: u64,
    /// Slots filled by calling the loader.
    pub fills: u64,
    /// Resident slots freed to make room.
    pub evictions: u64,
    /// Loader calls that returned an error.
    pub load_failures: u64,
}

/// Distance used to rank tiles for eviction.
///
/// A cheap stand-in for Euclidean distance: the largest absolute component
/// of `center - viewpoint` plus a quarter of the other two.
#[must_use]
pub fn eviction_distance(viewpoint: DVec3, center: DVec3) -> f64 {
    let d = (center - viewpoint).abs();
    let (mut hi, mut med, mut lo) = (d.x, d.y, d.z);
    if hi < med {
        std::mem::swap(&mut hi, &mut med);
    }
    if hi < lo {
        std::mem::swap(&mut hi, &mut lo);
    }
    if med < lo {
        std::mem::swap(&mut med, &mut lo);
    }
    hi + (med + lo) / 4.0
}

#[derive(Debug)]
struct Slot {
    tile: Tile,
    generation: u32,
}

/// Arena of tile slots backed by a [`TileLoader`].
#[derive(Debug)]
pub struct TileCache<L> {
    slots: Vec<Slot>,
    scenery_root: PathBuf,
    loader: L,
    stats: CacheStats,
}

impl<L: TileLoader> TileCache<L> {
    /// Create a cache with `capacity` vacant slots.
    ///
    /// Tiles are looked up under `scenery_root`. A capacity of zero is
    /// rejected.
    pub fn new(capacity: usize, scenery_root: impl Into<PathBuf>, loader: L) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::config("cache capacity must be at least 1"));
        }
        let slots = (0..capacity)
            .map(|_| Slot {
                tile: Tile::vacant(),
                generation: 0,
            })
            .collect();
        Ok(Self {
            slots,
            scenery_root: scenery_root.into(),
            loader,
            stats: CacheStats::default(),
        })
    }

    /// Create a cache sized and rooted by a validated configuration.
    pub fn from_config(config: &crate::SceneryConfig, loader: L) -> Result<Self> {
        config.validate()?;
        Self::new(config.cache_capacity, config.scenery_root.clone(), loader)
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of resident slots.
    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.slots.iter().filter(|s| s.tile.resident).count()
    }

    /// Directory tiles are loaded from.
    #[must_use]
    pub fn scenery_root(&self) -> &Path {
        &self.scenery_root
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// The loader used to fill slots.
    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Mutable access to the loader.
    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Free every resident slot.
    pub fn init<R: RenderBackend + ?Sized>(&mut self, backend: &mut R) {
        for slot in 0..self.slots.len() {
            self.free(slot, backend);
        }
        tracing::debug!(capacity = self.slots.len(), "tile cache initialised");
    }

    /// The resident slot holding `cell`, if any.
    #[must_use]
    pub fn exists(&self, cell: &GridCell) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.tile.resident && s.tile.cell == *cell)
    }

    /// Pick a slot to load into.
    ///
    /// Returns the lowest vacant slot if there is one. Otherwise the resident
    /// tile farthest from `viewpoint` is freed and its slot returned; on a
    /// tie the lowest slot wins.
    pub fn next_available<R: RenderBackend + ?Sized>(
        &mut self,
        viewpoint: DVec3,
        backend: &mut R,
    ) -> usize {
        self.next_available_keeping(viewpoint, backend, &[])
    }

    /// [`next_available`](Self::next_available) that passes over the tiles
    /// named in `keep`.
    ///
    /// A kept tile is only evicted when every resident tile is kept.
    pub fn next_available_keeping<R: RenderBackend + ?Sized>(
        &mut self,
        viewpoint: DVec3,
        backend: &mut R,
        keep: &[TileRef],
    ) -> usize {
        if let Some(slot) = self.slots.iter().position(|s| !s.tile.resident) {
            return slot;
        }

        let mut farthest: Option<(usize, f64)> = None;
        let mut any = (0, f64::NEG_INFINITY);
        for (slot, entry) in self.slots.iter().enumerate() {
            let distance = eviction_distance(viewpoint, entry.tile.center);
            if distance > any.1 {
                any = (slot, distance);
            }
            let kept = keep
                .iter()
                .any(|r| r.slot == slot && r.generation == entry.generation);
            if !kept && farthest.is_none_or(|(_, best)| distance > best) {
                farthest = Some((slot, distance));
            }
        }
        let (farthest, max_distance) = farthest.unwrap_or_else(|| {
            tracing::warn!(
                capacity = self.slots.len(),
                "every resident tile is in use, evicting one anyway"
            );
            any
        });

        tracing::debug!(
            slot = farthest,
            cell = %self.slots[farthest].tile.cell,
            distance = max_distance,
            "evicting tile"
        );
        self.free(farthest, backend);
        self.stats.evictions += 1;
        farthest
    }

    /// Load `cell` into `slot` and return a reference to it.
    ///
    /// Whatever the slot held is freed first, as is any other slot already
    /// holding `cell`. A loader error leaves the slot resident with empty
    /// geometry. A slot outside the cache is logged and the returned
    /// reference never resolves.
    pub fn fill_in<R: RenderBackend + ?Sized>(
        &mut self,
        slot: usize,
        cell: GridCell,
        materials: &MaterialRegistry,
        backend: &mut R,
    ) -> TileRef {
        if slot >= self.slots.len() {
            tracing::warn!(
                %cell,
                slot,
                capacity = self.slots.len(),
                "fill requested outside the cache"
            );
            return TileRef {
                slot,
                generation: 0,
            };
        }
        self.free(slot, backend);
        if let Some(duplicate) = self.exists(&cell) {
            tracing::warn!(%cell, slot, duplicate, "cell already resident, freeing old slot");
            self.free(duplicate, backend);
        }

        let entry = &mut self.slots[slot];
        entry.generation = entry.generation.wrapping_add(1);
        let tile_ref = TileRef {
            slot,
            generation: entry.generation,
        };

        let path = TilePath::new(&self.scenery_root, &cell);
        let request = TileRequest {
            cell,
            path: &path,
            materials,
            tile: tile_ref,
        };
        let geometry = match self.loader.load_tile(&request) {
            Ok(geometry) => geometry,
            Err(e) => {
                tracing::warn!(%cell, slot, error = %e, "failed to load tile, using empty geometry");
                self.stats.load_failures += 1;
                TileGeometry::empty_at(&cell)
            }
        };

        let tile = Tile::build(cell, tile_ref, geometry);
        tracing::debug!(
            %cell,
            slot,
            fragments = tile.fragments.len(),
            triangles = tile.triangle_count(),
            "filled cache slot"
        );
        self.slots[slot].tile = tile;
        self.stats.fills += 1;
        tile_ref
    }

    /// Release a slot's render resources and mark it vacant.
    ///
    /// Freeing a vacant slot does nothing.
    pub fn free<R: RenderBackend + ?Sized>(&mut self, slot: usize, backend: &mut R) {
        let Some(entry) = self.slots.get_mut(slot) else {
            return;
        };
        if !entry.tile.resident {
            return;
        }
        for handle in entry.tile.fragments.iter().filter_map(|f| f.batch) {
            backend.release(handle);
        }
        entry.tile = Tile::vacant();
    }

    /// Find or load `cell`.
    ///
    /// A resident cell is a hit and is returned as is. Otherwise a slot is
    /// chosen with [`next_available`](Self::next_available) and filled.
    pub fn fetch<R: RenderBackend + ?Sized>(
        &mut self,
        cell: GridCell,
        viewpoint: DVec3,
        materials: &MaterialRegistry,
        backend: &mut R,
    ) -> TileRef {
        self.fetch_keeping(cell, viewpoint, materials, backend, &[])
    }

    /// [`fetch`](Self::fetch) that does not evict the tiles named in `keep`
    /// while any other resident tile can make room.
    pub fn fetch_keeping<R: RenderBackend + ?Sized>(
        &mut self,
        cell: GridCell,
        viewpoint: DVec3,
        materials: &MaterialRegistry,
        backend: &mut R,
        keep: &[TileRef],
    ) -> TileRef {
        if let Some(slot) = self.exists(&cell) {
            self.stats.hits += 1;
            return TileRef {
                slot,
                generation: self.slots[slot].generation,
            };
        }
        let slot = self.next_available_keeping(viewpoint, backend, keep);
        self.fill_in(slot, cell, materials, backend)
    }
}

impl<L> TileCache<L> {
    /// The tile in `slot`, if resident.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&Tile> {
        self.slots
            .get(slot)
            .map(|s| &s.tile)
            .filter(|tile| tile.resident)
    }

    /// A reference to the current contents of `slot`, if resident.
    #[must_use]
    pub fn tile_ref(&self, slot: usize) -> Option<TileRef> {
        let entry = self.slots.get(slot)?;
        entry.tile.resident.then_some(TileRef {
            slot,
            generation: entry.generation,
        })
    }

    /// The tile behind `tile`, if the slot still holds the same load.
    #[must_use]
    pub fn resolve(&self, tile: TileRef) -> Option<&Tile> {
        let entry = self.slots.get(tile.slot)?;
        (entry.tile.resident && entry.generation == tile.generation).then_some(&entry.tile)
    }

    /// Mutable variant of [`resolve`](Self::resolve).
    pub(crate) fn resolve_mut(&mut self, tile: TileRef) -> Option<&mut Tile> {
        let entry = self.slots.get_mut(tile.slot)?;
        (entry.tile.resident && entry.generation == tile.generation).then_some(&mut entry.tile)
    }

    /// The fragment behind `fragment` together with its tile.
    #[must_use]
    pub fn fragment(&self, fragment: FragmentRef) -> Option<(&Tile, &Fragment)> {
        let tile = self.resolve(fragment.tile)?;
        Some((tile, tile.fragments.get(fragment.fragment)?))
    }

    /// Resident tiles in slot order.
    pub fn iter_resident(&self) -> impl Iterator<Item = (TileRef, &Tile)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.tile.resident)
            .map(|(slot, s)| {
                (
                    TileRef {
                        slot,
                        generation: s.generation,
                    },
                    &s.tile,
                )
            })
    }
}
