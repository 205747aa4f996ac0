//! Tile loader seam.
//!
//! The cache turns a cell into geometry by calling a [`TileLoader`]. The
//! loader receives the derived on-disk location of the tile and the material
//! registry so it can resolve fragment material names while building.

use std::path::{Path, PathBuf};

use crate::bucket::GridCell;
use crate::error::Result;
use crate::material::MaterialRegistry;
use crate::tile::{TileGeometry, TileRef};

/// On-disk location of a cell's tile.
///
/// The layout is `<root>/Scenery/<base path>/<index>`, optionally with a
/// `.gz` suffix for compressed tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePath {
    path: PathBuf,
}

impl TilePath {
    /// Derive the tile location for a cell under a scenery root.
    #[must_use]
    pub fn new(root: &Path, cell: &GridCell) -> Self {
        Self {
            path: root
                .join("Scenery")
                .join(cell.base_path())
                .join(cell.index().to_string()),
        }
    }

    /// Uncompressed tile file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compressed tile file.
    #[must_use]
    pub fn compressed(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".gz");
        PathBuf::from(name)
    }
}

/// Everything a loader gets to build one tile.
#[derive(Debug, Clone, Copy)]
pub struct TileRequest<'a> {
    /// The cell to load.
    pub cell: GridCell,
    /// Where the cell's tile lives on disk.
    pub path: &'a TilePath,
    /// Registry to resolve material names against.
    pub materials: &'a MaterialRegistry,
    /// The slot the tile is being loaded into.
    pub tile: TileRef,
}

/// Builds tile geometry for a cell.
///
/// Loading is synchronous and runs to completion inside the frame that
/// requested it. Returning an error is not fatal: the cache keeps the slot
/// resident with empty geometry and logs the failure.
pub trait TileLoader {
    /// Load the tile for `request.cell`.
    fn load_tile(&mut self, request: &TileRequest<'_>) -> Result<TileGeometry>;
}

impl<L: TileLoader + ?Sized> TileLoader for Box<L> {
    fn load_tile(&mut self, request: &TileRequest<'_>) -> Result<TileGeometry> {
        (**self).load_tile(request)
    }
}

/// A loader that produces empty tiles.
///
/// This is useful when only the window bookkeeping matters, or for testing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTerrain;

impl NoTerrain {
    /// Create a new empty-tile loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TileLoader for NoTerrain {
    fn load_tile(&mut self, request: &TileRequest<'_>) -> Result<TileGeometry> {
        Ok(TileGeometry::empty_at(&request.cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_path_layout() {
        let cell = GridCell::new(-123, 37, 3, 5);
        let path = TilePath::new(Path::new("/data"), &cell);
        assert_eq!(
            path.path(),
            Path::new("/data/Scenery/w130n30/w123n37/942059")
        );
        assert_eq!(
            path.compressed(),
            PathBuf::from("/data/Scenery/w130n30/w123n37/942059.gz")
        );
    }
}
