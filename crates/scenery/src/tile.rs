//! Tile geometry records.
//!
//! A [`Tile`] holds everything loaded for one [`GridCell`]: a shared node
//! list, fragments grouping faces by material, and a bounding sphere. Tiles
//! live in [`TileCache`](crate::TileCache) slots and are referred to from the
//! outside through generation-checked [`TileRef`]s.

use glam::{DMat4, DVec3};

use crate::bucket::GridCell;
use crate::geo::geodetic_to_ecef;
use crate::material::MaterialId;

/// Handle to a cache slot, valid only while the slot holds the same load.
///
/// The generation is bumped every time the slot is filled, so a reference
/// kept past an eviction no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRef {
    /// Slot index in the cache.
    pub slot: usize,
    /// Fill generation of the slot when this reference was taken.
    pub generation: u32,
}

/// Handle to one fragment of a cached tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentRef {
    /// The owning tile.
    pub tile: TileRef,
    /// Position of the fragment in the tile's fragment list.
    pub fragment: usize,
}

/// Opaque precompiled draw batch produced by the loader for the render backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchHandle(pub u64);

/// One triangle, as indices into the owning tile's node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    /// Node indices of the three corners.
    pub nodes: [u32; 3],
}

impl Face {
    /// Create a face from three node indices.
    #[must_use]
    pub fn new(n1: u32, n2: u32, n3: u32) -> Self {
        Self {
            nodes: [n1, n2, n3],
        }
    }
}

/// Faces sharing one material, the unit of render batching.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Centre of the fragment's bounding sphere (ECEF).
    pub center: DVec3,
    /// Radius of the fragment's bounding sphere in metres.
    pub bounding_radius: f64,
    /// Material used to draw the fragment; `None` if the name did not resolve.
    pub material: Option<MaterialId>,
    /// Owning tile.
    pub tile: TileRef,
    /// Draw batch for the render backend.
    pub batch: Option<BatchHandle>,
    /// Triangles in this fragment.
    pub faces: Vec<Face>,
}

/// Geometry for one fragment as produced by a loader.
#[derive(Debug, Clone, Default)]
pub struct FragmentGeometry {
    /// Centre of the bounding sphere (ECEF).
    pub center: DVec3,
    /// Radius of the bounding sphere in metres.
    pub bounding_radius: f64,
    /// Resolved material, if any.
    pub material: Option<MaterialId>,
    /// Draw batch for the render backend.
    pub batch: Option<BatchHandle>,
    /// Triangles referencing the tile's node list.
    pub faces: Vec<Face>,
}

/// Geometry for one tile as produced by a loader.
#[derive(Debug, Clone, Default)]
pub struct TileGeometry {
    /// Centre of the tile's bounding sphere (ECEF).
    pub center: DVec3,
    /// Radius of the tile's bounding sphere in metres.
    pub bounding_radius: f64,
    /// Node positions relative to `center`.
    pub nodes: Vec<DVec3>,
    /// Fragments in draw and query order.
    pub fragments: Vec<FragmentGeometry>,
}

impl TileGeometry {
    /// Geometry with no nodes, centred on the cell at sea level.
    ///
    /// Used for cells whose load failed so the slot still has a sensible
    /// position for eviction ordering.
    #[must_use]
    pub fn empty_at(cell: &GridCell) -> Self {
        let (lon, lat) = cell.center_lon_lat();
        Self {
            center: geodetic_to_ecef(lon, lat, 0.0),
            ..Self::default()
        }
    }
}

/// All geometry belonging to one grid cell.
///
/// Geometry is fixed once built; only the cache changes residency, and the
/// per-frame offset and view matrix are the only mutable state.
#[derive(Debug, Clone)]
pub struct Tile {
    pub(crate) cell: GridCell,
    pub(crate) resident: bool,
    pub(crate) center: DVec3,
    pub(crate) bounding_radius: f64,
    /// Node positions relative to `center`.
    pub(crate) nodes: Vec<DVec3>,
    pub(crate) fragments: Vec<Fragment>,
    pub(crate) offset: DVec3,
    pub(crate) view_matrix: DMat4,
}

impl Tile {
    /// An unused slot's tile.
    #[must_use]
    pub(crate) fn vacant() -> Self {
        Self {
            cell: GridCell::default(),
            resident: false,
            center: DVec3::ZERO,
            bounding_radius: 0.0,
            nodes: Vec::new(),
            fragments: Vec::new(),
            offset: DVec3::ZERO,
            view_matrix: DMat4::IDENTITY,
        }
    }

    /// Build a resident tile from loader output.
    ///
    /// Faces with a node index outside the node list are dropped so that
    /// every stored face can be indexed without checks.
    #[must_use]
    pub(crate) fn build(cell: GridCell, tile: TileRef, geometry: TileGeometry) -> Self {
        let node_count = geometry.nodes.len();
        let fragments = geometry
            .fragments
            .into_iter()
            .map(|fragment| {
                let total = fragment.faces.len();
                let faces: Vec<Face> = fragment
                    .faces
                    .into_iter()
                    .filter(|face| face.nodes.iter().all(|&n| (n as usize) < node_count))
                    .collect();
                if faces.len() != total {
                    tracing::warn!(
                        %cell,
                        dropped = total - faces.len(),
                        "dropping faces with out-of-range node indices"
                    );
                }
                Fragment {
                    center: fragment.center,
                    bounding_radius: fragment.bounding_radius,
                    material: fragment.material,
                    tile,
                    batch: fragment.batch,
                    faces,
                }
            })
            .collect();

        Self {
            cell,
            resident: true,
            center: geometry.center,
            bounding_radius: geometry.bounding_radius,
            nodes: geometry.nodes,
            fragments,
            offset: DVec3::ZERO,
            view_matrix: DMat4::IDENTITY,
        }
    }

    /// The cell this tile was loaded for.
    #[must_use]
    pub fn cell(&self) -> GridCell {
        self.cell
    }

    /// Whether the owning slot is in use.
    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.resident
    }

    /// Centre of the tile's bounding sphere (ECEF).
    #[must_use]
    pub fn center(&self) -> DVec3 {
        self.center
    }

    /// Radius of the tile's bounding sphere in metres.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Node positions relative to [`center`](Self::center).
    #[must_use]
    pub fn nodes(&self) -> &[DVec3] {
        &self.nodes
    }

    /// Fragments in list order.
    #[must_use]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Centre relative to the scenery centre as of the last render.
    #[must_use]
    pub fn offset(&self) -> DVec3 {
        self.offset
    }

    /// View transform translated to this tile as of the last render.
    #[must_use]
    pub fn view_matrix(&self) -> DMat4 {
        self.view_matrix
    }

    /// Corners of a face relative to the tile centre.
    #[must_use]
    pub fn face_points(&self, face: &Face) -> [DVec3; 3] {
        face.nodes.map(|n| self.nodes[n as usize])
    }

    /// Whether the tile holds no geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Total number of triangles across all fragments.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.fragments.iter().map(|f| f.faces.len()).sum()
    }

    /// Recompute the offset from the scenery centre.
    pub fn update_offset(&mut self, scenery_center: DVec3) {
        self.offset = self.center - scenery_center;
    }

    /// Recompute the per-tile view transform from the frame's view matrix.
    pub fn update_view_matrix(&mut self, view: &DMat4) {
        self.view_matrix = *view * DMat4::from_translation(self.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_ref() -> TileRef {
        TileRef {
            slot: 0,
            generation: 1,
        }
    }

    #[test]
    fn test_build_drops_out_of_range_faces() {
        let geometry = TileGeometry {
            center: DVec3::new(1.0, 2.0, 3.0),
            bounding_radius: 10.0,
            nodes: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
            fragments: vec![FragmentGeometry {
                faces: vec![Face::new(0, 1, 2), Face::new(0, 1, 3)],
                ..FragmentGeometry::default()
            }],
        };
        let tile = Tile::build(GridCell::new(1, 2, 3, 4), tile_ref(), geometry);
        assert!(tile.resident);
        assert_eq!(tile.fragments.len(), 1);
        assert_eq!(tile.fragments[0].faces, vec![Face::new(0, 1, 2)]);
        assert_eq!(tile.fragments[0].tile, tile_ref());
        assert_eq!(tile.triangle_count(), 1);
    }

    #[test]
    fn test_view_matrix_translates_by_offset() {
        let mut tile = Tile::build(
            GridCell::default(),
            tile_ref(),
            TileGeometry {
                center: DVec3::new(100.0, 0.0, 0.0),
                ..TileGeometry::default()
            },
        );
        tile.update_offset(DVec3::new(90.0, 0.0, 0.0));
        assert_eq!(tile.offset, DVec3::new(10.0, 0.0, 0.0));

        tile.update_view_matrix(&DMat4::IDENTITY);
        let origin = tile.view_matrix.transform_point3(DVec3::ZERO);
        assert_eq!(origin, DVec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_empty_at_uses_cell_centre() {
        let cell = GridCell::new(0, 0, 0, 0);
        let geometry = TileGeometry::empty_at(&cell);
        assert!(geometry.nodes.is_empty());
        assert!(geometry.center.x > 6_000_000.0);
    }
}
