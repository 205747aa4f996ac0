//! Ground elevation under the viewpoint.
//!
//! A probe line is cast through the resident tile for a cell and tested
//! against its faces. Tiles and fragments whose bounding sphere the line
//! misses are skipped without looking at their faces.
//!
//! All face tests run in tile-local coordinates (relative to the tile
//! centre) so that node positions and the probe stay small.

use glam::DVec3;

use crate::bucket::GridCell;
use crate::cache::TileCache;
use crate::geo::{Viewpoint, ecef_to_geodetic};
use crate::intersect::{Plane, point_in_triangle, point_line_distance_squared, straddles};
use crate::tile::{Tile, TileRef};

/// Which intersection wins when the probe crosses several faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HitPolicy {
    /// The first face hit, walking fragments and faces in list order.
    #[default]
    FirstInListOrder,
    /// The hit closest to the probe start.
    Nearest,
}

/// A line to intersect with terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    /// First point on the line (ECEF).
    pub start: DVec3,
    /// Second point on the line (ECEF).
    pub end: DVec3,
    /// Only accept hits between `start` and `end`.
    pub side_check: bool,
}

impl Probe {
    /// The infinite line from `start` through the centre of the earth.
    #[must_use]
    pub fn toward_center(start: DVec3) -> Self {
        Self {
            start,
            end: DVec3::ZERO,
            side_check: false,
        }
    }

    /// The segment from `start` to `end`.
    #[must_use]
    pub fn segment(start: DVec3, end: DVec3) -> Self {
        Self {
            start,
            end,
            side_check: true,
        }
    }
}

/// Where a probe met the terrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    /// Intersection point (ECEF).
    pub point: DVec3,
    /// Height of the intersection above the WGS84 ellipsoid in metres.
    pub altitude: f64,
    /// The tile that was hit.
    pub tile: TileRef,
}

/// Ray versus terrain intersection over cached tiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElevationQuery {
    policy: HitPolicy,
}

impl ElevationQuery {
    /// Create a query with the given hit policy.
    #[must_use]
    pub fn new(policy: HitPolicy) -> Self {
        Self { policy }
    }

    /// The hit policy in use.
    #[must_use]
    pub fn policy(&self) -> HitPolicy {
        self.policy
    }

    /// Intersect a probe with one tile, returning the hit in ECEF.
    #[must_use]
    pub fn intersect_tile(&self, tile: &Tile, probe: &Probe) -> Option<DVec3> {
        let start = probe.start - tile.center;
        let end = probe.end - tile.center;
        let direction = end - start;

        if misses_sphere(DVec3::ZERO, tile.bounding_radius, start, direction) {
            return None;
        }

        let mut nearest: Option<(f64, DVec3)> = None;
        for fragment in &tile.fragments {
            if misses_sphere(
                fragment.center - tile.center,
                fragment.bounding_radius,
                start,
                direction,
            ) {
                continue;
            }

            for face in &fragment.faces {
                let corners = tile.face_points(face);
                let [p1, p2, p3] = corners;
                let Some(hit) = Plane::from_points(p1, p2, p3).intersect_line(start, end) else {
                    continue;
                };
                if probe.side_check && !straddles(hit, start, end) {
                    continue;
                }
                if !point_in_triangle(corners, hit) {
                    continue;
                }

                match self.policy {
                    HitPolicy::FirstInListOrder => return Some(hit + tile.center),
                    HitPolicy::Nearest => {
                        let distance = hit.distance_squared(start);
                        if nearest.is_none_or(|(best, _)| distance < best) {
                            nearest = Some((distance, hit));
                        }
                    }
                }
            }
        }
        nearest.map(|(_, hit)| hit + tile.center)
    }

    /// Intersect a probe with the resident tile for `cell`.
    ///
    /// Returns `None` if the cell is not resident or the probe misses.
    #[must_use]
    pub fn intersect<L>(
        &self,
        cache: &TileCache<L>,
        cell: &GridCell,
        probe: &Probe,
    ) -> Option<GroundHit> {
        let Some((tile_ref, tile)) = cache.iter_resident().find(|(_, t)| t.cell == *cell) else {
            tracing::debug!(%cell, "no resident tile for elevation query");
            return None;
        };
        let point = self.intersect_tile(tile, probe)?;
        Some(GroundHit {
            point,
            altitude: ecef_to_geodetic(point).alt_m,
            tile: tile_ref,
        })
    }

    /// Ground directly below (or above) the viewpoint.
    #[must_use]
    pub fn ground_elevation<L>(
        &self,
        cache: &TileCache<L>,
        viewpoint: &Viewpoint,
    ) -> Option<GroundHit> {
        let cell = GridCell::containing(viewpoint.lon_deg, viewpoint.lat_deg);
        self.intersect(cache, &cell, &Probe::toward_center(viewpoint.position))
    }
}

fn misses_sphere(center: DVec3, radius: f64, start: DVec3, direction: DVec3) -> bool {
    point_line_distance_squared(center, start, direction) > radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::geo::{EQUATORIAL_RADIUS_M, geodetic_to_ecef};
    use crate::loader::{NoTerrain, TileLoader, TileRequest};
    use crate::material::MaterialRegistry;
    use crate::render::NullBackend;
    use crate::tile::{Face, FragmentGeometry, TileGeometry};

    const GROUND: f64 = 100.0;

    /// A tile at the equator and prime meridian with one flat face per
    /// terrace, each a right triangle facing up at its height above
    /// `GROUND` and covering the tile centre.
    struct Terraces {
        tile_radius: f64,
        /// Height and fragment bounding radius of each terrace.
        terraces: Vec<(f64, f64)>,
    }

    impl Terraces {
        fn wide(heights: &[f64]) -> Self {
            Self {
                tile_radius: 100_000.0,
                terraces: heights.iter().map(|&h| (h, 100_000.0)).collect(),
            }
        }
    }

    impl TileLoader for Terraces {
        fn load_tile(&mut self, _request: &TileRequest<'_>) -> Result<TileGeometry> {
            let center = geodetic_to_ecef(0.0, 0.0, GROUND);
            let mut geometry = TileGeometry {
                center,
                bounding_radius: self.tile_radius,
                ..TileGeometry::default()
            };
            for &(height, radius) in &self.terraces {
                let base = u32::try_from(geometry.nodes.len()).unwrap();
                geometry.nodes.extend([
                    DVec3::new(height, -500.0, -500.0),
                    DVec3::new(height, 1000.0, -500.0),
                    DVec3::new(height, -500.0, 1000.0),
                ]);
                geometry.fragments.push(FragmentGeometry {
                    center,
                    bounding_radius: radius,
                    faces: vec![Face::new(base, base + 1, base + 2)],
                    ..FragmentGeometry::default()
                });
            }
            Ok(geometry)
        }
    }

    fn cache_of(loader: Terraces) -> TileCache<Terraces> {
        let mut cache = TileCache::new(1, "/scenery", loader).unwrap();
        let materials = MaterialRegistry::new(1);
        cache.fetch(
            GridCell::containing(0.0, 0.0),
            DVec3::ZERO,
            &materials,
            &mut NullBackend,
        );
        cache
    }

    fn cache_with(heights: &[f64]) -> TileCache<Terraces> {
        cache_of(Terraces::wide(heights))
    }

    /// About 330 m east of the tile centre, over the faces.
    fn off_centre() -> Viewpoint {
        Viewpoint::from_geodetic(0.003, 0.0, 1000.0)
    }

    #[test]
    fn test_flat_face_returns_its_height() {
        let cache = cache_with(&[0.0]);
        let viewpoint = Viewpoint::from_geodetic(0.0, 0.0, 1000.0);

        let hit = ElevationQuery::default()
            .ground_elevation(&cache, &viewpoint)
            .unwrap();
        assert!((hit.altitude - GROUND).abs() < 1e-6);
        assert!((hit.point.x - (EQUATORIAL_RADIUS_M + GROUND)).abs() < 1e-6);
        assert_eq!(hit.tile.slot, 0);
    }

    #[test]
    fn test_probe_outside_footprint_misses() {
        let cache = cache_with(&[0.0]);
        // About 11 km east, well past the face but inside the tile's sphere.
        let viewpoint = Viewpoint::from_geodetic(0.1, 0.0, 1000.0);
        let cell = GridCell::containing(0.0, 0.0);

        let query = ElevationQuery::default();
        assert!(
            query
                .intersect(&cache, &cell, &Probe::toward_center(viewpoint.position))
                .is_none()
        );
    }

    #[test]
    fn test_missing_tile_is_none() {
        let mut cache = TileCache::new(1, "/scenery", NoTerrain).unwrap();
        let materials = MaterialRegistry::new(1);
        cache.fetch(
            GridCell::containing(10.0, 10.0),
            DVec3::ZERO,
            &materials,
            &mut NullBackend,
        );
        let viewpoint = Viewpoint::from_geodetic(0.0, 0.0, 1000.0);
        assert!(
            ElevationQuery::default()
                .ground_elevation(&cache, &viewpoint)
                .is_none()
        );
    }

    #[test]
    fn test_first_in_list_order_versus_nearest() {
        let cache = cache_with(&[0.0, 50.0]);
        let viewpoint = Viewpoint::from_geodetic(0.0, 0.0, 1000.0);

        let first = ElevationQuery::new(HitPolicy::FirstInListOrder)
            .ground_elevation(&cache, &viewpoint)
            .unwrap();
        assert!((first.altitude - GROUND).abs() < 1e-6);

        let nearest = ElevationQuery::new(HitPolicy::Nearest)
            .ground_elevation(&cache, &viewpoint)
            .unwrap();
        assert!((nearest.altitude - (GROUND + 50.0)).abs() < 1e-6);
    }

    #[test]
    fn test_segment_must_reach_the_ground() {
        let cache = cache_with(&[0.0]);
        let cell = GridCell::containing(0.0, 0.0);
        let query = ElevationQuery::default();

        let above = geodetic_to_ecef(0.0, 0.0, 1000.0);
        let still_above = geodetic_to_ecef(0.0, 0.0, 500.0);
        let below = geodetic_to_ecef(0.0, 0.0, -500.0);

        assert!(
            query
                .intersect(&cache, &cell, &Probe::segment(above, still_above))
                .is_none()
        );
        let hit = query
            .intersect(&cache, &cell, &Probe::segment(above, below))
            .unwrap();
        assert!((hit.altitude - GROUND).abs() < 1e-6);
    }

    #[test]
    fn test_probe_outside_tile_sphere_is_rejected() {
        let query = ElevationQuery::default();
        let narrow = cache_of(Terraces {
            tile_radius: 100.0,
            terraces: vec![(0.0, 100_000.0)],
        });
        assert!(query.ground_elevation(&narrow, &off_centre()).is_none());

        let covering = cache_of(Terraces {
            tile_radius: 1_000.0,
            terraces: vec![(0.0, 100_000.0)],
        });
        let hit = query.ground_elevation(&covering, &off_centre()).unwrap();
        assert!((hit.altitude - GROUND).abs() < 0.05);
    }

    #[test]
    fn test_probe_outside_fragment_sphere_skips_its_faces() {
        // The first terrace would be hit first but its sphere is too small.
        let cache = cache_of(Terraces {
            tile_radius: 100_000.0,
            terraces: vec![(0.0, 100.0), (50.0, 100_000.0)],
        });
        let hit = ElevationQuery::default()
            .ground_elevation(&cache, &off_centre())
            .unwrap();
        assert!((hit.altitude - (GROUND + 50.0)).abs() < 0.05);
    }
}
