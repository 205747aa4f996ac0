//! Procedural terrain loader.
//!
//! Builds each cell as a regular grid of triangles over a smooth height
//! field, split into fragments by height band. Nothing is read from disk.

use std::f64::consts::TAU;

use glam::DVec3;
use scenery::geo::geodetic_to_ecef;
use scenery::{
    BatchHandle, Face, FragmentGeometry, Result, TileGeometry, TileLoader, TileRequest,
};

/// Quads along each side of a cell.
const QUADS: u32 = 8;

/// Wavelength of the height field in degrees.
const WAVELENGTH_DEG: f64 = 0.5;

/// Materials the terrain refers to, in the registry properties format.
pub const DEFAULT_MATERIALS: &str = "
water {
    diffuse = 0.1 0.2 0.5
    alpha = yes
}

grass {
    texture = grass.rgb
    diffuse = 0.4 0.6 0.3
}

rock {
    texture = rock.rgb
    diffuse = 0.5 0.5 0.45
}

snow {
    texture = snow.rgb
    diffuse = 0.95 0.95 0.95
    specular = 0.3 0.3 0.3
    shininess = 20
}
";

/// Terrain height in metres at a geodetic position.
#[must_use]
pub fn height(lon_deg: f64, lat_deg: f64) -> f64 {
    600.0
        + 700.0 * (TAU * lon_deg / WAVELENGTH_DEG).sin() * (TAU * lat_deg / WAVELENGTH_DEG).cos()
}

fn band(height: f64) -> usize {
    match height {
        h if h <= 0.0 => 0,
        h if h < 700.0 => 1,
        h if h < 1_100.0 => 2,
        _ => 3,
    }
}

const BAND_MATERIALS: [&str; 4] = ["water", "grass", "rock", "snow"];

/// Generates tiles from [`height`].
#[derive(Debug, Default)]
pub struct ProceduralTerrain {
    next_handle: u64,
    tiles_built: u64,
}

impl ProceduralTerrain {
    /// Create a loader with no batches handed out yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw batches created so far.
    #[must_use]
    pub fn batches_built(&self) -> u64 {
        self.next_handle
    }

    /// Tiles generated so far.
    #[must_use]
    pub fn tiles_built(&self) -> u64 {
        self.tiles_built
    }
}

impl TileLoader for ProceduralTerrain {
    fn load_tile(&mut self, request: &TileRequest<'_>) -> Result<TileGeometry> {
        let cell = request.cell;
        let (lon0, lat0) = cell.origin_lon_lat();
        let (span_lon, span_lat) = cell.span();
        let step_lon = span_lon / f64::from(QUADS);
        let step_lat = span_lat / f64::from(QUADS);

        let (center_lon, center_lat) = cell.center_lon_lat();
        let center = geodetic_to_ecef(center_lon, center_lat, height(center_lon, center_lat));

        let mut heights = Vec::new();
        let mut nodes = Vec::new();
        for j in 0..=QUADS {
            for i in 0..=QUADS {
                let lon = lon0 + f64::from(i) * step_lon;
                let lat = lat0 + f64::from(j) * step_lat;
                let h = height(lon, lat);
                heights.push(h);
                nodes.push(geodetic_to_ecef(lon, lat, h) - center);
            }
        }
        let bounding_radius = nodes.iter().map(|n| n.length()).fold(0.0, f64::max);

        let mut bands: [Vec<Face>; 4] = Default::default();
        let node = |i: u32, j: u32| j * (QUADS + 1) + i;
        for j in 0..QUADS {
            for i in 0..QUADS {
                let quad = [
                    node(i, j),
                    node(i + 1, j),
                    node(i + 1, j + 1),
                    node(i, j + 1),
                ];
                for face in [
                    Face::new(quad[0], quad[1], quad[2]),
                    Face::new(quad[0], quad[2], quad[3]),
                ] {
                    let mean = face.nodes.iter().map(|&n| heights[n as usize]).sum::<f64>() / 3.0;
                    bands[band(mean)].push(face);
                }
            }
        }

        let mut fragments = Vec::new();
        for (faces, name) in bands.into_iter().zip(BAND_MATERIALS) {
            if faces.is_empty() {
                continue;
            }
            let used: Vec<DVec3> = faces
                .iter()
                .flat_map(|f| f.nodes)
                .map(|n| nodes[n as usize])
                .collect();
            #[allow(clippy::cast_precision_loss)]
            let local_center = used.iter().copied().sum::<DVec3>() / used.len() as f64;
            let radius = used
                .iter()
                .map(|p| p.distance(local_center))
                .fold(0.0, f64::max);

            self.next_handle += 1;
            fragments.push(FragmentGeometry {
                center: center + local_center,
                bounding_radius: radius,
                material: request.materials.resolve(name),
                batch: Some(BatchHandle(self.next_handle)),
                faces,
            });
        }

        self.tiles_built += 1;
        tracing::trace!(
            %cell,
            path = %request.path.path().display(),
            fragments = fragments.len(),
            "generated tile"
        );

        Ok(TileGeometry {
            center,
            bounding_radius,
            nodes,
            fragments,
        })
    }
}
