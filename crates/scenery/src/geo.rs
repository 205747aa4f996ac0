//! Geodetic coordinate conversions.
//!
//! Converts between WGS84 geodetic coordinates (longitude, latitude,
//! altitude above the ellipsoid) and earth-centred, earth-fixed (ECEF)
//! cartesian coordinates in metres. Tile geometry, the viewpoint and
//! elevation probes all live in ECEF.

use glam::DVec3;

/// WGS84 equatorial radius in metres.
pub const EQUATORIAL_RADIUS_M: f64 = 6_378_137.0;

/// WGS84 flattening.
pub const FLATTENING: f64 = 1.0 / 298.257_223_563;

/// WGS84 polar radius in metres.
pub const POLAR_RADIUS_M: f64 = EQUATORIAL_RADIUS_M * (1.0 - FLATTENING);

/// First eccentricity squared.
const E2: f64 = FLATTENING * (2.0 - FLATTENING);

/// A geodetic position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    /// Longitude in degrees, east positive.
    pub lon_deg: f64,
    /// Latitude in degrees, north positive.
    pub lat_deg: f64,
    /// Height above the ellipsoid in metres.
    pub alt_m: f64,
}

/// Convert geodetic coordinates to ECEF.
#[must_use]
pub fn geodetic_to_ecef(lon_deg: f64, lat_deg: f64, alt_m: f64) -> DVec3 {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let n = prime_vertical_radius(sin_lat);
    DVec3::new(
        (n + alt_m) * cos_lat * lon.cos(),
        (n + alt_m) * cos_lat * lon.sin(),
        (n * (1.0 - E2) + alt_m) * sin_lat,
    )
}

/// Convert ECEF coordinates to geodetic.
///
/// Iterates the latitude until it settles; a handful of rounds is enough for
/// sub-millimetre accuracy anywhere near the surface.
#[must_use]
pub fn ecef_to_geodetic(position: DVec3) -> Geodetic {
    let lon = position.y.atan2(position.x);
    let rho = position.x.hypot(position.y);

    // On the polar axis the longitude is arbitrary and the iteration below
    // divides by cos(lat).
    if rho < 1e-9 {
        let lat_deg = if position.z >= 0.0 { 90.0 } else { -90.0 };
        return Geodetic {
            lon_deg: 0.0,
            lat_deg,
            alt_m: position.z.abs() - POLAR_RADIUS_M,
        };
    }

    let mut lat = position.z.atan2(rho * (1.0 - E2));
    let mut alt = 0.0;
    for _ in 0..8 {
        let n = prime_vertical_radius(lat.sin());
        alt = rho / lat.cos() - n;
        lat = position.z.atan2(rho * (1.0 - E2 * n / (n + alt)));
    }

    Geodetic {
        lon_deg: lon.to_degrees(),
        lat_deg: lat.to_degrees(),
        alt_m: alt,
    }
}

/// Unit vector normal to the ellipsoid at a geodetic position.
#[must_use]
pub fn local_up(lon_deg: f64, lat_deg: f64) -> DVec3 {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    DVec3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

fn prime_vertical_radius(sin_lat: f64) -> f64 {
    EQUATORIAL_RADIUS_M / (1.0 - E2 * sin_lat * sin_lat).sqrt()
}

/// The observer the tile manager streams terrain around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewpoint {
    /// Longitude in degrees.
    pub lon_deg: f64,
    /// Latitude in degrees.
    pub lat_deg: f64,
    /// Height above the ellipsoid in metres.
    pub alt_m: f64,
    /// ECEF position matching the geodetic fields.
    pub position: DVec3,
}

impl Viewpoint {
    /// Create a viewpoint from geodetic coordinates.
    #[must_use]
    pub fn from_geodetic(lon_deg: f64, lat_deg: f64, alt_m: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            alt_m,
            position: geodetic_to_ecef(lon_deg, lat_deg, alt_m),
        }
    }

    /// Create a viewpoint from an ECEF position.
    #[must_use]
    pub fn from_ecef(position: DVec3) -> Self {
        let geodetic = ecef_to_geodetic(position);
        Self {
            lon_deg: geodetic.lon_deg,
            lat_deg: geodetic.lat_deg,
            alt_m: geodetic.alt_m,
            position,
        }
    }
}
