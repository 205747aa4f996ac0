//! Great-circle flight path and camera.

use glam::{DMat4, DVec3};
use scenery::Viewpoint;
use scenery::geo::local_up;

/// Approximate length of one degree of latitude in metres.
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Sphere radius giving [`METRES_PER_DEGREE`] along a great circle.
const EARTH_RADIUS_M: f64 = METRES_PER_DEGREE * 180.0 / std::f64::consts::PI;

/// Vertical field of view.
const FOV_Y_DEG: f64 = 60.0;

/// Far clip distance in metres.
const FAR_M: f64 = 60_000.0;

/// Position and heading of the aircraft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flight {
    pub lon_deg: f64,
    pub lat_deg: f64,
    /// Degrees clockwise from north.
    pub heading_deg: f64,
}

impl Flight {
    #[must_use]
    pub fn new(lon_deg: f64, lat_deg: f64, heading_deg: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            heading_deg,
        }
    }

    /// Move `metres` along the great circle through the current heading.
    ///
    /// The heading is updated to the track's direction at the new position.
    pub fn advance(&mut self, metres: f64) {
        let angle = metres / EARTH_RADIUS_M;
        let (sin_a, cos_a) = angle.sin_cos();
        let (sin_h, cos_h) = self.heading_deg.to_radians().sin_cos();
        let lat1 = self.lat_deg.to_radians();
        let lon1 = self.lon_deg.to_radians();

        let lat2 = (lat1.sin() * cos_a + lat1.cos() * sin_a * cos_h).clamp(-1.0, 1.0).asin();
        let lon2 = lon1 + (sin_h * sin_a * lat1.cos()).atan2(cos_a - lat1.sin() * lat2.sin());

        // Bearing back to the start, reversed.
        let back = lon1 - lon2;
        let reverse = (back.sin() * lat1.cos())
            .atan2(lat2.cos() * lat1.sin() - lat2.sin() * lat1.cos() * back.cos());

        self.lat_deg = lat2.to_degrees();
        self.lon_deg = (lon2.to_degrees() + 180.0).rem_euclid(360.0) - 180.0;
        self.heading_deg = (reverse.to_degrees() + 180.0).rem_euclid(360.0);
    }

    /// The viewpoint `altitude` metres above the ellipsoid.
    #[must_use]
    pub fn viewpoint(&self, altitude: f64) -> Viewpoint {
        Viewpoint::from_geodetic(self.lon_deg, self.lat_deg, altitude)
    }

    /// Unit vector along the heading, tangent to the ellipsoid.
    fn forward(&self) -> DVec3 {
        let lon = self.lon_deg.to_radians();
        let lat = self.lat_deg.to_radians();
        let east = DVec3::new(-lon.sin(), lon.cos(), 0.0);
        let north = DVec3::new(-lat.sin() * lon.cos(), -lat.sin() * lon.sin(), lat.cos());
        let (sin_h, cos_h) = self.heading_deg.to_radians().sin_cos();
        (north * cos_h + east * sin_h).normalize()
    }

    /// View matrix with `scenery_center` as the world origin, looking ahead
    /// and slightly down.
    #[must_use]
    pub fn view(&self, viewpoint: &Viewpoint, scenery_center: DVec3) -> DMat4 {
        let up = local_up(self.lon_deg, self.lat_deg);
        let look = (self.forward() - up * 0.2).normalize();
        DMat4::look_to_rh(viewpoint.position - scenery_center, look, up)
    }

    /// Perspective projection for a 16:9 view.
    #[must_use]
    pub fn projection() -> DMat4 {
        DMat4::perspective_rh_gl(FOV_Y_DEG.to_radians(), 16.0 / 9.0, 1.0, FAR_M)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenery::{Frustum, Visibility};

    #[test]
    fn test_advance_east_at_equator() {
        let mut flight = Flight::new(10.0, 0.0, 90.0);
        flight.advance(METRES_PER_DEGREE);
        assert!((flight.lon_deg - 11.0).abs() < 1e-9);
        assert!(flight.lat_deg.abs() < 1e-9);
    }

    #[test]
    fn test_advance_wraps_antimeridian() {
        let mut flight = Flight::new(179.5, 0.0, 90.0);
        flight.advance(METRES_PER_DEGREE);
        assert!((flight.lon_deg + 179.5).abs() < 1e-9);
    }

    #[test]
    fn test_advance_follows_great_circle() {
        // A quarter circle from the equator heading north-east peaks at 45°N,
        // 90° further east, flying due east.
        let mut flight = Flight::new(0.0, 0.0, 45.0);
        flight.advance(90.0 * METRES_PER_DEGREE);
        assert!((flight.lat_deg - 45.0).abs() < 1e-6);
        assert!((flight.lon_deg - 90.0).abs() < 1e-6);
        assert!((flight.heading_deg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_view_sees_ahead_not_behind() {
        let flight = Flight::new(8.5, 47.3, 0.0);
        let viewpoint = flight.viewpoint(1_500.0);
        let origin = viewpoint.position;
        let view = flight.view(&viewpoint, origin);
        let frustum = Frustum::from_matrix(Flight::projection() * view);

        let ahead = flight.forward() * 5_000.0 - local_up(8.5, 47.3) * 1_000.0;
        assert!(frustum.viewable(ahead, 10.0));
        assert!(!frustum.viewable(-ahead, 10.0));
    }
}
