//! Visibility predicates used for culling.
//!
//! Culling asks one question twice per tile: is a sphere at this offset from
//! the scenery centre, with this radius, inside the view? Once for the whole
//! tile, then once per fragment of a tile that passed.

use glam::{DMat4, DVec3, DVec4};

/// Decides whether a bounding sphere can be seen this frame.
pub trait Visibility {
    /// Whether a sphere centred at `offset` (relative to the scenery centre)
    /// with the given radius intersects the view.
    fn viewable(&self, offset: DVec3, radius: f64) -> bool;
}

impl<F: Fn(DVec3, f64) -> bool> Visibility for F {
    fn viewable(&self, offset: DVec3, radius: f64) -> bool {
        self(offset, radius)
    }
}

/// Accepts every sphere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl Visibility for AlwaysVisible {
    fn viewable(&self, _offset: DVec3, _radius: f64) -> bool {
        true
    }
}

/// A view frustum in scenery-centre-relative coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    /// Left, right, bottom, top, near and far planes as (normal, distance),
    /// normals pointing inwards.
    planes: [(DVec3, f64); 6],
}

impl Frustum {
    /// Extract the frustum planes from a view-projection matrix with an
    /// OpenGL-style `[-1, 1]` depth range.
    #[must_use]
    pub fn from_matrix(view_projection: DMat4) -> Self {
        let x = view_projection.row(0);
        let y = view_projection.row(1);
        let z = view_projection.row(2);
        let w = view_projection.row(3);

        Self {
            planes: [w + x, w - x, w + y, w - y, w + z, w - z].map(Self::normalize_plane),
        }
    }

    fn normalize_plane(plane: DVec4) -> (DVec3, f64) {
        let normal = plane.truncate();
        let length = normal.length();
        if length > 0.0 {
            (normal / length, plane.w / length)
        } else {
            (DVec3::ZERO, 0.0)
        }
    }

    /// Test whether a sphere intersects the frustum.
    #[must_use]
    pub fn intersects_sphere(&self, center: DVec3, radius: f64) -> bool {
        self.planes
            .iter()
            .all(|&(normal, distance)| normal.dot(center) + distance >= -radius)
    }
}

impl Visibility for Frustum {
    fn viewable(&self, offset: DVec3, radius: f64) -> bool {
        self.intersects_sphere(offset, radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_negative_z() -> Frustum {
        let view = DMat4::look_to_rh(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y);
        let projection =
            DMat4::perspective_rh_gl(std::f64::consts::FRAC_PI_2, 1.0, 1.0, 1000.0);
        Frustum::from_matrix(projection * view)
    }

    #[test]
    fn test_sphere_in_front_is_visible() {
        let frustum = looking_down_negative_z();
        assert!(frustum.viewable(DVec3::new(0.0, 0.0, -100.0), 1.0));
    }

    #[test]
    fn test_sphere_behind_is_culled() {
        let frustum = looking_down_negative_z();
        assert!(!frustum.viewable(DVec3::new(0.0, 0.0, 100.0), 1.0));
    }

    #[test]
    fn test_large_sphere_straddling_plane_is_visible() {
        let frustum = looking_down_negative_z();
        // Centre is outside the left plane but the radius reaches inside.
        assert!(!frustum.viewable(DVec3::new(-200.0, 0.0, -100.0), 1.0));
        assert!(frustum.viewable(DVec3::new(-200.0, 0.0, -100.0), 100.0));
    }

    #[test]
    fn test_beyond_far_plane_is_culled() {
        let frustum = looking_down_negative_z();
        assert!(!frustum.viewable(DVec3::new(0.0, 0.0, -2000.0), 10.0));
    }

    #[test]
    fn test_closure_predicate() {
        let above_ground = |offset: DVec3, radius: f64| offset.y + radius > 0.0;
        assert!(above_ground.viewable(DVec3::new(0.0, 1.0, 0.0), 0.5));
        assert!(!above_ground.viewable(DVec3::new(0.0, -2.0, 0.0), 0.5));
        assert!(AlwaysVisible.viewable(DVec3::ZERO, 0.0));
    }
}
