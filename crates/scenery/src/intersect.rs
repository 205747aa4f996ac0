//! Line versus triangle primitives for ground queries.
//!
//! Lines are parametrised by their x coordinate. This suits the probes used
//! to find the ground but is not a general 3-D line solver.

use glam::{DVec2, DVec3};

/// Tolerance for near-zero extents and denominators.
pub const EPSILON: f64 = 1e-7;

/// Squared distance from `point` to the infinite line through `origin`
/// along `direction`.
#[must_use]
pub fn point_line_distance_squared(point: DVec3, origin: DVec3, direction: DVec3) -> f64 {
    let v = point - origin;
    let length_squared = direction.length_squared();
    if length_squared <= EPSILON * EPSILON {
        return v.length_squared();
    }
    let along = v.dot(direction) / length_squared;
    (v - direction * along).length_squared()
}

/// A plane `normal . p = d`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unnormalised plane normal.
    pub normal: DVec3,
    /// Plane constant.
    pub d: f64,
}

impl Plane {
    /// The plane through three points, normal following their winding.
    #[must_use]
    pub fn from_points(p1: DVec3, p2: DVec3, p3: DVec3) -> Self {
        let normal = (p2 - p1).cross(p3 - p1);
        Self {
            normal,
            d: normal.dot(p1),
        }
    }

    /// Intersect the infinite line through `end0` and `end1` with the plane.
    ///
    /// The line is parametrised by x. If both ends share an x coordinate the
    /// reciprocal slope is taken as zero, which makes the line parallel to
    /// the x axis through `end0`. Returns `None` when the line and plane are
    /// parallel.
    #[must_use]
    pub fn intersect_line(&self, end0: DVec3, end1: DVec3) -> Option<DVec3> {
        let DVec3 { x: a, y: b, z: c } = self.normal;
        let dx = end1.x - end0.x;
        let inv_dx = if dx.abs() > EPSILON { 1.0 / dx } else { 0.0 };
        let dy = end1.y - end0.y;
        let dz = end1.z - end0.z;

        let ty = b * dy * inv_dx;
        let tz = c * dz * inv_dx;
        let denominator = a + ty + tz;
        if denominator.abs() <= EPSILON {
            return None;
        }

        let x = (ty * end0.x - b * end0.y + tz * end0.x - c * end0.z + self.d) / denominator;
        let t = inv_dx * (x - end0.x);
        Some(DVec3::new(x, dy * t + end0.y, dz * t + end0.z))
    }
}

/// Whether `end0` and `end1` lie on opposite sides of `point` along the
/// first axis on which `point` differs from `end0`.
///
/// Returns `true` when all three are too close to tell apart.
#[must_use]
pub fn straddles(point: DVec3, end0: DVec3, end1: DVec3) -> bool {
    let axis = (0..3).find(|&axis| (point[axis] - end0[axis]).abs() > EPSILON);
    let Some(axis) = axis else {
        return true;
    };
    side(point[axis] - end0[axis]) != side(point[axis] - end1[axis])
}

/// Whether `point`, already known to lie in the triangle's plane, falls
/// inside the triangle.
///
/// Rejects points outside the triangle's axis-aligned bounding box, accepts
/// any point of a triangle whose box is degenerate on every axis, and
/// otherwise projects onto the two widest axes and checks the point is on
/// the same side of each edge as the opposite corner.
#[must_use]
pub fn point_in_triangle(corners: [DVec3; 3], point: DVec3) -> bool {
    let [p1, p2, p3] = corners;
    let min = p1.min(p2).min(p3);
    let max = p1.max(p2).max(p3);
    let slack = DVec3::splat(EPSILON);
    if point.cmplt(min - slack).any() || point.cmpgt(max + slack).any() {
        return false;
    }

    let extent = max - min;
    if extent.cmple(slack).all() {
        return true;
    }

    let narrowest = narrowest_axis(extent);
    let project = |p: DVec3| match narrowest {
        0 => DVec2::new(p.y, p.z),
        1 => DVec2::new(p.x, p.z),
        _ => DVec2::new(p.x, p.y),
    };
    let (a, b, c, r) = (project(p1), project(p2), project(p3), project(point));

    same_side(a, b, c, r) && same_side(b, c, a, r) && same_side(c, a, b, r)
}

/// Index of the smallest component, preferring x, then y, then z on ties.
fn narrowest_axis(extent: DVec3) -> usize {
    let min = extent.min_element();
    if (min - extent.x).abs() <= EPSILON {
        0
    } else if (min - extent.y).abs() <= EPSILON {
        1
    } else {
        2
    }
}

/// Whether `r` lies on the same side of the edge `a -> b` as `c`.
fn same_side(a: DVec2, b: DVec2, c: DVec2, r: DVec2) -> bool {
    let edge = b - a;
    side(edge.perp_dot(c - a)) == side(edge.perp_dot(r - a))
}

/// Sign of a value, counting zero as positive.
fn side(value: f64) -> i8 {
    if value < 0.0 { -1 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_triangle(x: f64) -> [DVec3; 3] {
        [
            DVec3::new(x, 0.0, 0.0),
            DVec3::new(x, 10.0, 0.0),
            DVec3::new(x, 0.0, 10.0),
        ]
    }

    #[test]
    fn test_point_line_distance() {
        let d = point_line_distance_squared(DVec3::new(0.0, 3.0, 4.0), DVec3::ZERO, DVec3::X);
        assert!((d - 25.0).abs() < 1e-12);

        // Degenerate direction falls back to point distance.
        let d = point_line_distance_squared(DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO, DVec3::ZERO);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_intersect_line_along_x() {
        let [p1, p2, p3] = flat_triangle(100.0);
        let plane = Plane::from_points(p1, p2, p3);
        let hit = plane
            .intersect_line(DVec3::new(500.0, 2.0, 3.0), DVec3::new(0.0, 2.0, 3.0))
            .unwrap();
        assert!((hit - DVec3::new(100.0, 2.0, 3.0)).length() < 1e-9);
    }

    #[test]
    fn test_intersect_oblique_line() {
        // Plane z = 5.
        let plane = Plane::from_points(
            DVec3::new(0.0, 0.0, 5.0),
            DVec3::new(1.0, 0.0, 5.0),
            DVec3::new(0.0, 1.0, 5.0),
        );
        let hit = plane
            .intersect_line(DVec3::new(0.0, 0.0, 0.0), DVec3::new(2.0, 4.0, 10.0))
            .unwrap();
        assert!((hit - DVec3::new(1.0, 2.0, 5.0)).length() < 1e-9);
    }

    #[test]
    fn test_parallel_line_misses() {
        // Plane z = 5 and a line running along x.
        let plane = Plane::from_points(
            DVec3::new(0.0, 0.0, 5.0),
            DVec3::new(1.0, 0.0, 5.0),
            DVec3::new(0.0, 1.0, 5.0),
        );
        assert!(
            plane
                .intersect_line(DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn test_constant_x_line_is_treated_as_x_parallel() {
        // Plane z = 5; the probe runs along z but has no x extent, so the
        // solver follows the x axis through end0 and never meets the plane.
        let plane = Plane::from_points(
            DVec3::new(0.0, 0.0, 5.0),
            DVec3::new(1.0, 0.0, 5.0),
            DVec3::new(0.0, 1.0, 5.0),
        );
        assert!(
            plane
                .intersect_line(DVec3::new(1.0, 1.0, 10.0), DVec3::new(1.0, 1.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn test_point_in_triangle() {
        let triangle = flat_triangle(100.0);
        assert!(point_in_triangle(triangle, DVec3::new(100.0, 2.0, 3.0)));
        assert!(!point_in_triangle(triangle, DVec3::new(100.0, 6.0, 6.0)));
        assert!(!point_in_triangle(triangle, DVec3::new(100.0, -1.0, 3.0)));
        assert!(!point_in_triangle(triangle, DVec3::new(101.0, 2.0, 3.0)));
    }

    #[test]
    fn test_shared_edge_leaves_no_gap() {
        // Two triangles sharing the diagonal of the unit square in the z = 0 plane.
        let lower = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
        ];
        let upper = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        let on_diagonal = DVec3::new(0.5, 0.5, 0.0);
        let hits = [lower, upper]
            .into_iter()
            .filter(|&t| point_in_triangle(t, on_diagonal))
            .count();
        assert!(hits >= 1);
    }

    #[test]
    fn test_degenerate_triangle_accepts() {
        let p = DVec3::new(3.0, 4.0, 5.0);
        assert!(point_in_triangle([p, p, p], p));
    }

    #[test]
    fn test_straddles() {
        let hit = DVec3::new(100.0, 0.0, 0.0);
        assert!(straddles(hit, DVec3::new(50.0, 0.0, 0.0), DVec3::new(200.0, 0.0, 0.0)));
        assert!(!straddles(hit, DVec3::new(50.0, 0.0, 0.0), DVec3::new(80.0, 0.0, 0.0)));
        assert!(straddles(hit, hit, hit));
    }
}
