use super::{BarycentricCoordinates, FloatType, Ray, Triangle, WorldPoint};

/// Result of a ray hitting a triangle.
#[derive(Copy, Clone, Debug)]
pub struct TriangleHit {
    pub t: FloatType,
    pub uv: BarycentricCoordinates<FloatType>,
}

impl Triangle<WorldPoint> {
    /// Calculates ray intersection with the (two sided) triangle.
    ///
    /// Intersects the supporting plane first, then tests the hit point in 2D after
    /// dropping the axis along which the normal is largest. Only hits within
    /// `[ray.min_t, max_t]` are reported.
    pub fn intersect(&self, ray: &Ray, max_t: FloatType) -> Option<TriangleHit> {
        let normal = self.normal();
        let denominator = ray.direction.dot(&normal);
        if denominator == 0.0 {
            return None;
        }

        let t = (self[0] - ray.origin).dot(&normal) / denominator;
        if !t.is_finite() || t < ray.min_t || t > max_t {
            return None;
        }

        // Any axis with a nonzero normal component works, the largest one gives the
        // biggest projected area
        let (i, j) = projection_axes(&normal.abs().into());
        let hit = ray.point_at(t);
        let p = (hit[i], hit[j]);
        let [p0, p1, p2] = [0, 1, 2].map(|k| (self[k][i], self[k][j]));

        let area = edge_function(p0, p1, p2);
        if area == 0.0 {
            return None;
        }

        let e0 = edge_function(p0, p1, p);
        let e1 = edge_function(p1, p2, p);
        let e2 = edge_function(p2, p0, p);

        let inside = if area > 0.0 {
            e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0
        } else {
            e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0
        };
        if !inside {
            return None;
        }

        // Sub-triangle opposite to a vertex gives that vertex's weight
        let uv = BarycentricCoordinates {
            u: e2 / area,
            v: e0 / area,
        };
        Some(TriangleHit { t, uv })
    }
}

/// Picks the two coordinates kept after projecting along the dominant normal axis.
fn projection_axes(abs_normal: &[FloatType; 3]) -> (usize, usize) {
    let mut dropped = 0;
    for axis in 1..3 {
        if abs_normal[axis] > abs_normal[dropped] {
            dropped = axis;
        }
    }
    match dropped {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    }
}

/// Twice the signed area of triangle (a, b, p), positive if counter-clockwise.
fn edge_function(
    a: (FloatType, FloatType),
    b: (FloatType, FloatType),
    p: (FloatType, FloatType),
) -> FloatType {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}
