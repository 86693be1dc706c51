use crate::geometry::{FloatType, Ray, WorldBox};

/// Relative amount by which the entry point may lie past the exit point and still count as a hit.
const TOLERANCE: FloatType = 1e-9;

pub trait RayIntersectionExt {
    /// Narrows the interval `[t0, t1]` to the part of the ray that is inside the box.
    /// Returns None if the narrowed interval is empty.
    fn intersect(&self, ray: &Ray, t0: FloatType, t1: FloatType)
    -> Option<(FloatType, FloatType)>;
}

impl RayIntersectionExt for WorldBox {
    fn intersect(
        &self,
        ray: &Ray,
        t0: FloatType,
        t1: FloatType,
    ) -> Option<(FloatType, FloatType)> {
        let mut t_min = FloatType::NEG_INFINITY;
        let mut t_max = FloatType::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];

            if direction == 0.0 {
                // Parallel to the slab, either always inside or never
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }

            let p1 = (self.min[axis] - origin) / direction;
            let p2 = (self.max[axis] - origin) / direction;
            t_min = t_min.max(p1.min(p2));
            t_max = t_max.min(p1.max(p2));
        }

        // Rays touching an edge or a corner may end up with a slightly inverted interval
        let slack = TOLERANCE * t_min.abs().max(t_max.abs()).max(1.0);
        if t_min > t_max + slack {
            return None;
        }
        if t_min > t_max {
            let mid = (t_min + t_max) / 2.0;
            t_min = mid;
            t_max = mid;
        }

        if t_max < t0 || t_min > t1 {
            None
        } else {
            Some((t_min.max(t0), t_max.min(t1)))
        }
    }
}
