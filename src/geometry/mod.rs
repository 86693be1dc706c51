mod aabb;
mod frame;
mod ray_box_intersection;
mod ray_sphere_intersection;
mod ray_triangle_intersection;
mod triangle;

pub use aabb::AABB;
pub use frame::ShadingFrame;
pub use ray_box_intersection::RayIntersectionExt;
pub use ray_sphere_intersection::sphere_roots;
pub use ray_triangle_intersection::TriangleHit;
pub use triangle::{BarycentricCoordinates, Triangle};

use nalgebra::{Point2, Point3, Vector2, Vector3};

pub type FloatType = f64;

/// Minimal distance along secondary rays, keeps them from hitting the surface they start on.
pub const EPSILON: FloatType = 1e-5;

pub type ScreenPoint = Point2<u32>;
pub type ScreenSize = Vector2<u32>;
pub type ScreenBlock = AABB<ScreenPoint>;

/// Normalized sensor coordinates, (0, 0) is the bottom left corner, (1, 1) the top right.
pub type SensorPoint = Point2<FloatType>;

pub type WorldPoint = Point3<FloatType>;
pub type WorldVector = Vector3<FloatType>;
pub type WorldBox = AABB<WorldPoint>;

#[derive(Copy, Clone, Debug)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray
    pub direction: WorldVector,

    /// Smallest distance along the ray that counts as a hit
    pub min_t: FloatType,
    /// Largest distance along the ray that counts as a hit
    pub max_t: FloatType,

    /// Remaining bounce budget of the path this ray belongs to
    pub depth: u32,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
            min_t: 0.0,
            max_t: FloatType::INFINITY,
            depth: 0,
        }
    }

    pub fn with_range(self, min_t: FloatType, max_t: FloatType) -> Ray {
        Ray {
            min_t,
            max_t,
            ..self
        }
    }

    pub fn with_depth(self, depth: u32) -> Ray {
        Ray { depth, ..self }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }

    /// Returns true if the distance lies in the valid range of the ray.
    pub fn accepts(&self, distance: FloatType) -> bool {
        distance >= self.min_t && distance <= self.max_t
    }
}
