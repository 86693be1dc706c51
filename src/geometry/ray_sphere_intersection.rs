use super::{FloatType, Ray, WorldPoint};

/// Solves `|o + t·d - center|² = radius²` for t.
/// Returns both roots ordered (smaller first), or None if the ray misses the sphere.
pub fn sphere_roots(
    ray: &Ray,
    center: &WorldPoint,
    radius: FloatType,
) -> Option<(FloatType, FloatType)> {
    let oc = ray.origin - center;
    let a = ray.direction.dot(&ray.direction);
    let b = 2.0 * oc.dot(&ray.direction);
    let c = oc.dot(&oc) - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 || a == 0.0 {
        return None;
    }

    let sqrt_disc = discriminant.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    Some((t1, t2))
}
