//! Random sample generators shared by the camera, BSDFs and the integrator.

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::Distribution as _;

use crate::geometry::{FloatType, SensorPoint, WorldVector};

/// Density of `uniform_hemisphere` with respect to solid angle.
pub const UNIFORM_HEMISPHERE_PDF: FloatType = 1.0 / (2.0 * PI);

/// Uniform sample of the unit square.
pub fn grid_sample<R: Rng + ?Sized>(rng: &mut R) -> SensorPoint {
    SensorPoint::new(rng.random(), rng.random())
}

/// Uniformly distributed direction on the hemisphere around +Z.
pub fn uniform_hemisphere<R: Rng + ?Sized>(rng: &mut R) -> WorldVector {
    let [x, y, z]: [FloatType; 3] = rand_distr::UnitSphere.sample(rng);
    WorldVector::new(x, y, z.abs())
}

/// Cosine weighted direction on the hemisphere around +Z and its density.
pub fn cosine_hemisphere<R: Rng + ?Sized>(rng: &mut R) -> (WorldVector, FloatType) {
    let [x, y]: [FloatType; 2] = rand_distr::UnitDisc.sample(rng);
    let z = (1.0 - x * x - y * y).max(0.0).sqrt();
    (WorldVector::new(x, y, z), z / PI)
}

/// Maps `r`, `theta` (`r` uniform in [0, 1), `theta` uniform in [0, 2π)) to an
/// area-uniform point on a disk of the given radius.
pub fn disk_point(radius: FloatType, r: FloatType, theta: FloatType) -> (FloatType, FloatType) {
    let scale = radius * r.sqrt();
    (scale * theta.cos(), scale * theta.sin())
}

/// Returns true with probability `p`.
pub fn coin_flip<R: Rng + ?Sized>(rng: &mut R, p: FloatType) -> bool {
    rng.random_bool(p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn hemisphere_samples_are_unit_and_above() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..1000 {
            let w = uniform_hemisphere(&mut rng);
            assert!(w.z >= 0.0);
            assert!((w.norm() - 1.0).abs() < 1e-9);

            let (w, pdf) = cosine_hemisphere(&mut rng);
            assert!(w.z >= 0.0);
            assert!((w.norm() - 1.0).abs() < 1e-9);
            assert!((pdf - w.z / PI).abs() < 1e-12);
        }
    }

    #[test]
    fn disk_points_stay_inside() {
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..1000 {
            let (x, y) = disk_point(0.5, rng.random(), rng.random::<FloatType>() * 2.0 * PI);
            assert!(x * x + y * y <= 0.25 + 1e-12);
        }
    }

    #[test]
    fn uniform_hemisphere_mean_cosine() {
        // E[cos θ] over the uniform hemisphere is 1/2
        let mut rng = SmallRng::seed_from_u64(3);
        let n = 100_000;
        let mean = (0..n).map(|_| uniform_hemisphere(&mut rng).z).sum::<FloatType>() / n as FloatType;
        assert!((mean - 0.5).abs() < 0.01);
    }
}
