use std::f64::consts::PI;

use rand::Rng;

use super::{BsdfModel, BsdfSample, cos_theta, tan_theta2};
use crate::{
    geometry::{FloatType, WorldVector},
    spectrum::{Spectrum, black},
};

/// Rough conductor with a Beckmann distribution of microfacet normals.
#[derive(Clone, Debug)]
pub struct Microfacet {
    /// Beckmann roughness
    pub alpha: FloatType,
    /// Real part of the complex index of refraction, per channel
    pub eta: Spectrum,
    /// Absorption coefficient, per channel
    pub k: Spectrum,
}

impl Microfacet {
    pub fn new(alpha: FloatType, eta: Spectrum, k: Spectrum) -> Self {
        Microfacet { alpha, eta, k }
    }

    /// Beckmann normal distribution function.
    pub fn d(&self, h: &WorldVector) -> FloatType {
        let cos = cos_theta(h);
        if cos <= 0.0 {
            return 0.0;
        }
        let alpha2 = self.alpha * self.alpha;
        (-tan_theta2(h) / alpha2).exp() / (PI * alpha2 * cos.powi(4))
    }

    /// Smith shadowing-masking term.
    pub fn g(&self, wo: &WorldVector, wi: &WorldVector) -> FloatType {
        1.0 / (1.0 + self.lambda(wi) + self.lambda(wo))
    }

    /// Rational approximation of the Beckmann Smith Λ function.
    fn lambda(&self, w: &WorldVector) -> FloatType {
        let tan = tan_theta2(w).sqrt();
        if tan == 0.0 {
            return 0.0;
        }
        let a = 1.0 / (self.alpha * tan);
        if a >= 1.6 {
            0.0
        } else {
            (1.0 - 1.259 * a + 0.396 * a * a) / (3.535 * a + 2.181 * a * a)
        }
    }

    /// Fresnel reflectance of the conductor, averaged over both polarizations.
    pub fn fresnel(&self, wi: &WorldVector) -> Spectrum {
        let cos = cos_theta(wi);
        let cos2 = cos * cos;
        self.eta.zip_map(&self.k, |eta, k| {
            let magnitude = eta * eta + k * k;
            let rs = (magnitude - 2.0 * eta * cos + cos2) / (magnitude + 2.0 * eta * cos + cos2);
            let rp = (magnitude * cos2 - 2.0 * eta * cos + 1.0)
                / (magnitude * cos2 + 2.0 * eta * cos + 1.0);
            (rs + rp) / 2.0
        })
    }

    /// Samples a half vector proportionally to `d(h) · cos θh`, returns it with its density.
    fn sample_half_vector<R: Rng + ?Sized>(&self, rng: &mut R) -> (WorldVector, FloatType) {
        let r1: FloatType = rng.random();
        let r2: FloatType = rng.random();

        let theta = (-self.alpha * self.alpha * (1.0 - r1).ln()).sqrt().atan();
        let phi = 2.0 * PI * r2;
        let (sin_t, cos_t) = theta.sin_cos();
        let h = WorldVector::new(sin_t * phi.cos(), sin_t * phi.sin(), cos_t);

        (h, self.d(&h) * cos_t)
    }
}

impl BsdfModel for Microfacet {
    fn f(&self, wo: &WorldVector, wi: &WorldVector) -> Spectrum {
        if cos_theta(wo) <= 0.0 || cos_theta(wi) <= 0.0 {
            return black();
        }
        let h = (wo + wi).normalize();
        self.fresnel(wi) * (self.g(wo, wi) * self.d(&h) / (4.0 * cos_theta(wo) * cos_theta(wi)))
    }

    fn sample_f<R: Rng + ?Sized>(&self, wo: &WorldVector, rng: &mut R) -> Option<BsdfSample> {
        if cos_theta(wo) <= 0.0 {
            return None;
        }

        let (h, pdf_h) = self.sample_half_vector(rng);
        let wi = 2.0 * wo.dot(&h) * h - wo;
        if cos_theta(&wi) <= 0.0 {
            return None;
        }

        let pdf = pdf_h / (4.0 * wi.dot(&h));
        if !(pdf > 0.0) {
            return None;
        }

        Some(BsdfSample {
            wi,
            pdf,
            value: self.f(wo, &wi),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{sampling::uniform_hemisphere, spectrum::grey};
    use assert2::{assert, check};
    use rand::{SeedableRng, rngs::SmallRng};
    use test_case::test_case;

    fn gold(alpha: FloatType) -> Microfacet {
        Microfacet::new(
            alpha,
            Spectrum::new(0.21646, 0.42833, 1.3284),
            Spectrum::new(3.2390, 2.4599, 1.8661),
        )
    }

    #[test]
    fn zero_outside_hemisphere() {
        let m = gold(0.3);
        let up = WorldVector::new(0.1, 0.2, 0.9).normalize();
        let down = WorldVector::new(0.1, 0.2, -0.9).normalize();
        check!(m.f(&up, &down) == black());
        check!(m.f(&down, &up) == black());
        check!(m.f(&down, &down) == black());

        let mut rng = SmallRng::seed_from_u64(0);
        check!(m.sample_f(&down, &mut rng).is_none());
    }

    /// ∫ D(h) cos θh dω = 1 over the hemisphere.
    #[test_case(0.1)]
    #[test_case(0.3)]
    #[test_case(0.7)]
    fn normal_distribution_is_normalized(alpha: FloatType) {
        let m = gold(alpha);
        let mut rng = SmallRng::seed_from_u64(11);

        let n = 200_000;
        let integral = (0..n)
            .map(|_| {
                let h = uniform_hemisphere(&mut rng);
                m.d(&h) * h.z * 2.0 * PI
            })
            .sum::<FloatType>()
            / n as FloatType;

        let tolerance = if alpha < 0.2 { 0.1 } else { 0.04 };
        assert!((integral - 1.0).abs() < tolerance, "alpha {alpha}: {integral}");
    }

    #[test]
    fn fresnel_is_a_reflectance() {
        let m = gold(0.3);
        for z in [0.05, 0.3, 0.7, 1.0] {
            let wi: WorldVector = WorldVector::new((1.0f64 - z * z).sqrt(), 0.0, z);
            let f = m.fresnel(&wi);
            for c in f.iter() {
                check!(*c > 0.0);
                check!(*c <= 1.0);
            }
        }
        // Perfectly absorbing limit reflects everything
        let ideal = Microfacet::new(0.3, grey(0.0), grey(1e6));
        assert!((ideal.fresnel(&WorldVector::z()) - grey(1.0)).norm() < 1e-6);
    }

    #[test]
    fn shadowing_is_bounded() {
        let m = gold(0.5);
        let wo = WorldVector::new(0.8, 0.0, 0.6);
        let wi = WorldVector::new(-0.6, 0.0, 0.8);
        let g = m.g(&wo, &wi);
        assert!(g > 0.0 && g <= 1.0);
        assert!(m.g(&WorldVector::z(), &WorldVector::z()) == 1.0);
    }

    #[test]
    fn samples_are_consistent_with_f() {
        let m = gold(0.4);
        let wo = WorldVector::new(0.3, -0.2, 0.9).normalize();
        let mut rng = SmallRng::seed_from_u64(5);

        let mut accepted = 0;
        for _ in 0..1000 {
            if let Some(sample) = m.sample_f(&wo, &mut rng) {
                accepted += 1;
                check!(sample.wi.z > 0.0);
                check!(sample.pdf > 0.0);
                check!((sample.value - m.f(&wo, &sample.wi)).norm() == 0.0);
            }
        }
        assert!(accepted > 500);
    }

    #[test]
    fn albedo_does_not_exceed_one() {
        let m = Microfacet::new(0.3, grey(0.0), grey(1e6));
        let wo = WorldVector::new(0.3, 0.0, 0.95).normalize();
        let mut rng = SmallRng::seed_from_u64(9);

        let n = 100_000;
        let albedo = (0..n)
            .filter_map(|_| m.sample_f(&wo, &mut rng))
            .map(|s| s.value.x * s.wi.z / s.pdf)
            .sum::<FloatType>()
            / n as FloatType;
        assert!(albedo > 0.5);
        assert!(albedo < 1.05);
    }
}
