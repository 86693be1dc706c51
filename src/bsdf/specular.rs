use rand::Rng;

use super::{BsdfModel, BsdfSample, abs_cos_theta, reflect, refract, relative_eta};
use crate::{
    geometry::{FloatType, WorldVector},
    sampling::coin_flip,
    spectrum::{Spectrum, black},
};

/// Builds a delta sample in direction `wi`, dividing out the cosine the integrator applies.
/// Grazing directions carry no energy.
fn delta_sample(wi: WorldVector, pdf: FloatType, weight: Spectrum) -> Option<BsdfSample> {
    let cos = abs_cos_theta(&wi);
    if cos == 0.0 {
        return None;
    }
    Some(BsdfSample {
        wi,
        pdf,
        value: weight / cos,
    })
}

/// Perfect mirror.
#[derive(Clone, Debug)]
pub struct Mirror {
    pub reflectance: Spectrum,
}

impl Mirror {
    pub fn new(reflectance: Spectrum) -> Self {
        Mirror { reflectance }
    }
}

impl BsdfModel for Mirror {
    fn f(&self, _wo: &WorldVector, _wi: &WorldVector) -> Spectrum {
        black()
    }

    fn sample_f<R: Rng + ?Sized>(&self, wo: &WorldVector, _rng: &mut R) -> Option<BsdfSample> {
        delta_sample(reflect(wo), 1.0, self.reflectance)
    }

    fn is_delta(&self) -> bool {
        true
    }
}

/// Dielectric interface that only transmits.
#[derive(Clone, Debug)]
pub struct Refraction {
    pub transmittance: Spectrum,
    pub ior: FloatType,
}

impl Refraction {
    pub fn new(transmittance: Spectrum, ior: FloatType) -> Self {
        Refraction { transmittance, ior }
    }
}

impl BsdfModel for Refraction {
    fn f(&self, _wo: &WorldVector, _wi: &WorldVector) -> Spectrum {
        black()
    }

    fn sample_f<R: Rng + ?Sized>(&self, wo: &WorldVector, _rng: &mut R) -> Option<BsdfSample> {
        let wi = refract(wo, self.ior)?;
        let eta = relative_eta(wo, self.ior);
        delta_sample(wi, 1.0, self.transmittance / (eta * eta))
    }

    fn is_delta(&self) -> bool {
        true
    }
}

/// Dielectric interface that both reflects and transmits, split by Schlick's Fresnel term.
#[derive(Clone, Debug)]
pub struct Glass {
    pub reflectance: Spectrum,
    pub transmittance: Spectrum,
    pub ior: FloatType,
}

impl Glass {
    pub fn new(reflectance: Spectrum, transmittance: Spectrum, ior: FloatType) -> Self {
        Glass {
            reflectance,
            transmittance,
            ior,
        }
    }
}

/// Schlick's approximation of the Fresnel reflectance for light arriving from `wo`.
pub fn schlick_reflectance(wo: &WorldVector, ior: FloatType) -> FloatType {
    let eta = relative_eta(wo, ior);
    let r0 = ((1.0 - eta) / (1.0 + eta)).powi(2);
    r0 + (1.0 - r0) * (1.0 - abs_cos_theta(wo)).powi(5)
}

impl BsdfModel for Glass {
    fn f(&self, _wo: &WorldVector, _wi: &WorldVector) -> Spectrum {
        black()
    }

    fn sample_f<R: Rng + ?Sized>(&self, wo: &WorldVector, rng: &mut R) -> Option<BsdfSample> {
        let Some(transmitted) = refract(wo, self.ior) else {
            return delta_sample(reflect(wo), 1.0, self.reflectance);
        };

        let r = schlick_reflectance(wo, self.ior);
        if coin_flip(rng, r) {
            delta_sample(reflect(wo), r, self.reflectance * r)
        } else {
            let eta = relative_eta(wo, self.ior);
            delta_sample(
                transmitted,
                1.0 - r,
                self.transmittance * ((1.0 - r) / (eta * eta)),
            )
        }
    }

    fn is_delta(&self) -> bool {
        true
    }
}
