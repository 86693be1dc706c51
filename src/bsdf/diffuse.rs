use std::f64::consts::PI;

use rand::Rng;

use super::{BsdfModel, BsdfSample};
use crate::{
    geometry::WorldVector,
    sampling::cosine_hemisphere,
    spectrum::{Spectrum, black},
};

/// Lambertian reflector.
#[derive(Clone, Debug)]
pub struct Diffuse {
    pub reflectance: Spectrum,
}

impl Diffuse {
    pub fn new(reflectance: Spectrum) -> Self {
        Diffuse { reflectance }
    }
}

impl BsdfModel for Diffuse {
    fn f(&self, _wo: &WorldVector, _wi: &WorldVector) -> Spectrum {
        self.reflectance / PI
    }

    fn sample_f<R: Rng + ?Sized>(&self, wo: &WorldVector, rng: &mut R) -> Option<BsdfSample> {
        let (wi, pdf) = cosine_hemisphere(rng);
        if pdf <= 0.0 {
            return None;
        }
        Some(BsdfSample {
            wi,
            pdf,
            value: self.f(wo, &wi),
        })
    }
}

/// Light emitting surface that reflects nothing.
#[derive(Clone, Debug)]
pub struct Emission {
    pub radiance: Spectrum,
}

impl Emission {
    pub fn new(radiance: Spectrum) -> Self {
        Emission { radiance }
    }
}

impl BsdfModel for Emission {
    fn f(&self, _wo: &WorldVector, _wi: &WorldVector) -> Spectrum {
        black()
    }

    fn sample_f<R: Rng + ?Sized>(&self, _wo: &WorldVector, _rng: &mut R) -> Option<BsdfSample> {
        None
    }

    fn emission(&self) -> Spectrum {
        self.radiance
    }
}
