//! Scattering models.
//!
//! All directions are given in the local shading frame, where the surface normal
//! is the +Z axis. `wo` points away from the surface towards the viewer, `wi`
//! away from the surface towards the light.

mod diffuse;
mod microfacet;
mod specular;

pub use diffuse::{Diffuse, Emission};
pub use microfacet::Microfacet;
pub use specular::{Glass, Mirror, Refraction, schlick_reflectance};

use rand::Rng;

use crate::{
    geometry::{FloatType, WorldVector},
    spectrum::{Spectrum, black},
};

index_vec::define_index_type! {
    /// Index of a material in the scene's material table.
    pub struct BsdfIdx = u32;
}

/// Importance sampled incoming direction.
#[derive(Copy, Clone, Debug)]
pub struct BsdfSample {
    pub wi: WorldVector,
    pub pdf: FloatType,
    pub value: Spectrum,
}

/// Behavior shared by all scattering models.
pub trait BsdfModel {
    /// Evaluates the BSDF for a pair of directions.
    fn f(&self, wo: &WorldVector, wi: &WorldVector) -> Spectrum;

    /// Samples an incoming direction for `wo`.
    /// Returns None when the sample carries no energy (absorption, total internal
    /// reflection in a pure refractor, a microfacet sample below the horizon).
    fn sample_f<R: Rng + ?Sized>(&self, wo: &WorldVector, rng: &mut R) -> Option<BsdfSample>;

    fn emission(&self) -> Spectrum {
        black()
    }

    /// True for models concentrated in a single direction, `f` is always zero for these.
    fn is_delta(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug)]
pub enum Bsdf {
    Diffuse(Diffuse),
    Emission(Emission),
    Mirror(Mirror),
    Refraction(Refraction),
    Glass(Glass),
    Microfacet(Microfacet),
}

macro_rules! dispatch {
    ($self:ident, $bsdf:ident => $expr:expr) => {
        match $self {
            Bsdf::Diffuse($bsdf) => $expr,
            Bsdf::Emission($bsdf) => $expr,
            Bsdf::Mirror($bsdf) => $expr,
            Bsdf::Refraction($bsdf) => $expr,
            Bsdf::Glass($bsdf) => $expr,
            Bsdf::Microfacet($bsdf) => $expr,
        }
    };
}

impl BsdfModel for Bsdf {
    fn f(&self, wo: &WorldVector, wi: &WorldVector) -> Spectrum {
        dispatch!(self, b => b.f(wo, wi))
    }

    fn sample_f<R: Rng + ?Sized>(&self, wo: &WorldVector, rng: &mut R) -> Option<BsdfSample> {
        dispatch!(self, b => b.sample_f(wo, rng))
    }

    fn emission(&self) -> Spectrum {
        dispatch!(self, b => b.emission())
    }

    fn is_delta(&self) -> bool {
        dispatch!(self, b => b.is_delta())
    }
}

macro_rules! impl_from_model {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Bsdf {
                fn from(value: $variant) -> Self {
                    Bsdf::$variant(value)
                }
            }
        )*
    };
}

impl_from_model!(Diffuse, Emission, Mirror, Refraction, Glass, Microfacet);

pub fn cos_theta(w: &WorldVector) -> FloatType {
    w.z
}

pub fn abs_cos_theta(w: &WorldVector) -> FloatType {
    w.z.abs()
}

pub fn sin_theta2(w: &WorldVector) -> FloatType {
    (1.0 - w.z * w.z).max(0.0)
}

pub fn tan_theta2(w: &WorldVector) -> FloatType {
    sin_theta2(w) / (w.z * w.z)
}

/// Mirror reflection about the local normal.
pub fn reflect(wo: &WorldVector) -> WorldVector {
    WorldVector::new(-wo.x, -wo.y, wo.z)
}

/// Ratio of indices of refraction along the direction of travel of light arriving from `wo`.
/// `wo.z > 0` means the light enters the material from vacuum.
pub fn relative_eta(wo: &WorldVector, ior: FloatType) -> FloatType {
    if wo.z > 0.0 { 1.0 / ior } else { ior }
}

/// Refracts `wo` through the local interface using Snell's law.
/// Returns None on total internal reflection.
pub fn refract(wo: &WorldVector, ior: FloatType) -> Option<WorldVector> {
    let eta = relative_eta(wo, ior);
    let sign = if wo.z > 0.0 { -1.0 } else { 1.0 };

    let cos2_t = 1.0 - eta * eta * (1.0 - wo.z * wo.z);
    if cos2_t < 0.0 {
        return None;
    }

    Some(WorldVector::new(
        -eta * wo.x,
        -eta * wo.y,
        sign * cos2_t.sqrt(),
    ))
}
