mod builder;
pub mod bvh;
mod lights;
mod mesh;
mod presets;
mod primitives;

pub use builder::{SceneBuilder, SceneError};
pub use bvh::{BvhAccel, BvhStatistics, PrimitiveIdx, TraversalCache};
pub use lights::{EnvironmentLight, Light, LightSample};
pub use mesh::{Mesh, MeshVertex, ObjOpenError};
pub use presets::Preset;
pub use primitives::{MeshTriangle, Primitive, Sphere};

use index_vec::IndexVec;
use nalgebra::Unit;

use crate::{
    bsdf::{Bsdf, BsdfIdx},
    geometry::{FloatType, Ray, WorldBox, WorldVector},
};

/// Geometric object that can be hit by rays.
pub trait Object {
    fn bounding_box(&self) -> WorldBox;

    /// Intersects the ray within `[ray.min_t, max_t]`.
    /// On hit, `max_t` is lowered to the hit distance so that later tests only accept closer hits.
    fn intersect(&self, ray: &Ray, max_t: &mut FloatType) -> Option<SurfaceHit>;

    /// Checks for any hit within `[ray.min_t, ray.max_t]`.
    fn has_intersection(&self, ray: &Ray) -> bool;
}

/// Hit reported by a single primitive.
#[derive(Copy, Clone, Debug)]
pub struct SurfaceHit {
    pub t: FloatType,
    pub normal: Unit<WorldVector>,
    pub bsdf: BsdfIdx,
}

/// Nearest hit of a ray with the scene.
#[derive(Copy, Clone, Debug)]
pub struct Intersection {
    pub t: FloatType,
    /// Shading normal
    pub normal: Unit<WorldVector>,
    pub bsdf: BsdfIdx,
    pub primitive: PrimitiveIdx,
}

/// Immutable renderable scene.
#[derive(Clone, Debug)]
pub struct Scene {
    bvh: BvhAccel,
    materials: IndexVec<BsdfIdx, Bsdf>,
    lights: Vec<Light>,
    environment: Option<EnvironmentLight>,
}

impl Scene {
    pub fn builder() -> SceneBuilder {
        SceneBuilder::default()
    }

    pub fn intersect(&self, ray: &Ray, cache: &mut TraversalCache) -> Option<Intersection> {
        self.bvh.intersect(ray, cache)
    }

    pub fn has_intersection(&self, ray: &Ray, cache: &mut TraversalCache) -> bool {
        self.bvh.has_intersection(ray, cache)
    }

    pub fn bsdf(&self, index: BsdfIdx) -> &Bsdf {
        &self.materials[index]
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn environment(&self) -> Option<&EnvironmentLight> {
        self.environment.as_ref()
    }

    pub fn bounding_box(&self) -> WorldBox {
        self.bvh.bounding_box()
    }

    pub fn bvh(&self) -> &BvhAccel {
        &self.bvh
    }
}
