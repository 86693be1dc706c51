use nalgebra::Unit;

use crate::{
    bsdf::BsdfIdx,
    geometry::{FloatType, Ray, Triangle, WorldBox, WorldPoint, WorldVector, sphere_roots},
};

use super::{Object, SurfaceHit};

const NORMAL_EPSILON: FloatType = 1e-12;

#[derive(Clone, Debug)]
pub struct Sphere {
    pub center: WorldPoint,
    pub radius: FloatType,
    pub bsdf: BsdfIdx,
}

impl Sphere {
    /// Picks the nearer root inside `[ray.min_t, max_t]`, falling back to the farther one.
    fn accepted_root(&self, ray: &Ray, max_t: FloatType) -> Option<FloatType> {
        let (t1, t2) = sphere_roots(ray, &self.center, self.radius)?;
        [t1, t2]
            .into_iter()
            .find(|t| *t >= ray.min_t && *t <= max_t)
    }
}

impl Object for Sphere {
    fn bounding_box(&self) -> WorldBox {
        let r_vec = WorldVector::repeat(self.radius);
        WorldBox {
            min: self.center - r_vec,
            max: self.center + r_vec,
        }
    }

    fn intersect(&self, ray: &Ray, max_t: &mut FloatType) -> Option<SurfaceHit> {
        let t = self.accepted_root(ray, *max_t)?;
        *max_t = t;

        Some(SurfaceHit {
            t,
            normal: Unit::new_normalize(ray.point_at(t) - self.center),
            bsdf: self.bsdf,
        })
    }

    fn has_intersection(&self, ray: &Ray) -> bool {
        self.accepted_root(ray, ray.max_t).is_some()
    }
}

/// Single triangle of a mesh, with optional per-vertex shading normals.
#[derive(Clone, Debug)]
pub struct MeshTriangle {
    pub positions: Triangle<WorldPoint>,
    pub normals: Option<Triangle<WorldVector>>,
    pub bsdf: BsdfIdx,
}

impl Object for MeshTriangle {
    fn bounding_box(&self) -> WorldBox {
        WorldBox::from_points(self.positions.iter()).unwrap_or_else(WorldBox::empty)
    }

    fn intersect(&self, ray: &Ray, max_t: &mut FloatType) -> Option<SurfaceHit> {
        let hit = self.positions.intersect(ray, *max_t)?;
        *max_t = hit.t;

        // Opposing vertex normals can cancel out, the face normal is used then
        let normal = self
            .normals
            .as_ref()
            .and_then(|normals| Unit::try_new(hit.uv.interpolate_triangle(normals), NORMAL_EPSILON))
            .unwrap_or_else(|| Unit::new_normalize(self.positions.normal()));

        Some(SurfaceHit {
            t: hit.t,
            normal,
            bsdf: self.bsdf,
        })
    }

    fn has_intersection(&self, ray: &Ray) -> bool {
        self.positions.intersect(ray, ray.max_t).is_some()
    }
}

#[derive(Clone, Debug)]
pub enum Primitive {
    Sphere(Sphere),
    Triangle(MeshTriangle),
}

impl Primitive {
    pub fn centroid(&self) -> WorldPoint {
        match self {
            Primitive::Sphere(s) => s.center,
            Primitive::Triangle(t) => t.positions.centroid(),
        }
    }
}

impl Object for Primitive {
    fn bounding_box(&self) -> WorldBox {
        match self {
            Primitive::Sphere(s) => s.bounding_box(),
            Primitive::Triangle(t) => t.bounding_box(),
        }
    }

    fn intersect(&self, ray: &Ray, max_t: &mut FloatType) -> Option<SurfaceHit> {
        match self {
            Primitive::Sphere(s) => s.intersect(ray, max_t),
            Primitive::Triangle(t) => t.intersect(ray, max_t),
        }
    }

    fn has_intersection(&self, ray: &Ray) -> bool {
        match self {
            Primitive::Sphere(s) => s.has_intersection(ray),
            Primitive::Triangle(t) => t.has_intersection(ray),
        }
    }
}

impl From<Sphere> for Primitive {
    fn from(value: Sphere) -> Self {
        Primitive::Sphere(value)
    }
}

impl From<MeshTriangle> for Primitive {
    fn from(value: MeshTriangle) -> Self {
        Primitive::Triangle(value)
    }
}
