use index_vec::IndexVec;
use thiserror::Error;

use super::{BvhAccel, EnvironmentLight, Light, Mesh, MeshTriangle, Primitive, Scene, Sphere};
use crate::{
    bsdf::{Bsdf, BsdfIdx},
    geometry::{FloatType, Triangle, WorldPoint, WorldVector},
};

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("Primitive {primitive} refers to material {material}, but only {count} materials exist")]
    MissingMaterial {
        primitive: usize,
        material: usize,
        count: usize,
    },

    #[error("Sphere {primitive} has invalid radius {radius}")]
    InvalidSphereRadius {
        primitive: usize,
        radius: FloatType,
    },
}

/// Collects materials, geometry and lights before building the acceleration structure.
#[derive(Clone, Debug, Default)]
pub struct SceneBuilder {
    materials: IndexVec<BsdfIdx, Bsdf>,
    primitives: Vec<Primitive>,
    lights: Vec<Light>,
    environment: Option<EnvironmentLight>,
}

impl SceneBuilder {
    pub fn add_material(&mut self, bsdf: impl Into<Bsdf>) -> BsdfIdx {
        self.materials.push(bsdf.into())
    }

    pub fn add_sphere(&mut self, center: WorldPoint, radius: FloatType, bsdf: BsdfIdx) -> &mut Self {
        self.primitives.push(
            Sphere {
                center,
                radius,
                bsdf,
            }
            .into(),
        );
        self
    }

    pub fn add_triangle(&mut self, positions: Triangle<WorldPoint>, bsdf: BsdfIdx) -> &mut Self {
        self.primitives.push(
            MeshTriangle {
                positions,
                normals: None,
                bsdf,
            }
            .into(),
        );
        self
    }

    /// Adds a parallelogram as two triangles, its normal is `edge_a × edge_b`.
    pub fn add_quad(
        &mut self,
        corner: WorldPoint,
        edge_a: WorldVector,
        edge_b: WorldVector,
        bsdf: BsdfIdx,
    ) -> &mut Self {
        let far = corner + edge_a + edge_b;
        self.add_triangle(Triangle::new(corner, corner + edge_a, far), bsdf);
        self.add_triangle(Triangle::new(corner, far, corner + edge_b), bsdf)
    }

    pub fn add_mesh(&mut self, mesh: &Mesh, bsdf: BsdfIdx) -> &mut Self {
        self.primitives
            .extend(mesh.triangles(bsdf).map(Primitive::from));
        self
    }

    pub fn add_light(&mut self, light: Light) -> &mut Self {
        self.lights.push(light);
        self
    }

    pub fn environment(&mut self, environment: EnvironmentLight) -> &mut Self {
        self.environment = Some(environment);
        self
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    pub fn build(self, max_leaf_size: usize) -> Result<Scene, SceneError> {
        self.validate()?;

        let bvh = BvhAccel::build(self.primitives, max_leaf_size);
        bvh.log_statistics();

        Ok(Scene {
            bvh,
            materials: self.materials,
            lights: self.lights,
            environment: self.environment,
        })
    }

    fn validate(&self) -> Result<(), SceneError> {
        for (i, primitive) in self.primitives.iter().enumerate() {
            let material = match primitive {
                Primitive::Sphere(sphere) => {
                    if !(sphere.radius > 0.0 && sphere.radius.is_finite()) {
                        return Err(SceneError::InvalidSphereRadius {
                            primitive: i,
                            radius: sphere.radius,
                        });
                    }
                    sphere.bsdf
                }
                Primitive::Triangle(triangle) => triangle.bsdf,
            };

            if material.index() >= self.materials.len() {
                return Err(SceneError::MissingMaterial {
                    primitive: i,
                    material: material.index(),
                    count: self.materials.len(),
                });
            }
        }
        Ok(())
    }
}
