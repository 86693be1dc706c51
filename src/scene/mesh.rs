use std::{fs, path::Path};

use indexmap::IndexMap;
use thiserror::Error;

use super::MeshTriangle;
use crate::{
    bsdf::BsdfIdx,
    geometry::{FloatType, Triangle, WorldBox, WorldPoint, WorldVector},
};

#[derive(Debug, Error)]
pub enum ObjOpenError {
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse file: {0}")]
    ParseError(#[from] wavefront_obj::ParseError),
}

/// Per-vertex data of a mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshVertex {
    pub position: WorldPoint,
    /// Zero if the source had no normal for this vertex
    pub normal: WorldVector,
}

/// Indexed triangle mesh.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    pub triangles: Vec<Triangle<usize>>,
}

impl Mesh {
    pub fn with_obj(p: impl AsRef<Path>) -> Result<Mesh, ObjOpenError> {
        let content = fs::read_to_string(p)?;
        Self::parse_obj(content)
    }

    pub fn parse_obj(content: String) -> Result<Mesh, ObjOpenError> {
        let parsed = wavefront_obj::obj::parse(content)?;
        Ok(Self::load_obj(parsed))
    }

    fn load_obj(obj: wavefront_obj::obj::ObjSet) -> Mesh {
        let mut triangles = Vec::new();
        let mut vertices = Vec::new();

        for o in obj.objects.into_iter() {
            // Vertex indices are per object, so is the de-duplication
            let mut index_map = IndexMap::new();
            let base = vertices.len();

            for geometry in o.geometry.iter() {
                for shape in geometry.shapes.iter() {
                    let wavefront_obj::obj::Primitive::Triangle(a, b, c) = &shape.primitive else {
                        log::warn!("Skipping non-triangle primitive in object {:?}", o.name);
                        continue;
                    };

                    let mut handle_vertex = |vtindex: (usize, Option<usize>, Option<usize>)| {
                        let entry = index_map.entry((vtindex.0, vtindex.2));
                        let index = entry.index();
                        entry.or_insert_with(|| {
                            let vertex = &o.vertices[vtindex.0];
                            let normal = vtindex.2.map(|i| &o.normals[i]);
                            MeshVertex {
                                position: WorldPoint::new(vertex.x, vertex.y, vertex.z),
                                normal: normal.map_or_else(WorldVector::zeros, |v| {
                                    WorldVector::new(v.x, v.y, v.z).normalize()
                                }),
                            }
                        });
                        base + index
                    };

                    let a = handle_vertex(*a);
                    let b = handle_vertex(*b);
                    let c = handle_vertex(*c);

                    triangles.push(Triangle::new(a, b, c));
                }
            }

            vertices.extend(index_map.into_values());
        }

        log::debug!(
            "Loaded mesh with {} vertices and {} triangles",
            vertices.len(),
            triangles.len()
        );

        Mesh {
            vertices,
            triangles,
        }
    }

    pub fn bounding_box(&self) -> Option<WorldBox> {
        WorldBox::from_points(self.vertices.iter().map(|v| &v.position))
    }

    /// Uniformly scales and translates the mesh so that it sits centered on the floor
    /// of `target` and fits inside it.
    pub fn fit_into(&mut self, target: &WorldBox) {
        let Some(current) = self.bounding_box() else {
            return;
        };

        let size = current.size();
        let target_size = target.size();
        let scale = (0..3)
            .filter(|i| size[*i] > 0.0)
            .map(|i| target_size[i] / size[i])
            .fold(FloatType::INFINITY, FloatType::min);
        let scale = if scale.is_finite() { scale } else { 1.0 };

        let mut anchor = current.center();
        anchor.y = current.min.y;
        let mut target_anchor = target.center();
        target_anchor.y = target.min.y;

        for v in self.vertices.iter_mut() {
            v.position = target_anchor + (v.position - anchor) * scale;
        }
    }

    /// Scene primitives of this mesh. Triangles get smooth shading only if all three
    /// vertices have a normal.
    pub fn triangles(&self, bsdf: BsdfIdx) -> impl Iterator<Item = MeshTriangle> + '_ {
        self.triangles.iter().map(move |t| {
            let vertices = t.map(|i| &self.vertices[*i]);
            let smooth = vertices.iter().all(|v| v.normal.norm_squared() > 0.0);
            MeshTriangle {
                positions: vertices.map(|v| v.position),
                normals: smooth.then(|| vertices.map(|v| v.normal)),
                bsdf,
            }
        })
    }
}
