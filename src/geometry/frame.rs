use nalgebra::Unit;

use super::WorldVector;

/// Orthonormal basis with the surface normal as its +Z axis.
/// BSDFs are always evaluated in this local frame.
#[derive(Copy, Clone, Debug)]
pub struct ShadingFrame {
    x: WorldVector,
    y: WorldVector,
    z: WorldVector,
}

impl ShadingFrame {
    pub fn new(normal: &Unit<WorldVector>) -> ShadingFrame {
        let z = normal.into_inner();
        let helper = if z.x.abs() > 0.9 {
            WorldVector::y()
        } else {
            WorldVector::x()
        };
        let x = helper.cross(&z).normalize();
        let y = z.cross(&x);

        ShadingFrame { x, y, z }
    }

    pub fn normal(&self) -> WorldVector {
        self.z
    }

    pub fn to_local(&self, v: &WorldVector) -> WorldVector {
        WorldVector::new(v.dot(&self.x), v.dot(&self.y), v.dot(&self.z))
    }

    pub fn to_world(&self, v: &WorldVector) -> WorldVector {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
}
