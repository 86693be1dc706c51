//! Built-in Cornell box scenes.
//!
//! The box spans x, z in [-1, 1] and y in [0, 2], open towards +Z where the camera sits.

use super::{Light, SceneBuilder};
use crate::{
    bsdf::{Diffuse, Emission, Glass, Microfacet, Mirror},
    camera::Camera,
    geometry::{ScreenSize, WorldBox, WorldPoint, WorldVector},
    spectrum::{Spectrum, grey},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Preset {
    /// Two white diffuse spheres
    CornellDiffuse,
    /// Mirror and glass sphere
    CornellSpecular,
    /// Rough gold and polished silver sphere
    CornellMicrofacet,
    /// Empty box, room for a loaded mesh
    CornellEmpty,
}

const SPHERE_RADIUS: f64 = 0.35;
const LIGHT_SIZE: f64 = 0.5;
const LIGHT_HEIGHT: f64 = 1.99;

impl Preset {
    pub fn scene_builder(self) -> SceneBuilder {
        let mut builder = SceneBuilder::default();

        let white = builder.add_material(Diffuse::new(grey(0.75)));
        let red = builder.add_material(Diffuse::new(Spectrum::new(0.75, 0.1, 0.1)));
        let green = builder.add_material(Diffuse::new(Spectrum::new(0.1, 0.6, 0.1)));
        let light_radiance = Spectrum::new(14.0, 12.0, 9.0);
        let lamp = builder.add_material(Emission::new(light_radiance));

        let x = WorldVector::x() * 2.0;
        let y = WorldVector::y() * 2.0;
        let z = WorldVector::z() * 2.0;
        let corner = WorldPoint::new(-1.0, 0.0, -1.0);

        builder
            .add_quad(corner, z, x, white) // floor
            .add_quad(corner + y, x, z, white) // ceiling
            .add_quad(corner, x, y, white) // back
            .add_quad(corner, y, z, red) // left
            .add_quad(corner + x, z, y, green); // right

        let light_x = WorldVector::x() * LIGHT_SIZE;
        let light_z = WorldVector::z() * LIGHT_SIZE;
        builder.add_quad(
            WorldPoint::new(-LIGHT_SIZE / 2.0, LIGHT_HEIGHT, -LIGHT_SIZE / 2.0),
            light_x,
            light_z,
            lamp,
        );
        builder.add_light(Light::area(
            WorldPoint::new(0.0, LIGHT_HEIGHT, 0.0),
            light_x,
            light_z,
            light_radiance,
        ));

        let left = WorldPoint::new(-0.45, SPHERE_RADIUS, -0.3);
        let right = WorldPoint::new(0.45, SPHERE_RADIUS, 0.3);
        let spheres = match self {
            Preset::CornellDiffuse => Some((white, white)),
            Preset::CornellSpecular => Some((
                builder.add_material(Mirror::new(grey(0.9))),
                builder.add_material(Glass::new(grey(1.0), grey(1.0), 1.5)),
            )),
            Preset::CornellMicrofacet => Some((
                builder.add_material(Microfacet::new(
                    0.25,
                    Spectrum::new(0.143, 0.374, 1.442),
                    Spectrum::new(3.983, 2.385, 1.603),
                )),
                builder.add_material(Microfacet::new(
                    0.05,
                    Spectrum::new(0.155, 0.117, 0.138),
                    Spectrum::new(4.827, 3.122, 2.147),
                )),
            )),
            Preset::CornellEmpty => None,
        };
        if let Some((left_material, right_material)) = spheres {
            builder
                .add_sphere(left, SPHERE_RADIUS, left_material)
                .add_sphere(right, SPHERE_RADIUS, right_material);
        }

        builder
    }

    /// Region of the box where a loaded mesh fits without touching the walls.
    pub fn mesh_bounds(self) -> WorldBox {
        WorldBox::new(WorldPoint::new(-0.7, 0.0, -0.7), WorldPoint::new(0.7, 1.4, 0.7))
    }

    /// Pinhole camera looking into the box through its open side.
    pub fn camera(self, resolution: ScreenSize) -> Camera {
        Camera::builder()
            .position(WorldPoint::new(0.0, 1.0, 3.6))
            .target(WorldPoint::new(0.0, 1.0, 0.0))
            .resolution(resolution)
            .v_fov(40.0)
            .min_distance(0.5)
            .max_distance(20.0)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bsdf::BsdfModel,
        geometry::{Ray, SensorPoint},
        scene::TraversalCache,
    };
    use assert2::{assert, check, let_assert};
    use test_case::test_case;

    #[test_case(Preset::CornellDiffuse, 14)]
    #[test_case(Preset::CornellSpecular, 14)]
    #[test_case(Preset::CornellMicrofacet, 14)]
    #[test_case(Preset::CornellEmpty, 12)]
    fn builds(preset: Preset, primitives: usize) {
        let builder = preset.scene_builder();
        check!(builder.primitive_count() == primitives);
        let_assert!(Ok(scene) = builder.build(4));
        check!(scene.lights().len() == 1);

        let bounds = scene.bounding_box();
        check!((bounds.min - WorldPoint::new(-1.0, 0.0, -1.0)).norm() < 1e-12);
        check!((bounds.max - WorldPoint::new(1.0, 2.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn camera_sees_the_back_wall() {
        let_assert!(Ok(scene) = Preset::CornellEmpty.scene_builder().build(4));
        let camera = Preset::CornellEmpty.camera(ScreenSize::new(64, 64));
        let ray = camera.generate_ray(&SensorPoint::new(0.5, 0.5));

        let mut cache = TraversalCache::default();
        let_assert!(Some(hit) = scene.intersect(&ray, &mut cache));
        assert!((hit.t - 4.6).abs() < 1e-9);
        assert!(hit.normal.z > 0.99);
    }

    #[test]
    fn light_quad_faces_down() {
        let_assert!(Ok(scene) = Preset::CornellDiffuse.scene_builder().build(4));
        let ray = Ray::new(WorldPoint::new(0.05, 1.0, 0.05), WorldVector::y());
        let mut cache = TraversalCache::default();
        let_assert!(Some(hit) = scene.intersect(&ray, &mut cache));
        check!((hit.t - 0.99).abs() < 1e-9);
        check!(hit.normal.y < -0.99);
        check!(scene.bsdf(hit.bsdf).emission() == Spectrum::new(14.0, 12.0, 9.0));
    }
}
