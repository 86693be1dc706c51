use std::num::NonZeroU32;

use assert2::{assert, check, let_assert};
use lenspath::{
    Camera, DirectLighting, RenderSettings, Scene,
    bsdf::{Diffuse, Emission},
    camera::{CompoundLens, Optics},
    geometry::{FloatType, Ray, ScreenPoint, ScreenSize, WorldPoint, WorldVector},
    render,
    renderer::{Film, PathTracer, TraceContext, autofocus},
    scene::{Light, Preset},
    spectrum::{Spectrum, SpectrumExt as _, black, grey},
};

fn nz(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

fn render_film(scene: Scene, camera: Camera, settings: RenderSettings) -> Film {
    let mut progress = render(scene, camera, settings, |_| {}, |_, _| {}).unwrap();
    progress.wait().unwrap();
    assert!(progress.is_finished());
    progress.film().lock().unwrap().clone()
}

fn pixels(film: &Film) -> impl Iterator<Item = ScreenPoint> + '_ {
    let size = film.size();
    (0..size.y).flat_map(move |y| (0..size.x).map(move |x| ScreenPoint::new(x, y)))
}

/// Two large parallel planes: a diffuse floor at y = 0 and a glowing ceiling at y = 1.
fn glowing_slab(albedo: FloatType, emission: FloatType) -> Scene {
    let mut builder = Scene::builder();
    let floor = builder.add_material(Diffuse::new(grey(albedo)));
    let ceiling = builder.add_material(Emission::new(grey(emission)));
    builder
        .add_quad(
            WorldPoint::new(-50.0, 0.0, -50.0),
            WorldVector::new(0.0, 0.0, 100.0),
            WorldVector::new(100.0, 0.0, 0.0),
            floor,
        )
        .add_quad(
            WorldPoint::new(-50.0, 1.0, -50.0),
            WorldVector::new(100.0, 0.0, 0.0),
            WorldVector::new(0.0, 0.0, 100.0),
            ceiling,
        );
    builder.build(4).unwrap()
}

#[test]
fn depth_zero_shows_emitters_only() {
    let emission = grey(3.0);
    let mut builder = Scene::builder();
    let glow = builder.add_material(Emission::new(emission));
    builder
        .add_sphere(WorldPoint::origin(), 1.0, glow)
        .add_light(Light::point(WorldPoint::new(0.0, 3.0, 0.0), grey(10.0)));
    let scene = builder.build(4).unwrap();

    let camera = Camera::builder()
        .position(WorldPoint::new(0.0, 0.0, 5.0))
        .target(WorldPoint::origin())
        .resolution(ScreenSize::new(16, 16))
        .build();
    let settings = RenderSettings {
        samples_per_pixel: nz(4),
        samples_per_batch: nz(4),
        max_ray_depth: 0,
        direct_lighting: DirectLighting::Importance,
        seed: Some(3),
        ..Default::default()
    };

    let film = render_film(scene, camera, settings);

    for p in [ScreenPoint::new(7, 7), ScreenPoint::new(8, 8)] {
        check!((film.radiance(&p) - emission).norm() < 1e-12);
    }
    for p in [ScreenPoint::new(0, 0), ScreenPoint::new(15, 8), ScreenPoint::new(8, 0)] {
        check!(film.radiance(&p) == black());
    }
    // Silhouette pixels average hits and misses, so each one is k/4 of the emission
    for p in pixels(&film) {
        let radiance = film.radiance(&p);
        let coverage = radiance.x / emission.x * 4.0;
        let k = coverage.round();
        assert!((coverage - k).abs() < 1e-9, "{p:?}: {radiance:?}");
        assert!((0.0..=4.0).contains(&k));
        assert!((radiance - emission * (k / 4.0)).norm() < 1e-9);
    }
}

#[test]
fn diffuse_slab_does_not_amplify_energy() {
    let scene = glowing_slab(0.5, 1.0);
    let settings = RenderSettings {
        samples_per_pixel: nz(8),
        samples_per_light: nz(16),
        max_ray_depth: 1,
        direct_lighting: DirectLighting::Hemisphere,
        seed: Some(11),
        ..Default::default()
    };

    // Single hemisphere estimates are cos θ, their mean is albedo · L
    let tracer = PathTracer::new(&scene, &settings);
    let mut ctx = TraceContext::seeded(5);
    let ray = Ray::new(WorldPoint::new(0.3, 0.5, -0.2), -WorldVector::y()).with_depth(1);
    let n = 2000;
    let mut sum = black();
    for _ in 0..n {
        let l = tracer.estimate_radiance(&ray, &mut ctx);
        assert!(l.iter().all(|c| *c >= 0.0 && *c <= 1.0 + 1e-9));
        sum += l;
    }
    let mean = sum / n as FloatType;
    check!((mean.x - 0.5).abs() < 0.02);

    let camera = Camera::builder()
        .position(WorldPoint::new(0.0, 0.5, 3.0))
        .target(WorldPoint::new(0.0, 0.4, 0.0))
        .resolution(ScreenSize::new(24, 16))
        .v_fov(90.0)
        .build();
    let film = render_film(scene, camera, settings);
    for p in pixels(&film) {
        let radiance = film.radiance(&p);
        assert!(radiance.iter().all(|c| c.is_finite() && *c >= 0.0 && *c <= 1.0 + 1e-9));
    }
}

#[test]
fn constant_radiance_stops_after_first_batch() {
    let mut builder = Scene::builder();
    let glow = builder.add_material(Emission::new(grey(1.0)));
    builder.add_sphere(WorldPoint::origin(), 10.0, glow);
    let scene = builder.build(4).unwrap();

    let camera = Camera::builder()
        .position(WorldPoint::new(0.0, 0.0, 1.0))
        .target(WorldPoint::origin())
        .resolution(ScreenSize::new(12, 8))
        .build();
    let settings = RenderSettings {
        samples_per_pixel: nz(64),
        samples_per_batch: nz(8),
        max_ray_depth: 1,
        seed: Some(1),
        ..Default::default()
    };

    let film = render_film(scene, camera, settings);
    for p in pixels(&film) {
        check!(film.sample_count(&p) == 8);
        check!((film.radiance(&p) - grey(1.0)).norm() < 1e-12);
    }
    check!(film.total_samples() == 12 * 8 * 8);
}

#[test]
fn cornell_box_renders() {
    let preset = Preset::CornellDiffuse;
    let scene = preset.scene_builder().build(4).unwrap();
    let settings = RenderSettings {
        tile_size: nz(8),
        samples_per_pixel: nz(8),
        samples_per_batch: nz(8),
        max_ray_depth: 3,
        seed: Some(2),
        ..Default::default()
    };
    let film = render_film(scene, preset.camera(ScreenSize::new(32, 24)), settings);

    let total: Spectrum = pixels(&film).map(|p| film.radiance(&p)).sum();
    check!(total.illuminance() > 0.0);
    check!(total.iter().all(|c| c.is_finite()));

    let image = film.to_image(&Default::default());
    check!(image.dimensions() == (32, 24));
}

#[test]
fn autofocus_on_back_wall() {
    let preset = Preset::CornellDiffuse;
    let scene = preset.scene_builder().build(4).unwrap();
    let mut camera = preset.camera(ScreenSize::new(32, 24));
    let_assert!(Ok(optics) = Optics::thin_lens(0.05, 1.0));
    let_assert!(Ok(()) = camera.set_optics(optics));

    // Left of the middle row, clear of the spheres
    let_assert!(Some(distance) = autofocus(&scene, &mut camera, 10.0, 12.0));
    check!(distance > 4.6 && distance < 4.8);
    check!(camera.focal_distance() == Some(distance));
}

#[test]
fn autofocus_moves_compound_lens_sensor() {
    let preset = Preset::CornellDiffuse;
    let scene = preset.scene_builder().build(4).unwrap();
    let mut camera = preset.camera(ScreenSize::new(32, 24));
    let_assert!(
        Ok(lens) = CompoundLens::biconvex(0.1, 0.02, 1.5, 0.03, 0.02, 1.0, camera.v_fov(), camera.aspect_ratio())
    );
    let_assert!(Ok(()) = camera.set_optics(Optics::Compound(lens)));
    let_assert!(Some(before) = camera.focal_distance());
    check!(before < 1.1);

    let_assert!(Some(distance) = autofocus(&scene, &mut camera, 10.0, 12.0));
    check!(distance > 4.6 && distance < 4.8);
    let_assert!(Some(after) = camera.focal_distance());
    check!((after - distance).abs() < 1e-3);
    let_assert!(Optics::Compound(lens) = camera.optics());
    check!(lens.focus_offset() < 0.0);
}

#[test]
fn compound_lens_sees_the_box() {
    let preset = Preset::CornellDiffuse;
    let scene = preset.scene_builder().build(4).unwrap();
    let mut camera = preset.camera(ScreenSize::new(16, 12));
    let_assert!(
        Ok(lens) = CompoundLens::biconvex(0.1, 0.02, 1.5, 0.03, 0.02, 3.6, camera.v_fov(), camera.aspect_ratio())
    );
    let_assert!(Ok(()) = camera.set_optics(Optics::Compound(lens)));

    let settings = RenderSettings {
        tile_size: nz(8),
        samples_per_pixel: nz(16),
        samples_per_batch: nz(16),
        max_ray_depth: 2,
        seed: Some(4),
        ..Default::default()
    };
    let film = render_film(scene, camera, settings);

    let total: Spectrum = pixels(&film).map(|p| film.radiance(&p)).sum();
    check!(total.illuminance() > 0.0);
    check!(total.iter().all(|c| c.is_finite()));
}
