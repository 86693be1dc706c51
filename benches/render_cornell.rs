use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use lenspath::{RenderSettings, geometry::ScreenSize, render, scene::Preset};

fn criterion_benchmark(c: &mut Criterion) {
    let settings = RenderSettings {
        tile_size: 16.try_into().unwrap(),
        samples_per_pixel: 16.try_into().unwrap(),
        samples_per_batch: 16.try_into().unwrap(),
        max_ray_depth: 3,
        seed: Some(1),
        ..Default::default()
    };

    for preset in [Preset::CornellDiffuse, Preset::CornellSpecular] {
        let scene = preset
            .scene_builder()
            .build(settings.max_leaf_size.get())
            .unwrap();
        let camera = preset.camera(ScreenSize::new(160, 120));

        c.bench_function(&format!("render_{preset:?}"), |b| {
            b.iter_batched(
                || (camera.clone(), settings.clone(), scene.clone()),
                |(camera, settings, scene)| {
                    let mut render_progress =
                        render(scene, camera, settings, |_| {}, |_, _| {}).unwrap();
                    render_progress.wait().unwrap();
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20).measurement_time(Duration::from_secs(30));
    targets = criterion_benchmark
}
criterion_main!(benches);
