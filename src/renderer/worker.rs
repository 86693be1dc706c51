use rand::{SeedableRng, rngs::SmallRng};

use super::{
    PathTracer, RenderSettings,
    path_tracer::{PixelEstimate, TraceContext},
};
use crate::{
    camera::Camera,
    geometry::ScreenBlock,
    scene::Scene,
    screen_block::ScreenBlockExt as _,
    spectrum::Spectrum,
};

/// Per-thread renderer state, reused across tiles.
pub struct Worker {
    ctx: TraceContext,
    radiance: Vec<Spectrum>,
    sample_counts: Vec<u32>,
}

impl Worker {
    pub fn new(worker_id: usize) -> Self {
        log::debug!("Starting worker {worker_id}");
        Self {
            ctx: TraceContext::new(SmallRng::from_os_rng()),
            radiance: Vec::new(),
            sample_counts: Vec::new(),
        }
    }

    /// Renders all pixels of the tile into the worker's buffers, row-major over the tile.
    pub fn render_tile(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        settings: &RenderSettings,
        tile: &ScreenBlock,
        tile_index: usize,
    ) {
        if let Some(seed) = settings.seed {
            // Per-tile seed, independent of which worker gets the tile
            self.ctx.rng = SmallRng::seed_from_u64(seed.wrapping_add(tile_index as u64));
        }

        self.radiance.clear();
        self.sample_counts.clear();

        let tracer = PathTracer::new(scene, settings);
        for point in tile.internal_points() {
            let PixelEstimate {
                radiance,
                sample_count,
            } = tracer.estimate_pixel(camera, &point, &mut self.ctx);
            self.radiance.push(radiance);
            self.sample_counts.push(sample_count);
        }
    }

    pub fn radiance(&self) -> &[Spectrum] {
        &self.radiance
    }

    pub fn sample_counts(&self) -> &[u32] {
        &self.sample_counts
    }

    pub fn take_intersection_tests(&mut self) -> u64 {
        self.ctx.cache.take_intersection_tests()
    }
}
