use std::{
    num::NonZeroUsize,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use anyhow::anyhow;
use core_affinity::CoreId;

use crate::{
    camera::Camera,
    geometry::ScreenBlock,
    renderer::{Film, RenderSettings, worker::Worker},
    scene::Scene,
    screen_block::ScreenBlockExt as _,
};

/// Number of finished tiles out of the total.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileProgress {
    pub finished: usize,
    pub total: usize,
}

/// Starts rendering on background threads and returns immediately.
/// The callbacks are called from the worker threads before and after each tile.
pub fn render<F1, F2>(
    scene: Scene,
    camera: Camera,
    settings: RenderSettings,
    started_tile_callback: F1,
    finished_tile_callback: F2,
) -> anyhow::Result<RenderProgress>
where
    F1: Fn(ScreenBlock) + Send + Sync + 'static,
    F2: Fn(ScreenBlock, TileProgress) + Send + Sync + 'static,
{
    settings.validate()?;

    let resolution = camera.resolution();
    let tile_ordering = ScreenBlock::from_size(resolution).tile_ordering(settings.tile_size);
    let cores = thread_plan(settings.threads);

    log::info!(
        "Rendering {}x{} pixels in {} tiles on {} threads, up to {} samples per pixel, max depth {}",
        resolution.x,
        resolution.y,
        tile_ordering.len(),
        cores.len(),
        settings.samples_per_pixel,
        settings.max_ray_depth,
    );

    let state = Arc::new(RenderState {
        scene,
        camera,
        settings,

        film: Mutex::new(Film::new(resolution)),

        tile_ordering,
        next_tile_index: AtomicUsize::new(0),
        finished_tiles: AtomicUsize::new(0),
        intersection_tests: AtomicU64::new(0),
        started: Instant::now(),
    });
    let started_tile_callback = Arc::new(started_tile_callback);
    let finished_tile_callback = Arc::new(finished_tile_callback);

    let threads = cores
        .into_iter()
        .enumerate()
        .map(|(worker_id, core)| {
            let state = Arc::clone(&state);
            let started_tile_callback = Arc::clone(&started_tile_callback);
            let finished_tile_callback = Arc::clone(&finished_tile_callback);

            thread::Builder::new()
                .name(format!("worker{worker_id}"))
                .spawn(move || {
                    if let Some(core) = core {
                        core_affinity::set_for_current(core);
                    }

                    let mut worker = Worker::new(worker_id);
                    let total = state.tile_ordering.len();

                    while let Some((tile_index, tile)) = state.get_next_tile() {
                        (started_tile_callback)(tile.clone());

                        worker.render_tile(
                            &state.scene,
                            &state.camera,
                            &state.settings,
                            tile,
                            tile_index,
                        );
                        state
                            .film
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .write_tile(tile, worker.radiance(), worker.sample_counts());
                        state
                            .intersection_tests
                            .fetch_add(worker.take_intersection_tests(), Ordering::Relaxed);

                        let finished = state.finished_tiles.fetch_add(1, Ordering::AcqRel) + 1;
                        log::debug!("Tile {tile_index} done ({finished}/{total})");
                        (finished_tile_callback)(tile.clone(), TileProgress { finished, total });
                    }
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RenderProgress {
        render_state: state,
        threads,
    })
}

/// One entry per worker thread, with the core to pin it to if known.
fn thread_plan(threads: Option<NonZeroUsize>) -> Vec<Option<CoreId>> {
    if let Some(threads) = threads {
        return vec![None; threads.get()];
    }
    match core_affinity::get_core_ids() {
        Some(cores) if !cores.is_empty() => cores.into_iter().map(Some).collect(),
        _ => {
            log::warn!("Core list not available, running unpinned threads");
            vec![None; num_cpus::get().max(1)]
        }
    }
}

pub struct RenderProgress {
    render_state: Arc<RenderState>,
    threads: Vec<JoinHandle<()>>,
}

impl RenderProgress {
    pub fn progress(&self) -> TileProgress {
        TileProgress {
            finished: self.render_state.finished_tiles.load(Ordering::Acquire),
            total: self.render_state.tile_ordering.len(),
        }
    }

    pub fn progress_percent(&self) -> f32 {
        let TileProgress { finished, total } = self.progress();
        if total == 0 {
            100.0
        } else {
            100.0 * (finished as f32) / (total as f32)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.threads.iter().all(|handle| handle.is_finished())
    }

    /// Signal the workers to abort.
    /// Any running workers will still finish their tiles, but no new ones will be started.
    pub fn abort(&self) {
        self.render_state
            .next_tile_index
            .store(self.render_state.tile_ordering.len(), Ordering::Release);
    }

    /// Blocks until all workers are done.
    pub fn wait(&mut self) -> anyhow::Result<()> {
        let panicked = self
            .threads
            .drain(..)
            .map(|handle| handle.join())
            .filter(Result::is_err)
            .count();

        if panicked > 0 {
            return Err(anyhow!("{panicked} worker threads panicked"));
        }

        let film = self.film().lock().unwrap_or_else(PoisonError::into_inner);
        log::info!(
            "Render finished in {:.2?}: {} samples, {} intersection tests",
            self.render_state.started.elapsed(),
            film.total_samples(),
            self.intersection_tests(),
        );
        log::info!("Samples per pixel: {}", film.sample_stats());
        Ok(())
    }

    pub fn film(&self) -> &Mutex<Film> {
        &self.render_state.film
    }

    /// Ray/primitive tests of all finished tiles.
    pub fn intersection_tests(&self) -> u64 {
        self.render_state.intersection_tests.load(Ordering::Relaxed)
    }
}

struct RenderState {
    scene: Scene,
    camera: Camera,
    settings: RenderSettings,

    film: Mutex<Film>,

    tile_ordering: Vec<ScreenBlock>,
    next_tile_index: AtomicUsize,
    finished_tiles: AtomicUsize,
    intersection_tests: AtomicU64,
    started: Instant,
}

impl RenderState {
    fn get_next_tile(&self) -> Option<(usize, &ScreenBlock)> {
        let id = self.next_tile_index.fetch_add(1, Ordering::AcqRel);
        self.tile_ordering.get(id).map(|tile| (id, tile))
    }
}
