use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
};

use anyhow::{Context as _, anyhow, ensure};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use lenspath::{
    DirectLighting, RenderSettings,
    bsdf::Diffuse,
    camera::{CompoundLens, Optics},
    geometry::ScreenSize,
    render,
    renderer::{Tonemapper, autofocus},
    scene::{Mesh, Preset},
    spectrum::grey,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LensKind {
    Pinhole,
    Thin,
    Compound,
}

/// Render a Cornell box scene to a PNG file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Maximum camera rays per pixel
    #[arg(short, long, default_value_t = NonZeroU32::MIN)]
    samples: NonZeroU32,

    /// Samples per area light
    #[arg(short, long = "light-samples", default_value_t = NonZeroU32::MIN)]
    light_samples: NonZeroU32,

    /// Maximum ray depth, 0 renders emitters only
    #[arg(short, long = "max-depth", default_value_t = 1)]
    max_depth: u32,

    /// Adaptive sampling: samples per batch and tolerance
    #[arg(short, long, num_args = 2, value_names = ["BATCH", "TOLERANCE"])]
    adaptive: Option<Vec<f64>>,

    /// Use uniform hemisphere sampling for direct lighting
    #[arg(short = 'H', long)]
    hemisphere: bool,

    #[arg(short, long, num_args = 2, value_names = ["WIDTH", "HEIGHT"], default_values_t = [640, 480])]
    resolution: Vec<u32>,

    /// Worker thread count, one per core when not set
    #[arg(short, long)]
    threads: Option<NonZeroUsize>,

    #[arg(long, default_value = "32")]
    tile_size: NonZeroU32,

    #[arg(long, value_enum, default_value_t = Preset::CornellDiffuse)]
    scene: Preset,

    /// OBJ mesh placed inside the box
    #[arg(long)]
    mesh: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LensKind::Pinhole)]
    lens: LensKind,

    /// Lens radius for the thin lens, aperture stop radius for the compound lens
    #[arg(long, default_value_t = 0.05)]
    aperture: f64,

    /// Distance of the plane in focus, defaults to the camera target
    #[arg(long)]
    focal_distance: Option<f64>,

    /// Focus on whatever is visible at the given pixel
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    autofocus: Option<Vec<f64>>,

    #[arg(long, default_value_t = 2.2)]
    gamma: f64,

    /// Exposure multiplier
    #[arg(long, default_value_t = 1.0)]
    level: f64,

    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// Seed for reproducible renders
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides RUST_LOG
    #[arg(long)]
    log_level: Option<log::LevelFilter>,
}

impl Args {
    fn settings(&self) -> anyhow::Result<RenderSettings> {
        let mut settings = RenderSettings {
            tile_size: self.tile_size,
            samples_per_pixel: self.samples,
            samples_per_light: self.light_samples,
            max_ray_depth: self.max_depth,
            direct_lighting: if self.hemisphere {
                DirectLighting::Hemisphere
            } else {
                DirectLighting::Importance
            },
            threads: self.threads,
            seed: self.seed,
            ..Default::default()
        };

        if let Some(adaptive) = &self.adaptive {
            let &[batch, tolerance] = adaptive.as_slice() else {
                return Err(anyhow!("--adaptive takes a batch size and a tolerance"));
            };
            ensure!(
                batch >= 1.0 && batch.fract() == 0.0 && batch <= u32::MAX as f64,
                "Batch size must be a positive integer, got {batch}"
            );
            settings.samples_per_batch = NonZeroU32::new(batch as u32).context("Zero batch size")?;
            settings.max_tolerance = tolerance;
        }

        settings.validate()?;
        Ok(settings)
    }

    fn resolution(&self) -> anyhow::Result<ScreenSize> {
        let &[width, height] = self.resolution.as_slice() else {
            return Err(anyhow!("--resolution takes a width and a height"));
        };
        ensure!(width > 0 && height > 0, "Resolution must be positive, got {width}x{height}");
        Ok(ScreenSize::new(width, height))
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = args.log_level {
        logger.filter_level(level);
    }
    logger.init();

    let settings = args.settings()?;
    let resolution = args.resolution()?;

    let mut builder = args.scene.scene_builder();
    if let Some(path) = &args.mesh {
        let mut mesh = Mesh::with_obj(path).with_context(|| format!("Loading {}", path.display()))?;
        mesh.fit_into(&args.scene.mesh_bounds());
        let material = builder.add_material(Diffuse::new(grey(0.75)));
        builder.add_mesh(&mesh, material);
    }
    let scene = builder.build(settings.max_leaf_size.get())?;

    let mut camera = args.scene.camera(resolution);
    let focal_distance = args
        .focal_distance
        .unwrap_or_else(|| (camera.target() - camera.position()).norm());
    match args.lens {
        LensKind::Pinhole => {}
        LensKind::Thin => camera.set_optics(Optics::thin_lens(args.aperture, focal_distance)?)?,
        LensKind::Compound => camera.set_optics(Optics::Compound(CompoundLens::biconvex(
            0.1,
            0.02,
            1.5,
            0.03,
            args.aperture,
            focal_distance,
            camera.v_fov(),
            camera.aspect_ratio(),
        )?))?,
    }

    if let Some(point) = &args.autofocus {
        let &[x, y] = point.as_slice() else {
            return Err(anyhow!("--autofocus takes a pixel position"));
        };
        autofocus(&scene, &mut camera, x, y);
    }

    let max_samples = settings.samples_per_pixel.get();
    let bar = ProgressBar::no_length().with_style(
        ProgressStyle::with_template("{wide_bar} {pos}/{len} tiles, {elapsed_precise} elapsed, eta {eta}")?,
    );
    let mut render_progress = render(scene, camera, settings, |_| {}, {
        let bar = bar.clone();
        move |_, progress| {
            bar.update(|ps| {
                ps.set_len(progress.total as u64);
                ps.set_pos(progress.finished as u64)
            })
        }
    })?;
    bar.set_length(render_progress.progress().total as u64);

    render_progress.wait()?;
    bar.finish();

    let film = render_progress
        .film()
        .lock()
        .map_err(|_| anyhow!("Film lock poisoned"))?;
    let tonemapper = Tonemapper {
        gamma: args.gamma,
        level: args.level,
        ..Default::default()
    };
    film.to_image(&tonemapper)
        .save(&args.output)
        .with_context(|| format!("Saving {}", args.output.display()))?;

    let rate_path = args.output.with_file_name(format!(
        "{}_rate.png",
        args.output
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("render")
    ));
    film.rate_image(max_samples)
        .save(&rate_path)
        .with_context(|| format!("Saving {}", rate_path.display()))?;

    log::info!("Saved {} and {}", args.output.display(), rate_path.display());
    Ok(())
}
