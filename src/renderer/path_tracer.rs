//! Monte Carlo estimator of the radiance arriving through each pixel.

use std::num::NonZeroU32;

use rand::{SeedableRng, rngs::SmallRng};

use super::{DirectLighting, RenderSettings};
use crate::{
    bsdf::{BsdfModel as _, abs_cos_theta, cos_theta},
    camera::{Camera, LensSample},
    geometry::{
        EPSILON, FloatType, Ray, ScreenPoint, SensorPoint, ShadingFrame, WorldPoint, WorldVector,
    },
    sampling::{UNIFORM_HEMISPHERE_PDF, coin_flip, grid_sample, uniform_hemisphere},
    scene::{Intersection, Scene, TraversalCache},
    spectrum::{Spectrum, SpectrumExt as _, black},
};

/// Mutable per-thread state of the estimator.
#[derive(Clone, Debug)]
pub struct TraceContext {
    pub rng: SmallRng,
    pub cache: TraversalCache,
}

impl TraceContext {
    pub fn new(rng: SmallRng) -> Self {
        TraceContext {
            rng,
            cache: TraversalCache::default(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }
}

/// Radiance estimate of a single pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PixelEstimate {
    pub radiance: Spectrum,
    /// Number of camera samples actually taken
    pub sample_count: u32,
}

/// Everything needed to evaluate a hit: position, local frame and outgoing direction.
struct Shading {
    point: WorldPoint,
    frame: ShadingFrame,
    /// Direction towards the origin of the incoming ray, local frame
    wo: WorldVector,
}

impl Shading {
    fn new(ray: &Ray, isect: &Intersection) -> Self {
        let frame = ShadingFrame::new(&isect.normal);
        Shading {
            point: ray.point_at(isect.t),
            wo: frame.to_local(&-ray.direction),
            frame,
        }
    }
}

pub struct PathTracer<'a> {
    scene: &'a Scene,
    settings: &'a RenderSettings,
}

impl<'a> PathTracer<'a> {
    pub fn new(scene: &'a Scene, settings: &'a RenderSettings) -> Self {
        PathTracer { scene, settings }
    }

    /// Light emitted by the hit surface itself.
    pub fn zero_bounce(&self, isect: &Intersection) -> Spectrum {
        self.scene.bsdf(isect.bsdf).emission()
    }

    /// Light arriving directly from light sources and reflected at the hit.
    pub fn one_bounce(&self, ray: &Ray, isect: &Intersection, ctx: &mut TraceContext) -> Spectrum {
        let shading = Shading::new(ray, isect);
        match self.settings.direct_lighting {
            DirectLighting::Hemisphere => self.direct_hemisphere(&shading, isect, ctx),
            DirectLighting::Importance => self.direct_importance(&shading, isect, ctx),
        }
    }

    fn direct_hemisphere(
        &self,
        shading: &Shading,
        isect: &Intersection,
        ctx: &mut TraceContext,
    ) -> Spectrum {
        let bsdf = self.scene.bsdf(isect.bsdf);
        let samples_per_light = self.settings.samples_per_light.get() as usize;
        let sample_count = match self.scene.lights().len() * samples_per_light {
            0 => samples_per_light,
            n => n,
        };

        let mut l = black();
        for _ in 0..sample_count {
            let wi = uniform_hemisphere(&mut ctx.rng);
            let sample_ray = Ray::new(shading.point, shading.frame.to_world(&wi))
                .with_range(EPSILON, FloatType::INFINITY);

            let Some(hit) = self.scene.intersect(&sample_ray, &mut ctx.cache) else {
                continue;
            };
            let emission = self.scene.bsdf(hit.bsdf).emission();
            if emission.is_black() {
                continue;
            }

            l += bsdf.f(&shading.wo, &wi).component_mul(&emission) * cos_theta(&wi)
                / UNIFORM_HEMISPHERE_PDF
                / sample_count as FloatType;
        }
        l
    }

    fn direct_importance(
        &self,
        shading: &Shading,
        isect: &Intersection,
        ctx: &mut TraceContext,
    ) -> Spectrum {
        let bsdf = self.scene.bsdf(isect.bsdf);
        let samples_per_light = self.settings.samples_per_light.get();
        let sample_count = (self.scene.lights().len() * samples_per_light as usize) as FloatType;

        let mut l = black();
        for light in self.scene.lights() {
            for _ in 0..samples_per_light {
                let sample = light.sample_l(&shading.point, &mut ctx.rng);
                if sample.direction.dot(&shading.frame.normal()) < 0.0 || sample.radiance.is_black() {
                    if light.is_delta() {
                        break;
                    }
                    continue;
                }

                let shadow_ray = Ray::new(shading.point, sample.direction)
                    .with_range(EPSILON, sample.distance - EPSILON);
                if self.scene.has_intersection(&shadow_ray, &mut ctx.cache) {
                    if light.is_delta() {
                        break;
                    }
                    continue;
                }

                let wi = shading.frame.to_local(&sample.direction);
                let contribution = bsdf.f(&shading.wo, &wi).component_mul(&sample.radiance)
                    * cos_theta(&wi)
                    / sample.pdf
                    / sample_count;

                if light.is_delta() {
                    // Every sample of a delta light would be the same
                    l += contribution * samples_per_light as FloatType;
                    break;
                }
                l += contribution;
            }
        }
        l
    }

    /// Direct lighting at the hit plus, with Russian roulette, light from further bounces.
    pub fn at_least_one_bounce(
        &self,
        ray: &Ray,
        isect: &Intersection,
        ctx: &mut TraceContext,
    ) -> Spectrum {
        let bsdf = self.scene.bsdf(isect.bsdf);

        let mut l = black();
        if !bsdf.is_delta() {
            l += self.one_bounce(ray, isect, ctx);
        }

        let p = self.settings.russian_roulette;
        if ray.depth <= 1 || !coin_flip(&mut ctx.rng, p) {
            return l;
        }

        let shading = Shading::new(ray, isect);
        let Some(sample) = bsdf.sample_f(&shading.wo, &mut ctx.rng) else {
            return l;
        };

        let next_ray = Ray::new(shading.point, shading.frame.to_world(&sample.wi))
            .with_range(EPSILON, FloatType::INFINITY)
            .with_depth(ray.depth - 1);

        let incoming = match self.scene.intersect(&next_ray, &mut ctx.cache) {
            Some(next) => {
                let mut incoming = self.at_least_one_bounce(&next_ray, &next, ctx);
                // Direct lighting skipped the delta surface, emission reaches it this way
                if bsdf.is_delta() {
                    incoming += self.zero_bounce(&next);
                }
                incoming
            }
            None => self.environment(&next_ray),
        };

        l + sample.value.component_mul(&incoming) * abs_cos_theta(&sample.wi) / sample.pdf / p
    }

    fn environment(&self, ray: &Ray) -> Spectrum {
        self.scene
            .environment()
            .map_or_else(black, |env| env.sample_dir(&ray.direction))
    }

    /// Radiance arriving along a camera ray. The ray's depth is the bounce budget.
    pub fn estimate_radiance(&self, ray: &Ray, ctx: &mut TraceContext) -> Spectrum {
        let Some(isect) = self.scene.intersect(ray, &mut ctx.cache) else {
            return self.environment(ray);
        };

        let mut l = self.zero_bounce(&isect);
        if self.settings.max_ray_depth >= 1 {
            l += self.at_least_one_bounce(ray, &isect, ctx);
        }
        l
    }

    /// Averages camera samples jittered over the pixel until it converges or the sample
    /// budget runs out. Image rows go top to bottom.
    pub fn estimate_pixel(
        &self,
        camera: &Camera,
        pixel: &ScreenPoint,
        ctx: &mut TraceContext,
    ) -> PixelEstimate {
        let resolution = camera.resolution();
        let (width, height) = (resolution.x as FloatType, resolution.y as FloatType);

        adaptive_estimate(
            self.settings.samples_per_pixel,
            self.settings.samples_per_batch,
            self.settings.max_tolerance,
            || {
                let offset = grid_sample(&mut ctx.rng);
                let sensor = SensorPoint::new(
                    (pixel.x as FloatType + offset.x) / width,
                    1.0 - (pixel.y as FloatType + offset.y) / height,
                );
                let lens = LensSample::random(&mut ctx.rng);

                match camera.sample_ray(&sensor, &lens) {
                    Some(ray) => {
                        self.estimate_radiance(&ray.with_depth(self.settings.max_ray_depth), ctx)
                    }
                    None => black(),
                }
            },
        )
    }
}

/// Draws up to `max_samples` samples. After every `batch` samples the 95% confidence
/// interval of the mean luminance is checked and sampling stops once its half-width is
/// within `tolerance` of the mean.
pub fn adaptive_estimate(
    max_samples: NonZeroU32,
    batch: NonZeroU32,
    tolerance: FloatType,
    mut sample: impl FnMut() -> Spectrum,
) -> PixelEstimate {
    let mut radiance = black();
    let mut s1 = 0.0;
    let mut s2 = 0.0;
    let mut n = 0;

    while n < max_samples.get() {
        let value = sample();
        radiance += value;
        n += 1;

        let illuminance = value.illuminance();
        s1 += illuminance;
        s2 += illuminance * illuminance;

        if n >= 2 && n % batch.get() == 0 {
            let count = n as FloatType;
            let mean = s1 / count;
            let variance = ((s2 - s1 * s1 / count) / (count - 1.0)).max(0.0);
            let half_width = 1.96 * variance.sqrt() / count.sqrt();
            if half_width <= tolerance * mean {
                break;
            }
        }
    }

    PixelEstimate {
        radiance: radiance / n as FloatType,
        sample_count: n,
    }
}

/// Focuses a thin lens or compound lens camera on whatever is visible at the given image
/// position (pixel units, rows top to bottom). Returns the new focal distance, or None if
/// nothing was hit or the optics can't be refocused.
pub fn autofocus(scene: &Scene, camera: &mut Camera, x: FloatType, y: FloatType) -> Option<FloatType> {
    let resolution = camera.resolution();
    let sensor = SensorPoint::new(
        x / resolution.x as FloatType,
        1.0 - y / resolution.y as FloatType,
    );
    let ray = camera.generate_ray(&sensor);

    let Some(isect) = scene.intersect(&ray, &mut TraversalCache::default()) else {
        log::info!("Autofocus at ({x}, {y}) hit nothing, keeping focal distance");
        return None;
    };

    if camera.set_focal_distance(isect.t) {
        log::info!("Autofocus set focal distance to {:.4}", isect.t);
        Some(isect.t)
    } else {
        log::warn!("Camera optics can't focus at distance {:.4}", isect.t);
        None
    }
}
