use std::num::{NonZeroU32, NonZeroUsize};

use thiserror::Error;

use crate::geometry::FloatType;

/// How direct lighting is estimated at non-specular surfaces.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DirectLighting {
    /// Uniform directions over the hemisphere, only hits on emissive surfaces count
    Hemisphere,
    /// Directions sampled from the lights, with shadow rays
    #[default]
    Importance,
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(FloatType),

    #[error("Russian roulette continuation probability must be in (0, 1], got {0}")]
    InvalidContinuation(FloatType),
}

#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub tile_size: NonZeroU32,
    /// Maximal number of camera samples per pixel
    pub samples_per_pixel: NonZeroU32,
    /// Samples per light for direct lighting
    pub samples_per_light: NonZeroU32,
    /// 0 renders emission only, 1 adds direct lighting, more adds indirect bounces
    pub max_ray_depth: u32,
    /// Convergence of a pixel is checked after every batch of this many samples
    pub samples_per_batch: NonZeroU32,
    /// Relative half-width of the 95% confidence interval at which a pixel is done
    pub max_tolerance: FloatType,
    pub direct_lighting: DirectLighting,
    pub max_leaf_size: NonZeroUsize,
    /// Probability of continuing a path at each bounce
    pub russian_roulette: FloatType,
    /// Forces the number of worker threads, otherwise one pinned thread per core
    pub threads: Option<NonZeroUsize>,
    /// Seed for deterministic renders, otherwise seeded from the OS
    pub seed: Option<u64>,
}

const DEFAULT_TILE_SIZE: NonZeroU32 = NonZeroU32::new(32).unwrap();
const DEFAULT_BATCH: NonZeroU32 = NonZeroU32::new(32).unwrap();
const DEFAULT_LEAF_SIZE: NonZeroUsize = NonZeroUsize::new(4).unwrap();

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            tile_size: DEFAULT_TILE_SIZE,
            samples_per_pixel: NonZeroU32::MIN,
            samples_per_light: NonZeroU32::MIN,
            max_ray_depth: 1,
            samples_per_batch: DEFAULT_BATCH,
            max_tolerance: 0.05,
            direct_lighting: DirectLighting::default(),
            max_leaf_size: DEFAULT_LEAF_SIZE,
            russian_roulette: 0.7,
            threads: None,
            seed: None,
        }
    }
}

impl RenderSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.max_tolerance.is_finite() && self.max_tolerance >= 0.0) {
            return Err(SettingsError::InvalidTolerance(self.max_tolerance));
        }
        if !(self.russian_roulette > 0.0 && self.russian_roulette <= 1.0) {
            return Err(SettingsError::InvalidContinuation(self.russian_roulette));
        }
        Ok(())
    }
}
