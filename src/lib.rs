pub mod bsdf;
pub mod camera;
pub mod geometry;
pub mod renderer;
mod sampling;
pub mod scene;
mod screen_block;
pub mod spectrum;
mod util;

pub use crate::renderer::{DirectLighting, RenderProgress, RenderSettings, render};
pub use camera::Camera;
pub use scene::Scene;
