mod film;
mod machinery;
mod path_tracer;
mod settings;
mod worker;

pub use film::{Film, Tonemapper};
pub use machinery::{RenderProgress, TileProgress, render};
pub use path_tracer::{PathTracer, PixelEstimate, TraceContext, adaptive_estimate, autofocus};
pub use settings::{DirectLighting, RenderSettings, SettingsError};
