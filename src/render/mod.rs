//! Progressive rendering.
//!
//! ```text
//! SharedGrid ──read lock──► TraceContext::sample_pixel (rayon rows)
//!                                   │
//!                                   ▼
//!                        AccumulationBuffer ──tone_map──► Image
//!                                   ▲
//!          SppController ◄── frame time ── Renderer::render_frame
//! ```

mod accum;
mod adaptive;
mod integrator;
mod renderer;

pub use accum::{AccumulationBuffer, Image, Texel, ToneMap};
pub use adaptive::{SppController, MAX_SPP, TARGET_FPS};
pub use integrator::{
    cosine_hemisphere, russian_roulette, spawn_point, SurfaceHit, TraceContext, HIGHLIGHT_COLOR,
    MAX_DEPTH, SURFACE_OFFSET,
};
pub use renderer::{FrameStats, Renderer};
