//! Scene configuration and built-in scenes.

mod config;
mod presets;

pub use config::{Backdrop, DirectionalLight, SceneConfig};
pub use presets::Preset;
