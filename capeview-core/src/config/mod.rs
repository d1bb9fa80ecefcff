//! Visual configuration for CapeView.
//!
//! Holds the in-memory settings store that drives the renderer.

mod settings;

pub use settings::{AccessoryMode, ConfigStore, ModelVariant, VisualConfig};
