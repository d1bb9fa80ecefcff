//! CapeView Core Library
//!
//! This crate provides the core functionality for CapeView, a Minecraft
//! skin and cape studio. It includes:
//!
//! - The visual configuration store (single source of truth for the viewer)
//! - Texture references and the CORS-relay source resolver
//! - The local cape file watch poller
//! - The render synchronizer driving a pluggable renderer
//! - The AI cape suggestion client with a deterministic fallback

pub mod config;
pub mod render;
pub mod suggest;
pub mod texture;
pub mod watch;

// Re-exports for convenience
pub use config::{AccessoryMode, ConfigStore, ModelVariant, VisualConfig};

// Re-export texture handling
pub use texture::{
    default_cape, default_skin, fetch_bytes, resolve, InlineTexture, TextureError, TextureRef,
};

// Re-export the watch poller
pub use watch::{watch_channel, WatchEvent, WatchReceiver, WatchSender, WatchSession, POLL_INTERVAL};

// Re-export the render pipeline
pub use render::{
    render_channel, run_render_loop, spawn_render_loop, PlayerRenderer, RenderCommand, RenderError,
    RenderReceiver, RenderSender, RenderSynchronizer,
};

// Re-export suggestions
pub use suggest::{CapeSuggestion, SuggestionClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
