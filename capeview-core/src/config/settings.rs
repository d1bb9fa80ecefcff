//! The visual configuration and its store.
//!
//! `ConfigStore` is the single source of truth for what the renderer should
//! display. All writers (UI toggles, uploads, the watch poller) go through
//! the GUI update loop, so commits are serialized; each commit replaces the
//! whole config atomically and bumps a generation counter.

use crate::texture::{self, TextureRef};

// =============================================================================
// Model Variant
// =============================================================================

/// Arm-width variant of the avatar mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelVariant {
    /// 4px arms.
    #[default]
    Classic,
    /// 3px arms.
    Slim,
}

impl ModelVariant {
    /// Get all available variants.
    pub fn all() -> &'static [ModelVariant] {
        &[Self::Classic, Self::Slim]
    }

    /// The opposite variant (the UI exposes a single switch button).
    pub fn toggled(self) -> Self {
        match self {
            Self::Classic => Self::Slim,
            Self::Slim => Self::Classic,
        }
    }

    /// Label used in the control panel.
    pub fn arm_label(self) -> &'static str {
        match self {
            Self::Classic => "4px Arms (Classic)",
            Self::Slim => "3px Arms (Slim)",
        }
    }
}

impl std::fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classic => write!(f, "Classic"),
            Self::Slim => write!(f, "Slim"),
        }
    }
}

// =============================================================================
// Accessory Mode
// =============================================================================

/// Which back-accessory slot the cape texture is rendered into. The two
/// modes are mutually exclusive and share one texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessoryMode {
    #[default]
    Cape,
    Elytra,
}

impl AccessoryMode {
    /// Get all available modes.
    pub fn all() -> &'static [AccessoryMode] {
        &[Self::Cape, Self::Elytra]
    }
}

impl std::fmt::Display for AccessoryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cape => write!(f, "Cape"),
            Self::Elytra => write!(f, "Elytra"),
        }
    }
}

// =============================================================================
// Visual Config
// =============================================================================

/// Everything the renderer needs to display the avatar.
///
/// `skin_texture` is never absent once a config exists; `cape_texture`
/// absent means no back accessory is rendered regardless of
/// `accessory_mode`.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualConfig {
    /// The player skin.
    pub skin_texture: TextureRef,

    /// The cape texture, if any.
    pub cape_texture: Option<TextureRef>,

    /// Back-accessory slot the cape renders into.
    pub accessory_mode: AccessoryMode,

    /// Avatar mesh variant.
    pub model_variant: ModelVariant,

    /// Whether the idle animation advances.
    pub animation_enabled: bool,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            skin_texture: texture::default_skin(),
            cape_texture: Some(texture::default_cape()),
            accessory_mode: AccessoryMode::default(),
            model_variant: ModelVariant::default(),
            animation_enabled: true,
        }
    }
}

// =============================================================================
// Config Store
// =============================================================================

/// Owns exactly one current [`VisualConfig`].
///
/// Updates are applied as whole-object replacements in arrival order; last
/// write wins, no history. The generation counter lets observers detect
/// commits without comparing configs.
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: VisualConfig,
    generation: u64,
}

impl ConfigStore {
    /// Create a store seeded with the default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with a specific config.
    pub fn with_config(config: VisualConfig) -> Self {
        Self {
            current: config,
            generation: 0,
        }
    }

    /// The most recently committed config.
    pub fn get(&self) -> &VisualConfig {
        &self.current
    }

    /// Owned copy of the most recently committed config.
    pub fn snapshot(&self) -> VisualConfig {
        self.current.clone()
    }

    /// Bumped on every commit.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the whole config.
    pub fn replace(&mut self, config: VisualConfig) {
        self.current = config;
        self.generation += 1;
    }

    /// Patch one or more fields. The mutation is staged on a copy and
    /// committed as a single whole-object replacement.
    pub fn update(&mut self, mutate: impl FnOnce(&mut VisualConfig)) {
        let mut next = self.current.clone();
        mutate(&mut next);
        self.replace(next);
    }
}

// =============================================================================
// Tests
// =============================================================================
