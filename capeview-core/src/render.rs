//! Reconciling the visual config into renderer calls.
//!
//! The rendering engine itself is an opaque collaborator behind the
//! [`PlayerRenderer`] trait; this module owns the order of operations and
//! the failure policy when driving it. Reconciliation runs on a dedicated
//! task consuming commands in commit order, so two rapid config changes
//! can never interleave their renderer calls.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{AccessoryMode, ModelVariant, VisualConfig};
use crate::texture::{self, TextureRef};

// =============================================================================
// Renderer Collaborator
// =============================================================================

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to fetch texture: {0}")]
    Fetch(String),
    #[error("failed to decode texture: {0}")]
    Decode(String),
}

/// Capability surface of the rendering engine.
///
/// Construction is implementation-specific; releasing renderer resources
/// happens on `Drop`. Loads may suspend; implementations keep the previous
/// texture visible until a load completes, and on failure.
#[async_trait]
pub trait PlayerRenderer: Send {
    /// Load the skin texture tagged with the mesh variant.
    async fn load_skin(
        &mut self,
        texture: &TextureRef,
        variant: ModelVariant,
    ) -> Result<(), RenderError>;

    /// Load the back-accessory texture into `slot`, or clear the slot when
    /// `texture` is `None`.
    async fn load_cape(
        &mut self,
        texture: Option<&TextureRef>,
        slot: AccessoryMode,
    ) -> Result<(), RenderError>;

    fn set_animation_paused(&mut self, paused: bool);

    fn resize(&mut self, width: u32, height: u32);
}

// =============================================================================
// Synchronizer
// =============================================================================

/// Drives a [`PlayerRenderer`] to match committed [`VisualConfig`]s.
pub struct RenderSynchronizer<R: PlayerRenderer> {
    renderer: R,
}

impl<R: PlayerRenderer> RenderSynchronizer<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer }
    }

    /// Reconcile the renderer with `config`.
    ///
    /// Each step's failure is caught and logged; the renderer retains its
    /// last successfully loaded state for the failed slot and the
    /// remaining steps still run.
    pub async fn apply(&mut self, config: &VisualConfig) {
        let skin = texture::resolve(&config.skin_texture);
        if let Err(e) = self.renderer.load_skin(&skin, config.model_variant).await {
            warn!(error = %e, "Failed to load skin texture");
        }

        match &config.cape_texture {
            Some(cape) => {
                let cape = texture::resolve(cape);
                if let Err(e) = self
                    .renderer
                    .load_cape(Some(&cape), config.accessory_mode)
                    .await
                {
                    warn!(error = %e, "Failed to load cape texture");
                }
            }
            None => {
                // No texture means no back accessory, whatever the mode;
                // an explicit clear keeps a stale cape from lingering.
                if let Err(e) = self.renderer.load_cape(None, config.accessory_mode).await {
                    warn!(error = %e, "Failed to clear cape slot");
                }
            }
        }

        self.renderer.set_animation_paused(!config.animation_enabled);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }

    pub fn into_inner(self) -> R {
        self.renderer
    }
}

// =============================================================================
// Render Loop
// =============================================================================

/// Commands consumed by the render loop.
#[derive(Debug, Clone)]
pub enum RenderCommand {
    /// Reconcile the renderer with a freshly committed config.
    Apply(VisualConfig),
    /// The hosting surface changed size.
    Resize(u32, u32),
}

/// Sender for render commands.
pub type RenderSender = mpsc::UnboundedSender<RenderCommand>;

/// Receiver for render commands.
pub type RenderReceiver = mpsc::UnboundedReceiver<RenderCommand>;

/// Create the command channel feeding the render loop.
pub fn render_channel() -> (RenderSender, RenderReceiver) {
    mpsc::unbounded_channel()
}

/// Run the reconciliation loop until the sender side closes.
///
/// Commands are processed strictly in commit order. When the channel
/// closes (surface teardown) the renderer is dropped, releasing its
/// resources.
pub async fn run_render_loop<R: PlayerRenderer>(renderer: R, mut rx: RenderReceiver) {
    let mut synchronizer = RenderSynchronizer::new(renderer);
    while let Some(command) = rx.recv().await {
        match command {
            RenderCommand::Apply(config) => synchronizer.apply(&config).await,
            RenderCommand::Resize(width, height) => synchronizer.resize(width, height),
        }
    }
    debug!("Render loop finished");
}

/// Spawn [`run_render_loop`] as a task. Must be called within a Tokio
/// runtime context.
pub fn spawn_render_loop<R>(renderer: R, rx: RenderReceiver) -> JoinHandle<()>
where
    R: PlayerRenderer + 'static,
{
    tokio::spawn(run_render_loop(renderer, rx))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Skin(TextureRef, ModelVariant),
        Cape(Option<TextureRef>, AccessoryMode),
        Paused(bool),
        Resize(u32, u32),
    }

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_skin: bool,
        fail_cape: bool,
    }

    impl RecordingRenderer {
        fn new() -> (Self, Arc<Mutex<Vec<Call>>>) {
            let renderer = Self::default();
            let calls = renderer.calls.clone();
            (renderer, calls)
        }
    }

    #[async_trait]
    impl PlayerRenderer for RecordingRenderer {
        async fn load_skin(
            &mut self,
            texture: &TextureRef,
            variant: ModelVariant,
        ) -> Result<(), RenderError> {
            if self.fail_skin {
                return Err(RenderError::Fetch("connection refused".into()));
            }
            self.calls
                .lock()
                .unwrap()
                .push(Call::Skin(texture.clone(), variant));
            Ok(())
        }

        async fn load_cape(
            &mut self,
            texture: Option<&TextureRef>,
            slot: AccessoryMode,
        ) -> Result<(), RenderError> {
            if self.fail_cape {
                return Err(RenderError::Decode("not a png".into()));
            }
            self.calls
                .lock()
                .unwrap()
                .push(Call::Cape(texture.cloned(), slot));
            Ok(())
        }

        fn set_animation_paused(&mut self, paused: bool) {
            self.calls.lock().unwrap().push(Call::Paused(paused));
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.calls.lock().unwrap().push(Call::Resize(width, height));
        }
    }

    fn sample_config() -> VisualConfig {
        VisualConfig {
            skin_texture: TextureRef::remote("https://example.com/skin.png"),
            cape_texture: Some(TextureRef::remote("https://example.com/cape.png")),
            accessory_mode: AccessoryMode::Cape,
            model_variant: ModelVariant::Classic,
            animation_enabled: true,
        }
    }

    // -------------------------------------------------------------------------
    // Apply Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_apply_loads_skin_cape_and_animation_in_order() {
        let (renderer, calls) = RecordingRenderer::new();
        let mut sync = RenderSynchronizer::new(renderer);

        sync.apply(&sample_config()).await;

        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                Call::Skin(
                    TextureRef::remote("https://example.com/skin.png"),
                    ModelVariant::Classic
                ),
                Call::Cape(
                    Some(TextureRef::remote("https://example.com/cape.png")),
                    AccessoryMode::Cape
                ),
                Call::Paused(false),
            ]
        );
    }

    #[tokio::test]
    async fn test_absent_cape_always_clears_slot() {
        let (renderer, calls) = RecordingRenderer::new();
        let mut sync = RenderSynchronizer::new(renderer);

        // Round trip: set a cape, then clear it.
        sync.apply(&sample_config()).await;
        let mut config = sample_config();
        config.cape_texture = None;
        sync.apply(&config).await;

        let calls = calls.lock().unwrap();
        let last_cape = calls
            .iter()
            .rev()
            .find(|call| matches!(call, Call::Cape(..)))
            .unwrap();
        assert_eq!(*last_cape, Call::Cape(None, AccessoryMode::Cape));
    }

    #[tokio::test]
    async fn test_elytra_mode_routes_same_texture_to_elytra_slot() {
        let (renderer, calls) = RecordingRenderer::new();
        let mut sync = RenderSynchronizer::new(renderer);

        sync.apply(&sample_config()).await;
        let mut config = sample_config();
        config.accessory_mode = AccessoryMode::Elytra;
        sync.apply(&config).await;

        let calls = calls.lock().unwrap();
        let last_cape = calls
            .iter()
            .rev()
            .find(|call| matches!(call, Call::Cape(..)))
            .unwrap();
        assert_eq!(
            *last_cape,
            Call::Cape(
                Some(TextureRef::remote("https://example.com/cape.png")),
                AccessoryMode::Elytra
            )
        );
    }

    #[tokio::test]
    async fn test_animation_flag_is_negated() {
        let (renderer, calls) = RecordingRenderer::new();
        let mut sync = RenderSynchronizer::new(renderer);

        let mut config = sample_config();
        config.animation_enabled = false;
        sync.apply(&config).await;

        assert!(calls.lock().unwrap().contains(&Call::Paused(true)));
    }

    #[tokio::test]
    async fn test_skin_failure_does_not_block_remaining_steps() {
        let (mut renderer, calls) = RecordingRenderer::new();
        renderer.fail_skin = true;
        let mut sync = RenderSynchronizer::new(renderer);

        sync.apply(&sample_config()).await;

        let calls = calls.lock().unwrap();
        assert!(calls.iter().any(|call| matches!(call, Call::Cape(..))));
        assert!(calls.contains(&Call::Paused(false)));
    }

    #[tokio::test]
    async fn test_cape_failure_still_sets_animation() {
        let (mut renderer, calls) = RecordingRenderer::new();
        renderer.fail_cape = true;
        let mut sync = RenderSynchronizer::new(renderer);

        sync.apply(&sample_config()).await;

        assert!(calls.lock().unwrap().contains(&Call::Paused(false)));
    }

    #[tokio::test]
    async fn test_allow_listed_skin_is_resolved_through_relay() {
        let (renderer, calls) = RecordingRenderer::new();
        let mut sync = RenderSynchronizer::new(renderer);

        let mut config = sample_config();
        config.skin_texture = TextureRef::remote("https://namemc.com/texture/abc.png");
        sync.apply(&config).await;

        let calls = calls.lock().unwrap();
        let Call::Skin(TextureRef::Remote(url), _) = &calls[0] else {
            panic!("expected a skin load first");
        };
        assert!(url.starts_with("https://api.allorigins.win/raw?url="));
    }

    // -------------------------------------------------------------------------
    // Render Loop Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_render_loop_processes_commands_in_commit_order() {
        let (renderer, calls) = RecordingRenderer::new();
        let (tx, rx) = render_channel();
        let handle = spawn_render_loop(renderer, rx);

        tx.send(RenderCommand::Apply(sample_config())).unwrap();
        tx.send(RenderCommand::Resize(800, 600)).unwrap();
        let mut config = sample_config();
        config.cape_texture = None;
        tx.send(RenderCommand::Apply(config)).unwrap();

        drop(tx);
        handle.await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                Call::Skin(
                    TextureRef::remote("https://example.com/skin.png"),
                    ModelVariant::Classic
                ),
                Call::Cape(
                    Some(TextureRef::remote("https://example.com/cape.png")),
                    AccessoryMode::Cape
                ),
                Call::Paused(false),
                Call::Resize(800, 600),
                Call::Skin(
                    TextureRef::remote("https://example.com/skin.png"),
                    ModelVariant::Classic
                ),
                Call::Cape(None, AccessoryMode::Cape),
                Call::Paused(false),
            ]
        );
    }

    #[tokio::test]
    async fn test_render_loop_ends_when_sender_closes() {
        let (renderer, _calls) = RecordingRenderer::new();
        let (tx, rx) = render_channel();
        let handle = spawn_render_loop(renderer, rx);

        drop(tx);
        handle.await.unwrap();
    }
}
