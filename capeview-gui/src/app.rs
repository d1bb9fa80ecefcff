//! Main application state and update loop.

use std::path::PathBuf;

use eframe::egui;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use capeview_core::{
    render_channel, spawn_render_loop, watch_channel, AccessoryMode, CapeSuggestion, ConfigStore,
    RenderCommand, RenderSender, SuggestionClient, TextureRef, VisualConfig, WatchEvent,
    WatchReceiver, WatchSender, WatchSession,
};

use crate::ui;
use crate::ui::viewer::{EguiPlayerRenderer, ViewerPane};

/// Environment variable holding the analysis service API key.
const API_KEY_ENV: &str = "GEMINI_API_KEY";

// =============================================================================
// Application State
// =============================================================================

/// Main application state.
pub struct CapeViewApp {
    /// Tokio runtime for async operations.
    pub runtime: Runtime,

    /// The visual configuration store. All commits go through
    /// [`CapeViewApp::commit`] so every change reaches the render loop.
    pub store: ConfigStore,

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------
    /// Viewer pane painting the shared renderer state.
    pub viewer: ViewerPane,

    /// Command channel into the render loop. Dropping it (app teardown)
    /// ends the loop and releases the renderer.
    render_tx: RenderSender,

    /// Handle to the render loop task.
    #[allow(dead_code)]
    render_task: tokio::task::JoinHandle<()>,

    /// Last viewport size pushed to the renderer.
    viewer_size: egui::Vec2,

    // -------------------------------------------------------------------------
    // Cape Watching
    // -------------------------------------------------------------------------
    /// Active watch session, if any. Replacing or clearing the slot aborts
    /// the previous session's polling task.
    pub watch: Option<WatchSession>,

    /// Sender cloned into each watch session.
    watch_tx: WatchSender,

    /// Events from the active watch session.
    watch_rx: WatchReceiver,

    // -------------------------------------------------------------------------
    // Suggestions
    // -------------------------------------------------------------------------
    /// Client for the analysis service.
    suggestion_client: SuggestionClient,

    /// Latest suggestion. Display-only; never fed back into the store.
    pub suggestion: Option<CapeSuggestion>,

    /// Whether a suggestion request is in flight.
    pub is_suggesting: bool,

    /// Pending suggestion result receiver.
    suggest_rx: Option<oneshot::Receiver<CapeSuggestion>>,

    // -------------------------------------------------------------------------
    // File Dialogs
    // -------------------------------------------------------------------------
    /// Pending skin upload receiver.
    skin_pick_rx: Option<oneshot::Receiver<Option<Vec<u8>>>>,

    /// Pending cape upload receiver.
    cape_pick_rx: Option<oneshot::Receiver<Option<Vec<u8>>>>,

    /// Pending watch-file selection receiver.
    watch_pick_rx: Option<oneshot::Receiver<Option<PathBuf>>>,

    // -------------------------------------------------------------------------
    // UI State
    // -------------------------------------------------------------------------
    /// Status message.
    pub status_message: Option<(String, chrono::DateTime<chrono::Utc>)>,
}

impl CapeViewApp {
    /// Create a new application instance.
    pub fn new(cc: &eframe::CreationContext<'_>, runtime: Runtime) -> Self {
        info!("Initializing CapeViewApp");

        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let mut style = (*cc.egui_ctx.style()).clone();
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        cc.egui_ctx.set_style(style);

        let store = ConfigStore::new();

        // The renderer lives on the render loop task; the pane paints the
        // state they share.
        let (renderer, shared) = EguiPlayerRenderer::new(cc.egui_ctx.clone());
        let (render_tx, render_rx) = render_channel();
        let render_task = {
            let _guard = runtime.enter();
            spawn_render_loop(renderer, render_rx)
        };

        let (watch_tx, watch_rx) = watch_channel();

        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        if api_key.is_empty() {
            warn!("{} not set, cape suggestions will fall back", API_KEY_ENV);
        }

        let app = Self {
            runtime,
            store,
            viewer: ViewerPane::new(shared),
            render_tx,
            render_task,
            viewer_size: egui::Vec2::ZERO,
            watch: None,
            watch_tx,
            watch_rx,
            suggestion_client: SuggestionClient::new(api_key),
            suggestion: None,
            is_suggesting: false,
            suggest_rx: None,
            skin_pick_rx: None,
            cape_pick_rx: None,
            watch_pick_rx: None,
            status_message: None,
        };

        // Seed the renderer with the default config.
        let _ = app
            .render_tx
            .send(RenderCommand::Apply(app.store.snapshot()));
        app
    }

    // -------------------------------------------------------------------------
    // Config Commits
    // -------------------------------------------------------------------------

    /// Commit a config change and trigger reconciliation.
    pub fn commit(&mut self, mutate: impl FnOnce(&mut VisualConfig)) {
        self.store.update(mutate);
        let _ = self
            .render_tx
            .send(RenderCommand::Apply(self.store.snapshot()));
    }

    pub fn toggle_model(&mut self) {
        self.commit(|c| c.model_variant = c.model_variant.toggled());
    }

    pub fn toggle_accessory_mode(&mut self) {
        self.commit(|c| {
            c.accessory_mode = match c.accessory_mode {
                AccessoryMode::Cape => AccessoryMode::Elytra,
                AccessoryMode::Elytra => AccessoryMode::Cape,
            }
        });
    }

    pub fn toggle_animation(&mut self) {
        self.commit(|c| c.animation_enabled = !c.animation_enabled);
    }

    pub fn clear_cape(&mut self) {
        self.stop_watch();
        self.commit(|c| c.cape_texture = None);
        self.set_status("Cape cleared");
    }

    // -------------------------------------------------------------------------
    // Uploads
    // -------------------------------------------------------------------------

    /// Open a skin upload dialog asynchronously.
    pub fn upload_skin(&mut self) {
        if self.skin_pick_rx.is_some() {
            return;
        }

        let (tx, rx) = oneshot::channel();
        self.skin_pick_rx = Some(rx);

        self.runtime.spawn(async move {
            let picked = rfd::AsyncFileDialog::new()
                .add_filter("Image", &["png", "jpg", "jpeg"])
                .pick_file()
                .await;
            let bytes = match picked {
                Some(handle) => Some(handle.read().await),
                None => None,
            };
            let _ = tx.send(bytes);
        });
    }

    /// Open a cape upload dialog asynchronously.
    pub fn upload_cape(&mut self) {
        if self.cape_pick_rx.is_some() {
            return;
        }

        let (tx, rx) = oneshot::channel();
        self.cape_pick_rx = Some(rx);

        self.runtime.spawn(async move {
            let picked = rfd::AsyncFileDialog::new()
                .add_filter("Cape PNG", &["png"])
                .pick_file()
                .await;
            let bytes = match picked {
                Some(handle) => Some(handle.read().await),
                None => None,
            };
            let _ = tx.send(bytes);
        });
    }

    fn check_skin_pick(&mut self) {
        if let Some(mut rx) = self.skin_pick_rx.take() {
            match rx.try_recv() {
                Ok(Some(bytes)) => {
                    info!(len = bytes.len(), "Skin uploaded");
                    // An upload takes precedence over any active watch.
                    self.stop_watch();
                    self.commit(|c| c.skin_texture = TextureRef::inline_png(bytes));
                    self.set_status("Skin updated");
                }
                Ok(None) => {
                    debug!("Skin selection cancelled");
                }
                Err(oneshot::error::TryRecvError::Empty) => {
                    self.skin_pick_rx = Some(rx);
                }
                Err(oneshot::error::TryRecvError::Closed) => {
                    warn!("Skin selection channel closed unexpectedly");
                }
            }
        }
    }

    fn check_cape_pick(&mut self) {
        if let Some(mut rx) = self.cape_pick_rx.take() {
            match rx.try_recv() {
                Ok(Some(bytes)) => {
                    info!(len = bytes.len(), "Cape uploaded");
                    // Single writer to the cape slot: the upload wins.
                    self.stop_watch();
                    self.commit(|c| c.cape_texture = Some(TextureRef::inline_png(bytes)));
                    self.set_status("Cape updated");
                }
                Ok(None) => {
                    debug!("Cape selection cancelled");
                }
                Err(oneshot::error::TryRecvError::Empty) => {
                    self.cape_pick_rx = Some(rx);
                }
                Err(oneshot::error::TryRecvError::Closed) => {
                    warn!("Cape selection channel closed unexpectedly");
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Cape Watching
    // -------------------------------------------------------------------------

    /// Prompt for a local cape PNG and start mirroring it.
    pub fn start_watch(&mut self) {
        if self.watch_pick_rx.is_some() {
            return;
        }

        let (tx, rx) = oneshot::channel();
        self.watch_pick_rx = Some(rx);

        self.runtime.spawn(async move {
            let picked = rfd::AsyncFileDialog::new()
                .add_filter("Minecraft Cape PNG", &["png"])
                .pick_file()
                .await
                .map(|handle| handle.path().to_path_buf());
            let _ = tx.send(picked);
        });
    }

    fn check_watch_pick(&mut self) {
        if let Some(mut rx) = self.watch_pick_rx.take() {
            match rx.try_recv() {
                Ok(Some(path)) => {
                    let session = {
                        let _guard = self.runtime.enter();
                        WatchSession::start(path, self.watch_tx.clone())
                    };
                    self.set_status(&format!("Watching {}", session.file_name()));
                    // Replacing the slot aborts any previous session.
                    self.watch = Some(session);
                }
                Ok(None) => {
                    debug!("Cape watch selection cancelled");
                }
                Err(oneshot::error::TryRecvError::Empty) => {
                    self.watch_pick_rx = Some(rx);
                }
                Err(oneshot::error::TryRecvError::Closed) => {
                    warn!("File picker unavailable on this platform");
                    self.watch = None;
                }
            }
        }
    }

    /// Stop any active watch session. Safe to call when none is active.
    pub fn stop_watch(&mut self) {
        if self.watch.take().is_some() {
            self.set_status("Stopped watching cape file");
        }
    }

    /// Commit cape textures emitted by the watch poller, in arrival order.
    fn process_watch_events(&mut self) {
        let mut updates = Vec::new();
        while let Ok(WatchEvent::CapeUpdated(texture)) = self.watch_rx.try_recv() {
            updates.push(texture);
        }
        for texture in updates {
            self.commit(|c| c.cape_texture = Some(texture));
        }
    }

    // -------------------------------------------------------------------------
    // Suggestions
    // -------------------------------------------------------------------------

    /// Ask the analysis service for a cape suggestion for the current skin.
    pub fn request_suggestion(&mut self) {
        if self.is_suggesting {
            return;
        }

        info!("Requesting cape suggestion");
        self.is_suggesting = true;

        let (tx, rx) = oneshot::channel();
        self.suggest_rx = Some(rx);

        let client = self.suggestion_client.clone();
        let skin = self.store.get().skin_texture.clone();
        self.runtime.spawn(async move {
            let suggestion = client.suggest(&skin).await;
            let _ = tx.send(suggestion);
        });
    }

    fn check_suggestion(&mut self) {
        if let Some(mut rx) = self.suggest_rx.take() {
            match rx.try_recv() {
                Ok(suggestion) => {
                    self.suggestion = Some(suggestion);
                    self.is_suggesting = false;
                    self.set_status("Cape suggestion ready");
                }
                Err(oneshot::error::TryRecvError::Empty) => {
                    self.suggest_rx = Some(rx);
                }
                Err(oneshot::error::TryRecvError::Closed) => {
                    warn!("Suggestion channel closed unexpectedly");
                    self.is_suggesting = false;
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Status & Layout
    // -------------------------------------------------------------------------

    /// Set a status message.
    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some((msg.to_string(), chrono::Utc::now()));
    }

    /// Clear old status messages.
    pub fn clear_old_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if chrono::Utc::now() - *time > chrono::Duration::seconds(5) {
                self.status_message = None;
            }
        }
    }

    /// Push viewport size changes to the renderer.
    fn handle_viewer_resize(&mut self, size: egui::Vec2) {
        if size != self.viewer_size && size.x > 0.0 && size.y > 0.0 {
            self.viewer_size = size;
            let _ = self
                .render_tx
                .send(RenderCommand::Resize(size.x as u32, size.y as u32));
        }
    }
}

impl eframe::App for CapeViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for async completions
        self.check_skin_pick();
        self.check_cape_pick();
        self.check_watch_pick();
        self.check_suggestion();

        // Commit cape updates from the watch poller
        self.process_watch_events();
        self.clear_old_status();

        // Top panel with menu
        egui::TopBottomPanel::top("menu_panel").show(ctx, |ui| {
            ui::menu::render(self, ui, ctx);
        });

        // Status bar at bottom
        egui::TopBottomPanel::bottom("status_panel")
            .max_height(24.0)
            .show(ctx, |ui| {
                ui::status::render(self, ui);
            });

        // Control panel on the right
        egui::SidePanel::right("control_panel")
            .resizable(false)
            .default_width(340.0)
            .show(ctx, |ui| {
                ui::controls::render(self, ui);
            });

        // Viewer fills the remaining space
        egui::CentralPanel::default().show(ctx, |ui| {
            let size = ui.available_size();
            self.handle_viewer_resize(size);
            ui::viewer::render(self, ui);
        });

        // Keep pumping the update loop while background work can deliver
        // results outside of user interaction.
        if self.is_suggesting
            || self.watch.is_some()
            || self.skin_pick_rx.is_some()
            || self.cape_pick_rx.is_some()
            || self.watch_pick_rx.is_some()
        {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}
