//! Avatar preview pane and the egui-backed renderer.
//!
//! The renderer task decodes textures into the shared [`ViewerState`]; the
//! pane uploads them to egui textures whenever the state version moves.
//! While a load is in flight, and after a failed load, the pane keeps
//! showing whatever it last had.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use eframe::egui::{self, RichText};
use image::RgbaImage;

use capeview_core::render::{PlayerRenderer, RenderError};
use capeview_core::{texture, AccessoryMode, ModelVariant, TextureRef};

use crate::app::CapeViewApp;
use crate::ui::colors;

// =============================================================================
// Shared Viewer State
// =============================================================================

/// Decoded textures and flags written by the renderer task, read by the
/// pane each frame.
#[derive(Default)]
pub struct ViewerState {
    skin: Option<RgbaImage>,
    skin_variant: ModelVariant,
    cape: Option<RgbaImage>,
    cape_slot: AccessoryMode,
    animation_paused: bool,
    viewport: (u32, u32),
    /// Bumped whenever a texture changes so the pane re-uploads handles.
    version: u64,
}

pub type SharedViewer = Arc<Mutex<ViewerState>>;

// =============================================================================
// Renderer Implementation
// =============================================================================

/// Flat-preview implementation of the renderer collaborator.
pub struct EguiPlayerRenderer {
    ctx: egui::Context,
    http: reqwest::Client,
    state: SharedViewer,
}

impl EguiPlayerRenderer {
    /// Create the renderer and the state handle the pane paints from.
    pub fn new(ctx: egui::Context) -> (Self, SharedViewer) {
        let state = SharedViewer::default();
        let renderer = Self {
            ctx,
            http: reqwest::Client::new(),
            state: state.clone(),
        };
        (renderer, state)
    }

    fn state(&self) -> MutexGuard<'_, ViewerState> {
        self.state.lock().expect("viewer state lock poisoned")
    }

    async fn decode(&self, texture: &TextureRef) -> Result<RgbaImage, RenderError> {
        let (bytes, _mime) = texture::fetch_bytes(&self.http, texture)
            .await
            .map_err(|e| RenderError::Fetch(e.to_string()))?;
        let image =
            image::load_from_memory(&bytes).map_err(|e| RenderError::Decode(e.to_string()))?;
        Ok(image.to_rgba8())
    }
}

#[async_trait]
impl PlayerRenderer for EguiPlayerRenderer {
    async fn load_skin(
        &mut self,
        texture: &TextureRef,
        variant: ModelVariant,
    ) -> Result<(), RenderError> {
        let image = self.decode(texture).await?;
        {
            let mut state = self.state();
            state.skin = Some(image);
            state.skin_variant = variant;
            state.version += 1;
        }
        self.ctx.request_repaint();
        Ok(())
    }

    async fn load_cape(
        &mut self,
        texture: Option<&TextureRef>,
        slot: AccessoryMode,
    ) -> Result<(), RenderError> {
        let image = match texture {
            Some(texture) => Some(self.decode(texture).await?),
            None => None,
        };
        {
            let mut state = self.state();
            state.cape = image;
            state.cape_slot = slot;
            state.version += 1;
        }
        self.ctx.request_repaint();
        Ok(())
    }

    fn set_animation_paused(&mut self, paused: bool) {
        self.state().animation_paused = paused;
        self.ctx.request_repaint();
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.state().viewport = (width, height);
    }
}

// =============================================================================
// Viewer Pane
// =============================================================================

/// Paints the shared viewer state.
pub struct ViewerPane {
    state: SharedViewer,
    skin_texture: Option<egui::TextureHandle>,
    cape_texture: Option<egui::TextureHandle>,
    uploaded_version: u64,
}

impl ViewerPane {
    pub fn new(state: SharedViewer) -> Self {
        Self {
            state,
            skin_texture: None,
            cape_texture: None,
            uploaded_version: 0,
        }
    }

    /// Re-upload egui textures if the renderer committed anything since the
    /// last frame. Returns the flags needed to paint this frame.
    fn refresh_textures(
        &mut self,
        ctx: &egui::Context,
    ) -> (ModelVariant, AccessoryMode, bool, (u32, u32)) {
        let (skin, cape, variant, slot, paused, viewport, version, changed) = {
            let state = self.state.lock().expect("viewer state lock poisoned");
            let changed = state.version != self.uploaded_version;
            let (skin, cape) = if changed {
                (state.skin.clone(), state.cape.clone())
            } else {
                (None, None)
            };
            (
                skin,
                cape,
                state.skin_variant,
                state.cape_slot,
                state.animation_paused,
                state.viewport,
                state.version,
                changed,
            )
        };

        if changed {
            self.skin_texture = skin.map(|image| upload(ctx, "viewer-skin", &image));
            self.cape_texture = cape.map(|image| upload(ctx, "viewer-cape", &image));
            self.uploaded_version = version;
        }

        (variant, slot, paused, viewport)
    }

    fn ui(&mut self, ui: &mut egui::Ui) {
        let (variant, slot, paused, viewport) = self.refresh_textures(ui.ctx());
        let muted = colors::muted(ui.visuals());

        // Pixel-art scale follows the viewport height the renderer was last
        // fitted to.
        let skin_scale = if viewport.1 > 0 {
            (viewport.1 as f32 / 180.0).clamp(2.0, 6.0).floor()
        } else {
            4.0
        };
        let cape_scale = (skin_scale - 1.0).max(2.0);

        egui::Frame::none()
            .fill(colors::viewer_bg(ui.visuals()))
            .stroke(egui::Stroke::new(1.0, colors::border(ui.visuals())))
            .inner_margin(egui::Margin::same(12.0))
            .show(ui, |ui| {
                ui.set_min_size(ui.available_size());

                if self.skin_texture.is_none() {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.spinner();
                            ui.label(
                                RichText::new("INITIALIZING ENGINE...")
                                    .size(11.0)
                                    .color(muted),
                            );
                        });
                    });
                    return;
                }

                let time = ui.input(|i| i.time);
                let bob = if paused {
                    0.0
                } else {
                    ((time * 2.0).sin() * 6.0) as f32
                };
                if !paused {
                    ui.ctx().request_repaint();
                }

                ui.vertical_centered(|ui| {
                    ui.add_space(32.0 + bob);

                    if let Some(skin) = &self.skin_texture {
                        let size =
                            egui::vec2(skin.size()[0] as f32, skin.size()[1] as f32) * skin_scale;
                        ui.add(egui::Image::new(skin).fit_to_exact_size(size));
                        ui.label(
                            RichText::new(format!(
                                "{} MODEL",
                                variant.to_string().to_uppercase()
                            ))
                            .size(10.0)
                            .color(muted),
                        );
                    }

                    ui.add_space(16.0);

                    match &self.cape_texture {
                        Some(cape) => {
                            let size = egui::vec2(cape.size()[0] as f32, cape.size()[1] as f32)
                                * cape_scale;
                            ui.add(egui::Image::new(cape).fit_to_exact_size(size));
                            ui.label(
                                RichText::new(format!(
                                    "{} SLOT",
                                    slot.to_string().to_uppercase()
                                ))
                                .size(10.0)
                                .color(muted),
                            );
                        }
                        None => {
                            ui.label(RichText::new("NO BACK ACCESSORY").size(10.0).color(muted));
                        }
                    }
                });

                ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("●").size(8.0).color(colors::ACCENT));
                        ui.label(
                            RichText::new("RENDER: FLAT_PREVIEW")
                                .size(9.0)
                                .monospace()
                                .color(muted),
                        );
                    });
                });
            });
    }
}

fn upload(ctx: &egui::Context, name: &str, image: &RgbaImage) -> egui::TextureHandle {
    let size = [image.width() as usize, image.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
    // NEAREST keeps the pixel art crisp when scaled up.
    ctx.load_texture(name, color_image, egui::TextureOptions::NEAREST)
}

/// Render the viewer pane.
pub fn render(app: &mut CapeViewApp, ui: &mut egui::Ui) {
    app.viewer.ui(ui);
}
