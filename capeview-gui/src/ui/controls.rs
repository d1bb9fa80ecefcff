//! Viewer control panel.

use eframe::egui::{self, Margin, RichText, Rounding, Sense, Vec2};

use capeview_core::AccessoryMode;

use crate::app::CapeViewApp;
use crate::ui::colors;

/// Render the control panel.
pub fn render(app: &mut CapeViewApp, ui: &mut egui::Ui) {
    let muted = colors::muted(ui.visuals());

    egui::ScrollArea::vertical().show(ui, |ui| {
        ui.add_space(8.0);
        ui.heading("Viewer Controls");
        ui.separator();

        let config = app.store.snapshot();

        // ---------------------------------------------------------------------
        // Model & View
        // ---------------------------------------------------------------------
        egui::Frame::group(ui.style())
            .inner_margin(Margin::same(10.0))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.label(RichText::new("Player Model").strong());
                        ui.label(
                            RichText::new(config.model_variant.arm_label())
                                .size(11.0)
                                .color(muted),
                        );
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .add(egui::Button::new("Switch").rounding(Rounding::same(8.0)))
                            .clicked()
                        {
                            app.toggle_model();
                        }
                    });
                });
            });

        egui::Frame::group(ui.style())
            .inner_margin(Margin::same(10.0))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.label(RichText::new("Elytra Mode").strong());
                        let active = config.accessory_mode == AccessoryMode::Elytra;
                        ui.label(
                            RichText::new(if active { "Active" } else { "Disabled" })
                                .size(11.0)
                                .color(muted),
                        );
                    });
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let mut elytra = config.accessory_mode == AccessoryMode::Elytra;
                        if ui.checkbox(&mut elytra, "").changed() {
                            app.toggle_accessory_mode();
                        }
                    });
                });
            });

        ui.horizontal(|ui| {
            let mut animation = config.animation_enabled;
            if ui.checkbox(&mut animation, "Idle animation").changed() {
                app.toggle_animation();
            }
        });

        ui.add_space(8.0);
        ui.separator();

        // ---------------------------------------------------------------------
        // Textures
        // ---------------------------------------------------------------------
        ui.label(RichText::new("Player Skin").strong());
        if ui
            .add_sized(
                Vec2::new(ui.available_width(), 36.0),
                egui::Button::new("Upload PNG...").rounding(Rounding::same(8.0)),
            )
            .clicked()
        {
            app.upload_skin();
        }

        ui.add_space(8.0);
        ui.label(RichText::new("Cape Control").strong());

        let watching = app.watch.is_some();
        let watch_text = if watching {
            RichText::new("Watching for changes...").color(colors::ACCENT)
        } else {
            RichText::new("Watch Local Cape File")
        };
        if ui
            .add_sized(
                Vec2::new(ui.available_width(), 36.0),
                egui::Button::new(watch_text).rounding(Rounding::same(8.0)),
            )
            .clicked()
        {
            if watching {
                app.stop_watch();
            } else {
                app.start_watch();
            }
        }

        ui.horizontal(|ui| {
            if ui
                .add(egui::Button::new("Static Upload").rounding(Rounding::same(8.0)))
                .clicked()
            {
                app.upload_cape();
            }
            if ui
                .add(egui::Button::new("Clear Cape").rounding(Rounding::same(8.0)))
                .clicked()
            {
                app.clear_cape();
            }
        });

        ui.label(
            RichText::new("Watching re-reads the PNG every 500 ms after you save it.")
                .size(10.0)
                .color(muted)
                .italics(),
        );

        ui.add_space(8.0);
        ui.separator();

        // ---------------------------------------------------------------------
        // AI Suggestions
        // ---------------------------------------------------------------------
        let suggest_label = if app.is_suggesting {
            "Analyzing Skin..."
        } else {
            "Get AI Cape Suggestion"
        };
        let suggest_button = egui::Button::new(RichText::new(suggest_label).strong())
            .fill(colors::ACCENT)
            .rounding(Rounding::same(8.0));
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!app.is_suggesting, suggest_button)
                .clicked()
            {
                app.request_suggestion();
            }
            if app.is_suggesting {
                ui.spinner();
            }
        });

        if let Some(suggestion) = &app.suggestion {
            egui::Frame::group(ui.style())
                .inner_margin(Margin::same(10.0))
                .show(ui, |ui| {
                    ui.label(RichText::new(&suggestion.name).strong().color(colors::ACCENT));
                    ui.label(RichText::new(&suggestion.description).size(11.0));
                    ui.add_space(4.0);
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("Palette:").size(10.0).color(muted));
                        for hex in &suggestion.color_palette {
                            let color = parse_hex_color(hex).unwrap_or(egui::Color32::GRAY);
                            let (rect, response) =
                                ui.allocate_exact_size(Vec2::splat(14.0), Sense::hover());
                            ui.painter().rect_filled(rect, 3.0, color);
                            response.on_hover_text(hex);
                        }
                    });
                    ui.label(
                        RichText::new(format!("Theme: {}", suggestion.theme))
                            .size(10.0)
                            .color(muted),
                    );
                });
        }

        ui.add_space(12.0);
        ui.label(
            RichText::new("All textures stay in memory for this session only.")
                .size(10.0)
                .color(muted),
        );
    });
}

/// Parse a `#rrggbb` hex color.
fn parse_hex_color(hex: &str) -> Option<egui::Color32> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(egui::Color32::from_rgb(
        (value >> 16) as u8,
        (value >> 8) as u8,
        value as u8,
    ))
}
