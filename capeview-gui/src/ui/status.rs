//! Status bar at the bottom of the window.

use eframe::egui::{self, RichText};

use crate::app::CapeViewApp;
use crate::ui::colors;

/// Render the status bar.
pub fn render(app: &CapeViewApp, ui: &mut egui::Ui) {
    let muted = colors::muted(ui.visuals());

    ui.horizontal(|ui| {
        // Status message
        if let Some((msg, _)) = &app.status_message {
            ui.label(RichText::new(msg).size(11.0).color(muted));
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            // Current model and accessory summary
            let config = app.store.get();
            ui.label(
                RichText::new(format!(
                    "{} · {}",
                    config.model_variant, config.accessory_mode
                ))
                .size(11.0)
                .color(muted),
            );

            // Watched file
            if let Some(watch) = &app.watch {
                ui.separator();
                ui.label(
                    RichText::new(format!("👁 {}", watch.file_name()))
                        .size(11.0)
                        .color(colors::ACCENT),
                );
            }
        });
    });
}
