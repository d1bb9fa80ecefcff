//! Top menu bar.

use eframe::egui::{self, RichText};

use crate::app::CapeViewApp;
use crate::ui::colors;

/// Render the top menu bar.
pub fn render(app: &mut CapeViewApp, ui: &mut egui::Ui, ctx: &egui::Context) {
    egui::menu::bar(ui, |ui| {
        // App title/logo
        ui.label(RichText::new("CapeView").strong().size(15.0));
        ui.separator();

        // File menu
        ui.menu_button("File", |ui| {
            if ui.button("Upload Skin...").clicked() {
                app.upload_skin();
                ui.close_menu();
            }

            if ui.button("Upload Cape...").clicked() {
                app.upload_cape();
                ui.close_menu();
            }

            ui.separator();

            if ui.button("Watch Cape File...").clicked() {
                app.start_watch();
                ui.close_menu();
            }

            if ui.button("Stop Watching").clicked() {
                app.stop_watch();
                ui.close_menu();
            }

            ui.separator();

            if ui.button("Quit").clicked() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        // View menu
        ui.menu_button("View", |ui| {
            let animation = app.store.get().animation_enabled;
            if ui.checkbox(&mut { animation }, "Idle Animation").changed() {
                app.toggle_animation();
                ui.close_menu();
            }
        });

        // Help menu
        ui.menu_button("Help", |ui| {
            if ui.button("About").clicked() {
                app.set_status(&format!("CapeView v{}", capeview_core::VERSION));
                ui.close_menu();
            }
        });

        // Live indicator while a watch session is active
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if app.watch.is_some() {
                ui.label(RichText::new("● LIVE").size(11.0).color(colors::ACCENT));
            }
        });
    });
}
