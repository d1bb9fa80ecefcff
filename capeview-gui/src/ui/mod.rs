//! UI components for CapeView.

pub mod controls;
pub mod menu;
pub mod status;
pub mod viewer;

// Theme-aware colors for the UI
pub mod colors {
    use eframe::egui::{Color32, Visuals};

    /// Emerald accent for primary actions and the watch indicator
    pub const ACCENT: Color32 = Color32::from_rgb(16, 185, 129);

    /// Get muted text color based on theme
    pub fn muted(visuals: &Visuals) -> Color32 {
        if visuals.dark_mode {
            Color32::from_rgb(156, 163, 175)
        } else {
            Color32::from_rgb(100, 100, 110)
        }
    }

    /// Get border color based on theme
    pub fn border(visuals: &Visuals) -> Color32 {
        if visuals.dark_mode {
            Color32::from_rgb(70, 70, 75)
        } else {
            Color32::from_rgb(200, 200, 210)
        }
    }

    /// Get the viewer backdrop based on theme
    pub fn viewer_bg(visuals: &Visuals) -> Color32 {
        if visuals.dark_mode {
            Color32::from_rgb(18, 18, 22)
        } else {
            Color32::from_rgb(235, 235, 240)
        }
    }
}
