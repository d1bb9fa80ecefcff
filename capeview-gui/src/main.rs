//! CapeView GUI Application
//!
//! A desktop control panel and viewer for Minecraft player skins and capes.

mod app;
mod ui;

use eframe::egui;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("capeview=debug".parse().unwrap())
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting CapeView v{}", capeview_core::VERSION);

    // Create tokio runtime for async operations
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

    // Window configuration
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("CapeView - Minecraft Skin & Cape Studio"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "CapeView",
        options,
        Box::new(|cc| Ok(Box::new(app::CapeViewApp::new(cc, runtime)))),
    )
}
