//! Hum - A microphone orb visualizer for Linux
//!
//! This is the main entry point for the Hum application.

mod analysis;
mod app;
mod assets;
mod audio;
mod cli;
mod state;

use app::Hum;
use assets::Assets;
use clap::Parser;
use gpui::prelude::*;
use gpui::*;
use log::info;

fn main() {
    // Parse command-line arguments and initialize logging
    let args = cli::Args::parse();
    cli::init_logging(&args);

    info!("Starting Hum microphone visualizer");

    Application::new().with_assets(Assets).run(|cx: &mut App| {
        let bounds = Bounds::centered(None, size(px(440.0), px(600.0)), cx);
        cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                // No titlebar - we'll draw our own
                titlebar: None,
                // Use client-side decorations so we can draw our own titlebar
                window_decorations: Some(WindowDecorations::Client),
                // App ID for Wayland/GNOME desktop integration - matches .desktop file
                app_id: Some("com.hum.Visualizer".to_string()),
                ..Default::default()
            },
            |window, cx| {
                // Set app_id on the window for proper desktop integration
                window.set_app_id("com.hum.Visualizer");
                cx.new(Hum::new)
            },
        )
        .expect("Failed to open window");
    });
}
