use std::process;

use eframe::egui;

mod app;
mod config;
mod headless;
mod precompute;

fn main() -> eframe::Result<()> {
    let (console, log_level) = app::setup_tracing();

    tracing::info!("DeltaView starting");

    let args: Vec<String> = std::env::args().collect();
    let config = match config::AppConfig::from_args(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            process::exit(2);
        }
    };
    match headless::maybe_run_headless(&args, &config) {
        Ok(true) => return Ok(()),
        Ok(false) => {}
        Err(err) => {
            eprintln!("headless error: {err}");
            process::exit(1);
        }
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]),
        renderer: eframe::Renderer::Wgpu,
        ..Default::default()
    };
    eframe::run_native(
        "DeltaView",
        native_options,
        Box::new(|cc| {
            let mut app = app::DeltaViewApp::new(console, log_level, config);
            app.load_workspace(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
}
