use eframe::egui;
use render::VolumeChannel;
use tracing_subscriber::filter::LevelFilter;

use crate::config::AppConfig;
use crate::precompute::PrecomputeWorker;

mod io;
mod logging;
mod plot;
mod ui;
mod ui_heatmaps;
mod ui_scatter;
mod ui_side_panels;
mod ui_top_bar;
mod ui_transfer;
mod viewport;
mod workspace;

pub(crate) use logging::{ConsoleBuffer, SharedLevel};

use ui_scatter::ScatterGesture;
use viewport::ViewTextures;
use workspace::Workspace;

pub(crate) struct DeltaViewApp {
    config: AppConfig,
    console: ConsoleBuffer,
    log_level: SharedLevel,
    workspace: Option<Workspace>,
    load_error: Option<String>,
    textures: ViewTextures,
    panels: PanelSettings,
    scatter_gesture: ScatterGesture,
    transfer_drag: Option<VolumeChannel>,
    clip: ClipSettings,
    precompute: Option<PrecomputeWorker>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SideTab {
    TransferFunctions,
    Heatmaps,
}

#[derive(Clone, Copy, Debug)]
struct PanelSettings {
    show_side_panel: bool,
    show_console: bool,
    tab: SideTab,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            show_side_panel: true,
            show_console: true,
            tab: SideTab::TransferFunctions,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct ClipSettings {
    enabled: bool,
    axis: usize,
    offset: f64,
}

pub(crate) fn setup_tracing() -> (ConsoleBuffer, SharedLevel) {
    logging::setup_tracing()
}

impl DeltaViewApp {
    pub(crate) fn new(
        console: ConsoleBuffer,
        log_level: SharedLevel,
        config: AppConfig,
    ) -> Self {
        Self {
            config,
            console,
            log_level,
            workspace: None,
            load_error: None,
            textures: ViewTextures::default(),
            panels: PanelSettings::default(),
            scatter_gesture: ScatterGesture::default(),
            transfer_drag: None,
            clip: ClipSettings::default(),
            precompute: None,
        }
    }

    fn set_log_level(&mut self, new_level: LevelFilter) {
        if new_level != self.log_level.get() {
            self.log_level.set(new_level);
            tracing::info!("log level set to {}", new_level);
        }
    }
}
