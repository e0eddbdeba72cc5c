use std::path::Path;

use eframe::egui;
use render::{SampleError, ViewportSize};
use rfd::FileDialog;

use super::workspace::Workspace;
use super::{ClipSettings, DeltaViewApp};
use crate::precompute::PrecomputeWorker;

impl DeltaViewApp {
    pub(crate) fn load_workspace(&mut self, ctx: &egui::Context) {
        self.cancel_precompute();
        self.textures.clear_views();
        self.scatter_gesture.reset();
        self.transfer_drag = None;
        self.clip = ClipSettings::default();

        match Workspace::load(&self.config) {
            Ok(workspace) => {
                tracing::info!("dataset {} ready", workspace.name());
                self.workspace = Some(workspace);
                self.load_error = None;
            }
            Err(err) => {
                tracing::error!("failed to load dataset: {}", err);
                self.workspace = None;
                self.load_error = Some(err.to_string());
            }
        }

        if let Some(path) = self.config.reference_image.clone() {
            self.load_reference_image(ctx, &path);
        }
    }

    pub(super) fn open_data_folder_dialog(&mut self, ctx: &egui::Context) {
        if let Some(folder) = FileDialog::new()
            .set_directory(&self.config.data_folder)
            .pick_folder()
        {
            self.config.data_folder = folder;
            self.load_workspace(ctx);
        }
    }

    pub(super) fn open_reference_dialog(&mut self, ctx: &egui::Context) {
        if let Some(path) = FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg"])
            .pick_file()
        {
            self.load_reference_image(ctx, &path);
            self.config.reference_image = Some(path);
        }
    }

    fn load_reference_image(&mut self, ctx: &egui::Context, path: &Path) {
        match read_color_image(path) {
            Ok(image) => {
                self.textures.set_reference(ctx, image);
                tracing::info!("reference image loaded from {}", path.display());
            }
            Err(err) => tracing::warn!("reference image unavailable: {}", err),
        }
    }

    pub(super) fn save_config_dialog(&mut self) {
        self.sync_config_from_workspace();
        if let Some(path) = FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name("deltaview.json")
            .save_file()
        {
            match self.config.save(&path) {
                Ok(()) => tracing::info!("settings saved to {}", path.display()),
                Err(err) => tracing::error!("failed to save settings: {}", err),
            }
        }
    }

    pub(super) fn open_config_dialog(&mut self, ctx: &egui::Context) {
        let Some(path) = FileDialog::new().add_filter("JSON", &["json"]).pick_file() else {
            return;
        };
        match crate::config::AppConfig::load(&path) {
            Ok(config) => {
                self.config = config;
                self.load_workspace(ctx);
            }
            Err(err) => tracing::error!("{}", err),
        }
    }

    fn sync_config_from_workspace(&mut self) {
        if let Some(workspace) = &self.workspace {
            self.config.isovalue = workspace.transfer.isovalue();
            self.config.num_bins = workspace.transfer.num_bins();
        }
    }

    pub(super) fn is_precomputing(&self) -> bool {
        self.precompute.is_some()
    }

    pub(super) fn start_precompute(&mut self, ctx: &egui::Context) {
        if self.precompute.is_some() {
            return;
        }
        let Some(workspace) = &self.workspace else {
            tracing::warn!("no dataset loaded; nothing to precompute");
            return;
        };
        let [width, height] = self.config.sampler_size;
        let job = workspace.precompute_job(&self.config, ViewportSize::new(width, height));
        let repaint = ctx.clone();
        match PrecomputeWorker::spawn(job, move || repaint.request_repaint()) {
            Ok(worker) => {
                tracing::info!("precompute started at {}x{}", width, height);
                self.precompute = Some(worker);
            }
            Err(err) => tracing::error!("{}", err),
        }
    }

    pub(super) fn cancel_precompute(&mut self) {
        if self.precompute.take().is_some() {
            tracing::info!("precompute cancelled");
        }
    }

    pub(super) fn precompute_progress(&self) -> Option<f32> {
        self.precompute.as_ref().map(PrecomputeWorker::progress)
    }

    pub(super) fn poll_precompute(&mut self) {
        let Some(worker) = self.precompute.as_mut() else {
            return;
        };
        let Some(result) = worker.poll() else {
            return;
        };
        self.precompute = None;
        match result {
            Ok(grid) => {
                if let Some(workspace) = self.workspace.as_mut() {
                    if let Err(err) = workspace.install_stats(&grid) {
                        tracing::error!("failed to store directional statistics: {}", err);
                    }
                }
            }
            Err(err @ SampleError::Cancelled { .. }) => tracing::info!("{}", err),
            Err(err) => tracing::error!("precompute failed: {}", err),
        }
    }
}

fn read_color_image(path: &Path) -> Result<egui::ColorImage, String> {
    let bytes = std::fs::read(path).map_err(|err| format!("{}: {}", path.display(), err))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|err| format!("decode failed for {}: {}", path.display(), err))?;
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}
