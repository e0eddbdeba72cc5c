use eframe::egui;
use render::{Renderer, SyncState, ViewportSize};

use super::workspace::Workspace;
use super::DeltaViewApp;

const TEXTURE_OPTIONS: egui::TextureOptions = egui::TextureOptions::LINEAR;
const VIEW_BACKGROUND: egui::Color32 = egui::Color32::from_rgb(20, 20, 20);

/// GPU copies of the two software-rendered views and the reference photo.
#[derive(Default)]
pub(super) struct ViewTextures {
    iso: Option<egui::TextureHandle>,
    unc: Option<egui::TextureHandle>,
    reference: Option<egui::TextureHandle>,
}

impl ViewTextures {
    pub(super) fn clear_views(&mut self) {
        self.iso = None;
        self.unc = None;
    }

    pub(super) fn set_reference(&mut self, ctx: &egui::Context, image: egui::ColorImage) {
        self.reference = Some(ctx.load_texture("reference", image, TEXTURE_OPTIONS));
    }

    fn refresh(&mut self, ctx: &egui::Context, workspace: &Workspace) {
        let iso = workspace.views.iso().read_pixels().to_color_image();
        let unc = workspace.views.unc().read_pixels().to_color_image();
        upload(ctx, &mut self.iso, "isosurface_view", iso);
        upload(ctx, &mut self.unc, "uncertainty_view", unc);
    }
}

fn upload(
    ctx: &egui::Context,
    slot: &mut Option<egui::TextureHandle>,
    name: &str,
    image: egui::ColorImage,
) {
    match slot {
        Some(texture) => texture.set(image, TEXTURE_OPTIONS),
        None => *slot = Some(ctx.load_texture(name, image, TEXTURE_OPTIONS)),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ViewKind {
    Uncertainty,
    Isosurface,
}

impl DeltaViewApp {
    pub(super) fn show_central(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let full = ui.available_rect_before_wrap();
            if self.workspace.is_none() {
                self.show_load_error(ui, full);
                return;
            }

            let gap = 4.0;
            let half = egui::vec2((full.width() - gap) * 0.5, (full.height() - gap) * 0.5);
            let cell = |col: f32, row: f32| {
                egui::Rect::from_min_size(
                    full.min + egui::vec2(col * (half.x + gap), row * (half.y + gap)),
                    half,
                )
            };

            self.resize_views(ui, cell(1.0, 0.0));
            self.show_reference(ui, cell(0.0, 0.0));
            self.show_view(ui, cell(1.0, 0.0), ViewKind::Uncertainty);
            self.show_view(ui, cell(0.0, 1.0), ViewKind::Isosurface);
            self.show_info(ui, cell(1.0, 1.0));
        });
    }

    fn show_load_error(&mut self, ui: &mut egui::Ui, rect: egui::Rect) {
        ui.scope_builder(egui::UiBuilder::new().max_rect(rect), |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(rect.height() * 0.3);
                ui.heading("No dataset loaded");
                if let Some(err) = &self.load_error {
                    ui.colored_label(egui::Color32::from_rgb(220, 110, 90), err);
                }
                ui.label(format!(
                    "Looking for {} in {}",
                    self.config.paths().opacity.display(),
                    self.config.data_folder.display()
                ));
                if ui.button("Open data folder...").clicked() {
                    self.open_data_folder_dialog(ui.ctx());
                }
            });
        });
    }

    /// Views render at a fraction of their on-screen size and are upscaled.
    fn resize_views(&mut self, ui: &egui::Ui, rect: egui::Rect) {
        let Some(workspace) = self.workspace.as_mut() else {
            return;
        };
        if ui.input(|i| i.pointer.primary_down()) {
            return;
        }
        let scale = self.config.render_scale;
        workspace.resize_views(ViewportSize::new(
            (rect.width() * scale).round().max(1.0) as usize,
            (rect.height() * scale).round().max(1.0) as usize,
        ));
    }

    pub(super) fn refresh_textures(&mut self, ctx: &egui::Context) {
        if let Some(workspace) = self.workspace.as_mut() {
            if workspace.take_dirty() {
                self.textures.refresh(ctx, workspace);
            }
        }
    }

    fn show_reference(&mut self, ui: &mut egui::Ui, rect: egui::Rect) {
        let response = ui.allocate_rect(rect, egui::Sense::click());
        ui.painter().rect_filled(rect, 0.0, VIEW_BACKGROUND);
        if let Some(texture) = &self.textures.reference {
            paint_fitted(ui.painter(), rect, texture);
        } else {
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Reference render\n(click to open an image)",
                egui::FontId::proportional(14.0),
                egui::Color32::GRAY,
            );
        }
        caption(ui.painter(), rect, "Rendered image");
        if response.clicked() {
            self.open_reference_dialog(ui.ctx());
        }
    }

    fn show_view(&mut self, ui: &mut egui::Ui, rect: egui::Rect, kind: ViewKind) {
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let Some(workspace) = self.workspace.as_mut() else {
            return;
        };

        if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_motion();
            if delta != egui::Vec2::ZERO {
                workspace.orbit(delta.x, delta.y);
            }
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                workspace.dolly(1.0 + (scroll as f64 * 0.002).clamp(-0.5, 0.5));
            }
        }
        if response.double_clicked() {
            workspace.reset_view();
        }

        let painter = ui.painter();
        painter.rect_filled(rect, 0.0, VIEW_BACKGROUND);
        let (texture, label) = match kind {
            ViewKind::Uncertainty => (&self.textures.unc, "Uncertainty"),
            ViewKind::Isosurface => (&self.textures.iso, "Isosurface"),
        };
        if let Some(texture) = texture {
            paint_fitted(painter, rect, texture);
        }
        caption(painter, rect, label);
        if let SyncState::Locked { row, col } = workspace.camera_sync.state() {
            let (azimuth, elevation) = workspace.camera_sync.angles_for(row, col);
            painter.text(
                rect.right_top() + egui::vec2(-8.0, 8.0),
                egui::Align2::RIGHT_TOP,
                format!("locked  az {:.0}°  el {:.0}°", azimuth, elevation),
                egui::FontId::monospace(12.0),
                egui::Color32::from_rgb(240, 200, 120),
            );
        }
    }

    fn show_info(&mut self, ui: &mut egui::Ui, rect: egui::Rect) {
        let progress = self.precompute_progress();
        let Some(workspace) = self.workspace.as_ref() else {
            return;
        };
        ui.scope_builder(egui::UiBuilder::new().max_rect(rect.shrink(8.0)), |ui| {
            ui.heading(workspace.name());
            let dims = workspace.opacity.dims();
            ui.label(format!("Grid: {} x {} x {}", dims[0], dims[1], dims[2]));
            let size = workspace.view_size();
            ui.label(format!("Render size: {} x {}", size.width, size.height));
            match &workspace.stats {
                Some(stats) => {
                    let (rows, cols) = stats.shape();
                    ui.label(format!(
                        "Directional statistics: {} x {}, {} training views",
                        rows,
                        cols,
                        stats.angles.len()
                    ));
                }
                None => {
                    ui.label("Directional statistics: not computed");
                }
            }
            if let Some(fraction) = progress {
                ui.add(egui::ProgressBar::new(fraction).show_percentage());
            }
            let selection = workspace.selection.selection();
            if selection.is_empty() {
                ui.label("Selection: none");
            } else if let Some((lo, hi)) = selection.value_range {
                ui.label(format!(
                    "Selection: {} voxels, uncertainty {:.3} to {:.3}",
                    selection.len(),
                    lo,
                    hi
                ));
            }
            ui.label(format!("Camera: {:?}", workspace.camera_sync.state()));
            ui.small("Drag to orbit, scroll to zoom, double-click to reframe.");
        });
    }
}

/// Draws `texture` centred in `rect` at its own aspect ratio.
fn paint_fitted(painter: &egui::Painter, rect: egui::Rect, texture: &egui::TextureHandle) {
    let size = texture.size_vec2();
    if size.x <= 0.0 || size.y <= 0.0 {
        return;
    }
    let scale = (rect.width() / size.x).min(rect.height() / size.y);
    let target = egui::Rect::from_center_size(rect.center(), size * scale);
    painter.image(
        texture.id(),
        target,
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );
}

fn caption(painter: &egui::Painter, rect: egui::Rect, text: &str) {
    painter.text(
        rect.left_top() + egui::vec2(8.0, 8.0),
        egui::Align2::LEFT_TOP,
        text,
        egui::FontId::proportional(13.0),
        egui::Color32::from_gray(200),
    );
}
