use deltaview_core::{DirectionalStatsGrid, Matrix, PoleBand, TrainingView};
use eframe::egui;
use render::{CameraSyncController, SyncState};

use super::plot::{draw_axes, inner_rect, reds, PlotFrame};
use super::DeltaViewApp;

const MASKED_COLOR: egui::Color32 = egui::Color32::from_gray(48);
const COLORBAR_STEPS: usize = 32;
const FRONT_OUTLINE: egui::Color32 = egui::Color32::from_rgb(60, 120, 220);
const BACK_OUTLINE: egui::Color32 = egui::Color32::from_rgb(60, 180, 90);

struct HeatmapStyle<'a> {
    title: &'a str,
    band: PoleBand,
    step_degrees: f64,
    highlighted: Option<(usize, usize)>,
    preview: Option<(usize, usize)>,
}

/// Column spans outlined over the pole band: the front hemisphere in the
/// middle, the back hemisphere split across both edges.
fn hemisphere_outlines(cols: usize) -> [(std::ops::Range<usize>, egui::Color32); 3] {
    let edge = cols / 4;
    let back = cols - edge;
    [
        (edge..back, FRONT_OUTLINE),
        (0..edge, BACK_OUTLINE),
        (back..cols, BACK_OUTLINE),
    ]
}

impl DeltaViewApp {
    pub(super) fn show_heatmaps_tab(&mut self, ui: &mut egui::Ui) {
        let busy = self.is_precomputing();
        let Some(workspace) = self.workspace.as_mut() else {
            ui.label("No dataset loaded.");
            return;
        };
        let Some(stats) = workspace.stats.clone() else {
            ui.label("Directional statistics have not been computed for this dataset.");
            let clicked = ui
                .add_enabled(!busy, egui::Button::new("Precompute now"))
                .clicked();
            if clicked {
                self.start_precompute(ui.ctx());
            }
            return;
        };

        let state = workspace.camera_sync.state();
        let style = |title| HeatmapStyle {
            title,
            band: workspace.band(),
            step_degrees: self.config.step_degrees,
            highlighted: workspace.selection.heatmap_cell(),
            preview: match state {
                SyncState::PreviewHover { row, col } => Some((row, col)),
                _ => None,
            },
        };
        let means_style = style("Mean uncertainty");
        let stddev_style = style("Uncertainty standard deviation");

        let mut hovered = None;
        let mut clicked = None;
        for (matrix, style) in [(&stats.means, means_style), (&stats.stddevs, stddev_style)] {
            let (hover, click) = heatmap(ui, matrix, &stats.angles, &style);
            hovered = hovered.or(hover);
            clicked = clicked.or(click);
        }

        if let Some((row, col)) = clicked {
            workspace.heatmap_click(row, col);
        } else if let Some((row, col)) = hovered {
            workspace.heatmap_hover(row, col);
        } else if matches!(state, SyncState::PreviewHover { .. }) {
            workspace.heatmap_left();
        }

        ui.separator();
        readout(ui, workspace.camera_sync.readout().copied(), &stats);
        if workspace.camera_sync.is_locked() {
            ui.weak("Camera locked. Click any cell to release.");
        } else {
            ui.weak("Hover to preview a direction; click inside the band to lock it.");
        }
    }
}

/// Draws one matrix, row 0 at the bottom, and reports the cell under the
/// pointer and the clicked cell.
fn heatmap(
    ui: &mut egui::Ui,
    matrix: &Matrix,
    training: &[TrainingView],
    style: &HeatmapStyle<'_>,
) -> (Option<(usize, usize)>, Option<(usize, usize)>) {
    let (rows, cols) = matrix.shape();
    ui.strong(style.title);
    let width = ui.available_width();
    let (rect, response) =
        ui.allocate_exact_size(egui::vec2(width, width.min(320.0)), egui::Sense::click());
    let frame = PlotFrame::new(
        inner_rect(rect),
        (-0.5, cols as f64 - 0.5),
        (-0.5, rows as f64 - 0.5),
    );
    let cell_under = |pos: egui::Pos2| {
        let [x, y] = frame.to_data(pos);
        CameraSyncController::cell_at(x, y, rows, cols)
    };
    let hovered = response.hover_pos().and_then(cell_under);
    let clicked = if response.clicked() {
        response.interact_pointer_pos().and_then(cell_under)
    } else {
        None
    };

    let painter = ui.painter_at(rect);
    let range = matrix.finite_range();
    let cell_rect = |row: usize, col: usize| {
        let (r, c) = (row as f64, col as f64);
        frame.data_rect([c - 0.5, r - 0.5], [c + 0.5, r + 0.5])
    };
    for row in 0..rows {
        for col in 0..cols {
            let color = match (matrix.get(row, col), range) {
                (Some(value), Some((lo, hi))) if value.is_finite() => {
                    let t = if hi > lo { (value - lo) / (hi - lo) } else { 0.5 };
                    reds(t)
                }
                _ => MASKED_COLOR,
            };
            painter.rect_filled(cell_rect(row, col), 0.0, color);
        }
    }

    for (span, color) in hemisphere_outlines(cols) {
        let outline = frame.data_rect(
            [span.start as f64 - 0.4, style.band.start as f64 - 0.5],
            [span.end as f64 - 0.6, style.band.end as f64 - 0.5],
        );
        painter.rect_stroke(
            outline,
            0.0,
            egui::Stroke::new(1.5, color),
            egui::StrokeKind::Middle,
        );
    }

    for view in training {
        let (x, y) = view.heatmap_position(rows, cols);
        let pos = frame.to_screen([x, y]);
        painter.circle_filled(pos, 3.0, egui::Color32::from_rgb(40, 200, 120));
        painter.circle_stroke(pos, 3.0, egui::Stroke::new(1.0, egui::Color32::BLACK));
    }

    if let Some((row, col)) = style.preview {
        painter.rect_stroke(
            cell_rect(row, col),
            0.0,
            egui::Stroke::new(1.0, egui::Color32::from_gray(220)),
            egui::StrokeKind::Inside,
        );
    }
    if let Some((row, col)) = style.highlighted {
        painter.rect_stroke(
            cell_rect(row, col),
            0.0,
            egui::Stroke::new(2.5, egui::Color32::from_rgb(30, 30, 240)),
            egui::StrokeKind::Middle,
        );
    }

    let ticks: Vec<f64> = [-180.0, -90.0, 0.0, 90.0, 180.0]
        .iter()
        .map(|angle| (angle + 180.0) / style.step_degrees)
        .filter(|index| *index <= cols.max(rows) as f64 - 1.0)
        .collect();
    let step = style.step_degrees;
    draw_axes(&painter, &frame, &ticks, &ticks, |index| {
        format!("{:.0}", index * step - 180.0)
    });
    colorbar(ui, range);

    (hovered, clicked)
}

fn colorbar(ui: &mut egui::Ui, range: Option<(f64, f64)>) {
    let Some((lo, hi)) = range else {
        return;
    };
    ui.horizontal(|ui| {
        ui.small(format!("{:.4}", lo));
        let (rect, _) = ui.allocate_exact_size(egui::vec2(140.0, 10.0), egui::Sense::hover());
        let painter = ui.painter_at(rect);
        let step = rect.width() / COLORBAR_STEPS as f32;
        for i in 0..COLORBAR_STEPS {
            let segment = egui::Rect::from_min_size(
                rect.min + egui::vec2(i as f32 * step, 0.0),
                egui::vec2(step + 0.5, rect.height()),
            );
            painter.rect_filled(segment, 0.0, reds(i as f64 / (COLORBAR_STEPS - 1) as f64));
        }
        ui.small(format!("{:.4}", hi));
    });
}

fn readout(ui: &mut egui::Ui, readout: Option<render::Readout>, stats: &DirectionalStatsGrid) {
    let value = |v: Option<f64>| match v {
        Some(v) => format!("{:.6}", v),
        None => "n/a".to_string(),
    };
    egui::Grid::new("heatmap_readout").num_columns(2).show(ui, |ui| {
        match readout {
            Some(readout) => {
                ui.label("Azimuth");
                ui.label(format!("{:.0}°", readout.azimuth));
                ui.end_row();
                ui.label("Elevation");
                ui.label(format!("{:.0}°", readout.elevation));
                ui.end_row();
                ui.label("Mean");
                ui.label(value(readout.mean));
                ui.end_row();
                ui.label("Std. dev.");
                ui.label(value(readout.stddev));
                ui.end_row();
            }
            None => {
                ui.label("Mean range");
                ui.label(match stats.mean_range() {
                    Some((lo, hi)) => format!("{:.6} to {:.6}", lo, hi),
                    None => "n/a".to_string(),
                });
                ui.end_row();
            }
        }
    });
}
