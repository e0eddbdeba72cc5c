use std::collections::BTreeSet;

use deltaview_core::{select_box, select_lasso};
use eframe::egui;

use super::plot::{draw_axes, format_tick, inner_rect, PlotFrame};
use super::DeltaViewApp;

/// Points drawn per frame; selection always runs over every voxel.
const MAX_DRAWN_POINTS: usize = 20_000;
const SCATTER_HEIGHT: f32 = 160.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub(super) enum ScatterTool {
    #[default]
    Box,
    Lasso,
}

/// In-progress box or lasso in data coordinates.
#[derive(Clone, Debug, Default)]
pub(super) struct ScatterGesture {
    tool: ScatterTool,
    path: Vec<[f64; 2]>,
}

impl ScatterGesture {
    pub(super) fn reset(&mut self) {
        self.path.clear();
    }

    fn begin(&mut self, point: [f64; 2]) {
        self.path.clear();
        self.path.push(point);
    }

    fn extend(&mut self, point: [f64; 2]) {
        match self.tool {
            ScatterTool::Box => {
                self.path.truncate(1);
                self.path.push(point);
            }
            ScatterTool::Lasso => self.path.push(point),
        }
    }

    /// Indices enclosed by the finished gesture; empty for a bare click.
    fn finish(&mut self, points: &[[f64; 2]]) -> BTreeSet<usize> {
        let path = std::mem::take(&mut self.path);
        match (self.tool, path.as_slice()) {
            (ScatterTool::Box, [a, .., b]) => select_box(points, *a, *b),
            (ScatterTool::Lasso, polygon) if polygon.len() >= 3 => select_lasso(points, polygon),
            _ => BTreeSet::new(),
        }
    }
}

impl DeltaViewApp {
    pub(super) fn show_scatter(&mut self, ui: &mut egui::Ui) {
        let Some(workspace) = self.workspace.as_mut() else {
            return;
        };
        let gesture = &mut self.scatter_gesture;

        ui.horizontal(|ui| {
            ui.strong("Uncertainty scatter");
            ui.selectable_value(&mut gesture.tool, ScatterTool::Box, "Box");
            ui.selectable_value(&mut gesture.tool, ScatterTool::Lasso, "Lasso");
            if ui.button("Clear").clicked() {
                gesture.reset();
                workspace.select_scatter(std::iter::empty());
            }
        });

        let size = egui::vec2(ui.available_width(), SCATTER_HEIGHT);
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
        let frame = PlotFrame::new(inner_rect(rect), (0.0, 1.0), (-0.5, 0.5));
        let pointer = response.interact_pointer_pos().map(|pos| frame.to_data(pos));

        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(point) = pointer {
                gesture.begin(point);
            }
        } else if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(point) = pointer {
                gesture.extend(point);
            }
        }
        if response.drag_stopped() {
            let indices = gesture.finish(&workspace.scatter);
            workspace.select_scatter(indices);
        } else if response.clicked() {
            gesture.reset();
            workspace.select_scatter(std::iter::empty());
        }

        let painter = ui.painter_at(rect);
        painter.rect_filled(frame.rect, 0.0, egui::Color32::from_gray(24));
        let alphas = workspace.selection.scatter_alphas(workspace.scatter.len());
        let stride = workspace.scatter.len().div_ceil(MAX_DRAWN_POINTS).max(1);
        for (point, alpha) in workspace
            .scatter
            .iter()
            .zip(&alphas)
            .step_by(stride)
        {
            let color = egui::Color32::from_rgba_unmultiplied(
                70,
                130,
                220,
                (alpha.clamp(0.0, 1.0) * 255.0).round().max(1.0) as u8,
            );
            painter.circle_filled(frame.to_screen(*point), 1.5, color);
        }

        let peak = workspace
            .density
            .iter()
            .map(|p| p[1])
            .fold(0.0f64, f64::max);
        if peak > 0.0 {
            let curve: Vec<egui::Pos2> = workspace
                .density
                .iter()
                .map(|p| frame.to_screen([p[0], p[1] / peak - 0.5]))
                .collect();
            painter.add(egui::Shape::line(
                curve,
                egui::Stroke::new(1.5, egui::Color32::from_rgb(240, 160, 60)),
            ));
        }

        let outline = egui::Stroke::new(1.0, egui::Color32::WHITE);
        match (gesture.tool, gesture.path.as_slice()) {
            (ScatterTool::Box, [a, .., b]) => {
                painter.rect_stroke(
                    frame.data_rect(*a, *b),
                    0.0,
                    outline,
                    egui::StrokeKind::Middle,
                );
            }
            (ScatterTool::Lasso, path) if path.len() > 1 => {
                let points = path.iter().map(|p| frame.to_screen(*p)).collect();
                painter.add(egui::Shape::closed_line(points, outline));
            }
            _ => {}
        }
        draw_axes(&painter, &frame, &[0.0, 0.25, 0.5, 0.75, 1.0], &[], format_tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTS: [[f64; 2]; 4] = [[0.1, 0.0], [0.4, 0.1], [0.6, -0.2], [0.9, 0.3]];

    #[test]
    fn box_uses_first_and_last_corner() {
        let mut gesture = ScatterGesture::default();
        gesture.begin([0.0, -0.5]);
        gesture.extend([0.3, 0.0]);
        gesture.extend([0.5, 0.5]);
        assert_eq!(gesture.path.len(), 2);
        assert_eq!(gesture.finish(&POINTS), BTreeSet::from([0, 1]));
        assert!(gesture.path.is_empty());
    }

    #[test]
    fn lasso_needs_a_polygon() {
        let mut gesture = ScatterGesture {
            tool: ScatterTool::Lasso,
            path: Vec::new(),
        };
        gesture.begin([0.5, -0.5]);
        gesture.extend([1.0, -0.5]);
        assert!(gesture.finish(&POINTS).is_empty());

        gesture.begin([0.5, -0.5]);
        gesture.extend([1.0, -0.5]);
        gesture.extend([1.0, 0.5]);
        gesture.extend([0.5, 0.5]);
        assert_eq!(gesture.finish(&POINTS), BTreeSet::from([2, 3]));
    }

    #[test]
    fn click_selects_nothing() {
        let mut gesture = ScatterGesture::default();
        gesture.begin([0.1, 0.0]);
        assert!(gesture.finish(&POINTS).is_empty());
    }
}
