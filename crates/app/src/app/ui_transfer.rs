use deltaview_core::{ColorCurve, HighlightBand, OpacityCurve, TransferFunction};
use eframe::egui;
use render::VolumeChannel;

use super::plot::{draw_axes, format_tick, inner_rect, PlotFrame};
use super::workspace::Workspace;
use super::DeltaViewApp;

const EDITOR_HEIGHT: f32 = 140.0;
const PICK_RADIUS_PX: f32 = 8.0;
const UNIT_TICKS: [f64; 3] = [0.0, 0.5, 1.0];

impl DeltaViewApp {
    pub(super) fn show_transfer_tab(&mut self, ui: &mut egui::Ui) {
        let Some(workspace) = self.workspace.as_mut() else {
            ui.label("No dataset loaded.");
            return;
        };

        ui.strong("Uncertainty");
        curve_editor(ui, workspace, VolumeChannel::Uncertainty, &mut self.transfer_drag);
        curve_text(ui, workspace, VolumeChannel::Uncertainty);
        let mut bins = workspace.transfer.num_bins();
        ui.horizontal(|ui| {
            ui.label("Bins");
            if ui
                .add(egui::DragValue::new(&mut bins).range(1..=200))
                .changed()
            {
                workspace.rebin(bins);
            }
            if let Some(threshold) = workspace
                .transfer
                .editor(VolumeChannel::Uncertainty)
                .histogram()
                .filter_threshold()
            {
                ui.weak(format!("values ≤ {} not counted", threshold));
            }
        });

        ui.separator();
        ui.strong("Scene opacity");
        curve_editor(ui, workspace, VolumeChannel::SceneOpacity, &mut self.transfer_drag);
        curve_text(ui, workspace, VolumeChannel::SceneOpacity);

        let mut show_geometry = workspace.show_geometry();
        if ui.checkbox(&mut show_geometry, "Show geometry").changed() {
            workspace.set_show_geometry(show_geometry);
        }
        let mut isovalue = workspace.transfer.isovalue();
        ui.horizontal(|ui| {
            ui.label("Isovalue");
            let response = ui.add(
                egui::DragValue::new(&mut isovalue)
                    .speed(0.005)
                    .range(0.0..=1.0)
                    .max_decimals(3),
            );
            if response.changed() {
                workspace.set_isovalue(isovalue);
            }
        });
        let mut context = workspace.show_scene_context();
        if ui
            .checkbox(&mut context, "Scene density behind uncertainty")
            .changed()
        {
            workspace.set_show_scene_context(context);
        }

        let clip = &mut self.clip;
        let mut changed = ui.checkbox(&mut clip.enabled, "Clip plane").changed();
        if clip.enabled {
            ui.horizontal(|ui| {
                for (axis, label) in ["X", "Y", "Z"].into_iter().enumerate() {
                    changed |= ui.radio_value(&mut clip.axis, axis, label).changed();
                }
                changed |= ui
                    .add(egui::Slider::new(&mut clip.offset, -0.5..=0.5).text("offset"))
                    .changed();
            });
        }
        if changed {
            workspace.set_clip(clip.enabled.then_some((clip.axis, clip.offset)));
        }

        ui.separator();
        self.show_scatter(ui);
    }
}

/// Histogram bars with the opacity curve on top. Drags stay local until
/// release; double-click adds a point, right-click removes one.
fn curve_editor(
    ui: &mut egui::Ui,
    workspace: &mut Workspace,
    channel: VolumeChannel,
    drag: &mut Option<VolumeChannel>,
) {
    let size = egui::vec2(ui.available_width(), EDITOR_HEIGHT);
    let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
    let frame = PlotFrame::new(inner_rect(rect), (0.0, 1.0), (0.0, 1.0));
    let radius = frame.x_radius(PICK_RADIUS_PX);
    let pointer = response
        .interact_pointer_pos()
        .map(|pos| clamp_unit(frame.to_data(pos)));

    if response.drag_started_by(egui::PointerButton::Primary) {
        if let Some([x, opacity]) = pointer {
            if workspace
                .transfer
                .begin_drag(channel, x, opacity, radius)
                .is_some()
            {
                *drag = Some(channel);
            }
        }
    }
    if *drag == Some(channel) {
        if response.dragged() {
            if let Some([x, opacity]) = pointer {
                workspace.transfer.drag_to(channel, x, opacity);
            }
        }
        if response.drag_stopped() {
            workspace.end_transfer_drag(channel);
            *drag = None;
        }
    }
    if response.double_clicked() {
        if let Some([x, opacity]) = pointer {
            workspace.add_transfer_point(channel, x, opacity);
        }
    }
    if response.secondary_clicked() {
        if let Some([x, opacity]) = pointer {
            let nearest = workspace
                .transfer
                .editor(channel)
                .transfer_function()
                .opacity
                .nearest_point(x, opacity, radius);
            if let Some(index) = nearest {
                workspace.remove_transfer_point(channel, index);
            }
        }
    }

    let painter = ui.painter_at(rect);
    painter.rect_filled(frame.rect, 0.0, egui::Color32::from_gray(24));
    let editor = workspace.transfer.editor(channel);
    let histogram = editor.histogram();
    for (index, height) in histogram.counts().iter().enumerate() {
        if *height <= 0.0 {
            continue;
        }
        let (lo, hi) = histogram.bin_edges(index);
        painter.rect_filled(
            frame.data_rect([lo, 0.0], [hi, *height]),
            0.0,
            egui::Color32::from_gray(90),
        );
    }

    match channel {
        VolumeChannel::Uncertainty => {
            if let Some(band) = workspace.selection.band() {
                draw_band(&painter, &frame, band);
            }
        }
        VolumeChannel::SceneOpacity => {
            let marker = workspace.transfer.isovalue_marker(workspace.show_geometry());
            if marker.top > 0.0 {
                painter.line_segment(
                    [
                        frame.to_screen([marker.x, 0.0]),
                        frame.to_screen([marker.x, marker.top]),
                    ],
                    egui::Stroke::new(2.0, egui::Color32::from_rgb(220, 60, 60)),
                );
            }
        }
    }

    let tf = editor.transfer_function();
    let curve: Vec<egui::Pos2> = tf
        .opacity
        .points()
        .iter()
        .map(|p| frame.to_screen([p.x, p.opacity]))
        .collect();
    painter.add(egui::Shape::line(
        curve.clone(),
        egui::Stroke::new(1.5, egui::Color32::from_rgb(230, 230, 230)),
    ));
    for (index, (pos, point)) in curve.iter().zip(tf.opacity.points()).enumerate() {
        let [r, g, b] = tf.color.evaluate(point.x).map(|c| (c * 255.0).round() as u8);
        let active = *drag == Some(channel) && editor.dragging() == Some(index);
        painter.circle_filled(*pos, if active { 6.0 } else { 4.5 }, egui::Color32::from_rgb(r, g, b));
        painter.circle_stroke(*pos, 4.5, egui::Stroke::new(1.0, egui::Color32::BLACK));
    }
    draw_axes(&painter, &frame, &UNIT_TICKS, &UNIT_TICKS, format_tick);
}

fn draw_band(painter: &egui::Painter, frame: &PlotFrame, band: &HighlightBand) {
    let [left, middle, right] = band.rows;
    painter.rect_filled(
        frame.data_rect([left.x, left.bottom], [right.x, right.top]),
        0.0,
        egui::Color32::from_rgba_unmultiplied(240, 160, 60, 60),
    );
    painter.line_segment(
        [
            frame.to_screen([middle.x, middle.bottom]),
            frame.to_screen([middle.x, middle.top]),
        ],
        egui::Stroke::new(1.0, egui::Color32::from_rgb(240, 160, 60)),
    );
}

/// Curves as `x:opacity;...` and `x:r,g,b;...`, applied on Enter.
fn curve_text(ui: &mut egui::Ui, workspace: &mut Workspace, channel: VolumeChannel) {
    let current = workspace.transfer.editor(channel).transfer_function().clone();
    let id = ui.make_persistent_id(("curve_text", channel.label()));
    let mut text = ui
        .data(|d| d.get_temp::<(String, String)>(id))
        .unwrap_or_else(|| (current.opacity.to_string(), current.color.to_string()));
    let (opacity_id, color_id) = (id.with("opacity"), id.with("color"));
    let editing = ui.memory(|m| m.has_focus(opacity_id) || m.has_focus(color_id));
    if !editing {
        text = (current.opacity.to_string(), current.color.to_string());
    }

    let mut submitted = false;
    egui::Grid::new(id.with("grid")).num_columns(2).show(ui, |ui| {
        ui.label("Opacity");
        let response = ui.add(egui::TextEdit::singleline(&mut text.0).id(opacity_id));
        submitted |= response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        ui.end_row();
        ui.label("Color");
        let response = ui.add(egui::TextEdit::singleline(&mut text.1).id(color_id));
        submitted |= response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        ui.end_row();
    });

    if submitted {
        match (OpacityCurve::parse(&text.0), ColorCurve::parse(&text.1)) {
            (Some(opacity), Some(color)) => {
                workspace.set_transfer_function(channel, TransferFunction::new(opacity, color));
            }
            _ => tracing::warn!("could not parse {} curve", channel.label()),
        }
    }
    ui.data_mut(|d| d.insert_temp(id, text));
}

fn clamp_unit([x, y]: [f64; 2]) -> [f64; 2] {
    [x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)]
}
