use eframe::egui;

/// Maps a data-space window onto a screen rectangle, y pointing up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PlotFrame {
    pub rect: egui::Rect,
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl PlotFrame {
    pub(super) fn new(rect: egui::Rect, x: (f64, f64), y: (f64, f64)) -> Self {
        Self { rect, x, y }
    }

    pub(super) fn to_screen(&self, point: [f64; 2]) -> egui::Pos2 {
        let tx = (point[0] - self.x.0) / span(self.x);
        let ty = (point[1] - self.y.0) / span(self.y);
        egui::pos2(
            self.rect.left() + tx as f32 * self.rect.width(),
            self.rect.bottom() - ty as f32 * self.rect.height(),
        )
    }

    pub(super) fn to_data(&self, pos: egui::Pos2) -> [f64; 2] {
        let tx = ((pos.x - self.rect.left()) / self.rect.width().max(1.0)) as f64;
        let ty = ((self.rect.bottom() - pos.y) / self.rect.height().max(1.0)) as f64;
        [self.x.0 + tx * span(self.x), self.y.0 + ty * span(self.y)]
    }

    /// Screen distance that corresponds to `pixels` along x, in data units.
    pub(super) fn x_radius(&self, pixels: f32) -> f64 {
        pixels as f64 / self.rect.width().max(1.0) as f64 * span(self.x)
    }

    pub(super) fn data_rect(&self, a: [f64; 2], b: [f64; 2]) -> egui::Rect {
        egui::Rect::from_two_pos(self.to_screen(a), self.to_screen(b))
    }
}

fn span((lo, hi): (f64, f64)) -> f64 {
    let span = hi - lo;
    if span.abs() < f64::EPSILON {
        1.0
    } else {
        span
    }
}

/// Leaves room on the left and bottom for tick labels.
pub(super) fn inner_rect(rect: egui::Rect) -> egui::Rect {
    egui::Rect::from_min_max(
        rect.min + egui::vec2(34.0, 6.0),
        rect.max - egui::vec2(6.0, 18.0),
    )
}

pub(super) fn draw_axes(
    painter: &egui::Painter,
    frame: &PlotFrame,
    x_ticks: &[f64],
    y_ticks: &[f64],
    label: impl Fn(f64) -> String,
) {
    let stroke = egui::Stroke::new(1.0, egui::Color32::from_gray(110));
    let rect = frame.rect;
    painter.line_segment([rect.left_bottom(), rect.right_bottom()], stroke);
    painter.line_segment([rect.left_bottom(), rect.left_top()], stroke);
    let font = egui::FontId::proportional(10.0);
    for &x in x_ticks {
        let pos = frame.to_screen([x, frame.y.0]);
        painter.line_segment([pos, pos + egui::vec2(0.0, 3.0)], stroke);
        painter.text(
            pos + egui::vec2(0.0, 4.0),
            egui::Align2::CENTER_TOP,
            label(x),
            font.clone(),
            egui::Color32::GRAY,
        );
    }
    for &y in y_ticks {
        let pos = frame.to_screen([frame.x.0, y]);
        painter.line_segment([pos, pos - egui::vec2(3.0, 0.0)], stroke);
        painter.text(
            pos - egui::vec2(5.0, 0.0),
            egui::Align2::RIGHT_CENTER,
            label(y),
            font.clone(),
            egui::Color32::GRAY,
        );
    }
}

pub(super) fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Matplotlib's `Reds` ramp, light to dark.
pub(super) fn reds(t: f64) -> egui::Color32 {
    const STOPS: [[u8; 3]; 5] = [
        [255, 245, 240],
        [252, 187, 161],
        [251, 106, 74],
        [203, 24, 29],
        [103, 0, 13],
    ];
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (STOPS.len() - 1) as f64;
    let index = (scaled.floor() as usize).min(STOPS.len() - 2);
    let f = scaled - index as f64;
    let (a, b) = (STOPS[index], STOPS[index + 1]);
    let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * f).round() as u8;
    egui::Color32::from_rgb(mix(0), mix(1), mix(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> PlotFrame {
        PlotFrame::new(
            egui::Rect::from_min_size(egui::pos2(10.0, 20.0), egui::vec2(100.0, 50.0)),
            (0.0, 1.0),
            (-0.5, 0.5),
        )
    }

    #[test]
    fn y_points_up() {
        let frame = frame();
        assert_eq!(frame.to_screen([0.0, -0.5]), egui::pos2(10.0, 70.0));
        assert_eq!(frame.to_screen([1.0, 0.5]), egui::pos2(110.0, 20.0));
    }

    #[test]
    fn screen_and_data_agree() {
        let frame = frame();
        let data = frame.to_data(egui::pos2(35.0, 45.0));
        assert!((data[0] - 0.25).abs() < 1.0e-6);
        assert!(data[1].abs() < 1.0e-6);
        assert!((frame.x_radius(10.0) - 0.1).abs() < 1.0e-6);
    }

    #[test]
    fn degenerate_window_does_not_divide_by_zero() {
        let frame = PlotFrame::new(frame().rect, (0.5, 0.5), (0.0, 1.0));
        assert!(frame.to_screen([0.5, 0.5]).x.is_finite());
    }

    #[test]
    fn reds_ends() {
        assert_eq!(reds(0.0), egui::Color32::from_rgb(255, 245, 240));
        assert_eq!(reds(1.0), egui::Color32::from_rgb(103, 0, 13));
        assert_eq!(reds(f64::NAN), reds(0.0));
    }
}
