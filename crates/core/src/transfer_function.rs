use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityPoint {
    pub x: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPoint {
    pub x: f64,
    pub color: [f64; 3],
}

/// Piecewise-linear scalar-to-opacity curve with pinned endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct OpacityCurve {
    points: Vec<OpacityPoint>,
}

/// Piecewise-linear scalar-to-color curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorCurve {
    points: Vec<ColorPoint>,
}

/// Opacity and color mapping for one rendered channel.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    pub opacity: OpacityCurve,
    pub color: ColorCurve,
}

impl TransferFunction {
    pub fn new(opacity: OpacityCurve, color: ColorCurve) -> Self {
        Self { opacity, color }
    }

    /// Transparent near zero, fully opaque from 0.25 up, white to red.
    pub fn uncertainty_default() -> Self {
        Self {
            opacity: OpacityCurve::new(vec![(0.0, 0.0), (0.25, 1.0)]),
            color: ColorCurve::new(vec![(0.0, [1.0, 1.0, 1.0]), (1.0, [1.0, 0.0, 0.0])]),
        }
    }

    /// Grey ramp for the reconstructed scene density.
    pub fn scene_opacity_default() -> Self {
        Self {
            opacity: OpacityCurve::new(vec![(0.0, 0.0), (0.6, 1.0), (1.0, 0.99)]),
            color: ColorCurve::new(vec![(0.0, [0.0, 0.0, 0.0]), (1.0, [1.0, 1.0, 1.0])]),
        }
    }

    pub fn evaluate(&self, x: f64) -> ([f64; 3], f64) {
        (self.color.evaluate(x), self.opacity.evaluate(x))
    }
}

impl OpacityCurve {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        let mut points: Vec<OpacityPoint> = points
            .into_iter()
            .map(|(x, opacity)| OpacityPoint { x, opacity })
            .collect();
        normalize_opacity(&mut points);
        Self { points }
    }

    pub fn points(&self) -> &[OpacityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        interpolate(&self.points, x, |p| p.x, |p| p.opacity, |a, b, t| lerp(a, b, t))
            .unwrap_or(0.0)
    }

    pub fn is_endpoint(&self, index: usize) -> bool {
        index == 0 || index + 1 == self.points.len()
    }

    /// Moves a control point. Endpoints keep their position and only change
    /// opacity; interior points stay between their neighbours.
    pub fn move_point(&mut self, index: usize, x: f64, opacity: f64) -> bool {
        if index >= self.points.len() {
            return false;
        }
        let opacity = clamp_unit(opacity);
        if self.is_endpoint(index) {
            self.points[index].opacity = opacity;
            return true;
        }
        let lo = self.points[index - 1].x;
        let hi = self.points[index + 1].x;
        self.points[index] = OpacityPoint {
            x: clamp_unit(x).clamp(lo, hi),
            opacity,
        };
        true
    }

    /// Inserts a point between the endpoints, returning its index.
    pub fn insert_point(&mut self, x: f64, opacity: f64) -> Option<usize> {
        let first = self.points.first()?.x;
        let last = self.points.last()?.x;
        let x = clamp_unit(x);
        if x <= first || x >= last {
            return None;
        }
        let index = self.points.partition_point(|p| p.x <= x);
        self.points.insert(
            index,
            OpacityPoint {
                x,
                opacity: clamp_unit(opacity),
            },
        );
        Some(index)
    }

    pub fn remove_point(&mut self, index: usize) -> bool {
        if index >= self.points.len() || self.is_endpoint(index) {
            return false;
        }
        self.points.remove(index);
        true
    }

    /// Index of the control point nearest to `(x, opacity)` within `radius`.
    pub fn nearest_point(&self, x: f64, opacity: f64, radius: f64) -> Option<usize> {
        self.points
            .iter()
            .enumerate()
            .map(|(index, p)| (index, (p.x - x).hypot(p.opacity - opacity)))
            .filter(|(_, distance)| *distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    pub fn parse(value: &str) -> Option<Self> {
        let mut points = Vec::new();
        for token in value.trim().split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (x, opacity) = token.split_once(':')?;
            points.push((x.trim().parse().ok()?, opacity.trim().parse().ok()?));
        }
        if points.is_empty() {
            return None;
        }
        Some(Self::new(points))
    }
}

impl ColorCurve {
    pub fn new(points: Vec<(f64, [f64; 3])>) -> Self {
        let mut points: Vec<ColorPoint> = points
            .into_iter()
            .map(|(x, color)| ColorPoint { x, color })
            .collect();
        for point in points.iter_mut() {
            point.x = clamp_unit(point.x);
            point.color = point.color.map(clamp_unit);
        }
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self { points }
    }

    pub fn points(&self) -> &[ColorPoint] {
        &self.points
    }

    pub fn evaluate(&self, x: f64) -> [f64; 3] {
        interpolate(&self.points, x, |p| p.x, |p| p.color, |a, b, t| {
            [lerp(a[0], b[0], t), lerp(a[1], b[1], t), lerp(a[2], b[2], t)]
        })
        .unwrap_or([1.0, 1.0, 1.0])
    }

    pub fn parse(value: &str) -> Option<Self> {
        let mut points = Vec::new();
        for token in value.trim().split(';') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (x, color) = token.split_once(':')?;
            let channels = color
                .split([',', ' '])
                .filter(|part| !part.is_empty())
                .map(|part| part.parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()?;
            if channels.len() != 3 {
                return None;
            }
            points.push((x.trim().parse().ok()?, [channels[0], channels[1], channels[2]]));
        }
        if points.is_empty() {
            return None;
        }
        Some(Self::new(points))
    }
}

impl fmt::Display for OpacityCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, point) in self.points.iter().enumerate() {
            if index > 0 {
                f.write_str(";")?;
            }
            write!(f, "{:.3}:{:.3}", point.x, point.opacity)?;
        }
        Ok(())
    }
}

impl fmt::Display for ColorCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, point) in self.points.iter().enumerate() {
            if index > 0 {
                f.write_str(";")?;
            }
            write!(
                f,
                "{:.3}:{:.3},{:.3},{:.3}",
                point.x, point.color[0], point.color[1], point.color[2]
            )?;
        }
        Ok(())
    }
}

fn interpolate<P, V: Copy>(
    points: &[P],
    x: f64,
    pos: impl Fn(&P) -> f64,
    value: impl Fn(&P) -> V,
    mix: impl Fn(V, V, f64) -> V,
) -> Option<V> {
    let first = points.first()?;
    if x <= pos(first) {
        return Some(value(first));
    }
    for pair in points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if x <= pos(b) {
            let denom = (pos(b) - pos(a)).max(1.0e-12);
            let t = ((x - pos(a)) / denom).clamp(0.0, 1.0);
            return Some(mix(value(a), value(b), t));
        }
    }
    points.last().map(value)
}

fn normalize_opacity(points: &mut [OpacityPoint]) {
    for point in points.iter_mut() {
        if !point.x.is_finite() {
            point.x = 0.0;
        }
        point.x = clamp_unit(point.x);
        point.opacity = clamp_unit(point.opacity);
    }
    points.sort_by(|a, b| a.x.total_cmp(&b.x));
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncertainty_default_ramps_to_opaque() {
        let tf = TransferFunction::uncertainty_default();
        assert_eq!(tf.opacity.evaluate(0.0), 0.0);
        assert!((tf.opacity.evaluate(0.125) - 0.5).abs() < 1.0e-12);
        assert_eq!(tf.opacity.evaluate(0.8), 1.0);
        assert_eq!(tf.color.evaluate(1.0), [1.0, 0.0, 0.0]);
        assert_eq!(tf.color.evaluate(0.5), [1.0, 0.5, 0.5]);
    }

    #[test]
    fn endpoints_are_pinned_horizontally() {
        let mut curve = TransferFunction::scene_opacity_default().opacity;
        assert!(curve.move_point(0, 0.4, 0.2));
        assert_eq!(curve.points()[0], OpacityPoint { x: 0.0, opacity: 0.2 });

        assert!(curve.move_point(1, 1.5, 0.5));
        assert_eq!(curve.points()[1].x, 1.0);
        assert!(curve.move_point(1, -1.0, 0.5));
        assert_eq!(curve.points()[1].x, 0.0);
        assert!(!curve.move_point(7, 0.5, 0.5));
    }

    #[test]
    fn insert_and_remove_interior_points() {
        let mut curve = TransferFunction::uncertainty_default().opacity;
        let index = curve.insert_point(0.1, 0.8).unwrap();
        assert_eq!(index, 1);
        assert_eq!(curve.len(), 3);
        assert!(curve.insert_point(0.9, 0.5).is_none());

        assert!(!curve.remove_point(0));
        assert!(!curve.remove_point(2));
        assert!(curve.remove_point(1));
        assert_eq!(curve, TransferFunction::uncertainty_default().opacity);
    }

    #[test]
    fn nearest_point_respects_radius() {
        let curve = TransferFunction::scene_opacity_default().opacity;
        assert_eq!(curve.nearest_point(0.58, 0.97, 0.05), Some(1));
        assert_eq!(curve.nearest_point(0.3, 0.5, 0.05), None);
    }

    #[test]
    fn text_form_round_trips() {
        let tf = TransferFunction::scene_opacity_default();
        let opacity = tf.opacity.to_string();
        assert_eq!(opacity, "0.000:0.000;0.600:1.000;1.000:0.990");
        assert_eq!(OpacityCurve::parse(&opacity), Some(tf.opacity.clone()));

        let color = tf.color.to_string();
        assert_eq!(ColorCurve::parse(&color), Some(tf.color.clone()));
        assert!(ColorCurve::parse("0:1,1").is_none());
        assert!(OpacityCurve::parse("").is_none());
    }
}
