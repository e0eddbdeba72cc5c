use std::collections::BTreeSet;

pub const SELECTED_ALPHA: f32 = 1.0;
pub const UNSELECTED_ALPHA: f32 = 0.001;
pub const IDLE_ALPHA: f32 = 0.3;

/// Voxels picked on the scatter plot and the span of their values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub indices: BTreeSet<usize>,
    pub value_range: Option<(f64, f64)>,
}

impl Selection {
    /// Builds a selection over `values`, dropping out-of-range indices.
    pub fn from_indices(values: &[f64], indices: impl IntoIterator<Item = usize>) -> Self {
        let indices: BTreeSet<usize> = indices
            .into_iter()
            .filter(|index| *index < values.len())
            .collect();
        let value_range = indices.iter().map(|i| values[*i]).fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        });
        Self {
            indices,
            value_range,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

/// Area drawn over the transfer-function histogram to show the selected
/// value span: left edge, midpoint and right edge, each a column from
/// `bottom` to `top`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightBand {
    pub rows: [BandRow; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandRow {
    pub x: f64,
    pub top: f64,
    pub bottom: f64,
}

impl HighlightBand {
    pub const HEIGHT: f64 = 1.0;

    pub fn from_range((min, max): (f64, f64)) -> Self {
        let row = |x| BandRow {
            x,
            top: Self::HEIGHT,
            bottom: 0.0,
        };
        Self {
            rows: [row(min), row(0.5 * (min + max)), row(max)],
        }
    }

    pub fn span(&self) -> (f64, f64) {
        (self.rows[0].x, self.rows[2].x)
    }
}

/// Scatter coordinates: the value on x, a deterministic jitter in
/// `[-0.5, 0.5)` on y so overlapping values stay distinguishable.
pub fn scatter_points(values: &[f64]) -> Vec<[f64; 2]> {
    const GOLDEN: f64 = 0.618_033_988_749_894_9;
    values
        .iter()
        .enumerate()
        .map(|(index, value)| [*value, (index as f64 * GOLDEN).fract() - 0.5])
        .collect()
}

pub fn select_box(points: &[[f64; 2]], corner_a: [f64; 2], corner_b: [f64; 2]) -> BTreeSet<usize> {
    let min = [corner_a[0].min(corner_b[0]), corner_a[1].min(corner_b[1])];
    let max = [corner_a[0].max(corner_b[0]), corner_a[1].max(corner_b[1])];
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| p[0] >= min[0] && p[0] <= max[0] && p[1] >= min[1] && p[1] <= max[1])
        .map(|(index, _)| index)
        .collect()
}

/// Points inside a closed polygon (even-odd rule).
pub fn select_lasso(points: &[[f64; 2]], polygon: &[[f64; 2]]) -> BTreeSet<usize> {
    if polygon.len() < 3 {
        return BTreeSet::new();
    }
    let (mut lo, mut hi) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
    for vertex in polygon {
        lo = [lo[0].min(vertex[0]), lo[1].min(vertex[1])];
        hi = [hi[0].max(vertex[0]), hi[1].max(vertex[1])];
    }
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| p[0] >= lo[0] && p[0] <= hi[0] && p[1] >= lo[1] && p[1] <= hi[1])
        .filter(|(_, p)| point_in_polygon(**p, polygon))
        .map(|(index, _)| index)
        .collect()
}

fn point_in_polygon(point: [f64; 2], polygon: &[[f64; 2]]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a[1] > point[1]) != (b[1] > point[1]) {
            let x = (b[0] - a[0]) * (point[1] - a[1]) / (b[1] - a[1]) + a[0];
            if point[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Per-point alpha for the scatter plot.
pub fn scatter_alphas(len: usize, selection: &Selection) -> Vec<f32> {
    if selection.is_empty() {
        return vec![IDLE_ALPHA; len];
    }
    let mut alphas = vec![UNSELECTED_ALPHA; len];
    for index in &selection.indices {
        if let Some(alpha) = alphas.get_mut(*index) {
            *alpha = SELECTED_ALPHA;
        }
    }
    alphas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_range_spans_selected_values() {
        let values = [0.1, 0.2, 0.3, 0.9];
        let selection = Selection::from_indices(&values, [0, 1, 2, 99]);
        assert_eq!(selection.len(), 3);
        assert_eq!(selection.value_range, Some((0.1, 0.3)));
        assert!(Selection::from_indices(&values, Vec::new()).value_range.is_none());
    }

    #[test]
    fn band_rows_cover_edges_and_mean() {
        let band = HighlightBand::from_range((0.1, 0.3));
        let xs: Vec<f64> = band.rows.iter().map(|r| r.x).collect();
        assert_eq!(xs[0], 0.1);
        assert!((xs[1] - 0.2).abs() < 1.0e-12);
        assert_eq!(xs[2], 0.3);
        assert!(band.rows.iter().all(|r| r.top == 1.0 && r.bottom == 0.0));
    }

    #[test]
    fn box_and_lasso_pick_inner_points() {
        let points = [[0.1, 0.0], [0.5, 0.2], [0.9, -0.4], [0.5, 0.45]];
        let boxed = select_box(&points, [0.6, 0.3], [0.0, -0.1]);
        assert_eq!(boxed.into_iter().collect::<Vec<_>>(), vec![0, 1]);

        let triangle = [[0.3, -0.3], [0.8, -0.3], [0.55, 0.4]];
        let lassoed = select_lasso(&points, &triangle);
        assert_eq!(lassoed.into_iter().collect::<Vec<_>>(), vec![1]);
        assert!(select_lasso(&points, &triangle[..2]).is_empty());
    }

    #[test]
    fn alphas_follow_selection_state() {
        let idle = scatter_alphas(3, &Selection::default());
        assert_eq!(idle, vec![IDLE_ALPHA; 3]);

        let selection = Selection::from_indices(&[0.0, 0.5, 1.0], [1]);
        assert_eq!(
            scatter_alphas(3, &selection),
            vec![UNSELECTED_ALPHA, SELECTED_ALPHA, UNSELECTED_ALPHA]
        );
    }

    #[test]
    fn jitter_stays_in_unit_band() {
        let points = scatter_points(&[0.2; 64]);
        assert!(points.iter().all(|p| p[0] == 0.2 && p[1] >= -0.5 && p[1] < 0.5));
    }
}
