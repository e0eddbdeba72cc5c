/// Equal-width histogram over [0, 1], normalized so the tallest bin is 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    counts: Vec<f64>,
    totals: Vec<usize>,
    filter_threshold: Option<f64>,
}

impl Histogram {
    /// Bins `values` into `num_bins` buckets. Values at or below
    /// `filter_threshold` and values outside [0, 1] are skipped; the last
    /// bucket includes 1.0.
    pub fn compute(values: &[f64], num_bins: usize, filter_threshold: Option<f64>) -> Self {
        let num_bins = num_bins.max(1);
        let mut totals = vec![0usize; num_bins];
        for &value in values {
            if !(0.0..=1.0).contains(&value) {
                continue;
            }
            if let Some(threshold) = filter_threshold {
                if value <= threshold {
                    continue;
                }
            }
            let bin = ((value * num_bins as f64).floor() as usize).min(num_bins - 1);
            totals[bin] += 1;
        }

        let max = totals.iter().copied().max().unwrap_or(0);
        let counts = if max == 0 {
            vec![0.0; num_bins]
        } else {
            totals.iter().map(|t| *t as f64 / max as f64).collect()
        };
        Self {
            counts,
            totals,
            filter_threshold,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    /// Normalized heights in [0, 1].
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    /// Raw per-bin counts.
    pub fn totals(&self) -> &[usize] {
        &self.totals
    }

    pub fn filter_threshold(&self) -> Option<f64> {
        self.filter_threshold
    }

    pub fn filtered(&self) -> bool {
        self.filter_threshold.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.iter().all(|t| *t == 0)
    }

    pub fn bin_width(&self) -> f64 {
        1.0 / self.num_bins() as f64
    }

    pub fn bin_edges(&self, index: usize) -> (f64, f64) {
        let width = self.bin_width();
        (index as f64 * width, ((index + 1) as f64 * width).min(1.0))
    }

    pub fn bin_center(&self, index: usize) -> f64 {
        let (lo, hi) = self.bin_edges(index);
        0.5 * (lo + hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_ramp_fills_bins_evenly() {
        let values: Vec<f64> = (0..1000).map(|i| i as f64 / 999.0).collect();
        let histogram = Histogram::compute(&values, 10, None);
        assert_eq!(histogram.totals(), &[100; 10]);
        assert!(histogram.counts().iter().all(|c| *c == 1.0));
        assert!(!histogram.filtered());
    }

    #[test]
    fn tallest_bin_is_one() {
        let values = [0.05, 0.05, 0.05, 0.5, 0.95, 1.0];
        let histogram = Histogram::compute(&values, 4, None);
        assert_eq!(histogram.totals(), &[3, 0, 1, 2]);
        let max = histogram.counts().iter().cloned().fold(0.0, f64::max);
        assert_eq!(max, 1.0);
        assert!((histogram.counts()[3] - 2.0 / 3.0).abs() < 1.0e-12);
    }

    #[test]
    fn filter_excludes_values_at_or_below_threshold() {
        let values = [0.0, 0.1, 0.1, 0.2, 0.9];
        let histogram = Histogram::compute(&values, 10, Some(0.1));
        assert_eq!(histogram.totals().iter().sum::<usize>(), 2);
        assert!(histogram.filtered());
    }

    #[test]
    fn all_excluded_yields_zero_counts() {
        let values = [0.0, 0.05, 0.1, -3.0, 7.0, f64::NAN];
        let histogram = Histogram::compute(&values, 5, Some(0.1));
        assert!(histogram.is_empty());
        assert_eq!(histogram.counts(), &[0.0; 5]);

        let empty = Histogram::compute(&[], 3, None);
        assert_eq!(empty.counts(), &[0.0; 3]);
    }

    #[test]
    fn edges_cover_unit_interval() {
        let histogram = Histogram::compute(&[0.5], 4, None);
        assert_eq!(histogram.bin_edges(0), (0.0, 0.25));
        assert_eq!(histogram.bin_edges(3), (0.75, 1.0));
        assert_eq!(histogram.bin_center(1), 0.375);
    }
}
