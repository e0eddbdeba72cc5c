/// Gaussian kernel density estimate of `values`, evaluated at `samples`
/// evenly spaced points over `[lo, hi]`.
///
/// The bandwidth follows Scott's rule. Values are first binned onto a fine
/// grid so the cost stays linear in the number of voxels.
pub fn kernel_density(values: &[f64], lo: f64, hi: f64, samples: usize) -> Vec<[f64; 2]> {
    const GRID: usize = 512;
    let samples = samples.max(2);
    let span = hi - lo;
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || span <= 0.0 {
        return (0..samples)
            .map(|i| [lo + span * i as f64 / (samples - 1) as f64, 0.0])
            .collect();
    }

    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let bandwidth = (variance.sqrt() * n.powf(-0.2)).max(span / GRID as f64);

    let cell = span / GRID as f64;
    let mut bins = vec![0.0f64; GRID];
    for value in &finite {
        let index = ((value - lo) / cell).floor();
        if index >= 0.0 && (index as usize) < GRID {
            bins[index as usize] += 1.0;
        } else if *value == hi {
            bins[GRID - 1] += 1.0;
        }
    }

    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    let reach = (4.0 * bandwidth / cell).ceil() as isize;
    (0..samples)
        .map(|i| {
            let x = lo + span * i as f64 / (samples - 1) as f64;
            let center = ((x - lo) / cell).floor() as isize;
            let mut density = 0.0;
            for bin in (center - reach).max(0)..(center + reach + 1).min(GRID as isize) {
                let count = bins[bin as usize];
                if count == 0.0 {
                    continue;
                }
                let bin_x = lo + (bin as f64 + 0.5) * cell;
                let u = (x - bin_x) / bandwidth;
                density += count * (-0.5 * u * u).exp();
            }
            [x, density * norm]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_peaks_at_the_cluster() {
        let values: Vec<f64> = (0..200).map(|i| 0.4 + (i % 20) as f64 * 0.01).collect();
        let curve = kernel_density(&values, 0.0, 1.0, 101);
        let peak = curve
            .iter()
            .max_by(|a, b| a[1].total_cmp(&b[1]))
            .unwrap();
        assert!(peak[0] > 0.4 && peak[0] < 0.6);
        assert!(curve[0][1] < peak[1] * 1.0e-3);
    }

    #[test]
    fn density_integrates_to_about_one() {
        let values: Vec<f64> = (0..1000).map(|i| 0.3 + 0.4 * i as f64 / 999.0).collect();
        let curve = kernel_density(&values, 0.0, 1.0, 201);
        let step = curve[1][0] - curve[0][0];
        let area: f64 = curve.iter().map(|p| p[1] * step).sum();
        assert!((area - 1.0).abs() < 0.05, "area {}", area);
    }

    #[test]
    fn empty_input_is_flat() {
        let curve = kernel_density(&[], 0.0, 1.0, 5);
        assert_eq!(curve.len(), 5);
        assert!(curve.iter().all(|p| p[1] == 0.0));
    }
}
