use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// Angular step of the directional grid, in degrees.
pub const ANGLE_STEP_DEGREES: f64 = 15.0;
/// Samples per axis for a closed 0°..=360° sweep at 15°.
pub const GRID_SIZE: usize = 25;

/// Angles `0, step, .., 360` inclusive.
pub fn sweep_angles(step_degrees: f64) -> Vec<f64> {
    let step = if step_degrees > 0.0 {
        step_degrees
    } else {
        ANGLE_STEP_DEGREES
    };
    let count = (360.0 / step).round() as usize;
    (0..=count).map(|i| i as f64 * step).collect()
}

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, TableError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(TableError::Ragged {
                    line: index + 1,
                    expected: cols,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
        }
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.cols.max(1)).take(self.rows)
    }

    /// Circular shift: the value at `(r, c)` moves to
    /// `(r + row_shift, c + col_shift)` modulo the shape.
    pub fn roll(&self, row_shift: usize, col_shift: usize) -> Matrix {
        if self.data.is_empty() {
            return self.clone();
        }
        let mut out = Matrix::filled(self.rows, self.cols, 0.0);
        for r in 0..self.rows {
            let target_row = (r + row_shift) % self.rows;
            for c in 0..self.cols {
                let target_col = (c + col_shift) % self.cols;
                out.data[target_row * self.cols + target_col] = self.data[r * self.cols + c];
            }
        }
        out
    }

    /// Rotates by half the width, then half the height.
    pub fn roll_half(&self) -> Matrix {
        self.roll(0, self.cols / 2).roll(self.rows / 2, 0)
    }

    /// Inverse of [`Matrix::roll_half`] for any shape.
    pub fn unroll_half(&self) -> Matrix {
        let rows = self.rows.max(1);
        let cols = self.cols.max(1);
        self.roll(rows - self.rows / 2, 0)
            .roll(0, cols - self.cols / 2)
    }

    /// Half rotation for closed sweeps whose last row and column repeat the
    /// first direction (0° and 360°). The duplicate is dropped, the rest is
    /// rolled by half, and the new first entry is repeated at the end, so
    /// index `i` lands on angle `i * step - 180`. Shapes that are not closed
    /// sweeps fall back to [`Matrix::roll_half`].
    pub fn recenter_closed(&self) -> Matrix {
        if self.rows < 3 || self.cols < 3 || self.rows % 2 == 0 || self.cols % 2 == 0 {
            return self.roll_half();
        }
        let open_rows = self.rows - 1;
        let open_cols = self.cols - 1;
        let mut out = Matrix::filled(self.rows, self.cols, 0.0);
        for r in 0..self.rows {
            let src_row = (r % open_rows + open_rows / 2) % open_rows;
            for c in 0..self.cols {
                let src_col = (c % open_cols + open_cols / 2) % open_cols;
                out.data[r * self.cols + c] = self.data[src_row * self.cols + src_col];
            }
        }
        out
    }

    pub fn fill_rows(&mut self, rows: Range<usize>, value: f64) {
        for r in rows.start.min(self.rows)..rows.end.min(self.rows) {
            self.data[r * self.cols..(r + 1) * self.cols].fill(value);
        }
    }

    /// Smallest and largest finite entries; NaN cells are ignored.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Maps finite entries onto [0, 1]; NaN cells stay NaN.
    pub fn normalized(&self) -> Matrix {
        let mut out = self.clone();
        let Some((lo, hi)) = self.finite_range() else {
            return out;
        };
        let span = hi - lo;
        for value in out.data.iter_mut().filter(|v| v.is_finite()) {
            *value = if span > 0.0 { (*value - lo) / span } else { 0.0 };
        }
        out
    }
}

/// Rows of a recentred grid that describe usable viewing directions.
/// Rows outside `[start, end)` sit near the poles and are masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoleBand {
    pub start: usize,
    pub end: usize,
}

impl Default for PoleBand {
    fn default() -> Self {
        Self { start: 6, end: 19 }
    }
}

impl PoleBand {
    pub fn contains(&self, row: usize) -> bool {
        (self.start..self.end).contains(&row)
    }
}

/// A camera direction used while training the model, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingView {
    pub azimuth: f64,
    pub elevation: f64,
}

impl TrainingView {
    /// Position of this view on a recentred heatmap with `cols` x `rows`
    /// cells, as `(col, row)` in cell units.
    pub fn heatmap_position(&self, rows: usize, cols: usize) -> (f64, f64) {
        let second = if self.elevation == 0.0 || self.elevation == 360.0 {
            self.elevation
        } else {
            360.0 - self.elevation
        };
        let half_turn = |angle: f64| if angle < 180.0 { angle + 180.0 } else { angle - 180.0 };
        let x = half_turn(self.azimuth);
        let y = half_turn(second);
        (
            x / 360.0 * cols.saturating_sub(1) as f64,
            y / 360.0 * rows.saturating_sub(1) as f64,
        )
    }
}

/// Mean and standard deviation of visible uncertainty per viewing
/// direction; rows are azimuth bins, columns elevation bins.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalStatsGrid {
    pub means: Matrix,
    pub stddevs: Matrix,
    pub angles: Vec<TrainingView>,
}

impl DirectionalStatsGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            means: Matrix::filled(rows, cols, f64::NAN),
            stddevs: Matrix::filled(rows, cols, f64::NAN),
            angles: Vec::new(),
        }
    }

    pub fn from_matrices(means: Matrix, stddevs: Matrix) -> Result<Self, TableError> {
        if means.shape() != stddevs.shape() {
            return Err(TableError::Shape {
                expected_rows: means.rows(),
                expected_cols: means.cols(),
                rows: stddevs.rows(),
                cols: stddevs.cols(),
            });
        }
        Ok(Self {
            means,
            stddevs,
            angles: Vec::new(),
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.means.shape()
    }

    pub fn set(&mut self, row: usize, col: usize, mean: f64, stddev: f64) {
        self.means.set(row, col, mean);
        self.stddevs.set(row, col, stddev);
    }

    /// `(mean, stddev)` at a cell; `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        Some((self.means.get(row, col)?, self.stddevs.get(row, col)?))
    }

    pub fn recenter(&mut self) {
        self.means = self.means.roll_half();
        self.stddevs = self.stddevs.roll_half();
    }

    pub fn recenter_closed(&mut self) {
        self.means = self.means.recenter_closed();
        self.stddevs = self.stddevs.recenter_closed();
    }

    /// Marks every row outside `band` as NaN in both matrices.
    pub fn mask_poles(&mut self, band: PoleBand) {
        let rows = self.means.rows();
        for matrix in [&mut self.means, &mut self.stddevs] {
            matrix.fill_rows(0..band.start, f64::NAN);
            matrix.fill_rows(band.end..rows, f64::NAN);
        }
    }

    pub fn mean_range(&self) -> Option<(f64, f64)> {
        self.means.finite_range()
    }

    pub fn stddev_range(&self) -> Option<(f64, f64)> {
        self.stddevs.finite_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(rows: usize, cols: usize) -> Matrix {
        Matrix::from_rows(
            (0..rows)
                .map(|r| (0..cols).map(|c| (r * cols + c) as f64).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn roll_half_round_trips_for_odd_and_even_shapes() {
        for (rows, cols) in [(4, 6), (5, 7), (25, 25), (3, 4), (1, 1), (2, 5)] {
            let matrix = counting(rows, cols);
            let shifted = matrix.roll_half();
            assert_eq!(shifted.unroll_half(), matrix, "shape {}x{}", rows, cols);
        }
    }

    #[test]
    fn roll_half_moves_seam_to_the_edge() {
        let matrix = counting(4, 4);
        let shifted = matrix.roll_half();
        assert_eq!(shifted.get(2, 2), Some(0.0));
        assert_eq!(shifted.get(0, 0), matrix.get(2, 2));
    }

    #[test]
    fn grid_recenter_shifts_both_matrices_together() {
        let means = counting(5, 5);
        let stddevs = Matrix::from_rows(
            means
                .iter_rows()
                .map(|row| row.iter().map(|v| v * 2.0).collect())
                .collect(),
        )
        .unwrap();
        let mut grid = DirectionalStatsGrid::from_matrices(means.clone(), stddevs).unwrap();
        grid.recenter();
        assert_eq!(grid.means, means.roll_half());
        let (mean, stddev) = grid.cell(2, 2).unwrap();
        assert_eq!(mean, 0.0);
        assert_eq!(stddev, 0.0);
        let (mean, stddev) = grid.cell(0, 0).unwrap();
        assert_eq!(stddev, mean * 2.0);
        assert_eq!(grid.means.unroll_half(), means);
    }

    #[test]
    fn closed_recenter_aligns_index_with_signed_angle() {
        let angles = sweep_angles(ANGLE_STEP_DEGREES);
        assert_eq!(angles.len(), GRID_SIZE);
        let rows: Vec<Vec<f64>> = angles
            .iter()
            .map(|az| angles.iter().map(|_| *az).collect())
            .collect();
        let recentred = Matrix::from_rows(rows).unwrap().recenter_closed();
        for row in 0..GRID_SIZE {
            let expected = (row as f64 * 15.0 - 180.0).rem_euclid(360.0);
            assert_eq!(recentred.get(row, 3), Some(expected), "row {}", row);
        }
        assert_eq!(recentred.row(0), recentred.row(GRID_SIZE - 1));
    }

    #[test]
    fn pole_rows_are_excluded_from_ranges() {
        let mut grid = DirectionalStatsGrid::new(GRID_SIZE, GRID_SIZE);
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let value = if (6..19).contains(&row) { 0.5 } else { 100.0 };
                grid.set(row, col, value, -value);
            }
        }
        grid.set(10, 10, 0.25, -0.75);
        grid.mask_poles(PoleBand::default());

        assert!(grid.means.row(5).iter().all(|v| v.is_nan()));
        assert!(grid.stddevs.row(19).iter().all(|v| v.is_nan()));
        assert!(grid.means.row(6).iter().all(|v| v.is_finite()));
        assert!(grid.means.row(18).iter().all(|v| v.is_finite()));
        assert_eq!(grid.mean_range(), Some((0.25, 0.5)));
        assert_eq!(grid.stddev_range(), Some((-0.75, -0.5)));

        let normalized = grid.means.normalized();
        assert_eq!(normalized.get(10, 10), Some(0.0));
        assert_eq!(normalized.get(6, 0), Some(1.0));
        assert!(normalized.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn band_membership_is_half_open() {
        let band = PoleBand::default();
        assert!(!band.contains(5));
        assert!(band.contains(6));
        assert!(band.contains(18));
        assert!(!band.contains(19));
    }

    #[test]
    fn training_views_map_onto_heatmap_cells() {
        let view = TrainingView {
            azimuth: 0.0,
            elevation: 0.0,
        };
        assert_eq!(view.heatmap_position(25, 25), (12.0, 12.0));
        let view = TrainingView {
            azimuth: 270.0,
            elevation: 90.0,
        };
        assert_eq!(view.heatmap_position(25, 25), (6.0, 6.0));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, TableError::Ragged { line: 2, .. }));
    }
}
