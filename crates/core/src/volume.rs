use std::collections::BTreeSet;
use std::path::Path;

use glam::DVec3;

use crate::error::VolumeError;
use crate::histogram::Histogram;

/// Point-sampled scalar field on a regular grid.
///
/// `scalars` is what the renderers draw; `original_scalars` is the
/// untouched field as loaded, so masks are always applied from it and never
/// compound.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarVolume {
    name: String,
    dims: [usize; 3],
    origin: [f64; 3],
    spacing: [f64; 3],
    scalars: Vec<f64>,
    original_scalars: Vec<f64>,
    masked: bool,
}

/// Point count of a `dims` grid; zero or overflowing extents are format
/// errors.
pub(crate) fn grid_len(dims: [usize; 3]) -> Result<usize, VolumeError> {
    if dims.iter().any(|d| *d == 0) {
        return Err(VolumeError::format(format!(
            "grid dimensions must be positive, got {:?}",
            dims
        )));
    }
    dims.iter()
        .try_fold(1usize, |len, d| len.checked_mul(*d))
        .ok_or_else(|| VolumeError::format(format!("grid too large: {:?}", dims)))
}

impl ScalarVolume {
    pub fn new(
        name: impl Into<String>,
        dims: [usize; 3],
        origin: [f64; 3],
        spacing: [f64; 3],
        values: Vec<f64>,
    ) -> Result<Self, VolumeError> {
        let expected = grid_len(dims)?;
        if values.len() != expected {
            return Err(VolumeError::format(format!(
                "expected {} values for a {}x{}x{} grid, found {}",
                expected,
                dims[0],
                dims[1],
                dims[2],
                values.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            dims,
            origin,
            spacing,
            original_scalars: values.clone(),
            scalars: values,
            masked: false,
        })
    }

    /// Builds a unit-spaced grid at the origin from a function of the grid
    /// coordinates.
    pub fn from_fn(
        name: impl Into<String>,
        dims: [usize; 3],
        mut f: impl FnMut(usize, usize, usize) -> f64,
    ) -> Result<Self, VolumeError> {
        let mut values = Vec::with_capacity(grid_len(dims)?);
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    values.push(f(x, y, z));
                }
            }
        }
        Self::new(name, dims, [0.0; 3], [1.0; 3], values)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, VolumeError> {
        crate::vtk_legacy::read_structured_points(path.as_ref())
    }

    pub fn write_vtk(&self, path: impl AsRef<Path>) -> Result<(), VolumeError> {
        crate::vtk_legacy::write_structured_points(path.as_ref(), self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn len(&self) -> usize {
        self.scalars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty()
    }

    pub fn scalars(&self) -> &[f64] {
        &self.scalars
    }

    pub fn original_scalars(&self) -> &[f64] {
        &self.original_scalars
    }

    pub fn is_masked(&self) -> bool {
        self.masked
    }

    pub fn same_geometry(&self, other: &ScalarVolume) -> bool {
        self.dims == other.dims && self.origin == other.origin && self.spacing == other.spacing
    }

    /// World-space box spanned by the grid points.
    pub fn bounds(&self) -> (DVec3, DVec3) {
        let min = DVec3::from(self.origin);
        let extent = DVec3::new(
            self.dims[0].saturating_sub(1) as f64 * self.spacing[0],
            self.dims[1].saturating_sub(1) as f64 * self.spacing[1],
            self.dims[2].saturating_sub(1) as f64 * self.spacing[2],
        );
        let max = min + extent;
        (min.min(max), min.max(max))
    }

    pub fn value_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims[0] * (y + self.dims[1] * z)
    }

    /// Original values at `indices`, skipping out-of-range ones.
    pub fn values_at<'a>(&'a self, indices: impl IntoIterator<Item = &'a usize> + 'a) -> impl Iterator<Item = f64> + 'a {
        indices
            .into_iter()
            .filter_map(|index| self.original_scalars.get(*index).copied())
    }

    /// Zeroes every point outside `indices` (inside when `invert`), copying
    /// the survivors from the original field.
    pub fn apply_mask(&mut self, indices: &BTreeSet<usize>, invert: bool) {
        let mut keep = vec![invert; self.original_scalars.len()];
        for index in indices {
            if let Some(flag) = keep.get_mut(*index) {
                *flag = !invert;
            }
        }
        for ((value, original), keep) in self
            .scalars
            .iter_mut()
            .zip(&self.original_scalars)
            .zip(keep)
        {
            *value = if keep { *original } else { 0.0 };
        }
        self.masked = true;
    }

    pub fn clear_mask(&mut self) {
        if !self.masked {
            return;
        }
        self.scalars.copy_from_slice(&self.original_scalars);
        self.masked = false;
    }

    /// Histogram of the loaded field over [0, 1]; masks never reshape it.
    pub fn histogram(&self, num_bins: usize, filter_threshold: Option<f64>) -> Histogram {
        Histogram::compute(&self.original_scalars, num_bins, filter_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ScalarVolume {
        ScalarVolume::from_fn("ramp", [10, 10, 10], |x, y, z| {
            (x + 10 * (y + 10 * z)) as f64 / 999.0
        })
        .unwrap()
    }

    #[test]
    fn overflowing_grid_is_a_format_error() {
        let err = ScalarVolume::new("huge", [usize::MAX, 2, 1], [0.0; 3], [1.0; 3], Vec::new())
            .unwrap_err();
        assert!(matches!(err, VolumeError::Format(_)));
        assert!(ScalarVolume::from_fn("huge", [usize::MAX, usize::MAX, 2], |_, _, _| 0.0).is_err());
        assert_eq!(grid_len([3, 4, 5]).unwrap(), 60);
    }

    #[test]
    fn rejects_mismatched_value_count() {
        let err = ScalarVolume::new("v", [2, 2, 2], [0.0; 3], [1.0; 3], vec![0.0; 7]).unwrap_err();
        assert!(matches!(err, VolumeError::Format(_)));
        let err = ScalarVolume::new("v", [0, 2, 2], [0.0; 3], [1.0; 3], Vec::new()).unwrap_err();
        assert!(matches!(err, VolumeError::Format(_)));
    }

    #[test]
    fn index_matches_x_fastest_layout() {
        let volume = ramp();
        assert_eq!(volume.value_index(3, 2, 1), 123);
        assert_eq!(volume.scalars()[123], 123.0 / 999.0);
    }

    #[test]
    fn mask_round_trip_restores_exactly() {
        let subsets: Vec<BTreeSet<usize>> = vec![
            BTreeSet::new(),
            [5, 17, 400, 998].into_iter().collect(),
            (0..1000).collect(),
        ];
        for subset in subsets {
            let mut volume = ramp();
            let before = volume.scalars().to_vec();
            volume.apply_mask(&subset, false);
            volume.clear_mask();
            assert_eq!(volume.scalars(), before.as_slice());
            assert!(!volume.is_masked());
        }
    }

    #[test]
    fn mask_is_idempotent() {
        let subset: BTreeSet<usize> = [1, 2, 3, 500].into_iter().collect();
        let mut once = ramp();
        once.apply_mask(&subset, false);
        let mut twice = ramp();
        twice.apply_mask(&subset, false);
        twice.apply_mask(&subset, false);
        assert_eq!(once.scalars(), twice.scalars());
    }

    #[test]
    fn inverted_mask_hides_selection() {
        let subset: BTreeSet<usize> = [10, 20].into_iter().collect();
        let mut volume = ramp();
        volume.apply_mask(&subset, true);
        assert_eq!(volume.scalars()[10], 0.0);
        assert_eq!(volume.scalars()[20], 0.0);
        assert_eq!(volume.scalars()[30], 30.0 / 999.0);
    }

    #[test]
    fn clear_without_mask_is_noop() {
        let mut volume = ramp();
        volume.clear_mask();
        assert_eq!(volume, ramp());
    }

    #[test]
    fn selecting_three_points_zeroes_the_rest() {
        let mut volume = ScalarVolume::from_fn("u", [10, 10, 10], |x, y, z| {
            match x + 10 * (y + 10 * z) {
                0 => 0.1,
                1 => 0.2,
                2 => 0.3,
                i => i as f64 / 999.0,
            }
        })
        .unwrap();
        let before = volume.scalars().to_vec();
        let subset: BTreeSet<usize> = [0, 1, 2].into_iter().collect();
        let values: Vec<f64> = volume.values_at(&subset).collect();
        assert_eq!(values, vec![0.1, 0.2, 0.3]);

        volume.apply_mask(&subset, false);
        assert_eq!(&volume.scalars()[..3], &[0.1, 0.2, 0.3]);
        assert!(volume.scalars()[3..].iter().all(|v| *v == 0.0));

        volume.clear_mask();
        assert_eq!(volume.scalars(), before.as_slice());
    }

    #[test]
    fn bounds_follow_origin_and_spacing() {
        let volume =
            ScalarVolume::new("v", [3, 2, 2], [1.0, 0.0, -1.0], [0.5, 2.0, 1.0], vec![0.0; 12])
                .unwrap();
        let (min, max) = volume.bounds();
        assert_eq!(min, DVec3::new(1.0, 0.0, -1.0));
        assert_eq!(max, DVec3::new(2.0, 2.0, 0.0));
    }
}
