use crate::dataset::DatasetPaths;
use crate::directional::{DirectionalStatsGrid, Matrix, TrainingView, GRID_SIZE};
use crate::error::{DatasetError, VolumeError};
use crate::table;
use crate::volume::ScalarVolume;

/// Solid ball of density with a soft edge, centred in a `dims^3` grid.
pub fn sphere_opacity(dims: usize) -> Result<ScalarVolume, VolumeError> {
    let dims = dims.max(2);
    let center = (dims - 1) as f64 * 0.5;
    ScalarVolume::from_fn("opacity", [dims; 3], |x, y, z| {
        let r = radius(x, y, z, center) / center;
        (1.0 - smoothstep(0.55, 0.75, r)).clamp(0.0, 1.0)
    })
}

/// Uncertainty concentrated in a shell around the ball, higher on the +x
/// side so directional statistics differ between viewpoints.
pub fn shell_uncertainty(dims: usize) -> Result<ScalarVolume, VolumeError> {
    let dims = dims.max(2);
    let center = (dims - 1) as f64 * 0.5;
    ScalarVolume::from_fn("uncertainty", [dims; 3], |x, y, z| {
        let r = radius(x, y, z, center) / center;
        let shell = (-((r - 0.8) / 0.08).powi(2)).exp();
        let bias = 0.6 + 0.4 * (x as f64 / (dims - 1) as f64);
        (shell * bias).clamp(0.0, 1.0)
    })
}

/// Eight training views around the equator plus two from above.
pub fn ring_views() -> Vec<TrainingView> {
    let mut views: Vec<TrainingView> = (0..8)
        .map(|i| TrainingView {
            azimuth: i as f64 * 45.0,
            elevation: 0.0,
        })
        .collect();
    views.push(TrainingView {
        azimuth: 0.0,
        elevation: 30.0,
    });
    views.push(TrainingView {
        azimuth: 180.0,
        elevation: 30.0,
    });
    views
}

/// Writes a complete dataset: both volumes, constant statistics tables and
/// training views.
pub fn write_synthetic_dataset(paths: &DatasetPaths, dims: usize) -> Result<(), DatasetError> {
    let volume_err = |channel: &'static str| move |source| DatasetError::Volume { channel, source };
    sphere_opacity(dims)
        .and_then(|volume| volume.write_vtk(&paths.opacity))
        .map_err(volume_err("opacity"))?;
    shell_uncertainty(dims)
        .and_then(|volume| volume.write_vtk(&paths.uncertainty))
        .map_err(volume_err("uncertainty"))?;

    let grid = DirectionalStatsGrid::from_matrices(
        Matrix::filled(GRID_SIZE, GRID_SIZE, 0.0),
        Matrix::filled(GRID_SIZE, GRID_SIZE, 0.0),
    )
    .map_err(|source| DatasetError::Table {
        table: "statistics",
        source,
    })?;
    crate::dataset::write_stats(paths, &grid)?;
    table::write_training_views(&paths.angles, &ring_views()).map_err(|source| {
        DatasetError::Table {
            table: "training views",
            source,
        }
    })?;
    tracing::info!(
        "wrote synthetic {}^3 dataset to {}",
        dims,
        paths.opacity.parent().map(|p| p.display().to_string()).unwrap_or_default()
    );
    Ok(())
}

fn radius(x: usize, y: usize, z: usize, center: f64) -> f64 {
    let dx = x as f64 - center;
    let dy = y as f64 - center;
    let dz = z as f64 - center;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, DatasetId};
    use crate::directional::PoleBand;

    #[test]
    fn sphere_is_dense_inside_and_empty_at_corners() {
        let volume = sphere_opacity(16).unwrap();
        let center = volume.value_index(8, 8, 8);
        assert!(volume.scalars()[center] > 0.99);
        assert_eq!(volume.scalars()[0], 0.0);
    }

    #[test]
    fn synthetic_dataset_loads() {
        let dir = std::env::temp_dir().join(format!("deltaview_synth_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths = DatasetPaths::new(&dir, &DatasetId::default());
        write_synthetic_dataset(&paths, 8).unwrap();
        let dataset = Dataset::load(&paths, PoleBand::default()).unwrap();
        assert_eq!(dataset.opacity.dims(), [8, 8, 8]);
        let stats = dataset.stats.unwrap();
        assert_eq!(stats.angles.len(), 10);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
