use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::directional::{DirectionalStatsGrid, PoleBand, GRID_SIZE};
use crate::error::{DatasetError, TableError};
use crate::table;
use crate::volume::ScalarVolume;

/// Identifiers that name a dataset's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetId {
    pub dataset: String,
    pub size: String,
    pub iterations: String,
}

impl Default for DatasetId {
    fn default() -> Self {
        Self {
            dataset: "chair".to_string(),
            size: "full".to_string(),
            iterations: "200000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetPaths {
    pub opacity: PathBuf,
    pub uncertainty: PathBuf,
    pub means: PathBuf,
    pub stddevs: PathBuf,
    pub angles: PathBuf,
}

impl DatasetPaths {
    pub fn new(folder: &Path, id: &DatasetId) -> Self {
        let stem = format!("{}_{}_{}", id.dataset, id.size, id.iterations);
        Self {
            opacity: folder.join(format!("{}_opacity.vtk", stem)),
            uncertainty: folder.join(format!("{}_uncertainty.vtk", stem)),
            means: folder.join("uncertainty_means.csv"),
            stddevs: folder.join("uncertainty_standard_deviations.csv"),
            angles: folder.join(format!("angles_{}__{}.csv", id.size, id.dataset)),
        }
    }
}

/// Everything the viewer needs for one dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub opacity: ScalarVolume,
    pub uncertainty: ScalarVolume,
    /// Recentred, pole-masked statistics; `None` until precomputed.
    pub stats: Option<DirectionalStatsGrid>,
}

impl Dataset {
    /// Loads both volumes (required) and the directional tables (optional).
    pub fn load(paths: &DatasetPaths, band: PoleBand) -> Result<Self, DatasetError> {
        let (opacity, uncertainty) = load_volumes(paths)?;
        let stats = match load_stats(paths, band) {
            Ok(stats) => Some(stats),
            Err(DatasetError::Table {
                source: TableError::Io { path, .. },
                ..
            }) => {
                tracing::warn!(
                    "directional statistics not found at {}; precompute them to enable the heatmaps",
                    path.display()
                );
                None
            }
            Err(err) => return Err(err),
        };
        Ok(Self {
            opacity,
            uncertainty,
            stats,
        })
    }
}

pub fn load_volumes(paths: &DatasetPaths) -> Result<(ScalarVolume, ScalarVolume), DatasetError> {
    let opacity = ScalarVolume::load(&paths.opacity).map_err(|source| DatasetError::Volume {
        channel: "opacity",
        source,
    })?;
    let uncertainty =
        ScalarVolume::load(&paths.uncertainty).map_err(|source| DatasetError::Volume {
            channel: "uncertainty",
            source,
        })?;
    if !opacity.same_geometry(&uncertainty) {
        return Err(DatasetError::GeometryMismatch {
            opacity: opacity.dims(),
            uncertainty: uncertainty.dims(),
        });
    }
    Ok((opacity, uncertainty))
}

/// Reads the raw tables, recentres them so index `i` is angle `i*15 - 180`,
/// masks the pole rows and attaches the training views when present.
pub fn load_stats(paths: &DatasetPaths, band: PoleBand) -> Result<DirectionalStatsGrid, DatasetError> {
    let table_err = |table: &'static str| move |source| DatasetError::Table { table, source };
    let means = table::read_matrix_shaped(&paths.means, GRID_SIZE, GRID_SIZE)
        .map_err(table_err("means"))?;
    let stddevs = table::read_matrix_shaped(&paths.stddevs, GRID_SIZE, GRID_SIZE)
        .map_err(table_err("standard deviations"))?;
    let mut grid =
        DirectionalStatsGrid::from_matrices(means, stddevs).map_err(table_err("statistics"))?;
    if let (Some((lo, hi)), Some((slo, shi))) = (grid.mean_range(), grid.stddev_range()) {
        tracing::info!(
            "raw directional means in [{:.6}, {:.6}], standard deviations in [{:.6}, {:.6}]",
            lo,
            hi,
            slo,
            shi
        );
    }
    grid.recenter_closed();
    grid.mask_poles(band);

    match table::read_training_views(&paths.angles) {
        Ok(views) => grid.angles = views,
        Err(err) => tracing::warn!("training views unavailable: {}", err),
    }
    Ok(grid)
}

/// Writes raw (un-recentred) statistics the way the loader expects them.
/// A grid the loader would reject is refused before any file is touched.
pub fn write_stats(paths: &DatasetPaths, grid: &DirectionalStatsGrid) -> Result<(), DatasetError> {
    let (rows, cols) = grid.shape();
    if (rows, cols) != (GRID_SIZE, GRID_SIZE) {
        return Err(DatasetError::Table {
            table: "statistics",
            source: TableError::Shape {
                expected_rows: GRID_SIZE,
                expected_cols: GRID_SIZE,
                rows,
                cols,
            },
        });
    }
    table::write_matrix(&paths.means, &grid.means).map_err(|source| DatasetError::Table {
        table: "means",
        source,
    })?;
    table::write_matrix(&paths.stddevs, &grid.stddevs).map_err(|source| DatasetError::Table {
        table: "standard deviations",
        source,
    })?;
    Ok(())
}
