mod dataset;
mod density;
mod directional;
mod error;
mod histogram;
mod parallel;
mod progress;
mod selection;
mod synthetic;
mod table;
mod transfer_function;
mod volume;
mod volume_sampling;
mod vtk_legacy;

pub use dataset::{load_stats, load_volumes, write_stats, Dataset, DatasetId, DatasetPaths};
pub use density::kernel_density;
pub use directional::{
    sweep_angles, DirectionalStatsGrid, Matrix, PoleBand, TrainingView, ANGLE_STEP_DEGREES,
    GRID_SIZE,
};
pub use error::{DatasetError, TableError, VolumeError};
pub use histogram::Histogram;
pub use parallel::{for_each_indexed_mut, for_each_row_mut};
pub use progress::{report as report_progress, CancelToken, ProgressEvent, ProgressSink};
pub use selection::{
    scatter_alphas, scatter_points, select_box, select_lasso, BandRow, HighlightBand, Selection,
    IDLE_ALPHA, SELECTED_ALPHA, UNSELECTED_ALPHA,
};
pub use synthetic::{ring_views, shell_uncertainty, sphere_opacity, write_synthetic_dataset};
pub use table::{
    format_scientific, parse_matrix, read_matrix, read_matrix_shaped, read_training_views,
    write_matrix, write_training_views,
};
pub use transfer_function::{
    ColorCurve, ColorPoint, OpacityCurve, OpacityPoint, TransferFunction,
};
pub use volume::ScalarVolume;
pub use volume_sampling::VolumeSampler;
