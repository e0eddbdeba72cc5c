use deltaview_core::{DirectionalStatsGrid, PoleBand, ANGLE_STEP_DEGREES};
use deltaview_scene::{Camera, CameraPose, VIEW_UP_ALIGNMENT_THRESHOLD};

use crate::compositor::DepthCompositor;
use crate::renderer::Renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    PreviewHover {
        row: usize,
        col: usize,
    },
    Locked {
        row: usize,
        col: usize,
    },
}

/// Text panel contents for the cell under the pointer. Masked cells and a
/// missing grid read as `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readout {
    pub azimuth: f64,
    pub elevation: f64,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
}

/// Drives the shared camera from the heatmaps: hovering previews a
/// direction, clicking inside the band locks it.
#[derive(Debug, Clone)]
pub struct CameraSyncController {
    state: SyncState,
    home: Option<CameraPose>,
    band: PoleBand,
    step_degrees: f64,
    view_up_threshold: f64,
    readout: Option<Readout>,
}

impl Default for CameraSyncController {
    fn default() -> Self {
        Self::new(PoleBand::default())
    }
}

impl CameraSyncController {
    pub fn new(band: PoleBand) -> Self {
        Self {
            state: SyncState::Idle,
            home: None,
            band,
            step_degrees: ANGLE_STEP_DEGREES,
            view_up_threshold: VIEW_UP_ALIGNMENT_THRESHOLD,
            readout: None,
        }
    }

    pub fn with_step(mut self, step_degrees: f64) -> Self {
        self.step_degrees = step_degrees;
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn home(&self) -> Option<&CameraPose> {
        self.home.as_ref()
    }

    pub fn band(&self) -> PoleBand {
        self.band
    }

    pub fn readout(&self) -> Option<&Readout> {
        self.readout.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, SyncState::Locked { .. })
    }

    /// Every preview starts from this pose. Call again after the user
    /// reframes the scene.
    pub fn capture_home(&mut self, camera: &Camera) {
        self.home = Some(camera.pose());
        tracing::debug!("camera home captured at {:?}", camera.position());
    }

    /// Heatmap cell under a data-space pointer position, `x` along columns
    /// and `y` along rows.
    pub fn cell_at(x: f64, y: f64, rows: usize, cols: usize) -> Option<(usize, usize)> {
        let row = (y + 0.5).floor();
        let col = (x + 0.5).floor();
        if !row.is_finite() || !col.is_finite() || row < 0.0 || col < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < rows && col < cols).then_some((row, col))
    }

    /// `(azimuth, elevation)` in degrees for a recentred cell.
    pub fn angles_for(&self, row: usize, col: usize) -> (f64, f64) {
        (
            row as f64 * self.step_degrees - 180.0,
            col as f64 * self.step_degrees - 180.0,
        )
    }

    /// Previews the hovered direction unless a cell is locked.
    pub fn pointer_moved<I: Renderer, U: Renderer>(
        &mut self,
        row: usize,
        col: usize,
        grid: Option<&DirectionalStatsGrid>,
        compositor: &mut DepthCompositor<I, U>,
    ) -> Option<Readout> {
        if self.is_locked() {
            return None;
        }
        if self.state == (SyncState::PreviewHover { row, col }) {
            return self.readout;
        }
        self.state = SyncState::PreviewHover { row, col };
        Some(self.preview(row, col, grid, compositor))
    }

    /// The camera stays where the last preview left it.
    pub fn pointer_left(&mut self) {
        if !self.is_locked() {
            self.state = SyncState::Idle;
            self.readout = None;
        }
    }

    /// Locks on a click inside the band; any click while locked unlocks
    /// and resumes previewing at the clicked cell.
    pub fn clicked(&mut self, row: usize, col: usize) -> SyncState {
        self.state = match self.state {
            SyncState::Locked { .. } => SyncState::PreviewHover { row, col },
            _ if self.band.contains(row) => SyncState::Locked { row, col },
            state => state,
        };
        tracing::debug!("heatmap click at ({}, {}): {:?}", row, col, self.state);
        self.state
    }

    fn preview<I: Renderer, U: Renderer>(
        &mut self,
        row: usize,
        col: usize,
        grid: Option<&DirectionalStatsGrid>,
        compositor: &mut DepthCompositor<I, U>,
    ) -> Readout {
        let home = *self
            .home
            .get_or_insert_with(|| compositor.camera().pose());
        let (azimuth, elevation) = self.angles_for(row, col);
        compositor
            .camera_mut()
            .orient_from(&home, azimuth, elevation, self.view_up_threshold);
        compositor.reset_camera();
        compositor.composite();

        let cell = grid.and_then(|grid| grid.cell(row, col));
        let finite = |value: f64| value.is_finite().then_some(value);
        let readout = Readout {
            azimuth,
            elevation,
            mean: cell.and_then(|(mean, _)| finite(mean)),
            stddev: cell.and_then(|(_, stddev)| finite(stddev)),
        };
        self.readout = Some(readout);
        readout
    }
}
