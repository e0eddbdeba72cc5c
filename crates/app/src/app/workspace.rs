use deltaview_core::{
    kernel_density, load_stats, scatter_points, write_stats, Dataset, DatasetError, DatasetPaths,
    DirectionalStatsGrid, PoleBand, ScalarVolume, TransferFunction,
};
use deltaview_scene::{Bounds, ClipPlane};
use glam::DVec3;
use render::{
    software_compositor, CameraSyncController, DepthCompositor, Readout, Renderer,
    SelectionBridge, SoftwareRenderer, SyncState, TransferFunctionController, ViewportSize,
    VolumeChannel,
};

use crate::config::AppConfig;
use crate::precompute::PrecomputeJob;

const INITIAL_VIEW_SIZE: ViewportSize = ViewportSize::new(160, 160);
const DENSITY_SAMPLES: usize = 200;
/// Degrees of orbit per pixel of pointer motion.
const ORBIT_SPEED: f64 = 0.4;

pub(super) type Views = DepthCompositor<SoftwareRenderer, SoftwareRenderer>;

/// One loaded dataset and every controller wired to it.
pub(super) struct Workspace {
    pub(super) paths: DatasetPaths,
    pub(super) opacity: ScalarVolume,
    /// Masked in place by scatter selections.
    pub(super) uncertainty: ScalarVolume,
    pub(super) stats: Option<DirectionalStatsGrid>,
    pub(super) views: Views,
    pub(super) transfer: TransferFunctionController,
    pub(super) selection: SelectionBridge,
    pub(super) camera_sync: CameraSyncController,
    pub(super) scatter: Vec<[f64; 2]>,
    pub(super) density: Vec<[f64; 2]>,
    band: PoleBand,
    show_scene_context: bool,
    dirty: bool,
}

impl Workspace {
    pub(super) fn load(config: &AppConfig) -> Result<Self, DatasetError> {
        let paths = config.paths();
        let dataset = Dataset::load(&paths, config.pole_band)?;
        tracing::info!(
            "loaded {} ({:?} voxels)",
            paths.opacity.display(),
            dataset.opacity.dims()
        );
        Ok(Self::from_dataset(paths, dataset, config))
    }

    pub(super) fn from_dataset(paths: DatasetPaths, dataset: Dataset, config: &AppConfig) -> Self {
        let Dataset {
            opacity,
            uncertainty,
            stats,
        } = dataset;
        let mut views =
            software_compositor(&opacity, &uncertainty, config.isovalue, INITIAL_VIEW_SIZE);
        views.camera_mut().set_view_angle(config.view_angle);
        views.reset_camera();

        let mut transfer =
            TransferFunctionController::new(config.isovalue, Some(config.uncertainty_filter));
        transfer.rebin(config.num_bins, &opacity, &uncertainty);
        transfer.apply_all(&mut views);

        let mut camera_sync = CameraSyncController::new(config.pole_band).with_step(config.step_degrees);
        camera_sync.capture_home(views.camera());

        let scatter = scatter_points(uncertainty.original_scalars());
        let density = kernel_density(uncertainty.original_scalars(), 0.0, 1.0, DENSITY_SAMPLES);

        Self {
            paths,
            opacity,
            uncertainty,
            stats,
            views,
            transfer,
            selection: SelectionBridge::new(),
            camera_sync,
            scatter,
            density,
            band: config.pole_band,
            show_scene_context: true,
            dirty: true,
        }
    }

    pub(super) fn name(&self) -> String {
        self.paths
            .opacity
            .file_stem()
            .map(|stem| stem.to_string_lossy().trim_end_matches("_opacity").to_string())
            .unwrap_or_else(|| "dataset".to_string())
    }

    pub(super) fn band(&self) -> PoleBand {
        self.band
    }

    pub(super) fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True once after anything visible in the 3-D views changed.
    pub(super) fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(super) fn view_size(&self) -> ViewportSize {
        self.views.unc().actual_size()
    }

    pub(super) fn resize_views(&mut self, size: ViewportSize) {
        if size.is_empty() || size == self.view_size() {
            return;
        }
        self.views.iso_mut().resize(size);
        self.views.unc_mut().resize(size);
        self.views.composite();
        self.dirty = true;
    }

    /// Orbiting or zooming by hand reframes the scene, so heatmap previews
    /// start from the new pose afterwards.
    pub(super) fn orbit(&mut self, dx: f32, dy: f32) {
        if self.camera_sync.is_locked() {
            return;
        }
        self.views
            .camera_mut()
            .orbit(-dx as f64 * ORBIT_SPEED, dy as f64 * ORBIT_SPEED);
        self.reframed();
    }

    pub(super) fn dolly(&mut self, factor: f64) {
        if self.camera_sync.is_locked() || factor <= 0.0 {
            return;
        }
        self.views.camera_mut().dolly(factor);
        self.reframed();
    }

    pub(super) fn reset_view(&mut self) {
        self.views.reset_camera();
        self.reframed();
    }

    fn reframed(&mut self) {
        if let Some(bounds) = self.views.content_bounds() {
            self.views.camera_mut().reset_clipping_range(bounds);
        }
        self.views.composite();
        self.camera_sync.capture_home(self.views.camera());
        self.dirty = true;
    }

    pub(super) fn set_isovalue(&mut self, isovalue: f64) {
        self.transfer.set_isovalue(isovalue);
        self.views.iso_mut().set_isovalue(self.transfer.isovalue());
        self.views.composite();
        self.dirty = true;
    }

    pub(super) fn show_geometry(&self) -> bool {
        self.views.show_geometry()
    }

    pub(super) fn set_show_geometry(&mut self, show: bool) {
        if show != self.views.show_geometry() {
            self.views.set_show_geometry(show);
            self.dirty = true;
        }
    }

    pub(super) fn show_scene_context(&self) -> bool {
        self.show_scene_context
    }

    pub(super) fn set_show_scene_context(&mut self, show: bool) {
        self.show_scene_context = show;
        self.views
            .unc_mut()
            .set_channel_visible(VolumeChannel::SceneOpacity, show);
        self.views.composite();
        self.dirty = true;
    }

    /// Plane through the data centre, facing along `axis` (0, 1 or 2),
    /// shifted by `offset` of the extent on that axis.
    pub(super) fn set_clip(&mut self, clip: Option<(usize, f64)>) {
        let plane = clip.and_then(|(axis, offset)| {
            let bounds = self.views.content_bounds()?;
            Some(clip_plane(bounds, axis, offset))
        });
        self.views.iso_mut().set_clip_plane(plane);
        self.views.unc_mut().set_clip_plane(plane);
        self.views.composite();
        self.dirty = true;
    }

    pub(super) fn rebin(&mut self, num_bins: usize) {
        self.transfer.rebin(num_bins, &self.opacity, &self.uncertainty);
    }

    pub(super) fn select_scatter(&mut self, indices: impl IntoIterator<Item = usize>) {
        self.selection
            .select_from_scatter(&mut self.uncertainty, indices, &mut self.views);
        self.dirty = true;
    }

    pub(super) fn end_transfer_drag(&mut self, channel: VolumeChannel) {
        if self.transfer.end_drag(channel, &mut self.views) {
            self.dirty = true;
        }
    }

    pub(super) fn add_transfer_point(&mut self, channel: VolumeChannel, x: f64, opacity: f64) {
        if self.transfer.add_point(channel, x, opacity, &mut self.views).is_some() {
            self.dirty = true;
        }
    }

    pub(super) fn remove_transfer_point(&mut self, channel: VolumeChannel, index: usize) {
        if self.transfer.remove_point(channel, index, &mut self.views) {
            self.dirty = true;
        }
    }

    pub(super) fn set_transfer_function(&mut self, channel: VolumeChannel, tf: TransferFunction) {
        self.transfer
            .set_transfer_function(channel, tf, &mut self.views);
        self.dirty = true;
    }

    pub(super) fn heatmap_hover(&mut self, row: usize, col: usize) -> Option<Readout> {
        if self.selection.hover_suspended() {
            return None;
        }
        let readout =
            self.camera_sync
                .pointer_moved(row, col, self.stats.as_ref(), &mut self.views);
        if readout.is_some() {
            self.dirty = true;
        }
        readout
    }

    pub(super) fn heatmap_left(&mut self) {
        self.camera_sync.pointer_left();
    }

    pub(super) fn heatmap_click(&mut self, row: usize, col: usize) -> SyncState {
        self.selection.select_from_heatmap(row, col, self.band);
        let state = self.camera_sync.clicked(row, col);
        if let SyncState::PreviewHover { row, col } = state {
            // unlocked: resume previewing where the click landed
            self.camera_sync.pointer_left();
            self.heatmap_hover(row, col);
        }
        state
    }

    pub(super) fn precompute_job(&self, config: &AppConfig, size: ViewportSize) -> PrecomputeJob {
        let scene = self.transfer.editor(VolumeChannel::SceneOpacity);
        let unc = self.transfer.editor(VolumeChannel::Uncertainty);
        PrecomputeJob {
            opacity: self.opacity.clone(),
            uncertainty: self.uncertainty.clone(),
            isovalue: self.transfer.isovalue(),
            size,
            step_degrees: config.step_degrees,
            view_angle: config.view_angle,
            home: self.camera_sync.home().copied(),
            transfer: Some((
                scene.transfer_function().clone(),
                unc.transfer_function().clone(),
            )),
        }
    }

    /// Persists a fresh sweep and reloads it the way a startup load would.
    pub(super) fn install_stats(&mut self, grid: &DirectionalStatsGrid) -> Result<(), DatasetError> {
        write_stats(&self.paths, grid)?;
        self.stats = Some(load_stats(&self.paths, self.band)?);
        tracing::info!("directional statistics updated");
        Ok(())
    }
}

fn clip_plane(bounds: Bounds, axis: usize, offset: f64) -> ClipPlane {
    let mut normal = DVec3::ZERO;
    normal[axis.min(2)] = 1.0;
    let origin = bounds.center() + normal * (offset.clamp(-0.5, 0.5) * bounds.size()[axis.min(2)]);
    ClipPlane::new(origin, normal)
}

#[cfg(test)]
mod tests {
    use deltaview_core::{shell_uncertainty, sphere_opacity, Matrix, GRID_SIZE};

    use super::*;

    fn workspace(folder: &str) -> Workspace {
        let folder = std::env::temp_dir().join(format!("deltaview_ws_{}_{}", folder, std::process::id()));
        let mut config = AppConfig::default();
        config.data_folder = folder;
        let dataset = Dataset {
            opacity: sphere_opacity(8).unwrap(),
            uncertainty: shell_uncertainty(8).unwrap(),
            stats: None,
        };
        let mut workspace = Workspace::from_dataset(config.paths(), dataset, &config);
        workspace.resize_views(ViewportSize::new(6, 6));
        workspace
    }

    #[test]
    fn loading_frames_and_renders() {
        let mut ws = workspace("load");
        assert!(ws.take_dirty());
        assert!(!ws.take_dirty());
        assert_eq!(ws.view_size(), ViewportSize::new(6, 6));
        assert_eq!(ws.scatter.len(), 512);
        assert_eq!(ws.density.len(), DENSITY_SAMPLES);
        assert!(ws.camera_sync.home().is_some());
        assert_eq!(ws.name(), "chair_full_200000");
    }

    #[test]
    fn scatter_selection_masks_uncertainty() {
        let mut ws = workspace("select");
        ws.select_scatter([0, 1, 2]);
        assert!(ws.uncertainty.is_masked());
        assert_eq!(ws.selection.selection().len(), 3);
        ws.select_scatter(std::iter::empty());
        assert!(!ws.uncertainty.is_masked());
    }

    #[test]
    fn heatmap_click_locks_camera_and_highlight() {
        let mut ws = workspace("click");
        ws.heatmap_hover(10, 3);
        assert_eq!(ws.heatmap_click(10, 3), SyncState::Locked { row: 10, col: 3 });
        assert_eq!(ws.selection.heatmap_cell(), Some((10, 3)));
        let pose = ws.views.camera().pose();
        ws.orbit(30.0, 0.0);
        assert_eq!(ws.views.camera().pose(), pose);
        assert!(ws.heatmap_hover(12, 12).is_none());

        assert_eq!(ws.heatmap_click(2, 2), SyncState::PreviewHover { row: 2, col: 2 });
        assert!(ws.selection.heatmap_cell().is_none());
        assert!(ws.heatmap_hover(12, 12).is_some());
    }

    #[test]
    fn installed_stats_are_recentred_and_masked() {
        let mut ws = workspace("stats");
        std::fs::create_dir_all(&ws.paths.means.parent().unwrap()).unwrap();
        let grid = DirectionalStatsGrid::from_matrices(
            Matrix::filled(GRID_SIZE, GRID_SIZE, 0.5),
            Matrix::filled(GRID_SIZE, GRID_SIZE, 0.1),
        )
        .unwrap();
        ws.install_stats(&grid).unwrap();
        let stats = ws.stats.as_ref().unwrap();
        assert_eq!(stats.cell(12, 12), Some((0.5, 0.1)));
        assert!(stats.cell(0, 0).unwrap().0.is_nan());
        let _ = std::fs::remove_dir_all(ws.paths.means.parent().unwrap());
    }

    #[test]
    fn clip_plane_faces_the_axis() {
        let bounds = Bounds::new(DVec3::ZERO, DVec3::new(2.0, 4.0, 6.0));
        let plane = clip_plane(bounds, 1, 0.25);
        assert!(plane.keeps(DVec3::new(1.0, 3.5, 3.0)));
        assert!(!plane.keeps(DVec3::new(1.0, 2.5, 3.0)));
    }
}
