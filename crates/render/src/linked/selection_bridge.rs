use deltaview_core::{scatter_alphas, HighlightBand, PoleBand, ScalarVolume, Selection};

use crate::compositor::DepthCompositor;
use crate::renderer::{Renderer, VolumeChannel};

/// Carries selections made in the 2-D plots into the uncertainty volume and
/// the heatmap highlight.
#[derive(Debug, Clone, Default)]
pub struct SelectionBridge {
    selection: Selection,
    band: Option<HighlightBand>,
    heatmap_cell: Option<(usize, usize)>,
}

impl SelectionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Value span drawn over the uncertainty histogram, if anything is
    /// selected.
    pub fn band(&self) -> Option<&HighlightBand> {
        self.band.as_ref()
    }

    pub fn heatmap_cell(&self) -> Option<(usize, usize)> {
        self.heatmap_cell
    }

    /// Hover previews pause while a heatmap cell is highlighted.
    pub fn hover_suspended(&self) -> bool {
        self.heatmap_cell.is_some()
    }

    /// Masks `volume` down to `indices` and shows the result. An empty
    /// gesture clears the selection instead.
    pub fn select_from_scatter<I: Renderer, U: Renderer>(
        &mut self,
        volume: &mut ScalarVolume,
        indices: impl IntoIterator<Item = usize>,
        compositor: &mut DepthCompositor<I, U>,
    ) -> &Selection {
        let selection = Selection::from_indices(volume.original_scalars(), indices);
        if selection.is_empty() {
            volume.clear_mask();
            self.band = None;
            tracing::debug!("scatter selection cleared");
        } else {
            volume.apply_mask(&selection.indices, false);
            self.band = selection.value_range.map(HighlightBand::from_range);
            tracing::debug!(
                "scatter selection: {} voxels in {:?}",
                selection.len(),
                selection.value_range
            );
        }
        self.selection = selection;
        compositor
            .unc_mut()
            .set_volume_scalars(VolumeChannel::Uncertainty, volume);
        compositor.composite();
        &self.selection
    }

    pub fn clear_scatter<I: Renderer, U: Renderer>(
        &mut self,
        volume: &mut ScalarVolume,
        compositor: &mut DepthCompositor<I, U>,
    ) {
        self.select_from_scatter(volume, std::iter::empty(), compositor);
    }

    /// Toggles the highlighted heatmap cell. A click while a cell is
    /// highlighted clears it; otherwise only rows inside `band` can be
    /// highlighted.
    pub fn select_from_heatmap(
        &mut self,
        row: usize,
        col: usize,
        band: PoleBand,
    ) -> Option<(usize, usize)> {
        self.heatmap_cell = if self.heatmap_cell.is_some() {
            None
        } else if band.contains(row) {
            Some((row, col))
        } else {
            None
        };
        self.heatmap_cell
    }

    pub fn scatter_alphas(&self, len: usize) -> Vec<f32> {
        scatter_alphas(len, &self.selection)
    }
}

#[cfg(test)]
mod tests {
    use deltaview_core::{IDLE_ALPHA, SELECTED_ALPHA, UNSELECTED_ALPHA};
    use deltaview_scene::Camera;

    use super::*;
    use crate::buffers::ViewportSize;
    use crate::testing::{Call, RecordingRenderer};

    fn setup() -> (ScalarVolume, DepthCompositor<RecordingRenderer, RecordingRenderer>) {
        let values = vec![0.1, 0.4, 0.7, 0.9, 0.3, 0.6];
        let volume = ScalarVolume::new("uncertainty", [6, 1, 1], [0.0; 3], [1.0; 3], values).unwrap();
        let size = ViewportSize::new(2, 2);
        let compositor = DepthCompositor::new(
            RecordingRenderer::new("iso", size),
            RecordingRenderer::new("unc", size),
            Camera::default(),
        );
        (volume, compositor)
    }

    #[test]
    fn scatter_selection_masks_pushes_and_recomposites() {
        let (mut volume, mut compositor) = setup();
        compositor.unc_mut().clear_log();
        let mut bridge = SelectionBridge::new();

        let selection = bridge.select_from_scatter(&mut volume, [1, 2], &mut compositor);
        assert_eq!(selection.value_range, Some((0.4, 0.7)));
        assert_eq!(volume.scalars(), &[0.0, 0.4, 0.7, 0.0, 0.0, 0.0]);
        assert_eq!(
            compositor.unc().scalars.as_deref(),
            Some(&[0.0, 0.4, 0.7, 0.0, 0.0, 0.0][..])
        );
        let band = bridge.band().unwrap();
        assert_eq!(band.span(), (0.4, 0.7));
        assert!((band.rows[1].x - 0.55).abs() < 1.0e-12);
        assert!(band.rows.iter().all(|row| row.top == HighlightBand::HEIGHT));

        let log = compositor.unc().log();
        assert_eq!(log.first(), Some(&Call::SetScalars(VolumeChannel::Uncertainty)));
        assert!(log.contains(&Call::Render));
    }

    #[test]
    fn reselection_does_not_accumulate() {
        let (mut volume, mut compositor) = setup();
        let mut bridge = SelectionBridge::new();
        bridge.select_from_scatter(&mut volume, [1, 2], &mut compositor);
        bridge.select_from_scatter(&mut volume, [3], &mut compositor);
        assert_eq!(volume.scalars(), &[0.0, 0.0, 0.0, 0.9, 0.0, 0.0]);
    }

    #[test]
    fn empty_gesture_clears_everything() {
        let (mut volume, mut compositor) = setup();
        let mut bridge = SelectionBridge::new();
        bridge.select_from_scatter(&mut volume, [0], &mut compositor);
        bridge.clear_scatter(&mut volume, &mut compositor);
        assert!(!volume.is_masked());
        assert_eq!(volume.scalars(), volume.original_scalars());
        assert!(bridge.band().is_none());
        assert!(bridge.selection().is_empty());
        assert_eq!(
            compositor.unc().scalars.as_deref(),
            Some(volume.original_scalars())
        );
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let (mut volume, mut compositor) = setup();
        let mut bridge = SelectionBridge::new();
        let selection = bridge.select_from_scatter(&mut volume, [99], &mut compositor);
        assert!(selection.is_empty());
        assert!(!volume.is_masked());
    }

    #[test]
    fn heatmap_click_toggles_highlight_inside_band() {
        let mut bridge = SelectionBridge::new();
        let band = PoleBand::default();
        assert_eq!(bridge.select_from_heatmap(2, 5, band), None);
        assert!(!bridge.hover_suspended());

        assert_eq!(bridge.select_from_heatmap(12, 5, band), Some((12, 5)));
        assert!(bridge.hover_suspended());

        assert_eq!(bridge.select_from_heatmap(8, 8, band), None);
        assert!(!bridge.hover_suspended());
    }

    #[test]
    fn alphas_follow_selection() {
        let (mut volume, mut compositor) = setup();
        let mut bridge = SelectionBridge::new();
        assert_eq!(bridge.scatter_alphas(3), vec![IDLE_ALPHA; 3]);
        bridge.select_from_scatter(&mut volume, [1], &mut compositor);
        assert_eq!(
            bridge.scatter_alphas(3),
            vec![UNSELECTED_ALPHA, SELECTED_ALPHA, UNSELECTED_ALPHA]
        );
    }
}
