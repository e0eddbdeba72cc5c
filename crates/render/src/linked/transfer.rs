use deltaview_core::{Histogram, ScalarVolume, TransferFunction};

use crate::compositor::DepthCompositor;
use crate::renderer::{Renderer, VolumeChannel};

pub const DEFAULT_NUM_BINS: usize = 20;
pub const DEFAULT_UNCERTAINTY_FILTER: f64 = 0.1;

/// One channel's curve, the histogram drawn behind it and the point being
/// dragged, if any.
#[derive(Debug, Clone)]
pub struct ChannelEditor {
    tf: TransferFunction,
    histogram: Histogram,
    filter_threshold: Option<f64>,
    dragging: Option<usize>,
}

impl ChannelEditor {
    fn new(tf: TransferFunction, filter_threshold: Option<f64>) -> Self {
        Self {
            tf,
            histogram: Histogram::compute(&[], DEFAULT_NUM_BINS, filter_threshold),
            filter_threshold,
            dragging: None,
        }
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.tf
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }
}

/// Vertical line on the scene histogram at the isosurface value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsovalueMarker {
    pub x: f64,
    pub top: f64,
}

/// Keeps the editable transfer functions, their histograms and the
/// renderer state in step. Drags are local until released.
#[derive(Debug, Clone)]
pub struct TransferFunctionController {
    scene: ChannelEditor,
    uncertainty: ChannelEditor,
    num_bins: usize,
    isovalue: f64,
}

impl TransferFunctionController {
    pub fn new(isovalue: f64, uncertainty_filter: Option<f64>) -> Self {
        Self {
            scene: ChannelEditor::new(TransferFunction::scene_opacity_default(), None),
            uncertainty: ChannelEditor::new(
                TransferFunction::uncertainty_default(),
                uncertainty_filter,
            ),
            num_bins: DEFAULT_NUM_BINS,
            isovalue,
        }
    }

    pub fn editor(&self, channel: VolumeChannel) -> &ChannelEditor {
        match channel {
            VolumeChannel::SceneOpacity => &self.scene,
            VolumeChannel::Uncertainty => &self.uncertainty,
        }
    }

    fn editor_mut(&mut self, channel: VolumeChannel) -> &mut ChannelEditor {
        match channel {
            VolumeChannel::SceneOpacity => &mut self.scene,
            VolumeChannel::Uncertainty => &mut self.uncertainty,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn isovalue(&self) -> f64 {
        self.isovalue
    }

    pub fn set_isovalue(&mut self, isovalue: f64) {
        self.isovalue = isovalue.clamp(0.0, 1.0);
    }

    /// Recomputes both histograms; control points are left alone.
    pub fn rebin(&mut self, num_bins: usize, scene: &ScalarVolume, uncertainty: &ScalarVolume) {
        self.num_bins = num_bins.max(1);
        for (editor, volume) in [(&mut self.scene, scene), (&mut self.uncertainty, uncertainty)] {
            editor.histogram = volume.histogram(self.num_bins, editor.filter_threshold);
        }
        tracing::debug!("histograms rebinned to {} bins", self.num_bins);
    }

    /// Picks the control point under the pointer. Returns its index.
    pub fn begin_drag(
        &mut self,
        channel: VolumeChannel,
        x: f64,
        opacity: f64,
        radius: f64,
    ) -> Option<usize> {
        let editor = self.editor_mut(channel);
        editor.dragging = editor.tf.opacity.nearest_point(x, opacity, radius);
        editor.dragging
    }

    /// Moves the dragged point in the local curve only.
    pub fn drag_to(&mut self, channel: VolumeChannel, x: f64, opacity: f64) -> bool {
        let editor = self.editor_mut(channel);
        match editor.dragging {
            Some(index) => editor.tf.opacity.move_point(index, x, opacity),
            None => false,
        }
    }

    /// Releases the drag and commits the curve to the uncertainty view.
    pub fn end_drag<I: Renderer, U: Renderer>(
        &mut self,
        channel: VolumeChannel,
        compositor: &mut DepthCompositor<I, U>,
    ) -> bool {
        if self.editor_mut(channel).dragging.take().is_none() {
            return false;
        }
        self.commit(channel, compositor);
        true
    }

    pub fn add_point<I: Renderer, U: Renderer>(
        &mut self,
        channel: VolumeChannel,
        x: f64,
        opacity: f64,
        compositor: &mut DepthCompositor<I, U>,
    ) -> Option<usize> {
        let index = self.editor_mut(channel).tf.opacity.insert_point(x, opacity)?;
        self.commit(channel, compositor);
        Some(index)
    }

    /// Endpoints cannot be removed.
    pub fn remove_point<I: Renderer, U: Renderer>(
        &mut self,
        channel: VolumeChannel,
        index: usize,
        compositor: &mut DepthCompositor<I, U>,
    ) -> bool {
        if !self.editor_mut(channel).tf.opacity.remove_point(index) {
            return false;
        }
        self.commit(channel, compositor);
        true
    }

    /// Replaces a whole curve, e.g. from a text field.
    pub fn set_transfer_function<I: Renderer, U: Renderer>(
        &mut self,
        channel: VolumeChannel,
        tf: TransferFunction,
        compositor: &mut DepthCompositor<I, U>,
    ) {
        let editor = self.editor_mut(channel);
        editor.tf = tf;
        editor.dragging = None;
        self.commit(channel, compositor);
    }

    /// Pushes both curves, e.g. after a dataset load.
    pub fn apply_all<I: Renderer, U: Renderer>(&self, compositor: &mut DepthCompositor<I, U>) {
        for channel in [VolumeChannel::SceneOpacity, VolumeChannel::Uncertainty] {
            compositor
                .unc_mut()
                .set_transfer_function(channel, &self.editor(channel).tf);
        }
        compositor.composite();
    }

    /// Full height while the geometry is shown, collapsed otherwise.
    pub fn isovalue_marker(&self, show_geometry: bool) -> IsovalueMarker {
        IsovalueMarker {
            x: self.isovalue,
            top: if show_geometry { 1.0 } else { 0.0 },
        }
    }

    fn commit<I: Renderer, U: Renderer>(
        &self,
        channel: VolumeChannel,
        compositor: &mut DepthCompositor<I, U>,
    ) {
        let tf = &self.editor(channel).tf;
        tracing::debug!("{} opacity curve: {}", channel.label(), tf.opacity);
        compositor.unc_mut().set_transfer_function(channel, tf);
        compositor.composite();
    }
}
