use deltaview_core::{ScalarVolume, TransferFunction};
use deltaview_scene::{Bounds, Camera, ClipPlane};

use crate::buffers::{ColorBuffer, DepthBuffer, ViewportSize};

/// Scalar fields a renderer can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeChannel {
    /// Reconstructed scene density; the isosurface source and the grey
    /// context volume behind the uncertainty.
    SceneOpacity,
    Uncertainty,
}

impl VolumeChannel {
    pub fn label(self) -> &'static str {
        match self {
            VolumeChannel::SceneOpacity => "scene opacity",
            VolumeChannel::Uncertainty => "uncertainty",
        }
    }
}

/// What the compositor, sampler and controllers need from a view.
///
/// Depth buffers are exchanged at an explicit extent so a caller can always
/// query `actual_size` first and never rely on a cached size.
pub trait Renderer {
    fn render(&mut self, camera: &Camera);

    fn actual_size(&self) -> ViewportSize;

    /// When on, the next render starts from the current depth buffer instead
    /// of clearing it.
    fn set_preserve_depth(&mut self, preserve: bool);

    fn preserve_depth(&self) -> bool;

    fn depth_buffer(&self, size: ViewportSize) -> DepthBuffer;

    fn set_depth_buffer(&mut self, size: ViewportSize, depth: &DepthBuffer);

    fn read_pixels(&self) -> ColorBuffer;

    /// World-space box of everything this renderer draws.
    fn content_bounds(&self) -> Option<Bounds>;

    fn set_volume_scalars(&mut self, _channel: VolumeChannel, _volume: &ScalarVolume) {}

    fn set_transfer_function(&mut self, _channel: VolumeChannel, _tf: &TransferFunction) {}

    fn set_channel_visible(&mut self, _channel: VolumeChannel, _visible: bool) {}

    fn set_clip_plane(&mut self, _plane: Option<ClipPlane>) {}
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, camera: &Camera) {
        (**self).render(camera)
    }

    fn actual_size(&self) -> ViewportSize {
        (**self).actual_size()
    }

    fn set_preserve_depth(&mut self, preserve: bool) {
        (**self).set_preserve_depth(preserve)
    }

    fn preserve_depth(&self) -> bool {
        (**self).preserve_depth()
    }

    fn depth_buffer(&self, size: ViewportSize) -> DepthBuffer {
        (**self).depth_buffer(size)
    }

    fn set_depth_buffer(&mut self, size: ViewportSize, depth: &DepthBuffer) {
        (**self).set_depth_buffer(size, depth)
    }

    fn read_pixels(&self) -> ColorBuffer {
        (**self).read_pixels()
    }

    fn content_bounds(&self) -> Option<Bounds> {
        (**self).content_bounds()
    }

    fn set_volume_scalars(&mut self, channel: VolumeChannel, volume: &ScalarVolume) {
        (**self).set_volume_scalars(channel, volume)
    }

    fn set_transfer_function(&mut self, channel: VolumeChannel, tf: &TransferFunction) {
        (**self).set_transfer_function(channel, tf)
    }

    fn set_channel_visible(&mut self, channel: VolumeChannel, visible: bool) {
        (**self).set_channel_visible(channel, visible)
    }

    fn set_clip_plane(&mut self, plane: Option<ClipPlane>) {
        (**self).set_clip_plane(plane)
    }
}
