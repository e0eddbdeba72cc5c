use std::cell::RefCell;

use deltaview_core::{ScalarVolume, TransferFunction};
use deltaview_scene::{Bounds, Camera, CameraPose, ClipPlane};
use glam::DVec3;

use crate::buffers::{ColorBuffer, DepthBuffer, ViewportSize};
use crate::renderer::{Renderer, VolumeChannel};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Render,
    ActualSize,
    SetPreserveDepth(bool),
    ReadDepth(ViewportSize),
    WriteDepth(ViewportSize),
    ReadPixels,
    SetScalars(VolumeChannel),
    SetTransferFunction(VolumeChannel),
    SetVisible(VolumeChannel, bool),
    SetClipPlane(bool),
}

/// Renderer that records every call and fakes a depth pass.
pub struct RecordingRenderer {
    pub name: &'static str,
    size: ViewportSize,
    preserve: bool,
    surface_depth: f32,
    depth: Vec<f32>,
    pixel: [f32; 4],
    corrupt_depth: bool,
    pub poses: Vec<CameraPose>,
    pub scalars: Option<Vec<f64>>,
    pub transfer_functions: Vec<(VolumeChannel, TransferFunction)>,
    log: RefCell<Vec<Call>>,
}

impl RecordingRenderer {
    pub fn new(name: &'static str, size: ViewportSize) -> Self {
        Self {
            name,
            size,
            preserve: false,
            surface_depth: DepthBuffer::BACKGROUND,
            depth: vec![DepthBuffer::BACKGROUND; size.pixel_count()],
            pixel: [0.0, 0.0, 0.0, 1.0],
            corrupt_depth: false,
            poses: Vec::new(),
            scalars: None,
            transfer_functions: Vec::new(),
            log: RefCell::new(Vec::new()),
        }
    }

    /// Every render that clears depth writes this value everywhere.
    pub fn fill_depth(&mut self, depth: f32) {
        self.surface_depth = depth;
    }

    pub fn with_pixel(mut self, pixel: [f32; 4]) -> Self {
        self.pixel = pixel;
        self
    }

    pub fn resize(&mut self, size: ViewportSize) {
        self.size = size;
        self.depth = vec![DepthBuffer::BACKGROUND; size.pixel_count()];
    }

    pub fn corrupt_depth_length(&mut self) {
        self.corrupt_depth = true;
    }

    pub fn log(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&mut self) {
        self.log.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, camera: &Camera) {
        self.record(Call::Render);
        self.poses.push(camera.pose());
        if !self.preserve || self.depth.len() != self.size.pixel_count() {
            self.depth = vec![self.surface_depth; self.size.pixel_count()];
        }
    }

    fn actual_size(&self) -> ViewportSize {
        self.record(Call::ActualSize);
        self.size
    }

    fn set_preserve_depth(&mut self, preserve: bool) {
        self.record(Call::SetPreserveDepth(preserve));
        self.preserve = preserve;
    }

    fn preserve_depth(&self) -> bool {
        self.preserve
    }

    fn depth_buffer(&self, size: ViewportSize) -> DepthBuffer {
        self.record(Call::ReadDepth(size));
        let mut values = self.depth.clone();
        if self.corrupt_depth {
            values.push(DepthBuffer::BACKGROUND);
        }
        DepthBuffer::from_values(size, values)
    }

    fn set_depth_buffer(&mut self, size: ViewportSize, depth: &DepthBuffer) {
        self.record(Call::WriteDepth(size));
        self.depth = depth.values().to_vec();
    }

    fn read_pixels(&self) -> ColorBuffer {
        self.record(Call::ReadPixels);
        ColorBuffer::filled(self.size, self.pixel)
    }

    fn content_bounds(&self) -> Option<Bounds> {
        Some(Bounds::new(DVec3::ZERO, DVec3::ONE))
    }

    fn set_volume_scalars(&mut self, channel: VolumeChannel, volume: &ScalarVolume) {
        self.record(Call::SetScalars(channel));
        self.scalars = Some(volume.scalars().to_vec());
    }

    fn set_transfer_function(&mut self, channel: VolumeChannel, tf: &TransferFunction) {
        self.record(Call::SetTransferFunction(channel));
        self.transfer_functions.push((channel, tf.clone()));
    }

    fn set_channel_visible(&mut self, channel: VolumeChannel, visible: bool) {
        self.record(Call::SetVisible(channel, visible));
    }

    fn set_clip_plane(&mut self, plane: Option<ClipPlane>) {
        self.record(Call::SetClipPlane(plane.is_some()));
    }
}
