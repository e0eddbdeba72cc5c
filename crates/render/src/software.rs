use std::time::Instant;

use deltaview_core::{for_each_indexed_mut, ScalarVolume, TransferFunction, VolumeSampler};
use deltaview_scene::{Bounds, Camera, ClipPlane};
use glam::DVec3;

use crate::buffers::{ColorBuffer, DepthBuffer, ViewportSize};
use crate::compositor::DepthCompositor;
use crate::renderer::{Renderer, VolumeChannel};

const LUT_SIZE: usize = 256;
const EARLY_EXIT_ALPHA: f64 = 0.99;
const AMBIENT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderMode {
    /// First crossing of the scene-opacity field at `isovalue`, shaded with
    /// a headlight. Writes depth.
    Isosurface { isovalue: f64, color: [f32; 3] },
    /// Front-to-back compositing of the visible channels. Marching stops at
    /// whatever the depth buffer holds.
    Volume,
}

struct ChannelState {
    volume: Option<ScalarVolume>,
    lut: Vec<[f32; 4]>,
    visible: bool,
}

impl ChannelState {
    fn new(tf: &TransferFunction, visible: bool) -> Self {
        Self {
            volume: None,
            lut: build_lut(tf),
            visible,
        }
    }

    fn active(&self) -> Option<&ScalarVolume> {
        if self.visible {
            self.volume.as_ref()
        } else {
            None
        }
    }
}

/// CPU ray marcher over one or two scalar volumes.
pub struct SoftwareRenderer {
    mode: RenderMode,
    size: ViewportSize,
    background: [f32; 4],
    scene: ChannelState,
    uncertainty: ChannelState,
    clip_plane: Option<ClipPlane>,
    preserve_depth: bool,
    color: Vec<[f32; 4]>,
    depth: Vec<f32>,
    step_scale: f64,
}

impl SoftwareRenderer {
    pub fn new(mode: RenderMode, size: ViewportSize) -> Self {
        Self {
            mode,
            size,
            background: [0.0, 0.0, 0.0, 1.0],
            scene: ChannelState::new(&TransferFunction::scene_opacity_default(), true),
            uncertainty: ChannelState::new(&TransferFunction::uncertainty_default(), true),
            clip_plane: None,
            preserve_depth: false,
            color: vec![[0.0, 0.0, 0.0, 1.0]; size.pixel_count()],
            depth: vec![DepthBuffer::BACKGROUND; size.pixel_count()],
            step_scale: 0.5,
        }
    }

    /// Isosurface view of the scene-opacity volume.
    pub fn isosurface(opacity: &ScalarVolume, isovalue: f64, size: ViewportSize) -> Self {
        let mut renderer = Self::new(
            RenderMode::Isosurface {
                isovalue,
                color: [0.85, 0.85, 0.85],
            },
            size,
        );
        renderer.scene.volume = Some(opacity.clone());
        renderer
    }

    /// Uncertainty volume with the scene opacity as grey context.
    pub fn volume(opacity: &ScalarVolume, uncertainty: &ScalarVolume, size: ViewportSize) -> Self {
        let mut renderer = Self::new(RenderMode::Volume, size);
        renderer.scene.volume = Some(opacity.clone());
        renderer.uncertainty.volume = Some(uncertainty.clone());
        renderer
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn set_isovalue(&mut self, value: f64) {
        if let RenderMode::Isosurface { isovalue, .. } = &mut self.mode {
            *isovalue = value;
        }
    }

    pub fn resize(&mut self, size: ViewportSize) {
        if size == self.size {
            return;
        }
        self.size = size;
        self.color = vec![self.background; size.pixel_count()];
        self.depth = vec![DepthBuffer::BACKGROUND; size.pixel_count()];
    }

    fn channel_mut(&mut self, channel: VolumeChannel) -> &mut ChannelState {
        match channel {
            VolumeChannel::SceneOpacity => &mut self.scene,
            VolumeChannel::Uncertainty => &mut self.uncertainty,
        }
    }

    fn volumes(&self) -> impl Iterator<Item = &ScalarVolume> {
        self.scene
            .volume
            .iter()
            .chain(self.uncertainty.volume.iter())
    }
}

impl Renderer for SoftwareRenderer {
    fn render(&mut self, camera: &Camera) {
        let start = Instant::now();
        let size = self.size;
        if !self.preserve_depth || self.depth.len() != size.pixel_count() {
            self.depth = vec![DepthBuffer::BACKGROUND; size.pixel_count()];
        }
        if size.is_empty() {
            self.color.clear();
            return;
        }

        let frame = Frame::new(camera, size);
        let mut pixels: Vec<([f32; 4], f32)> = self
            .depth
            .iter()
            .map(|depth| (self.background, *depth))
            .collect();

        match self.mode {
            RenderMode::Isosurface { isovalue, color } => {
                if let Some(volume) = self.scene.volume.as_ref() {
                    let march = March::new(volume, self.step_scale, self.clip_plane);
                    for_each_indexed_mut(&mut pixels, |index, pixel| {
                        let ray = frame.ray(index);
                        if let Some((rgb, depth)) = march.isosurface(&frame, ray, isovalue, color, pixel.1) {
                            *pixel = ([rgb[0], rgb[1], rgb[2], 1.0], depth);
                        }
                    });
                }
            }
            RenderMode::Volume => {
                let layers: Vec<(March<'_>, &[[f32; 4]])> = [&self.uncertainty, &self.scene]
                    .into_iter()
                    .filter_map(|channel| {
                        channel.active().map(|volume| {
                            (
                                March::new(volume, self.step_scale, self.clip_plane),
                                channel.lut.as_slice(),
                            )
                        })
                    })
                    .collect();
                if !layers.is_empty() {
                    let background = self.background;
                    for_each_indexed_mut(&mut pixels, |index, pixel| {
                        let ray = frame.ray(index);
                        pixel.0 = composite_layers(&frame, ray, &layers, pixel.1, background);
                    });
                }
            }
        }

        self.color = pixels.iter().map(|(color, _)| *color).collect();
        self.depth = pixels.into_iter().map(|(_, depth)| depth).collect();
        tracing::trace!(
            "software render {:?} at {}x{} in {:.2} ms",
            self.mode,
            size.width,
            size.height,
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    fn actual_size(&self) -> ViewportSize {
        self.size
    }

    fn set_preserve_depth(&mut self, preserve: bool) {
        self.preserve_depth = preserve;
    }

    fn preserve_depth(&self) -> bool {
        self.preserve_depth
    }

    fn depth_buffer(&self, size: ViewportSize) -> DepthBuffer {
        let own = DepthBuffer::from_values(self.size, self.depth.clone());
        if size == self.size && own.len() == size.pixel_count() {
            own
        } else {
            own.resample_nearest(size)
        }
    }

    fn set_depth_buffer(&mut self, size: ViewportSize, depth: &DepthBuffer) {
        if size == self.size && depth.len() == size.pixel_count() {
            self.depth = depth.values().to_vec();
        } else {
            self.depth = depth.resample_nearest(self.size).values().to_vec();
        }
    }

    fn read_pixels(&self) -> ColorBuffer {
        ColorBuffer::from_pixels(self.size, self.color.clone())
    }

    fn content_bounds(&self) -> Option<Bounds> {
        self.volumes()
            .map(|volume| {
                let (min, max) = volume.bounds();
                Bounds::new(min, max)
            })
            .reduce(Bounds::union)
    }

    fn set_volume_scalars(&mut self, channel: VolumeChannel, volume: &ScalarVolume) {
        self.channel_mut(channel).volume = Some(volume.clone());
    }

    fn set_transfer_function(&mut self, channel: VolumeChannel, tf: &TransferFunction) {
        self.channel_mut(channel).lut = build_lut(tf);
    }

    fn set_channel_visible(&mut self, channel: VolumeChannel, visible: bool) {
        self.channel_mut(channel).visible = visible;
    }

    fn set_clip_plane(&mut self, plane: Option<ClipPlane>) {
        self.clip_plane = plane;
    }
}

/// Per-render camera constants.
struct Frame {
    origin: DVec3,
    forward: DVec3,
    near: f64,
    far: f64,
    size: ViewportSize,
    camera: Camera,
    aspect: f64,
}

impl Frame {
    fn new(camera: &Camera, size: ViewportSize) -> Self {
        let [near, far] = camera.clipping_range();
        Self {
            origin: camera.position(),
            forward: camera.direction_of_projection(),
            near,
            far: far.max(near + 1.0e-9),
            size,
            camera: camera.clone(),
            aspect: size.aspect(),
        }
    }

    fn ray(&self, index: usize) -> DVec3 {
        let x = index % self.size.width;
        let y = index / self.size.width;
        let u = 2.0 * (x as f64 + 0.5) / self.size.width as f64 - 1.0;
        let v = 1.0 - 2.0 * (y as f64 + 0.5) / self.size.height as f64;
        self.camera.view_ray(u, v, self.aspect)
    }

    fn depth_at(&self, ray: DVec3, t: f64) -> f32 {
        let z = t * ray.dot(self.forward);
        ((z - self.near) / (self.far - self.near)).clamp(0.0, 1.0) as f32
    }

    /// Ray parameter at which `depth` is reached, or infinity for the
    /// background.
    fn t_at_depth(&self, ray: DVec3, depth: f32) -> f64 {
        if depth >= DepthBuffer::BACKGROUND {
            return f64::INFINITY;
        }
        let along = ray.dot(self.forward);
        if along <= 0.0 {
            return f64::INFINITY;
        }
        (self.near + depth as f64 * (self.far - self.near)) / along
    }
}

struct March<'a> {
    sampler: VolumeSampler<'a>,
    bounds: Bounds,
    unit: f64,
    step: f64,
    clip: Option<ClipPlane>,
}

impl<'a> March<'a> {
    fn new(volume: &'a ScalarVolume, step_scale: f64, clip: Option<ClipPlane>) -> Self {
        let (min, max) = volume.bounds();
        let spacing = volume.spacing();
        let unit = spacing
            .iter()
            .map(|s| s.abs())
            .filter(|s| *s > 0.0)
            .fold(f64::INFINITY, f64::min);
        let unit = if unit.is_finite() { unit } else { 1.0 };
        Self {
            sampler: VolumeSampler::new(volume),
            bounds: Bounds::new(min, max),
            unit,
            step: unit * step_scale,
            clip,
        }
    }

    fn span(&self, frame: &Frame, ray: DVec3) -> Option<(f64, f64)> {
        let (t0, t1) = self.bounds.intersect_ray(frame.origin, ray)?;
        let t0 = t0.max(0.0);
        (t1 > t0).then_some((t0, t1))
    }

    fn sample(&self, point: DVec3) -> Option<f64> {
        if self.clip.is_some_and(|plane| !plane.keeps(point)) {
            return None;
        }
        Some(self.sampler.sample_world(point))
    }

    fn isosurface(
        &self,
        frame: &Frame,
        ray: DVec3,
        isovalue: f64,
        color: [f32; 3],
        depth_limit: f32,
    ) -> Option<([f32; 3], f32)> {
        let (t0, t1) = self.span(frame, ray)?;
        let t_limit = frame.t_at_depth(ray, depth_limit).min(t1);
        let mut previous: Option<(f64, f64)> = None;
        let mut t = t0;
        while t <= t_limit {
            let point = frame.origin + ray * t;
            match self.sample(point) {
                Some(value) if value >= isovalue => {
                    let hit = match previous {
                        Some((pt, pv)) if value > pv => {
                            pt + (t - pt) * ((isovalue - pv) / (value - pv)).clamp(0.0, 1.0)
                        }
                        _ => t,
                    };
                    let point = frame.origin + ray * hit;
                    let normal = -self.sampler.gradient_world(point).normalize_or_zero();
                    let lambert = normal.dot(-ray).abs();
                    let shade = (AMBIENT + (1.0 - AMBIENT) * lambert) as f32;
                    return Some((color.map(|c| c * shade), frame.depth_at(ray, hit)));
                }
                Some(value) => previous = Some((t, value)),
                None => previous = None,
            }
            t += self.step;
        }
        None
    }
}

fn composite_layers(
    frame: &Frame,
    ray: DVec3,
    layers: &[(March<'_>, &[[f32; 4]])],
    depth_limit: f32,
    background: [f32; 4],
) -> [f32; 4] {
    let Some((t0, t1)) = layers
        .iter()
        .filter_map(|(march, _)| march.span(frame, ray))
        .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)))
    else {
        return background;
    };
    let step = layers
        .iter()
        .map(|(march, _)| march.step)
        .fold(f64::INFINITY, f64::min);
    let t_limit = frame.t_at_depth(ray, depth_limit).min(t1);

    let mut rgb = [0.0f64; 3];
    let mut alpha = 0.0f64;
    let mut t = t0;
    while t <= t_limit && alpha < EARLY_EXIT_ALPHA {
        let point = frame.origin + ray * t;
        for (march, lut) in layers {
            let Some(value) = march.sample(point) else {
                continue;
            };
            let entry = lut_lookup(lut, value);
            let a = entry[3] as f64;
            if a <= 0.0 {
                continue;
            }
            // opacity is defined per unit grid spacing
            let a = 1.0 - (1.0 - a.min(1.0)).powf(step / march.unit);
            let weight = (1.0 - alpha) * a;
            for (c, e) in rgb.iter_mut().zip(entry) {
                *c += weight * e as f64;
            }
            alpha += weight;
        }
        t += step;
    }

    let mut out = [0.0f32; 4];
    for i in 0..3 {
        out[i] = (rgb[i] + (1.0 - alpha) * background[i] as f64) as f32;
    }
    out[3] = 1.0;
    out
}

fn lut_lookup(lut: &[[f32; 4]], value: f64) -> [f32; 4] {
    if lut.is_empty() {
        return [0.0; 4];
    }
    let index = (value.clamp(0.0, 1.0) * (lut.len() - 1) as f64).round() as usize;
    lut[index.min(lut.len() - 1)]
}

fn build_lut(tf: &TransferFunction) -> Vec<[f32; 4]> {
    (0..LUT_SIZE)
        .map(|i| {
            let x = i as f64 / (LUT_SIZE - 1) as f64;
            let (color, opacity) = tf.evaluate(x);
            [
                color[0] as f32,
                color[1] as f32,
                color[2] as f32,
                opacity.clamp(0.0, 1.0) as f32,
            ]
        })
        .collect()
}

/// Isosurface and uncertainty views sharing one camera framed on the data.
pub fn software_compositor(
    opacity: &ScalarVolume,
    uncertainty: &ScalarVolume,
    isovalue: f64,
    size: ViewportSize,
) -> DepthCompositor<SoftwareRenderer, SoftwareRenderer> {
    let iso = SoftwareRenderer::isosurface(opacity, isovalue, size);
    let unc = SoftwareRenderer::volume(opacity, uncertainty, size);
    let mut compositor = DepthCompositor::new(iso, unc, Camera::default());
    compositor.reset_camera();
    compositor
}

#[cfg(test)]
mod tests {
    use deltaview_core::sphere_opacity;

    use super::*;

    const SIZE: ViewportSize = ViewportSize::new(9, 9);
    const CENTER: usize = 4 * 9 + 4;

    fn framed_camera(volume: &ScalarVolume) -> Camera {
        let (min, max) = volume.bounds();
        let mut camera = Camera::default();
        camera.reset(Bounds::new(min, max));
        camera
    }

    fn core_uncertainty(dims: usize) -> ScalarVolume {
        let center = (dims - 1) as f64 * 0.5;
        ScalarVolume::from_fn("uncertainty", [dims; 3], |x, y, z| {
            let d = DVec3::new(x as f64, y as f64, z as f64) - DVec3::splat(center);
            if d.length() / center < 0.3 {
                0.5
            } else {
                0.0
            }
        })
        .unwrap()
    }

    #[test]
    fn isosurface_hits_the_ball_and_misses_the_corners() {
        let opacity = sphere_opacity(16).unwrap();
        let camera = framed_camera(&opacity);
        let mut renderer = SoftwareRenderer::isosurface(&opacity, 0.9, SIZE);
        renderer.render(&camera);

        let depth = renderer.depth_buffer(SIZE);
        let center = depth.values()[CENTER];
        assert!(center > 0.0 && center < DepthBuffer::BACKGROUND);
        assert_eq!(depth.get(0, 0), Some(DepthBuffer::BACKGROUND));
        assert!(renderer.read_pixels().pixels()[CENTER][0] > 0.0);
    }

    #[test]
    fn volume_marching_stops_at_preserved_depth() {
        let uniform = ScalarVolume::from_fn("uncertainty", [16; 3], |_, _, _| 0.5).unwrap();
        let camera = framed_camera(&uniform);
        let mut renderer = SoftwareRenderer::volume(&uniform, &uniform, SIZE);
        renderer.set_channel_visible(VolumeChannel::SceneOpacity, false);

        renderer.render(&camera);
        assert!(renderer.read_pixels().pixels()[CENTER][0] > 0.9);

        renderer.set_preserve_depth(true);
        renderer.set_depth_buffer(SIZE, &DepthBuffer::from_values(SIZE, vec![0.0; SIZE.pixel_count()]));
        renderer.render(&camera);
        assert_eq!(renderer.read_pixels().pixels()[CENTER][0], 0.0);
    }

    #[test]
    fn compositor_hides_uncertainty_behind_the_surface() {
        let opacity = sphere_opacity(16).unwrap();
        let uncertainty = core_uncertainty(16);
        let mut compositor = software_compositor(&opacity, &uncertainty, 0.9, SIZE);
        compositor
            .unc_mut()
            .set_channel_visible(VolumeChannel::SceneOpacity, false);

        let report = compositor.composite();
        assert!(report.transplanted);
        assert_eq!(compositor.unc().read_pixels().pixels()[CENTER][0], 0.0);

        compositor.set_show_geometry(false);
        assert!(compositor.unc().read_pixels().pixels()[CENTER][0] > 0.5);
    }

    #[test]
    fn buffers_follow_resize() {
        let opacity = sphere_opacity(8).unwrap();
        let mut renderer = SoftwareRenderer::isosurface(&opacity, 0.9, SIZE);
        renderer.resize(ViewportSize::new(3, 2));
        renderer.render(&framed_camera(&opacity));
        assert_eq!(renderer.actual_size(), ViewportSize::new(3, 2));
        assert_eq!(renderer.depth_buffer(ViewportSize::new(3, 2)).len(), 6);
        assert_eq!(renderer.depth_buffer(ViewportSize::new(6, 4)).len(), 24);
        assert_eq!(renderer.read_pixels().pixels().len(), 6);
    }

    #[test]
    fn transfer_function_updates_the_lookup_table() {
        let uniform = ScalarVolume::from_fn("uncertainty", [8; 3], |_, _, _| 0.5).unwrap();
        let camera = framed_camera(&uniform);
        let mut renderer = SoftwareRenderer::volume(&uniform, &uniform, SIZE);
        renderer.set_channel_visible(VolumeChannel::SceneOpacity, false);
        let mut tf = TransferFunction::uncertainty_default();
        tf.opacity = deltaview_core::OpacityCurve::new(vec![(0.0, 0.0), (1.0, 0.0)]);
        renderer.set_transfer_function(VolumeChannel::Uncertainty, &tf);
        renderer.render(&camera);
        assert_eq!(renderer.read_pixels().pixels()[CENTER][0], 0.0);
    }
}
