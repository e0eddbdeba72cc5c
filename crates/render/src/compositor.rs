use deltaview_scene::{Bounds, Camera};

use crate::buffers::ViewportSize;
use crate::renderer::{Renderer, VolumeChannel};

/// What one `composite` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeReport {
    pub iso_size: ViewportSize,
    pub unc_size: ViewportSize,
    /// The isosurface depth was written into the uncertainty view.
    pub transplanted: bool,
    /// The two views differed in size and the depth was resampled.
    pub resampled: bool,
}

/// Keeps the isosurface view and the uncertainty view depth-consistent.
///
/// Both renderers draw from the one camera owned here, so a camera change
/// reaches both views by construction. Callers composite again after any
/// change that affects what either view draws.
pub struct DepthCompositor<I, U> {
    iso: I,
    unc: U,
    camera: Camera,
    show_geometry: bool,
}

impl<I: Renderer, U: Renderer> DepthCompositor<I, U> {
    pub fn new(iso: I, unc: U, camera: Camera) -> Self {
        let mut compositor = Self {
            iso,
            unc,
            camera,
            show_geometry: true,
        };
        compositor
            .unc
            .set_channel_visible(VolumeChannel::SceneOpacity, true);
        compositor
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn iso(&self) -> &I {
        &self.iso
    }

    pub fn iso_mut(&mut self) -> &mut I {
        &mut self.iso
    }

    pub fn unc(&self) -> &U {
        &self.unc
    }

    pub fn unc_mut(&mut self) -> &mut U {
        &mut self.unc
    }

    pub fn show_geometry(&self) -> bool {
        self.show_geometry
    }

    /// Shows or hides the scene geometry and recomposites. Hiding it also
    /// removes the scene-opacity context volume from the uncertainty view.
    pub fn set_show_geometry(&mut self, show: bool) -> CompositeReport {
        self.set_geometry_flag(show);
        self.composite()
    }

    /// Flag change only; the next `composite` picks it up.
    pub(crate) fn set_geometry_flag(&mut self, show: bool) {
        self.show_geometry = show;
        self.unc
            .set_channel_visible(VolumeChannel::SceneOpacity, show);
    }

    /// Union of both views' content.
    pub fn content_bounds(&self) -> Option<Bounds> {
        match (self.iso.content_bounds(), self.unc.content_bounds()) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        }
    }

    /// Frames both views' content with the current viewing direction.
    pub fn reset_camera(&mut self) {
        if let Some(bounds) = self.content_bounds() {
            self.camera.reset(bounds);
        }
    }

    pub fn composite(&mut self) -> CompositeReport {
        self.iso.set_preserve_depth(false);
        self.iso.render(&self.camera);
        self.unc.set_preserve_depth(false);
        self.unc.render(&self.camera);

        let iso_size = self.iso.actual_size();
        let unc_size = self.unc.actual_size();
        if !self.show_geometry {
            let report = CompositeReport {
                iso_size,
                unc_size,
                transplanted: false,
                resampled: false,
            };
            tracing::debug!("composite without geometry: {:?}", report);
            return report;
        }

        let iso_depth = self.iso.depth_buffer(iso_size);
        assert_eq!(
            iso_depth.len(),
            iso_size.pixel_count(),
            "isosurface depth buffer does not match its {}x{} viewport",
            iso_size.width,
            iso_size.height
        );

        self.unc.set_preserve_depth(true);
        let own_depth = self.unc.depth_buffer(unc_size);
        assert_eq!(
            own_depth.len(),
            unc_size.pixel_count(),
            "uncertainty depth buffer does not match its {}x{} viewport",
            unc_size.width,
            unc_size.height
        );

        let resampled = iso_size != unc_size;
        let depth = if resampled {
            iso_depth.resample_nearest(unc_size)
        } else {
            iso_depth
        };
        self.unc.set_depth_buffer(unc_size, &depth);

        self.iso.render(&self.camera);
        self.unc.render(&self.camera);

        let report = CompositeReport {
            iso_size,
            unc_size,
            transplanted: true,
            resampled,
        };
        tracing::debug!("composite with geometry: {:?}", report);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingRenderer};

    fn pair(iso: ViewportSize, unc: ViewportSize) -> DepthCompositor<RecordingRenderer, RecordingRenderer> {
        let iso = RecordingRenderer::new("iso", iso);
        let unc = RecordingRenderer::new("unc", unc);
        DepthCompositor::new(iso, unc, Camera::default())
    }

    #[test]
    fn geometry_pass_transplants_depth_between_renders() {
        let size = ViewportSize::new(4, 3);
        let mut compositor = pair(size, size);
        compositor.iso_mut().fill_depth(0.25);
        compositor.unc_mut().clear_log();
        compositor.iso_mut().clear_log();

        let report = compositor.composite();
        assert!(report.transplanted);
        assert!(!report.resampled);

        assert_eq!(
            compositor.iso().log(),
            vec![
                Call::SetPreserveDepth(false),
                Call::Render,
                Call::ActualSize,
                Call::ReadDepth(size),
                Call::Render,
            ]
        );
        assert_eq!(
            compositor.unc().log(),
            vec![
                Call::SetPreserveDepth(false),
                Call::Render,
                Call::ActualSize,
                Call::SetPreserveDepth(true),
                Call::ReadDepth(size),
                Call::WriteDepth(size),
                Call::Render,
            ]
        );
        assert!(compositor.unc().preserve_depth());
        assert!(compositor
            .unc()
            .depth_buffer(size)
            .values()
            .iter()
            .all(|d| *d == 0.25));
    }

    #[test]
    fn hiding_geometry_detaches_depth() {
        let size = ViewportSize::new(2, 2);
        let mut compositor = pair(size, size);
        compositor.composite();
        assert!(compositor.unc().preserve_depth());

        compositor.unc_mut().clear_log();
        let report = compositor.set_show_geometry(false);
        assert!(!report.transplanted);
        assert!(!compositor.unc().preserve_depth());
        assert!(!compositor.iso().preserve_depth());
        let log = compositor.unc().log();
        assert_eq!(
            log.first(),
            Some(&Call::SetVisible(VolumeChannel::SceneOpacity, false))
        );
        assert!(!log.iter().any(|call| matches!(call, Call::WriteDepth(_))));
    }

    #[test]
    fn sizes_are_requeried_after_resize() {
        let mut compositor = pair(ViewportSize::new(4, 4), ViewportSize::new(4, 4));
        compositor.composite();

        compositor.unc_mut().resize(ViewportSize::new(2, 3));
        compositor.unc_mut().clear_log();
        let report = compositor.composite();
        assert_eq!(report.unc_size, ViewportSize::new(2, 3));
        assert!(report.resampled);
        assert!(compositor
            .unc()
            .log()
            .contains(&Call::WriteDepth(ViewportSize::new(2, 3))));
        assert_eq!(
            compositor.unc().depth_buffer(ViewportSize::new(2, 3)).len(),
            6
        );
    }

    #[test]
    #[should_panic(expected = "isosurface depth buffer")]
    fn stale_depth_length_is_an_invariant_violation() {
        let size = ViewportSize::new(3, 3);
        let mut compositor = pair(size, size);
        compositor.iso_mut().corrupt_depth_length();
        compositor.composite();
    }

    #[test]
    fn reset_frames_union_of_content() {
        let mut compositor = pair(ViewportSize::new(2, 2), ViewportSize::new(2, 2));
        compositor.reset_camera();
        assert_eq!(
            compositor.camera().focal_point(),
            glam::DVec3::new(0.5, 0.5, 0.5)
        );
    }
}
