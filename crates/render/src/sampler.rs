use deltaview_core::{
    report_progress, sweep_angles, CancelToken, DirectionalStatsGrid, ProgressEvent, ProgressSink,
    ANGLE_STEP_DEGREES,
};
use deltaview_scene::VIEW_UP_ALIGNMENT_THRESHOLD;
use thiserror::Error;

use crate::buffers::PixelChannel;
use crate::compositor::DepthCompositor;
use crate::renderer::Renderer;

#[derive(Debug, Error, PartialEq)]
pub enum SampleError {
    #[error("directional sampling cancelled after {done} of {total} views")]
    Cancelled { done: usize, total: usize },
    #[error("uncertainty view rendered an empty image at azimuth {azimuth}°, elevation {elevation}°")]
    EmptyImage { azimuth: f64, elevation: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    pub step_degrees: f64,
    pub channel: PixelChannel,
    pub view_up_threshold: f64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            step_degrees: ANGLE_STEP_DEGREES,
            channel: PixelChannel::Red,
            view_up_threshold: VIEW_UP_ALIGNMENT_THRESHOLD,
        }
    }
}

/// Renders the uncertainty view from a sphere of directions and records the
/// mean and spread of what is visible past the scene geometry.
#[derive(Clone, Default)]
pub struct DirectionalSampler {
    settings: SamplerSettings,
    cancel: Option<CancelToken>,
    progress: Option<ProgressSink>,
}

impl DirectionalSampler {
    pub fn new(settings: SamplerSettings) -> Self {
        Self {
            settings,
            cancel: None,
            progress: None,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Visits every `(azimuth, elevation)` pair of the sweep, azimuth outer,
    /// each time starting again from the camera pose at call time. The
    /// camera pose and geometry flag are restored before returning.
    pub fn sample<I: Renderer, U: Renderer>(
        &self,
        compositor: &mut DepthCompositor<I, U>,
    ) -> Result<DirectionalStatsGrid, SampleError> {
        let angles = sweep_angles(self.settings.step_degrees);
        let step = self.settings.step_degrees;
        let total = angles.len() * angles.len();
        let home = compositor.camera().pose();
        let geometry_was_shown = compositor.show_geometry();
        if !geometry_was_shown {
            compositor.set_geometry_flag(true);
        }

        let _span = tracing::info_span!("directional_sampling", views = total).entered();
        tracing::info!("sampling {} views at {}° steps", total, step);
        report_progress(self.progress.as_ref(), ProgressEvent::Start { total });

        let result = self.sweep(compositor, &angles, total);

        compositor.camera_mut().restore(&home);
        if !geometry_was_shown {
            compositor.set_show_geometry(false);
        } else {
            compositor.composite();
        }
        report_progress(
            self.progress.as_ref(),
            ProgressEvent::Finish {
                cancelled: matches!(result, Err(SampleError::Cancelled { .. })),
            },
        );
        match &result {
            Ok(grid) => {
                if let (Some((lo, hi)), Some((slo, shi))) = (grid.mean_range(), grid.stddev_range())
                {
                    tracing::info!(
                        "directional means in [{:.6}, {:.6}], standard deviations in [{:.6}, {:.6}]",
                        lo,
                        hi,
                        slo,
                        shi
                    );
                }
            }
            Err(err) => tracing::warn!("{}", err),
        }
        result
    }

    fn sweep<I: Renderer, U: Renderer>(
        &self,
        compositor: &mut DepthCompositor<I, U>,
        angles: &[f64],
        total: usize,
    ) -> Result<DirectionalStatsGrid, SampleError> {
        let home = compositor.camera().pose();
        let mut grid = DirectionalStatsGrid::new(angles.len(), angles.len());
        let mut done = 0usize;

        for (row, &azimuth) in angles.iter().enumerate() {
            for (col, &elevation) in angles.iter().enumerate() {
                if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                    return Err(SampleError::Cancelled { done, total });
                }

                compositor.camera_mut().orient_from(
                    &home,
                    azimuth,
                    elevation,
                    self.settings.view_up_threshold,
                );
                compositor.reset_camera();
                compositor.composite();

                let pixels = compositor.unc().read_pixels();
                let (mean, stddev) = pixels
                    .channel_stats(self.settings.channel)
                    .ok_or(SampleError::EmptyImage { azimuth, elevation })?;
                grid.set(row, col, mean, stddev);

                done += 1;
                report_progress(
                    self.progress.as_ref(),
                    ProgressEvent::Advance {
                        done,
                        fraction: done as f32 / total as f32,
                    },
                );
            }
            tracing::debug!("azimuth {}° done", azimuth);
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use deltaview_core::GRID_SIZE;
    use deltaview_scene::Camera;

    use super::*;
    use crate::buffers::ViewportSize;
    use crate::testing::{Call, RecordingRenderer};

    fn single_pixel_pair() -> DepthCompositor<RecordingRenderer, RecordingRenderer> {
        let size = ViewportSize::new(1, 1);
        let iso = RecordingRenderer::new("iso", size);
        let unc = RecordingRenderer::new("unc", size).with_pixel([0.5, 0.5, 0.5, 1.0]);
        let mut compositor = DepthCompositor::new(iso, unc, Camera::default());
        compositor.reset_camera();
        compositor
    }

    #[test]
    fn constant_image_gives_flat_statistics() {
        let mut compositor = single_pixel_pair();
        let grid = DirectionalSampler::default()
            .sample(&mut compositor)
            .unwrap();
        assert_eq!(grid.shape(), (GRID_SIZE, GRID_SIZE));
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                assert_eq!(grid.cell(row, col), Some((0.5, 0.0)));
            }
        }
    }

    #[test]
    fn every_view_starts_from_home_and_home_is_restored() {
        let mut compositor = single_pixel_pair();
        let home = compositor.camera().pose();
        DirectionalSampler::new(SamplerSettings {
            step_degrees: 90.0,
            ..SamplerSettings::default()
        })
        .sample(&mut compositor)
        .unwrap();
        assert_eq!(compositor.camera().pose(), home);

        let reads = compositor
            .unc()
            .log()
            .iter()
            .filter(|call| **call == Call::ReadPixels)
            .count();
        assert_eq!(reads, 25);

        // azimuth 0, elevation 0 is the home direction
        let poses = &compositor.unc().poses;
        let first_view = poses[poses.len() - 2 * 25 - 2];
        assert!(first_view
            .position
            .abs_diff_eq(home.position, 1.0e-9));
    }

    #[test]
    fn sampling_forces_geometry_and_restores_flag() {
        let mut compositor = single_pixel_pair();
        compositor.set_show_geometry(false);
        compositor.unc_mut().clear_log();
        DirectionalSampler::new(SamplerSettings {
            step_degrees: 180.0,
            ..SamplerSettings::default()
        })
        .sample(&mut compositor)
        .unwrap();
        assert!(!compositor.show_geometry());
        let writes = compositor
            .unc()
            .log()
            .iter()
            .filter(|call| matches!(call, Call::WriteDepth(_)))
            .count();
        assert_eq!(writes, 9);
    }

    #[test]
    fn cancellation_stops_between_cells() {
        let mut compositor = single_pixel_pair();
        let token = CancelToken::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink: ProgressSink = {
            let events = Arc::clone(&events);
            let token = token.clone();
            Arc::new(move |event: ProgressEvent| {
                if let ProgressEvent::Advance { done: 3, .. } = event {
                    token.cancel();
                }
                events.lock().expect("progress lock").push(event);
            })
        };
        let result = DirectionalSampler::default()
            .with_cancel(token)
            .with_progress(sink)
            .sample(&mut compositor);
        assert_eq!(
            result,
            Err(SampleError::Cancelled {
                done: 3,
                total: GRID_SIZE * GRID_SIZE
            })
        );
        let events = events.lock().expect("progress lock");
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Finish { cancelled: true })
        );
    }
}
