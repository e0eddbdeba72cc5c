use std::sync::mpsc::{self, Receiver};
use std::thread;

use deltaview_core::{
    CancelToken, DirectionalStatsGrid, ProgressEvent, ProgressSink, ScalarVolume, TransferFunction,
};
use deltaview_scene::CameraPose;
use render::{
    software_compositor, DirectionalSampler, PixelChannel, Renderer, SampleError, SamplerSettings,
    ViewportSize, VolumeChannel,
};

/// Everything a sweep needs, owned so it can move to a worker thread.
#[derive(Clone)]
pub(crate) struct PrecomputeJob {
    pub opacity: ScalarVolume,
    pub uncertainty: ScalarVolume,
    pub isovalue: f64,
    pub size: ViewportSize,
    pub step_degrees: f64,
    pub view_angle: f64,
    pub home: Option<CameraPose>,
    pub transfer: Option<(TransferFunction, TransferFunction)>,
}

pub(crate) enum PrecomputeMessage {
    Progress(f32),
    Finished(Result<DirectionalStatsGrid, SampleError>),
}

/// A sweep running on its own renderers; the interactive views are never
/// touched from here.
pub(crate) struct PrecomputeWorker {
    receiver: Receiver<PrecomputeMessage>,
    cancel: CancelToken,
    progress: f32,
}

impl PrecomputeWorker {
    pub(crate) fn spawn(
        job: PrecomputeJob,
        on_message: impl Fn() + Send + Sync + 'static,
    ) -> Result<Self, String> {
        let (sender, receiver) = mpsc::channel();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let progress_sender = sender.clone();
        let notify = std::sync::Arc::new(on_message);
        let progress_notify = notify.clone();
        let sink: ProgressSink = std::sync::Arc::new(move |event| {
            if let ProgressEvent::Advance { fraction, .. } = event {
                let _ = progress_sender.send(PrecomputeMessage::Progress(fraction));
                progress_notify();
            }
        });
        thread::Builder::new()
            .name("deltaview-precompute".to_string())
            .spawn(move || {
                let result = job.run(Some(token), Some(sink));
                let _ = sender.send(PrecomputeMessage::Finished(result));
                notify();
            })
            .map_err(|err| format!("failed to start precompute worker: {}", err))?;
        Ok(Self {
            receiver,
            cancel,
            progress: 0.0,
        })
    }

    pub(crate) fn progress(&self) -> f32 {
        self.progress
    }

    /// Drains pending messages; returns the result once the sweep ends.
    pub(crate) fn poll(&mut self) -> Option<Result<DirectionalStatsGrid, SampleError>> {
        while let Ok(message) = self.receiver.try_recv() {
            match message {
                PrecomputeMessage::Progress(fraction) => self.progress = fraction,
                PrecomputeMessage::Finished(result) => return Some(result),
            }
        }
        None
    }
}

impl Drop for PrecomputeWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl PrecomputeJob {
    pub(crate) fn run(
        &self,
        cancel: Option<CancelToken>,
        progress: Option<ProgressSink>,
    ) -> Result<DirectionalStatsGrid, SampleError> {
        let mut uncertainty = self.uncertainty.clone();
        uncertainty.clear_mask();
        let mut compositor =
            software_compositor(&self.opacity, &uncertainty, self.isovalue, self.size);
        compositor.camera_mut().set_view_angle(self.view_angle);
        match &self.home {
            Some(home) => compositor.camera_mut().restore(home),
            None => compositor.reset_camera(),
        }
        if let Some((scene, unc)) = &self.transfer {
            compositor
                .unc_mut()
                .set_transfer_function(VolumeChannel::SceneOpacity, scene);
            compositor
                .unc_mut()
                .set_transfer_function(VolumeChannel::Uncertainty, unc);
        }

        let mut sampler = DirectionalSampler::new(SamplerSettings {
            step_degrees: self.step_degrees,
            channel: PixelChannel::Red,
            ..SamplerSettings::default()
        });
        if let Some(token) = cancel {
            sampler = sampler.with_cancel(token);
        }
        if let Some(sink) = progress {
            sampler = sampler.with_progress(sink);
        }
        sampler.sample(&mut compositor)
    }
}

#[cfg(test)]
mod tests {
    use deltaview_core::{shell_uncertainty, sphere_opacity};

    use super::*;

    fn job() -> PrecomputeJob {
        PrecomputeJob {
            opacity: sphere_opacity(8).unwrap(),
            uncertainty: shell_uncertainty(8).unwrap(),
            isovalue: 0.9,
            size: ViewportSize::new(4, 4),
            step_degrees: 90.0,
            view_angle: 30.0,
            home: None,
            transfer: None,
        }
    }

    #[test]
    fn sweep_fills_the_grid() {
        let grid = job().run(None, None).unwrap();
        assert_eq!(grid.shape(), (5, 5));
        let (lo, hi) = grid.mean_range().unwrap();
        assert!((0.0..=1.0).contains(&lo));
        assert!(hi <= 1.0);
    }

    #[test]
    fn cancelled_job_reports_it() {
        let token = CancelToken::new();
        token.cancel();
        let result = job().run(Some(token), None);
        assert_eq!(result, Err(SampleError::Cancelled { done: 0, total: 25 }));
    }

    #[test]
    fn worker_delivers_result() {
        let mut worker = PrecomputeWorker::spawn(job(), || {}).unwrap();
        let result = loop {
            if let Some(result) = worker.poll() {
                break result;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        };
        assert!(result.is_ok());
        assert_eq!(worker.progress(), 1.0);
    }
}
