//! Detection pipeline: camera session, frame sampler and presenter wired
//! together behind the two user actions, Open Camera and Close Camera.

use std::sync::Arc;

use crate::camera::{CameraError, CameraSession, CameraSettings, CaptureBackend};
use crate::inference::Dispatch;
use crate::presentation::Presenter;
use crate::sampler::{FrameSampler, SamplerConfig};

/// Snapshot of the pipeline for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    pub camera_active: bool,
    pub sampling: bool,
    pub active_tracks: usize,
    pub epoch: Option<u64>,
    pub label: Option<String>,
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.camera_active { "on" } else { "off" };
        write!(
            f,
            "camera: {} | sampling: {} | tracks: {} | label: {}",
            state,
            if self.sampling { "yes" } else { "no" },
            self.active_tracks,
            self.label.as_deref().unwrap_or("-")
        )
    }
}

pub struct DetectionPipeline {
    sampler: FrameSampler,
    session: CameraSession,
    presenter: Arc<Presenter>,
}

impl DetectionPipeline {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        camera: CameraSettings,
        sampler: SamplerConfig,
        dispatcher: Arc<dyn Dispatch>,
        presenter: Arc<Presenter>,
    ) -> Self {
        Self {
            sampler: FrameSampler::new(sampler, dispatcher, Arc::clone(&presenter)),
            session: CameraSession::new(backend, camera),
            presenter,
        }
    }

    pub fn presenter(&self) -> &Arc<Presenter> {
        &self.presenter
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active() && self.sampler.is_running()
    }

    /// Open Camera: acquire the device, open a new epoch and start sampling.
    ///
    /// A no-op when already active. On failure the error is logged and
    /// returned and the pipeline stays inactive.
    pub async fn start(&mut self) -> Result<(), CameraError> {
        if self.is_active() {
            log::debug!("Pipeline already active; ignoring start");
            return Ok(());
        }

        if let Err(e) = self.session.start().await {
            log::error!("Could not open camera: {}", e);
            return Err(e);
        }

        let Some(surface) = self.session.surface() else {
            self.session.stop();
            let err = CameraError::StreamFailed("capture resource has no video surface".to_string());
            log::error!("Could not open camera: {}", err);
            return Err(err);
        };

        let epoch = self.presenter.open_epoch();
        self.sampler.start(surface, epoch);
        Ok(())
    }

    /// Close Camera: stop sampling, release every track and close the epoch.
    ///
    /// Sampling is fully stopped before the camera is released. Requests
    /// already in flight may still resolve; the presenter decides what
    /// happens to them.
    pub async fn stop(&mut self) {
        self.sampler.stop().await;
        self.session.stop();
        self.presenter.close_epoch();
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            camera_active: self.session.is_active(),
            sampling: self.sampler.is_running(),
            active_tracks: self.session.active_track_count(),
            epoch: self.sampler.epoch(),
            label: self.presenter.current_label(),
        }
    }
}

impl Drop for DetectionPipeline {
    fn drop(&mut self) {
        // Same order as `stop`: sampling ends before the camera is released.
        self.sampler.abort();
        self.session.stop();
        self.presenter.close_epoch();
    }
}
