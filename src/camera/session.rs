//! Camera session: owns at most one capture resource at a time.

use std::sync::Arc;

use super::backend::{CaptureBackend, CaptureResource, VideoSurface};
use super::types::{CameraError, CameraSettings, TrackInfo};

/// Owns the capture resource for one consumer.
///
/// `start` acquires a resource through the backend, `stop` releases every
/// track. Dropping the session stops it, so no device stays open once the
/// owner is gone.
pub struct CameraSession {
    backend: Arc<dyn CaptureBackend>,
    settings: CameraSettings,
    resource: Option<Box<dyn CaptureResource>>,
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("backend", &self.backend.name())
            .field("settings", &self.settings)
            .field("is_active", &self.is_active())
            .finish()
    }
}

impl CameraSession {
    pub fn new(backend: Arc<dyn CaptureBackend>, settings: CameraSettings) -> Self {
        Self {
            backend,
            settings,
            resource: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.resource.is_some()
    }

    /// Acquire a video-only capture resource.
    ///
    /// Does nothing when the session is already active. On failure the
    /// session stays inactive and the error is returned; there is no retry.
    pub async fn start(&mut self) -> Result<(), CameraError> {
        if self.is_active() {
            log::debug!("Camera session already active; ignoring start");
            return Ok(());
        }

        let backend = Arc::clone(&self.backend);
        let settings = self.settings.clone();
        let resource = tokio::task::spawn_blocking(move || backend.acquire(&settings))
            .await
            .map_err(|e| CameraError::OpenFailed(format!("capture task failed: {}", e)))??;

        log::info!(
            "Camera started ({} backend, device {}, {} track(s))",
            self.backend.name(),
            self.settings.device_index,
            resource.active_track_count()
        );
        self.resource = Some(resource);
        Ok(())
    }

    /// Stop every track and drop the resource. No-op when inactive.
    pub fn stop(&mut self) {
        if let Some(mut resource) = self.resource.take() {
            resource.stop_all_tracks();
            log::info!("Camera stopped");
        }
    }

    /// Video surface of the active resource.
    pub fn surface(&self) -> Option<Arc<dyn VideoSurface>> {
        self.resource.as_ref().map(|r| r.surface())
    }

    pub fn tracks(&self) -> Vec<TrackInfo> {
        self.resource
            .as_ref()
            .map(|r| r.tracks())
            .unwrap_or_default()
    }

    pub fn active_track_count(&self) -> usize {
        self.resource
            .as_ref()
            .map_or(0, |r| r.active_track_count())
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}
