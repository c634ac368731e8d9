//! Seams between a camera session and the platform's capture facility.

use std::sync::Arc;

use super::types::{CameraError, CameraInfo, CameraSettings, Frame, Resolution, TrackInfo};

/// The platform's media-capture facility.
///
/// `acquire` may block while the platform asks for permission or opens the
/// device; sessions call it from a blocking task.
pub trait CaptureBackend: Send + Sync + 'static {
    /// Short name used in logs and `list-cameras` output.
    fn name(&self) -> &'static str;

    /// Enumerate the devices this backend can open.
    fn list_devices(&self) -> Result<Vec<CameraInfo>, CameraError>;

    /// Request a video-only capture resource.
    fn acquire(&self, settings: &CameraSettings) -> Result<Box<dyn CaptureResource>, CameraError>;
}

/// An open video input device and its tracks.
pub trait CaptureResource: Send {
    fn tracks(&self) -> Vec<TrackInfo>;

    fn active_track_count(&self) -> usize {
        self.tracks().iter().filter(|t| t.live).count()
    }

    /// Stop every track. Must be idempotent.
    fn stop_all_tracks(&mut self);

    /// The live video output of this resource.
    fn surface(&self) -> Arc<dyn VideoSurface>;
}

/// Live video output that frames can be read from.
pub trait VideoSurface: Send + Sync {
    /// Current native dimensions; [`Resolution::ZERO`] until a frame exists.
    fn dimensions(&self) -> Resolution;

    /// Copy of the most recent frame, if any.
    fn current_frame(&self) -> Option<Frame>;
}
