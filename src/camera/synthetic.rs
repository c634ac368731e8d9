//! Test-pattern camera that runs without hardware.
//!
//! Frames are a diagonal RGB gradient that drifts a few pixels per read, so
//! consecutive JPEGs differ. The surface reports no dimensions for the first
//! `warmup_polls` reads, like a real device that has not delivered a frame.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::backend::{CaptureBackend, CaptureResource, VideoSurface};
use super::types::{
    CameraError, CameraInfo, CameraSettings, Frame, FrameFormat, Resolution, TrackInfo, TrackKind,
};

/// Reads that report no picture before the pattern starts.
pub const DEFAULT_WARMUP_POLLS: u32 = 1;

/// Backend producing [`SyntheticCapture`] resources.
#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    warmup_polls: u32,
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self {
            warmup_polls: DEFAULT_WARMUP_POLLS,
        }
    }
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `dimensions()` reads that report [`Resolution::ZERO`].
    pub fn with_warmup(warmup_polls: u32) -> Self {
        Self { warmup_polls }
    }
}

impl CaptureBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn list_devices(&self) -> Result<Vec<CameraInfo>, CameraError> {
        Ok(vec![CameraInfo {
            index: 0,
            name: "Synthetic test pattern".to_string(),
            description: "built-in".to_string(),
        }])
    }

    fn acquire(&self, settings: &CameraSettings) -> Result<Box<dyn CaptureResource>, CameraError> {
        if settings.device_index != 0 {
            return Err(CameraError::DeviceNotFound(settings.device_index));
        }
        if settings.resolution.is_empty() {
            return Err(CameraError::OpenFailed(format!(
                "invalid resolution {}",
                settings.resolution
            )));
        }

        let surface = Arc::new(SyntheticSurface {
            resolution: settings.resolution,
            warmup_remaining: AtomicU32::new(self.warmup_polls),
            phase: AtomicU64::new(0),
            live: AtomicBool::new(true),
        });
        log::debug!("Synthetic camera opened at {}", settings.resolution);
        Ok(Box::new(SyntheticCapture { surface }))
    }
}

/// A single-track synthetic capture resource.
pub struct SyntheticCapture {
    surface: Arc<SyntheticSurface>,
}

impl CaptureResource for SyntheticCapture {
    fn tracks(&self) -> Vec<TrackInfo> {
        vec![TrackInfo {
            id: "synthetic-video".to_string(),
            kind: TrackKind::Video,
            live: self.surface.live.load(Ordering::SeqCst),
        }]
    }

    fn stop_all_tracks(&mut self) {
        self.surface.live.store(false, Ordering::SeqCst);
    }

    fn surface(&self) -> Arc<dyn VideoSurface> {
        self.surface.clone()
    }
}

impl Drop for SyntheticCapture {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}

struct SyntheticSurface {
    resolution: Resolution,
    warmup_remaining: AtomicU32,
    phase: AtomicU64,
    live: AtomicBool,
}

impl VideoSurface for SyntheticSurface {
    fn dimensions(&self) -> Resolution {
        if !self.live.load(Ordering::SeqCst) {
            return Resolution::ZERO;
        }
        let warming_up = self
            .warmup_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if warming_up {
            Resolution::ZERO
        } else {
            self.resolution
        }
    }

    fn current_frame(&self) -> Option<Frame> {
        if !self.live.load(Ordering::SeqCst) || self.warmup_remaining.load(Ordering::SeqCst) > 0 {
            return None;
        }
        let phase = self.phase.fetch_add(1, Ordering::Relaxed);
        Some(gradient_frame(self.resolution, phase))
    }
}

fn gradient_frame(resolution: Resolution, phase: u64) -> Frame {
    let width = resolution.width as usize;
    let height = resolution.height as usize;
    let shift = (phase * 4) as usize;
    let mut data = Vec::with_capacity(width * height * 3);

    for y in 0..height {
        for x in 0..width {
            let r = ((x + shift) * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = (((x + y + shift) / 2) % 256) as u8;
            data.extend_from_slice(&[r, g, b]);
        }
    }

    Frame {
        data,
        width: resolution.width,
        height: resolution.height,
        format: FrameFormat::Rgb,
        timestamp: Instant::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> CameraSettings {
        CameraSettings {
            resolution: Resolution {
                width: 8,
                height: 4,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_surface_not_ready_during_warmup() {
        let backend = SyntheticBackend::with_warmup(2);
        let resource = backend.acquire(&small_settings()).unwrap();
        let surface = resource.surface();

        assert_eq!(surface.dimensions(), Resolution::ZERO);
        assert!(surface.current_frame().is_none());
        assert_eq!(surface.dimensions(), Resolution::ZERO);
        assert_eq!(surface.dimensions(), Resolution { width: 8, height: 4 });

        let frame = surface.current_frame().unwrap();
        assert_eq!(frame.data.len(), frame.expected_len());
    }

    #[test]
    fn test_consecutive_frames_differ() {
        let backend = SyntheticBackend::with_warmup(0);
        let resource = backend.acquire(&small_settings()).unwrap();
        let surface = resource.surface();

        let a = surface.current_frame().unwrap();
        let b = surface.current_frame().unwrap();
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_stop_all_tracks_blanks_surface() {
        let backend = SyntheticBackend::with_warmup(0);
        let mut resource = backend.acquire(&small_settings()).unwrap();
        let surface = resource.surface();
        assert_eq!(resource.active_track_count(), 1);

        resource.stop_all_tracks();
        resource.stop_all_tracks();

        assert_eq!(resource.active_track_count(), 0);
        assert_eq!(surface.dimensions(), Resolution::ZERO);
        assert!(surface.current_frame().is_none());
    }

    #[test]
    fn test_unknown_device_index_is_not_found() {
        let backend = SyntheticBackend::new();
        let settings = CameraSettings {
            device_index: 3,
            ..Default::default()
        };
        let result = backend.acquire(&settings);
        assert!(matches!(result, Err(CameraError::DeviceNotFound(3))));
    }

    #[test]
    fn test_list_devices_reports_single_pattern() {
        let devices = SyntheticBackend::new().list_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].index, 0);
    }
}
