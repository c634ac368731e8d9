//! Physical webcams through nokhwa.
//!
//! The nokhwa `Camera` is opened inside a background capture thread (it is not
//! `Send` on every platform). The thread keeps the latest decoded RGB frame in
//! a shared buffer that the video surface reads from.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nokhwa::pixel_format::RgbFormat;
use nokhwa::query;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;

use super::backend::{CaptureBackend, CaptureResource, VideoSurface};
use super::types::{
    CameraError, CameraInfo, CameraSettings, Frame, FrameFormat, Resolution, TrackInfo, TrackKind,
};

/// Keywords in platform errors that mean the user refused camera access.
const PERMISSION_KEYWORDS: &[&str] = &["permission", "denied", "authorization", "not authorized"];

type LatestFrame = Arc<Mutex<Option<Frame>>>;

/// List all available camera devices on the system.
///
/// An empty list is not an error.
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    let devices = query(ApiBackend::Auto).map_err(|e| CameraError::QueryFailed(e.to_string()))?;

    Ok(devices
        .into_iter()
        .map(|d| CameraInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

/// Backend for the system's webcams.
#[derive(Debug, Default, Clone)]
pub struct NokhwaBackend;

impl CaptureBackend for NokhwaBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn list_devices(&self) -> Result<Vec<CameraInfo>, CameraError> {
        list_devices()
    }

    fn acquire(&self, settings: &CameraSettings) -> Result<Box<dyn CaptureResource>, CameraError> {
        let devices = list_devices()?;
        if devices.is_empty() {
            return Err(CameraError::NoDevices);
        }
        if !devices.iter().any(|d| d.index == settings.device_index) {
            return Err(CameraError::DeviceNotFound(settings.device_index));
        }

        let buffer: LatestFrame = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (info_tx, info_rx) = mpsc::channel::<Result<(Resolution, u32), CameraError>>();

        let thread = {
            let buffer = Arc::clone(&buffer);
            let stop = Arc::clone(&stop);
            let settings = settings.clone();
            thread::Builder::new()
                .name("camera-capture".to_string())
                .spawn(move || run_capture_loop(settings, buffer, stop, info_tx))
                .map_err(|e| CameraError::OpenFailed(e.to_string()))?
        };

        let mut capture = NativeCapture {
            surface: Arc::new(NativeSurface { buffer }),
            stop,
            thread: Some(thread),
            device_index: settings.device_index,
        };

        match info_rx.recv() {
            Ok(Ok((res, fps))) => {
                log::info!("Webcam {} streaming at {} @ {} fps", settings.device_index, res, fps);
                Ok(Box::new(capture))
            }
            Ok(Err(e)) => {
                capture.stop_all_tracks();
                Err(e)
            }
            Err(_) => {
                capture.stop_all_tracks();
                Err(CameraError::StreamFailed(
                    "Capture thread terminated unexpectedly".to_string(),
                ))
            }
        }
    }
}

/// An open webcam: one video track backed by the capture thread.
struct NativeCapture {
    surface: Arc<NativeSurface>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    device_index: u32,
}

impl CaptureResource for NativeCapture {
    fn tracks(&self) -> Vec<TrackInfo> {
        vec![TrackInfo {
            id: format!("webcam-{}", self.device_index),
            kind: TrackKind::Video,
            live: self.thread.as_ref().is_some_and(|h| !h.is_finished()),
        }]
    }

    fn stop_all_tracks(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        if let Ok(mut frame) = self.surface.buffer.lock() {
            *frame = None;
        }
    }

    fn surface(&self) -> Arc<dyn VideoSurface> {
        self.surface.clone()
    }
}

impl Drop for NativeCapture {
    fn drop(&mut self) {
        self.stop_all_tracks();
    }
}

struct NativeSurface {
    buffer: LatestFrame,
}

impl VideoSurface for NativeSurface {
    fn dimensions(&self) -> Resolution {
        self.buffer
            .lock()
            .ok()
            .and_then(|b| b.as_ref().map(Frame::resolution))
            .unwrap_or(Resolution::ZERO)
    }

    fn current_frame(&self) -> Option<Frame> {
        self.buffer.lock().ok()?.clone()
    }
}

fn run_capture_loop(
    settings: CameraSettings,
    buffer: LatestFrame,
    stop: Arc<AtomicBool>,
    info_tx: Sender<Result<(Resolution, u32), CameraError>>,
) {
    let index = CameraIndex::Index(settings.device_index);

    let mut camera = match open_camera_with_fallback(&index, &settings) {
        Ok(cam) => cam,
        Err(e) => {
            let _ = info_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        let _ = info_tx.send(Err(classify_open_error(&e.to_string(), CameraError::StreamFailed)));
        return;
    }

    let res = camera.resolution();
    let actual = Resolution {
        width: res.width(),
        height: res.height(),
    };
    let _ = info_tx.send(Ok((actual, camera.frame_rate())));

    while !stop.load(Ordering::Relaxed) {
        if let Ok(raw_frame) = camera.frame() {
            // Undecodable frames are skipped; the next one usually succeeds.
            if let Some(mut frame) = convert_to_rgb(&raw_frame) {
                if settings.mirror {
                    mirror_horizontal(&mut frame);
                }
                if let Ok(mut latest) = buffer.lock() {
                    *latest = Some(frame);
                }
            }
        }
        thread::sleep(Duration::from_millis(1));
    }

    let _ = camera.stop_stream();
}

/// Try NV12, then MJPEG, then whatever the camera offers at its highest resolution.
fn open_camera_with_fallback(
    index: &CameraIndex,
    settings: &CameraSettings,
) -> Result<Camera, CameraError> {
    let requested_resolution =
        nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
    let format_attempts = [
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            requested_resolution,
            NokhwaFrameFormat::NV12,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            requested_resolution,
            NokhwaFrameFormat::MJPEG,
            settings.fps,
        ))),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = String::from("no capture format accepted");
    for requested in format_attempts {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(classify_open_error(&last_error, CameraError::OpenFailed))
}

/// Map a platform error message to `PermissionDenied` when it says so.
fn classify_open_error(message: &str, otherwise: fn(String) -> CameraError) -> CameraError {
    let lower = message.to_lowercase();
    if PERMISSION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        CameraError::PermissionDenied
    } else {
        otherwise(message.to_string())
    }
}

/// Decode a nokhwa buffer (MJPEG, YUYV, NV12, ...) into an RGB frame.
fn convert_to_rgb(buffer: &nokhwa::Buffer) -> Option<Frame> {
    let decoded = buffer.decode_image::<RgbFormat>().ok()?;
    let resolution = buffer.resolution();

    Some(Frame {
        data: decoded.into_raw(),
        width: resolution.width(),
        height: resolution.height(),
        format: FrameFormat::Rgb,
        timestamp: Instant::now(),
    })
}

/// Flip a frame left-right in place.
fn mirror_horizontal(frame: &mut Frame) {
    let width = frame.width as usize;
    let bpp = frame.bytes_per_pixel();
    if width == 0 {
        return;
    }

    for row in frame.data.chunks_exact_mut(width * bpp) {
        for x in 0..width / 2 {
            let left = x * bpp;
            let right = (width - 1 - x) * bpp;
            for i in 0..bpp {
                row.swap(left + i, right + i);
            }
        }
    }
}
