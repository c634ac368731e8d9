//! Camera access: capture backends and the session that owns a device.
//!
//! - [`CameraSession`] acquires and releases one capture resource
//! - [`CaptureBackend`] / [`CaptureResource`] / [`VideoSurface`] are the seams
//!   to the platform
//! - [`SyntheticBackend`] is a hardware-free test pattern; `NokhwaBackend`
//!   (feature `native-camera`) opens real webcams

mod backend;
#[cfg(feature = "native-camera")]
mod native;
mod session;
mod synthetic;
mod types;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use backend::{CaptureBackend, CaptureResource, VideoSurface};
#[cfg(feature = "native-camera")]
pub use native::{list_devices, NokhwaBackend};
pub use session::CameraSession;
pub use synthetic::{SyntheticBackend, DEFAULT_WARMUP_POLLS};
pub use types::{
    CameraError, CameraInfo, CameraSettings, Frame, FrameFormat, Resolution, TrackInfo, TrackKind,
};

/// Which capture backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Synthetic,
    Native,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Synthetic => "synthetic",
            BackendKind::Native => "native",
        }
    }
}

/// Build the backend for `kind`.
///
/// # Errors
/// `CameraError::BackendUnavailable` for `Native` when the crate was built
/// without the `native-camera` feature.
pub fn backend_for(kind: BackendKind) -> Result<Arc<dyn CaptureBackend>, CameraError> {
    match kind {
        BackendKind::Synthetic => Ok(Arc::new(SyntheticBackend::new())),
        #[cfg(feature = "native-camera")]
        BackendKind::Native => Ok(Arc::new(NokhwaBackend)),
        #[cfg(not(feature = "native-camera"))]
        BackendKind::Native => Err(CameraError::BackendUnavailable(kind.name().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_for_synthetic() {
        let backend = backend_for(BackendKind::Synthetic).unwrap();
        assert_eq!(backend.name(), "synthetic");
    }

    #[cfg(not(feature = "native-camera"))]
    #[test]
    fn test_backend_for_native_without_feature() {
        let result = backend_for(BackendKind::Native);
        assert!(matches!(
            result,
            Err(CameraError::BackendUnavailable(name)) if name == "native"
        ));
    }

    #[test]
    fn test_backend_kind_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            backend: BackendKind,
        }
        let parsed: Wrapper = toml::from_str("backend = \"native\"").unwrap();
        assert_eq!(parsed.backend, BackendKind::Native);
    }
}
