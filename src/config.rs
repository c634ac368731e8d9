//! Configuration file handling for symbol-detect.
//!
//! Loads configuration from `<config_dir>/symbol-detect/config.toml` or a
//! custom path. Environment and CLI overrides are applied on top by the
//! binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::{BackendKind, CameraSettings, Resolution};
use crate::inference::{DEFAULT_BASE_URL, ENDPOINT_ENV};
use crate::presentation::{CharSet, OrderingPolicy, PresenterConfig, TerminalOptions, DEFAULT_PLAYER};
use crate::sampler::{SamplerConfig, DEFAULT_JPEG_QUALITY, MIN_INTERVAL};

/// Configuration file structure for symbol-detect.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub sampler: SamplerSection,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub backend: BackendKind,
    pub device: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let settings = CameraSettings::default();
        Self {
            backend: BackendKind::default(),
            device: settings.device_index,
            width: settings.resolution.width,
            height: settings.resolution.height,
            fps: settings.fps,
            mirror: settings.mirror,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplerSection {
    pub interval_ms: u64,
    pub jpeg_quality: u8,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub ordering: OrderingPolicy,
    pub apply_after_stop: bool,
    pub preview: bool,
    pub charset: CharSet,
    pub audio: bool,
    pub player: String,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            ordering: OrderingPolicy::default(),
            apply_after_stop: false,
            preview: false,
            charset: CharSet::default(),
            audio: true,
            player: DEFAULT_PLAYER.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// Without a path the default location is used and a missing file yields
    /// the defaults. An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::load_file(path)
            }
            None => {
                let path = default_path();
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Take the endpoint from `SYMBOL_DETECT_ENDPOINT` when it is set.
    pub fn apply_env(&mut self) {
        self.apply_endpoint_override(std::env::var(ENDPOINT_ENV).ok());
    }

    fn apply_endpoint_override(&mut self, endpoint: Option<String>) {
        if let Some(url) = endpoint.filter(|u| !u.trim().is_empty()) {
            self.inference.base_url = url.trim().to_string();
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            device_index: self.camera.device,
            resolution: Resolution {
                width: self.camera.width,
                height: self.camera.height,
            },
            fps: self.camera.fps,
            mirror: self.camera.mirror,
        }
    }

    /// Sampler settings, clamped to a 1 ms minimum and quality 1..=100.
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_millis(self.sampler.interval_ms).max(MIN_INTERVAL),
            jpeg_quality: self.sampler.jpeg_quality.clamp(1, 100),
        }
    }

    /// Whole-request timeout, at least one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.inference.timeout_secs.max(1))
    }

    /// Connect timeout, at least one second.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.inference.connect_timeout_secs.max(1))
    }

    pub fn presenter_config(&self) -> PresenterConfig {
        PresenterConfig {
            ordering: self.presentation.ordering,
            apply_after_stop: self.presentation.apply_after_stop,
        }
    }

    pub fn terminal_options(&self) -> TerminalOptions {
        TerminalOptions {
            preview: self.presentation.preview,
            charset: self.presentation.charset,
            ..Default::default()
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config file already exists: '{}'", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("symbol-detect").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/symbol-detect/config.toml")
        })
}

/// Commented default configuration written by `config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# symbol-detect configuration

[camera]
# Capture backend: synthetic, native (needs the native-camera feature)
backend = "synthetic"
# Camera device index (see list-cameras)
device = 0
width = 640
height = 480
fps = 30
# Mirror horizontally (selfie mode)
mirror = false

[sampler]
# Milliseconds between sampled frames
interval_ms = 500
# JPEG quality, 1-100
jpeg_quality = 80

[inference]
# Prediction server; frames are posted to <base_url>/api/predict/
# SYMBOL_DETECT_ENDPOINT overrides this
base_url = "http://127.0.0.1:8000"
timeout_secs = 30
connect_timeout_secs = 10

[presentation]
# last-resolved-wins or discard-stale
ordering = "last-resolved-wins"
# Show results that arrive after the camera was closed
apply_after_stop = false
# ASCII preview of each sampled frame
preview = false
# Preview characters: standard, blocks, minimal
charset = "standard"
# Play the spoken label
audio = true
player = "ffplay"
"#;

/// Write the default template to `path`, creating parent directories.
pub fn init_at(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }
    let io_err = |e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(io_err)
}
