//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::camera::BackendKind;
use crate::config::Config;
use crate::presentation::OrderingPolicy;

/// Samples a live camera feed and announces the symbols a remote detector
/// finds in it
#[derive(Parser, Debug)]
#[command(name = "symbol-detect")]
#[command(version, about = "Camera symbol detection client", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Prediction server base URL (overrides SYMBOL_DETECT_ENDPOINT)
    #[arg(long, short)]
    pub endpoint: Option<String>,

    /// Milliseconds between sampled frames
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Capture backend
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Camera device index (from list-cameras)
    #[arg(long)]
    pub camera: Option<u32>,

    /// Print an ASCII preview of every sampled frame
    #[arg(long)]
    pub preview: bool,

    /// Do not play spoken labels
    #[arg(long)]
    pub no_audio: bool,

    /// Drop results older than the one on screen
    #[arg(long)]
    pub discard_stale: bool,

    /// Open the camera immediately
    #[arg(long)]
    pub autostart: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the interactive detector (default)
    Run,
    /// List available cameras
    ListCameras,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

impl Args {
    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(endpoint) = &self.endpoint {
            config.inference.base_url = endpoint.clone();
        }
        if let Some(interval) = self.interval_ms {
            config.sampler.interval_ms = interval;
        }
        if let Some(backend) = self.backend {
            config.camera.backend = backend;
        }
        if let Some(camera) = self.camera {
            config.camera.device = camera;
        }
        if self.preview {
            config.presentation.preview = true;
        }
        if self.no_audio {
            config.presentation.audio = false;
        }
        if self.discard_stale {
            config.presentation.ordering = OrderingPolicy::DiscardStale;
        }
    }

    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}
