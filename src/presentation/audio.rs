//! Spoken-label audio clips and their playback.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;

/// Default external player. Reads WAV from stdin and exits when done.
pub const DEFAULT_PLAYER: &str = "ffplay";

const FFPLAY_ARGS: &[&str] = &["-nodisp", "-autoexit", "-loglevel", "quiet", "-i", "-"];

/// Decoded audio payload (WAV) delivered with a prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    bytes: Bytes,
}

impl AudioClip {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Decode standard-alphabet base64, as sent by the prediction endpoint.
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        STANDARD.decode(encoded.trim()).map(Self::new)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the payload starts with a RIFF/WAVE header.
    pub fn is_wav(&self) -> bool {
        self.bytes.len() >= 12 && &self.bytes[0..4] == b"RIFF" && &self.bytes[8..12] == b"WAVE"
    }
}

/// Something that can play a clip. Playback must not block the caller and
/// must not surface failures; it logs them.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, clip: &AudioClip);
}

/// Pipes WAV bytes into an external player process on a background thread.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl Default for CommandPlayer {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER)
    }
}

impl CommandPlayer {
    /// Player `program`; ffplay gets its quiet stdin arguments automatically.
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let args = if program.ends_with("ffplay") {
            FFPLAY_ARGS.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };
        Self { program, args }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn run(&self, clip: &AudioClip) -> std::io::Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // stdin is closed at the end of the match so the player sees EOF.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(clip.as_bytes()),
            None => Ok(()),
        };

        // Reap the child even when the write failed.
        let status = child.wait()?;
        written?;
        if !status.success() {
            return Err(std::io::Error::other(format!(
                "{} exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}

impl AudioPlayer for CommandPlayer {
    fn play(&self, clip: &AudioClip) {
        if !clip.is_wav() {
            log::warn!("Skipping playback: audio payload is not WAV ({} bytes)", clip.len());
            return;
        }

        let player = self.clone();
        let clip = clip.clone();
        let spawned = thread::Builder::new()
            .name("audio-playback".to_string())
            .spawn(move || {
                if let Err(e) = player.run(&clip) {
                    log::warn!("Audio playback via '{}' failed: {}", player.program, e);
                }
            });
        if let Err(e) = spawned {
            log::warn!("Could not start audio playback thread: {}", e);
        }
    }
}

/// Player that discards every clip (`--no-audio`).
#[derive(Debug, Default, Clone, Copy)]
pub struct MutePlayer;

impl AudioPlayer for MutePlayer {
    fn play(&self, clip: &AudioClip) {
        log::debug!("Audio muted; dropping {} byte clip", clip.len());
    }
}
