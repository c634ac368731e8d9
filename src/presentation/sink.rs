//! Presentation sinks: where snapshots, labels and audio end up.

use std::io::Write;
use std::sync::{Arc, Mutex};

use super::audio::{AudioClip, AudioPlayer};
use super::preview::{render_preview, CharSet};
use crate::sampler::Snapshot;

/// Receives the latest snapshot, label and audio.
///
/// Calls arrive from tokio tasks and must return quickly.
pub trait PresentationSink: Send + Sync {
    fn show_snapshot(&self, snapshot: &Snapshot);

    /// `None` clears the label.
    fn show_label(&self, label: Option<&str>);

    fn play_audio(&self, clip: &AudioClip);
}

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    Snapshot { seq: u64, width: u32, height: u32 },
    Label(Option<String>),
    Audio(Vec<u8>),
}

/// Sink that records every call, for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PresentationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Label currently displayed (the last `Label` event).
    pub fn current_label(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            PresentationEvent::Label(label) => Some(label),
            _ => None,
        })?
    }

    /// Every audio payload played, in order.
    pub fn played(&self) -> Vec<Vec<u8>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresentationEvent::Audio(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn snapshot_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PresentationEvent::Snapshot { .. }))
            .count()
    }

    fn push(&self, event: PresentationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl PresentationSink for RecordingSink {
    fn show_snapshot(&self, snapshot: &Snapshot) {
        self.push(PresentationEvent::Snapshot {
            seq: snapshot.tag.seq,
            width: snapshot.width,
            height: snapshot.height,
        });
    }

    fn show_label(&self, label: Option<&str>) {
        self.push(PresentationEvent::Label(label.map(str::to_string)));
    }

    fn play_audio(&self, clip: &AudioClip) {
        self.push(PresentationEvent::Audio(clip.as_bytes().to_vec()));
    }
}

/// Options for [`TerminalSink`].
#[derive(Debug, Clone, Copy)]
pub struct TerminalOptions {
    /// Draw an ASCII preview of each snapshot
    pub preview: bool,
    pub charset: CharSet,
    /// Preview width in characters
    pub preview_width: u16,
}

impl Default for TerminalOptions {
    fn default() -> Self {
        Self {
            preview: false,
            charset: CharSet::Standard,
            preview_width: 64,
        }
    }
}

/// Writes labels (and optionally snapshot previews) to stdout and hands
/// audio to a player.
pub struct TerminalSink {
    options: TerminalOptions,
    player: Arc<dyn AudioPlayer>,
    last_label: Mutex<Option<String>>,
}

impl TerminalSink {
    pub fn new(options: TerminalOptions, player: Arc<dyn AudioPlayer>) -> Self {
        Self {
            options,
            player,
            last_label: Mutex::new(None),
        }
    }

    fn write_lines(&self, lines: &[String]) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for line in lines {
            if writeln!(out, "{}", line).is_err() {
                return;
            }
        }
        let _ = out.flush();
    }
}

impl PresentationSink for TerminalSink {
    fn show_snapshot(&self, snapshot: &Snapshot) {
        if !self.options.preview {
            return;
        }
        match render_preview(snapshot, self.options.preview_width, self.options.charset) {
            Ok(mut lines) => {
                let label = self.last_label.lock().ok().and_then(|l| l.clone());
                lines.push(format!(
                    "[{} {}x{}] {}",
                    snapshot.tag,
                    snapshot.width,
                    snapshot.height,
                    label.unwrap_or_default()
                ));
                self.write_lines(&lines);
            }
            Err(e) => log::warn!("Could not render snapshot {}: {}", snapshot.tag, e),
        }
    }

    fn show_label(&self, label: Option<&str>) {
        if let Ok(mut last) = self.last_label.lock() {
            if last.as_deref() == label {
                return;
            }
            *last = label.map(str::to_string);
        }
        match label {
            Some(label) => self.write_lines(&[format!("Detected: {}", label)]),
            None => self.write_lines(&["Detected: -".to_string()]),
        }
    }

    fn play_audio(&self, clip: &AudioClip) {
        self.player.play(clip);
    }
}
