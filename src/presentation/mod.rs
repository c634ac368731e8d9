//! Presentation of detection results.
//!
//! The [`Presenter`] decides which resolved result is displayed; a
//! [`PresentationSink`] displays it. Audio goes through an [`AudioPlayer`].

mod audio;
mod presenter;
mod preview;
mod sink;

pub use audio::{AudioClip, AudioPlayer, CommandPlayer, MutePlayer, DEFAULT_PLAYER};
pub use presenter::{OfferOutcome, OrderingPolicy, Presenter, PresenterConfig};
pub use preview::{render_preview, CharSet, BLOCKS_CHARSET, MINIMAL_CHARSET, STANDARD_CHARSET};
pub use sink::{PresentationEvent, PresentationSink, RecordingSink, TerminalOptions, TerminalSink};
