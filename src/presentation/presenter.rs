//! Last-writer-wins register between dispatch results and the sink.
//!
//! Every dispatch is tagged with the camera epoch and a per-epoch sequence
//! number. The presenter decides whether a resolved result may overwrite the
//! displayed state, then forwards it to the sink.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::sink::PresentationSink;
use crate::inference::InferenceResult;
use crate::sampler::{DispatchTag, Snapshot};

/// How results that resolve out of send order are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingPolicy {
    /// Whatever resolves last is displayed, even if it was sent earlier.
    #[default]
    LastResolvedWins,
    /// Results older than the one already displayed are dropped.
    DiscardStale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresenterConfig {
    pub ordering: OrderingPolicy,
    /// Apply results that resolve after their camera epoch was closed.
    pub apply_after_stop: bool,
}

/// Fate of a result offered to the presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Applied,
    /// Older than the displayed result under `DiscardStale`.
    Stale,
    /// Its epoch was closed and late results are not applied.
    AfterStop,
}

#[derive(Debug, Default)]
struct Register {
    next_epoch: u64,
    open_epoch: Option<u64>,
    last_applied: Option<DispatchTag>,
    label: Option<String>,
}

pub struct Presenter {
    sink: Arc<dyn PresentationSink>,
    config: PresenterConfig,
    register: Mutex<Register>,
}

impl std::fmt::Debug for Presenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("config", &self.config)
            .field("register", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl Presenter {
    pub fn new(sink: Arc<dyn PresentationSink>, config: PresenterConfig) -> Self {
        Self {
            sink,
            config,
            register: Mutex::new(Register::default()),
        }
    }

    pub fn config(&self) -> &PresenterConfig {
        &self.config
    }

    // A panicking sink must not wedge the presenter.
    fn lock(&self) -> MutexGuard<'_, Register> {
        self.register.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a new camera epoch and return its id. Any previous epoch closes.
    pub fn open_epoch(&self) -> u64 {
        let mut register = self.lock();
        let epoch = register.next_epoch;
        register.next_epoch += 1;
        register.open_epoch = Some(epoch);
        epoch
    }

    /// Close the current epoch; its late results become `AfterStop`.
    pub fn close_epoch(&self) {
        self.lock().open_epoch = None;
    }

    pub fn open_epoch_id(&self) -> Option<u64> {
        self.lock().open_epoch
    }

    /// Tag of the result currently displayed.
    pub fn last_applied(&self) -> Option<DispatchTag> {
        self.lock().last_applied
    }

    /// Label currently displayed.
    pub fn current_label(&self) -> Option<String> {
        self.lock().label.clone()
    }

    /// Forward a snapshot taken in the open epoch.
    pub fn show_snapshot(&self, snapshot: &Snapshot) {
        let register = self.lock();
        if register.open_epoch == Some(snapshot.tag.epoch) {
            self.sink.show_snapshot(snapshot);
        }
    }

    /// Offer a resolved result.
    ///
    /// The sink is called while the register lock is held, so the sink sees
    /// applies in the same order the register records them.
    pub fn offer(&self, tag: DispatchTag, result: InferenceResult) -> OfferOutcome {
        let mut register = self.lock();

        if register.open_epoch != Some(tag.epoch) && !self.config.apply_after_stop {
            log::debug!("Discarding result {} that resolved after its camera stopped", tag);
            return OfferOutcome::AfterStop;
        }

        if self.config.ordering == OrderingPolicy::DiscardStale
            && register.last_applied.is_some_and(|last| tag < last)
        {
            log::debug!(
                "Discarding stale result {} (showing {:?})",
                tag,
                register.last_applied
            );
            return OfferOutcome::Stale;
        }

        register.last_applied = Some(tag);
        register.label = result.label.clone();
        self.sink.show_label(result.label.as_deref());
        if let Some(clip) = &result.audio {
            self.sink.play_audio(clip);
        }
        OfferOutcome::Applied
    }
}
