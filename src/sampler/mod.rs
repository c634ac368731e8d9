//! Frame sampling: turns live video into a bounded-rate stream of uploads.
//!
//! While running, a tokio task ticks on a fixed period. Each tick reads the
//! current frame from the session's [`VideoSurface`], encodes it as JPEG,
//! shows the snapshot and dispatches the upload on its own task. Ticks never
//! wait for earlier dispatches, so responses can resolve out of order.

mod encode;

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::camera::VideoSurface;
use crate::inference::Dispatch;
use crate::presentation::{OfferOutcome, Presenter};

pub use encode::{
    encode_frame, DispatchTag, EncodeError, EncodedFrame, Snapshot, DEFAULT_JPEG_QUALITY,
    JPEG_MIME,
};

/// Default sampling period.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

/// Shortest period accepted; smaller values are raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub jpeg_quality: u8,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// What happened to one dispatched frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The endpoint answered and the result was offered to the presenter.
    Offered(OfferOutcome),
    /// The request failed; presentation state was left untouched.
    Failed,
}

struct RunningSampler {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    epoch: u64,
}

/// Periodic frame sampler. At most one sampling task runs at a time.
pub struct FrameSampler {
    config: SamplerConfig,
    dispatcher: Arc<dyn Dispatch>,
    presenter: Arc<Presenter>,
    running: Option<RunningSampler>,
}

impl FrameSampler {
    pub fn new(config: SamplerConfig, dispatcher: Arc<dyn Dispatch>, presenter: Arc<Presenter>) -> Self {
        Self {
            config: SamplerConfig {
                interval: config.interval.max(MIN_INTERVAL),
                jpeg_quality: config.jpeg_quality.clamp(1, 100),
            },
            dispatcher,
            presenter,
            running: None,
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Epoch of the running sampling task.
    pub fn epoch(&self) -> Option<u64> {
        self.running.as_ref().map(|r| r.epoch)
    }

    /// Start ticking against `surface`, tagging dispatches with `epoch`.
    ///
    /// Returns false (and changes nothing) if already running. Must be called
    /// from within a tokio runtime.
    pub fn start(&mut self, surface: Arc<dyn VideoSurface>, epoch: u64) -> bool {
        if self.running.is_some() {
            log::debug!("Sampler already running (epoch {})", epoch);
            return false;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_sampling_loop(
            self.config,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.presenter),
            surface,
            epoch,
            cancel.clone(),
        ));
        log::debug!(
            "Sampling every {:?} (epoch {})",
            self.config.interval,
            epoch
        );
        self.running = Some(RunningSampler {
            cancel,
            task,
            epoch,
        });
        true
    }

    /// Cancel the sampling task and wait for it to finish.
    ///
    /// Once this returns no further tick runs and no further dispatch is
    /// issued. Dispatches already in flight are not cancelled.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            if !e.is_cancelled() {
                log::error!("Sampling task for epoch {} failed: {}", running.epoch, e);
            }
        }
    }

    /// Cancel and abort the sampling task without waiting for it.
    pub fn abort(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            running.task.abort();
        }
    }
}

impl Drop for FrameSampler {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn run_sampling_loop(
    config: SamplerConfig,
    dispatcher: Arc<dyn Dispatch>,
    presenter: Arc<Presenter>,
    surface: Arc<dyn VideoSurface>,
    epoch: u64,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut seq = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let tag = DispatchTag { epoch, seq };
        match sample_tick(surface.as_ref(), config.jpeg_quality, tag) {
            Ok(Some((snapshot, frame))) => {
                seq += 1;
                presenter.show_snapshot(&snapshot);
                let dispatcher = Arc::clone(&dispatcher);
                let presenter = Arc::clone(&presenter);
                tokio::spawn(async move {
                    dispatch_and_present(dispatcher.as_ref(), &presenter, frame).await;
                });
            }
            Ok(None) => log::trace!("Video surface not ready; skipping tick {}", tag),
            Err(e) => log::warn!("Dropping sampled frame {}: {}", tag, e),
        }
    }

    log::debug!("Sampling loop for epoch {} stopped", epoch);
}

/// Take one sample from `surface`.
///
/// `Ok(None)` when the surface has no picture yet (zero dimensions or no
/// frame); that is not an error.
pub fn sample_tick(
    surface: &dyn VideoSurface,
    jpeg_quality: u8,
    tag: DispatchTag,
) -> Result<Option<(Snapshot, EncodedFrame)>, EncodeError> {
    if surface.dimensions().is_empty() {
        return Ok(None);
    }
    let Some(frame) = surface.current_frame() else {
        return Ok(None);
    };
    if frame.resolution().is_empty() {
        return Ok(None);
    }
    encode_frame(frame, jpeg_quality, tag).map(Some)
}

/// Send one frame and hand the result to the presenter.
///
/// Failures are logged once and never reach the presenter.
pub async fn dispatch_and_present(
    dispatcher: &dyn Dispatch,
    presenter: &Presenter,
    frame: EncodedFrame,
) -> DispatchOutcome {
    let tag = frame.tag;
    match dispatcher.dispatch(frame).await {
        Ok(result) => DispatchOutcome::Offered(presenter.offer(tag, result)),
        Err(e) => {
            log::error!("Inference request {} failed: {}", tag, e);
            DispatchOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Frame, FrameFormat, Resolution};
    use crate::inference::{InferenceError, InferenceResult};
    use crate::presentation::{PresenterConfig, RecordingSink};
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StaticSurface {
        resolution: Resolution,
    }

    impl VideoSurface for StaticSurface {
        fn dimensions(&self) -> Resolution {
            self.resolution
        }

        fn current_frame(&self) -> Option<Frame> {
            if self.resolution.is_empty() {
                return None;
            }
            Some(Frame {
                data: vec![90; (self.resolution.width * self.resolution.height * 3) as usize],
                width: self.resolution.width,
                height: self.resolution.height,
                format: FrameFormat::Rgb,
                timestamp: std::time::Instant::now(),
            })
        }
    }

    /// Answers every request with the same label and counts calls.
    #[derive(Default)]
    struct CountingDispatcher {
        calls: AtomicUsize,
        tags: Mutex<Vec<DispatchTag>>,
        fail: bool,
    }

    impl Dispatch for CountingDispatcher {
        fn dispatch(
            &self,
            frame: EncodedFrame,
        ) -> BoxFuture<'static, Result<InferenceResult, InferenceError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tags.lock().unwrap().push(frame.tag);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    Err(InferenceError::Status {
                        status: 500,
                        body: "boom".to_string(),
                    })
                } else {
                    Ok(InferenceResult::labelled("stop_sign"))
                }
            })
        }
    }

    fn ready_surface() -> Arc<dyn VideoSurface> {
        Arc::new(StaticSurface {
            resolution: Resolution {
                width: 8,
                height: 8,
            },
        })
    }

    fn sampler_with(
        dispatcher: Arc<CountingDispatcher>,
    ) -> (FrameSampler, Arc<Presenter>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let presenter = Arc::new(Presenter::new(sink.clone(), PresenterConfig::default()));
        let sampler = FrameSampler::new(SamplerConfig::default(), dispatcher, Arc::clone(&presenter));
        (sampler, presenter, sink)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_dispatch_once_per_period() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let (mut sampler, presenter, sink) = sampler_with(Arc::clone(&dispatcher));
        let epoch = presenter.open_epoch();

        assert!(sampler.start(ready_surface(), epoch));
        time::sleep(Duration::from_millis(1600)).await;
        settle().await;

        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 3);
        assert_eq!(sink.snapshot_count(), 3);
        assert_eq!(sink.current_label(), Some("stop_sign".to_string()));
        let seqs: Vec<u64> = dispatcher.tags.lock().unwrap().iter().map(|t| t.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);

        sampler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_dispatch_after_stop() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let (mut sampler, presenter, _sink) = sampler_with(Arc::clone(&dispatcher));
        let epoch = presenter.open_epoch();

        sampler.start(ready_surface(), epoch);
        time::sleep(Duration::from_millis(1100)).await;
        settle().await;
        let before = dispatcher.calls.load(Ordering::SeqCst);
        assert_eq!(before, 2);

        sampler.stop().await;
        assert!(!sampler.is_running());
        time::sleep(Duration::from_secs(5)).await;
        settle().await;

        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_dimension_surface_never_dispatches() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let (mut sampler, presenter, sink) = sampler_with(Arc::clone(&dispatcher));
        let epoch = presenter.open_epoch();
        let surface = Arc::new(StaticSurface {
            resolution: Resolution::ZERO,
        });

        sampler.start(surface, epoch);
        time::sleep(Duration::from_secs(3)).await;
        settle().await;

        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(sink.snapshot_count(), 0);
        assert!(sampler.is_running());
        sampler.stop().await;
    }

    #[test]
    fn test_sample_tick_skips_unready_surface() {
        let surface = StaticSurface {
            resolution: Resolution::ZERO,
        };
        let tag = DispatchTag { epoch: 0, seq: 0 };
        assert!(sample_tick(&surface, 80, tag).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_rejected() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let (mut sampler, presenter, _sink) = sampler_with(Arc::clone(&dispatcher));
        let epoch = presenter.open_epoch();

        assert!(sampler.start(ready_surface(), epoch));
        assert!(!sampler.start(ready_surface(), epoch + 1));
        assert_eq!(sampler.epoch(), Some(epoch));

        time::sleep(Duration::from_millis(600)).await;
        settle().await;
        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 1);
        sampler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_sampling() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let (mut sampler, presenter, _sink) = sampler_with(Arc::clone(&dispatcher));
        let epoch = presenter.open_epoch();

        sampler.start(ready_surface(), epoch);
        drop(sampler);
        time::sleep(Duration::from_secs(2)).await;
        settle().await;

        assert_eq!(dispatcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_dispatch_leaves_presentation_untouched() {
        let dispatcher = Arc::new(CountingDispatcher {
            fail: true,
            ..Default::default()
        });
        let sink = Arc::new(RecordingSink::new());
        let presenter = Presenter::new(sink.clone(), PresenterConfig::default());
        let epoch = presenter.open_epoch();

        let (_, frame) = sample_tick(ready_surface().as_ref(), 80, DispatchTag { epoch, seq: 0 })
            .unwrap()
            .unwrap();
        let outcome = dispatch_and_present(dispatcher.as_ref(), &presenter, frame).await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_config_is_clamped() {
        let dispatcher = Arc::new(CountingDispatcher::default());
        let sink = Arc::new(RecordingSink::new());
        let presenter = Arc::new(Presenter::new(sink, PresenterConfig::default()));
        let sampler = FrameSampler::new(
            SamplerConfig {
                interval: Duration::ZERO,
                jpeg_quality: 0,
            },
            dispatcher,
            presenter,
        );
        assert_eq!(sampler.config().interval, MIN_INTERVAL);
        assert_eq!(sampler.config().jpeg_quality, 1);
    }
}
