//! Clock-driven player used by the demo binary and in tests.
//!
//! The playback position advances with wall-clock time while playing and
//! stops at the end of the media with a `Paused` time-control notification.
//! Frames are synthetic gradients so thumbnail strips can be inspected.

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::source::MediaSource;
use super::traits::{EventSink, MediaPlayer};
use super::types::{
    Asset, Bitmap, ItemStatus, ObservationKind, ObservedEvent, ObserverToken, PlayerEvent,
    SeekTolerance,
    TimeControlStatus,
};
use crate::utils::{LoadError, PlayerError, ThumbnailError};

/// Description of the media the simulated decoder pretends to find on disk
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedMedia {
    pub duration_secs: f64,
    pub is_playable: bool,
    pub has_protected_content: bool,
}

impl SimulatedMedia {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            is_playable: true,
            has_protected_content: false,
        }
    }
}

struct Observer {
    kind: ObservationKind,
    sink: EventSink,
}

struct ClockState {
    asset: Option<Asset>,
    item_status: Option<ItemStatus>,
    time_control: TimeControlStatus,
    /// Position at `anchor`, or the current position while paused
    position: f64,
    anchor: Option<Instant>,
    /// Bumped on every play/pause/seek so stale end-of-media timers do nothing
    epoch: u64,
    observers: HashMap<ObserverToken, Observer>,
    tickers: HashMap<ObserverToken, CancellationToken>,
}

impl ClockState {
    fn duration(&self) -> f64 {
        self.asset.as_ref().map_or(0.0, |a| a.duration_secs)
    }

    fn current_time(&self) -> f64 {
        let elapsed = self
            .anchor
            .map_or(0.0, |anchor| anchor.elapsed().as_secs_f64());
        (self.position + elapsed).min(self.duration())
    }

    fn freeze(&mut self) {
        self.position = self.current_time();
        self.anchor = None;
    }

    fn notify(&mut self, event: PlayerEvent) {
        let kind = event.kind();
        self.observers.retain(|token, observer| {
            if observer.kind != kind {
                return true;
            }
            let delivered = observer.sink.send(ObservedEvent::new(*token, event)).is_ok();
            if !delivered {
                trace!("Dropping closed observer {}", token);
            }
            delivered
        });
    }

    fn set_time_control(&mut self, status: TimeControlStatus) {
        if self.time_control != status {
            self.time_control = status;
            self.notify(PlayerEvent::TimeControlChanged(status));
        }
    }
}

pub struct SimulatedPlayer {
    media: SimulatedMedia,
    state: Arc<Mutex<ClockState>>,
    seek_latency: Duration,
    frame_latency: Duration,
    frame_size: (u32, u32),
    failing_frames: HashSet<u64>,
}

impl SimulatedPlayer {
    pub fn new(media: SimulatedMedia) -> Self {
        Self {
            media,
            state: Arc::new(Mutex::new(ClockState {
                asset: None,
                item_status: None,
                time_control: TimeControlStatus::Paused,
                position: 0.0,
                anchor: None,
                epoch: 0,
                observers: HashMap::new(),
                tickers: HashMap::new(),
            })),
            seek_latency: Duration::from_millis(5),
            frame_latency: Duration::from_millis(2),
            frame_size: (80, 45),
            failing_frames: HashSet::new(),
        }
    }

    pub fn with_seek_latency(mut self, latency: Duration) -> Self {
        self.seek_latency = latency;
        self
    }

    pub fn with_frame_latency(mut self, latency: Duration) -> Self {
        self.frame_latency = latency;
        self
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width.max(1), height.max(1));
        self
    }

    /// Makes frame extraction fail at the given time (millisecond precision)
    pub fn with_failing_frame(mut self, time_secs: f64) -> Self {
        self.failing_frames.insert(Self::frame_key(time_secs));
        self
    }

    fn frame_key(time_secs: f64) -> u64 {
        (time_secs.max(0.0) * 1000.0).round() as u64
    }

    /// Schedules the automatic pause at the end of media for the current epoch
    fn schedule_end_of_media(&self, remaining: f64, epoch: u64) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(remaining.max(0.0))).await;
            let mut state = state.lock();
            if state.epoch != epoch || state.time_control != TimeControlStatus::Playing {
                return;
            }
            let end = state.duration();
            debug!("Reached end of media at {:.3}s", end);
            state.notify(PlayerEvent::PeriodicTime(end));
            state.position = end;
            state.anchor = None;
            state.epoch += 1;
            state.set_time_control(TimeControlStatus::Paused);
        });
    }

    fn render_frame(&self, time_secs: f64, duration: f64) -> RgbaImage {
        let (width, height) = self.frame_size;
        let progress = if duration > 0.0 {
            (time_secs / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let red = (progress * 255.0) as u8;
        RgbaImage::from_fn(width, height, |x, _| {
            let shade = ((x as f64 / width as f64) * 255.0) as u8;
            Rgba([red, shade, 255 - red, 255])
        })
    }
}

#[async_trait]
impl MediaPlayer for SimulatedPlayer {
    async fn load_asset(&self, source: &str) -> Result<Asset, LoadError> {
        let source = MediaSource::parse(source)?;
        source.ensure_exists()?;

        if !self.media.duration_secs.is_finite() || self.media.duration_secs < 0.0 {
            return Err(LoadError::ValidationFailed("duration".to_string()));
        }
        if !self.media.is_playable {
            return Err(LoadError::NotPlayable);
        }
        if self.media.has_protected_content {
            return Err(LoadError::ProtectedContent);
        }

        let asset = Asset {
            source: source.into_path(),
            duration_secs: self.media.duration_secs,
            is_playable: self.media.is_playable,
            has_protected_content: self.media.has_protected_content,
        };

        let mut state = self.state.lock();
        state.epoch += 1;
        state.anchor = None;
        state.position = 0.0;
        state.asset = Some(asset.clone());
        state.set_time_control(TimeControlStatus::Paused);
        state.item_status = Some(ItemStatus::ReadyToPlay);
        state.notify(PlayerEvent::ItemStatusChanged(ItemStatus::ReadyToPlay));
        debug!("Loaded {:?} ({:.3}s)", asset.source, asset.duration_secs);

        Ok(asset)
    }

    async fn play(&self) -> Result<(), PlayerError> {
        let (remaining, epoch) = {
            let mut state = self.state.lock();
            if state.asset.is_none() {
                return Err(PlayerError::NoAsset);
            }
            if state.time_control == TimeControlStatus::Playing {
                return Ok(());
            }
            state.epoch += 1;
            state.anchor = Some(Instant::now());
            state.set_time_control(TimeControlStatus::Playing);
            (state.duration() - state.position, state.epoch)
        };
        self.schedule_end_of_media(remaining, epoch);
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        let mut state = self.state.lock();
        if state.asset.is_none() {
            return Err(PlayerError::NoAsset);
        }
        state.freeze();
        state.epoch += 1;
        state.set_time_control(TimeControlStatus::Paused);
        Ok(())
    }

    async fn seek(&self, time_secs: f64, tolerance: SeekTolerance) -> Result<bool, PlayerError> {
        if self.state.lock().asset.is_none() {
            return Err(PlayerError::NoAsset);
        }
        trace!("Seeking to {:.3}s with tolerance {:?}", time_secs, tolerance);
        tokio::time::sleep(self.seek_latency).await;

        let reschedule = {
            let mut state = self.state.lock();
            let target = time_secs.clamp(0.0, state.duration());
            state.position = target;
            state.epoch += 1;
            if state.time_control == TimeControlStatus::Playing {
                state.anchor = Some(Instant::now());
                Some((state.duration() - target, state.epoch))
            } else {
                state.anchor = None;
                None
            }
        };
        if let Some((remaining, epoch)) = reschedule {
            self.schedule_end_of_media(remaining, epoch);
        }
        Ok(true)
    }

    async fn current_time(&self) -> f64 {
        self.state.lock().current_time()
    }

    async fn current_item_status(&self) -> Option<ItemStatus> {
        self.state.lock().item_status
    }

    async fn time_control_status(&self) -> TimeControlStatus {
        self.state.lock().time_control
    }

    fn observe_time_control_status(&self, sink: EventSink) -> ObserverToken {
        let token = ObserverToken::new();
        let mut state = self.state.lock();
        // Current value is delivered on registration
        let _ = sink.send(ObservedEvent::new(
            token,
            PlayerEvent::TimeControlChanged(state.time_control),
        ));
        state.observers.insert(
            token,
            Observer {
                kind: ObservationKind::TimeControlStatus,
                sink,
            },
        );
        token
    }

    fn observe_item_status(&self, sink: EventSink) -> ObserverToken {
        let token = ObserverToken::new();
        let mut state = self.state.lock();
        if let Some(status) = state.item_status {
            let _ = sink.send(ObservedEvent::new(token, PlayerEvent::ItemStatusChanged(status)));
        }
        state.observers.insert(
            token,
            Observer {
                kind: ObservationKind::ItemStatus,
                sink,
            },
        );
        token
    }

    fn add_periodic_time_observer(&self, interval: Duration, sink: EventSink) -> ObserverToken {
        let token = ObserverToken::new();
        let cancel = CancellationToken::new();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime, periodic time observer {} is inert", token);
            return token;
        };

        let state = Arc::clone(&self.state);
        let stop = cancel.clone();
        let ticker_sink = sink.clone();
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        let time = {
                            let state = state.lock();
                            if state.time_control != TimeControlStatus::Playing {
                                continue;
                            }
                            state.current_time()
                        };
                        let tick = ObservedEvent::new(token, PlayerEvent::PeriodicTime(time));
                        if ticker_sink.send(tick).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let mut state = self.state.lock();
        state.tickers.insert(token, cancel);
        // Also registered as a plain observer so end-of-media can push the final time
        state.observers.insert(
            token,
            Observer {
                kind: ObservationKind::PeriodicTime,
                sink,
            },
        );
        token
    }

    fn remove_observer(&self, token: ObserverToken) {
        let mut state = self.state.lock();
        let ticker = state.tickers.remove(&token);
        if let Some(cancel) = &ticker {
            cancel.cancel();
        }
        if state.observers.remove(&token).is_none() && ticker.is_none() {
            warn!("Removing unknown observer {}", token);
        }
    }

    async fn generate_frame(&self, time_secs: f64) -> Result<Bitmap, ThumbnailError> {
        tokio::time::sleep(self.frame_latency).await;

        let duration = match &self.state.lock().asset {
            Some(asset) => asset.duration_secs,
            None => return Err(ThumbnailError::NoAsset),
        };
        if time_secs < 0.0 || time_secs > duration {
            return Err(ThumbnailError::OutOfRange {
                time: time_secs,
                duration,
            });
        }
        if self.failing_frames.contains(&Self::frame_key(time_secs)) {
            return Err(ThumbnailError::Extraction {
                time: time_secs,
                reason: "simulated decode failure".to_string(),
            });
        }

        Ok(Arc::new(self.render_frame(time_secs, duration)))
    }
}

impl Drop for SimulatedPlayer {
    fn drop(&mut self) {
        for (_, cancel) in self.state.lock().tickers.drain() {
            cancel.cancel();
        }
    }
}
