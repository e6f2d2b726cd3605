use async_trait::async_trait;
use filmstrip::player::{
    Asset, Bitmap, EventSink, ItemStatus, MediaPlayer, ObservationKind, ObservedEvent,
    ObserverToken, PlayerEvent, SeekTolerance, TimeControlStatus,
};
use filmstrip::utils::{LoadError, PlayerError, ThumbnailError};
use image::RgbaImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

type FrameDelay = Arc<dyn Fn(f64) -> Duration + Send + Sync>;

struct MockState {
    duration: f64,
    item_status: Option<ItemStatus>,
    time_control: TimeControlStatus,
    position: f64,
    load_error: Option<LoadError>,
    observers: HashMap<ObserverToken, (ObservationKind, EventSink)>,
    seeks: Vec<f64>,
    pauses: usize,
    plays: usize,
    failing_frames: Vec<f64>,
}

/// Scriptable player. Nothing happens on its own: tests push observer events
/// and release gated seeks explicitly.
pub struct MockPlayer {
    state: Arc<Mutex<MockState>>,
    seek_gate: Option<Arc<Semaphore>>,
    frame_delay: FrameDelay,
    active_frames: Arc<AtomicUsize>,
    max_active_frames: Arc<AtomicUsize>,
}

impl MockPlayer {
    pub fn new(duration: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                duration,
                item_status: None,
                time_control: TimeControlStatus::Paused,
                position: 0.0,
                load_error: None,
                observers: HashMap::new(),
                seeks: Vec::new(),
                pauses: 0,
                plays: 0,
                failing_frames: Vec::new(),
            })),
            seek_gate: None,
            frame_delay: Arc::new(|_| Duration::ZERO),
            active_frames: Arc::new(AtomicUsize::new(0)),
            max_active_frames: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Seeks block until `release_seeks` hands out permits
    pub fn with_gated_seeks(mut self) -> Self {
        self.seek_gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn with_frame_delay(mut self, delay: impl Fn(f64) -> Duration + Send + Sync + 'static) -> Self {
        self.frame_delay = Arc::new(delay);
        self
    }

    pub fn with_failing_frame(self, time: f64) -> Self {
        self.state.lock().unwrap().failing_frames.push(time);
        self
    }

    pub fn with_load_error(self, error: LoadError) -> Self {
        self.state.lock().unwrap().load_error = Some(error);
        self
    }

    pub fn release_seeks(&self, count: usize) {
        if let Some(gate) = &self.seek_gate {
            gate.add_permits(count);
        }
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn pauses(&self) -> usize {
        self.state.lock().unwrap().pauses
    }

    pub fn plays(&self) -> usize {
        self.state.lock().unwrap().plays
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().unwrap().observers.len()
    }

    pub fn max_active_frames(&self) -> usize {
        self.max_active_frames.load(Ordering::SeqCst)
    }

    pub fn set_position(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    pub fn set_item_status(&self, status: Option<ItemStatus>) {
        let mut state = self.state.lock().unwrap();
        state.item_status = status;
        if let Some(status) = status {
            Self::notify(&mut state, PlayerEvent::ItemStatusChanged(status));
        }
    }

    /// Pushes an event to every observer registered for its kind
    pub fn emit(&self, event: PlayerEvent) {
        let mut state = self.state.lock().unwrap();
        if let PlayerEvent::TimeControlChanged(status) = event {
            state.time_control = status;
        }
        Self::notify(&mut state, event);
    }

    fn notify(state: &mut MockState, event: PlayerEvent) {
        let kind = event.kind();
        state.observers.retain(|token, (observed, sink)| {
            *observed != kind || sink.send(ObservedEvent::new(*token, event)).is_ok()
        });
    }

    fn register(&self, kind: ObservationKind, sink: EventSink, initial: Option<PlayerEvent>) -> ObserverToken {
        let token = ObserverToken::new();
        if let Some(event) = initial {
            let _ = sink.send(ObservedEvent::new(token, event));
        }
        self.state
            .lock()
            .unwrap()
            .observers
            .insert(token, (kind, sink));
        token
    }
}

#[async_trait]
impl MediaPlayer for MockPlayer {
    async fn load_asset(&self, source: &str) -> Result<Asset, LoadError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.load_error.clone() {
            state.item_status = Some(ItemStatus::Failed);
            return Err(error);
        }
        state.item_status = Some(ItemStatus::ReadyToPlay);
        state.position = 0.0;
        Ok(Asset {
            source: PathBuf::from(source),
            duration_secs: state.duration,
            is_playable: true,
            has_protected_content: false,
        })
    }

    async fn play(&self) -> Result<(), PlayerError> {
        let mut state = self.state.lock().unwrap();
        if state.item_status.is_none() {
            return Err(PlayerError::NoAsset);
        }
        state.plays += 1;
        if state.time_control != TimeControlStatus::Playing {
            state.time_control = TimeControlStatus::Playing;
            Self::notify(&mut state, PlayerEvent::TimeControlChanged(TimeControlStatus::Playing));
        }
        Ok(())
    }

    async fn pause(&self) -> Result<(), PlayerError> {
        let mut state = self.state.lock().unwrap();
        state.pauses += 1;
        if state.time_control != TimeControlStatus::Paused {
            state.time_control = TimeControlStatus::Paused;
            Self::notify(&mut state, PlayerEvent::TimeControlChanged(TimeControlStatus::Paused));
        }
        Ok(())
    }

    async fn seek(&self, time_secs: f64, _tolerance: SeekTolerance) -> Result<bool, PlayerError> {
        self.state.lock().unwrap().seeks.push(time_secs);
        if let Some(gate) = &self.seek_gate {
            gate.acquire()
                .await
                .map_err(|e| PlayerError::Backend(e.to_string()))?
                .forget();
        }
        self.state.lock().unwrap().position = time_secs;
        Ok(true)
    }

    async fn current_time(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    async fn current_item_status(&self) -> Option<ItemStatus> {
        self.state.lock().unwrap().item_status
    }

    async fn time_control_status(&self) -> TimeControlStatus {
        self.state.lock().unwrap().time_control
    }

    fn observe_time_control_status(&self, sink: EventSink) -> ObserverToken {
        let current = self.state.lock().unwrap().time_control;
        self.register(
            ObservationKind::TimeControlStatus,
            sink,
            Some(PlayerEvent::TimeControlChanged(current)),
        )
    }

    fn observe_item_status(&self, sink: EventSink) -> ObserverToken {
        let current = self.state.lock().unwrap().item_status;
        self.register(
            ObservationKind::ItemStatus,
            sink,
            current.map(PlayerEvent::ItemStatusChanged),
        )
    }

    fn add_periodic_time_observer(&self, _interval: Duration, sink: EventSink) -> ObserverToken {
        self.register(ObservationKind::PeriodicTime, sink, None)
    }

    fn remove_observer(&self, token: ObserverToken) {
        self.state.lock().unwrap().observers.remove(&token);
    }

    async fn generate_frame(&self, time_secs: f64) -> Result<Bitmap, ThumbnailError> {
        let active = self.active_frames.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_frames.fetch_max(active, Ordering::SeqCst);

        tokio::time::sleep((self.frame_delay)(time_secs)).await;
        self.active_frames.fetch_sub(1, Ordering::SeqCst);

        if self.state.lock().unwrap().failing_frames.contains(&time_secs) {
            return Err(ThumbnailError::Extraction {
                time: time_secs,
                reason: "scripted failure".to_string(),
            });
        }
        Ok(Arc::new(RgbaImage::new(4, 4)))
    }
}
