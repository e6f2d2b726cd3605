use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::constants::INITIAL_TIME_LABEL;
use crate::events::{EventBus, EventPayload, EventSubscriber};
use crate::player::{
    Asset, ItemStatus, MediaPlayer, ObservedEvent, PlayPauseIcon, PlaybackStatus, SeekTolerance,
    TimeControlStatus,
};
use crate::scrubber::timeline;
use crate::scrubber::{
    BridgeNotification, PlaybackStatusBridge, SeekCoordinator, SeekDirective, SeekState,
};
use crate::utils::{AppError, LoadError, PlayerError, Result, format_timestamp};
use crate::workers::{Deliver, ThumbnailBatchGenerator, ThumbnailOutcome, ThumbnailStrip};

/// Scroll position of the filmstrip, sent on every scroll tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollUpdate {
    pub content_offset: f64,
    /// Distance from the scroll origin to the needle
    pub center_inset: f64,
    pub content_length: f64,
    /// False when the offset was set programmatically, e.g. while following playback
    pub user_driven: bool,
}

/// Point-in-time view of a session
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub status: PlaybackStatus,
    pub asset: Option<Asset>,
    pub seek_state: SeekState,
    pub seeks_issued: u64,
    pub time_label: String,
    pub ratio: f64,
    pub controls_visible: bool,
    pub play_pause_icon: PlayPauseIcon,
    pub thumbnail_batch: u64,
    pub displayed_thumbnails: Vec<usize>,
    pub failed_thumbnails: Vec<usize>,
    pub thumbnails_complete: bool,
}

/// Commands that can be sent to the session controller
#[derive(Debug)]
pub enum SessionCommand {
    LoadAsset {
        source: String,
        respond_to: oneshot::Sender<Result<Asset>>,
    },
    Play {
        respond_to: oneshot::Sender<Result<()>>,
    },
    Pause {
        respond_to: oneshot::Sender<Result<()>>,
    },
    TogglePlayPause {
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// Fire and forget, one per scroll tick
    Scroll(ScrollUpdate),
    Snapshot {
        respond_to: oneshot::Sender<SessionSnapshot>,
    },
    Teardown {
        respond_to: oneshot::Sender<()>,
    },
}

/// Completions of work the controller spawned
#[derive(Debug)]
enum InternalMessage {
    AssetLoaded {
        generation: u64,
        result: std::result::Result<Asset, LoadError>,
        respond_to: oneshot::Sender<Result<Asset>>,
    },
    SeekFinished {
        time: f64,
        finished: bool,
    },
    Thumbnail(ThumbnailOutcome),
}

/// Owns all scrubbing state of one playback session and processes commands,
/// player events and task completions one at a time.
pub struct SessionController {
    player: Arc<dyn MediaPlayer>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    // Spawned tasks only ever get a weak clone of this sender
    internal_tx: mpsc::UnboundedSender<InternalMessage>,
    internal_rx: mpsc::UnboundedReceiver<InternalMessage>,
    player_events_tx: mpsc::UnboundedSender<ObservedEvent>,
    player_events_rx: mpsc::UnboundedReceiver<ObservedEvent>,
    events: Arc<EventBus>,

    generator: ThumbnailBatchGenerator,
    coordinator: SeekCoordinator,
    bridge: PlaybackStatusBridge,
    cell_width: f64,

    asset: Option<Asset>,
    strip: Option<ThumbnailStrip>,
    batch: u64,
    load_generation: u64,
    reported_status: PlaybackStatus,
    time_label: String,
    ratio: f64,
    controls_visible: bool,
    icon: PlayPauseIcon,
    play_after_settle: bool,
}

impl SessionController {
    pub fn new(
        player: Arc<dyn MediaPlayer>,
        config: &Config,
    ) -> Result<(SessionHandle, SessionController)> {
        config.validate()?;

        let generator = ThumbnailBatchGenerator::new(
            config.playback.capture_interval_secs,
            config.thumbnails.max_concurrent_extractions,
        )?;
        let events = Arc::new(EventBus::new(
            config.events.channel_capacity,
            config.events.history_size,
        ));

        let (sender, commands) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (player_events_tx, player_events_rx) = mpsc::unbounded_channel();

        let controller = SessionController {
            player,
            commands,
            internal_tx,
            internal_rx,
            player_events_tx,
            player_events_rx,
            events: events.clone(),
            generator,
            coordinator: SeekCoordinator::new(),
            bridge: PlaybackStatusBridge::new(config.periodic_interval()),
            cell_width: config.thumbnails.cell_width,
            asset: None,
            strip: None,
            batch: 0,
            load_generation: 0,
            reported_status: PlaybackStatus::Idle,
            time_label: INITIAL_TIME_LABEL.to_string(),
            ratio: 0.0,
            controls_visible: false,
            icon: PlayPauseIcon::Play,
            play_after_settle: false,
        };
        let handle = SessionHandle { sender, events };

        Ok((handle, controller))
    }

    /// Run the controller loop until teardown or until every handle is dropped
    pub async fn run(mut self) {
        debug!("SessionController event loop started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        debug!("All session handles dropped");
                        self.teardown().await;
                        break;
                    }
                },
                Some(message) = self.internal_rx.recv() => {
                    self.handle_internal(message).await;
                }
                Some(event) = self.player_events_rx.recv() => {
                    self.handle_player_event(event).await;
                }
            }
        }

        debug!("SessionController event loop terminated");
    }

    /// Returns false once the loop should stop
    async fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::LoadAsset { source, respond_to } => {
                self.start_load(source, respond_to);
            }
            SessionCommand::Play { respond_to } => {
                let result = self.play().await;
                let _ = respond_to.send(result);
            }
            SessionCommand::Pause { respond_to } => {
                let result = self.pause().await;
                let _ = respond_to.send(result);
            }
            SessionCommand::TogglePlayPause { respond_to } => {
                let result = match self.bridge.time_control() {
                    TimeControlStatus::Paused => self.play().await,
                    TimeControlStatus::Playing | TimeControlStatus::WaitingToPlay => {
                        self.pause().await
                    }
                };
                let _ = respond_to.send(result);
            }
            SessionCommand::Scroll(update) => {
                self.scroll(update).await;
            }
            SessionCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            SessionCommand::Teardown { respond_to } => {
                self.teardown().await;
                let _ = respond_to.send(());
                return false;
            }
        }
        true
    }

    fn start_load(&mut self, source: String, respond_to: oneshot::Sender<Result<Asset>>) {
        self.load_generation += 1;
        let generation = self.load_generation;
        let player = self.player.clone();
        let internal = self.internal_tx.downgrade();

        info!("Loading asset {}", source);
        tokio::spawn(async move {
            let result = player.load_asset(&source).await;
            match internal.upgrade() {
                Some(tx) => {
                    let _ = tx.send(InternalMessage::AssetLoaded {
                        generation,
                        result,
                        respond_to,
                    });
                }
                None => {
                    trace!("Session gone before {} finished loading", source);
                    let _ = respond_to.send(Err(AppError::SessionClosed));
                }
            }
        });
    }

    async fn handle_internal(&mut self, message: InternalMessage) {
        match message {
            InternalMessage::AssetLoaded {
                generation,
                result,
                respond_to,
            } => {
                if generation != self.load_generation {
                    debug!(
                        "Discarding load {} superseded by load {}",
                        generation, self.load_generation
                    );
                    let _ = respond_to.send(result.map_err(AppError::from));
                    return;
                }
                let result = match result {
                    Ok(asset) => {
                        self.apply_asset(asset.clone()).await;
                        Ok(asset)
                    }
                    Err(e) => {
                        self.fail_load(e.clone()).await;
                        Err(e.into())
                    }
                };
                let _ = respond_to.send(result);
            }
            InternalMessage::SeekFinished { time, finished } => {
                if !finished {
                    debug!("Seek to {:.3}s was interrupted", time);
                }
                match self.coordinator.complete(time) {
                    SeekDirective::Issue(latest) => self.spawn_seek(latest),
                    SeekDirective::Settled(settled) => self.seek_settled(settled).await,
                    SeekDirective::Coalesced | SeekDirective::Unchanged => {}
                }
            }
            InternalMessage::Thumbnail(outcome) => self.accept_thumbnail(outcome).await,
        }
    }

    async fn apply_asset(&mut self, asset: Asset) {
        info!(
            "Loaded {} ({:.2}s)",
            asset.source.display(),
            asset.duration_secs
        );

        self.coordinator.reset();
        self.play_after_settle = false;
        self.bridge
            .attach(self.player.as_ref(), self.player_events_tx.clone());
        self.publish_status().await;

        self.ratio = 0.0;
        self.set_time_label(0.0).await;

        self.batch += 1;
        let samples = self.generator.plan(asset.duration_secs);
        let sample_count = samples.len();
        self.strip = Some(ThumbnailStrip::new(self.batch, samples.clone()));

        self.events
            .emit(EventPayload::AssetLoaded {
                duration_secs: asset.duration_secs,
                sample_count,
                content_length: timeline::content_length(sample_count, self.cell_width),
            })
            .await;
        self.asset = Some(asset);

        let internal = self.internal_tx.downgrade();
        let deliver: Deliver = Arc::new(move |outcome: ThumbnailOutcome| match internal.upgrade() {
            Some(tx) => tx.send(InternalMessage::Thumbnail(outcome)).is_ok(),
            None => false,
        });
        self.generator
            .dispatch(self.player.clone(), self.batch, samples, deliver);
    }

    async fn fail_load(&mut self, error: LoadError) {
        error!("Failed to load asset: {}", error);

        self.bridge.detach(self.player.as_ref());
        self.bridge.mark_failed();
        self.coordinator.reset();
        self.play_after_settle = false;
        self.asset = None;
        self.strip = None;

        self.events.emit(EventPayload::LoadFailed(error)).await;
        self.publish_status().await;
        self.set_controls_visible(false).await;
    }

    async fn play(&mut self) -> Result<()> {
        let Some(duration) = self.asset.as_ref().map(|a| a.duration_secs) else {
            return Err(PlayerError::NoAsset.into());
        };

        let current = self.player.current_time().await;
        if current < duration {
            return self.player.play().await.map_err(AppError::from);
        }

        debug!("At end of media ({:.3}s), replaying from start", current);
        // Any earlier seek to 0 was undone by playback reaching the end
        self.coordinator.invalidate_settled();
        let item_status = self.player.current_item_status().await;
        if let SeekDirective::Issue(time) = self.coordinator.request(0.0, item_status)? {
            self.spawn_seek(time);
        }

        self.ratio = 0.0;
        self.events.emit_scrubber_offset(0.0).await;
        self.set_time_label(0.0).await;

        if self.coordinator.is_idle() {
            return self.player.play().await.map_err(AppError::from);
        }
        self.play_after_settle = true;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.play_after_settle = false;
        self.player.pause().await.map_err(AppError::from)
    }

    async fn scroll(&mut self, update: ScrollUpdate) {
        if !update.user_driven {
            trace!("Ignoring programmatic scroll to {:.1}", update.content_offset);
            return;
        }
        let Some(duration) = self.asset.as_ref().map(|a| a.duration_secs) else {
            trace!("Ignoring scroll without an asset");
            return;
        };

        self.play_after_settle = false;

        let ratio = timeline::ratio_from_offset(
            update.content_offset,
            update.center_inset,
            update.content_length,
        );
        let time = timeline::time_from_ratio(ratio, duration);
        self.ratio = ratio;
        self.set_time_label(time).await;
        self.events
            .emit(EventPayload::NeedleOffsetUpdate(timeline::overscroll_offset(
                update.content_offset,
                update.center_inset,
                update.content_length,
            )))
            .await;

        let item_status = self.player.current_item_status().await;
        match self.coordinator.request(time, item_status) {
            Ok(SeekDirective::Issue(time)) => self.spawn_seek(time),
            Ok(_) => {}
            Err(e) => {
                warn!("{}", e);
                self.events.emit(EventPayload::SeekError(e)).await;
            }
        }
    }

    /// Pauses and seeks on a separate task, reporting back when done
    fn spawn_seek(&self, time: f64) {
        let player = self.player.clone();
        let internal = self.internal_tx.downgrade();

        trace!("Seeking to {:.3}s", time);
        tokio::spawn(async move {
            if let Err(e) = player.pause().await {
                warn!("Failed to pause before seeking: {}", e);
            }
            let finished = match player.seek(time, SeekTolerance::ZERO).await {
                Ok(finished) => finished,
                Err(e) => {
                    warn!("Seek to {:.3}s failed: {}", time, e);
                    false
                }
            };
            if let Some(tx) = internal.upgrade() {
                let _ = tx.send(InternalMessage::SeekFinished { time, finished });
            }
        });
    }

    async fn seek_settled(&mut self, time: f64) {
        trace!("Seek settled at {:.3}s", time);
        if std::mem::take(&mut self.play_after_settle)
            && let Err(e) = self.player.play().await
        {
            warn!("Failed to resume after replay seek: {}", e);
        }
    }

    async fn handle_player_event(&mut self, event: ObservedEvent) {
        let notification = match self.bridge.dispatch(event) {
            Ok(notification) => notification,
            Err(e) => {
                warn!("{}", e);
                self.events.emit_diagnostic(e.to_string()).await;
                return;
            }
        };

        match notification {
            Some(BridgeNotification::TimeControlChanged(time_control)) => {
                if time_control != TimeControlStatus::Paused {
                    self.coordinator.invalidate_settled();
                }
                let icon = PlayPauseIcon::for_time_control(time_control);
                if icon != self.icon {
                    self.icon = icon;
                    self.events.emit_play_pause_icon(icon).await;
                }
            }
            Some(BridgeNotification::ItemStatusChanged(ItemStatus::ReadyToPlay)) => {
                self.set_controls_visible(true).await;
            }
            Some(BridgeNotification::ItemStatusChanged(ItemStatus::Failed)) => {
                self.set_controls_visible(false).await;
            }
            Some(BridgeNotification::ItemStatusChanged(ItemStatus::Unknown)) => {}
            Some(BridgeNotification::PeriodicTime(time)) => {
                // A seek in flight owns the position
                if let Some(duration) = self.asset.as_ref().map(|a| a.duration_secs)
                    && self.coordinator.is_idle()
                {
                    self.ratio = timeline::ratio_from_time(time, duration);
                    self.events.emit_scrubber_offset(self.ratio).await;
                    self.set_time_label(time).await;
                }
            }
            None => {}
        }

        self.publish_status().await;
    }

    async fn accept_thumbnail(&mut self, outcome: ThumbnailOutcome) {
        let Some(strip) = self.strip.as_mut() else {
            trace!("No thumbnail strip, dropping thumbnail {}", outcome.index);
            return;
        };

        let update = strip.accept(outcome);
        let (batch, displayed, failed) = (
            strip.batch(),
            strip.displayed().len(),
            strip.failed_indices().len(),
        );

        if let Some((index, error)) = update.failure {
            self.events
                .emit(EventPayload::ThumbnailError { index, error })
                .await;
        }
        if !update.appended.is_empty() {
            self.events
                .emit(EventPayload::ThumbnailsAppended(update.appended))
                .await;
        }
        if update.complete {
            self.events
                .emit(EventPayload::ThumbnailBatchComplete {
                    batch,
                    displayed,
                    failed,
                })
                .await;
        }
    }

    async fn teardown(&mut self) {
        info!("Tearing down session");

        self.bridge.detach(self.player.as_ref());
        if self.asset.is_some()
            && let Err(e) = self.player.pause().await
        {
            warn!("Failed to pause on teardown: {}", e);
        }
        self.coordinator.reset();
        self.play_after_settle = false;
        self.set_controls_visible(false).await;
    }

    async fn set_time_label(&mut self, seconds: f64) {
        let label = format_timestamp(seconds);
        if label != self.time_label {
            self.time_label = label.clone();
            self.events
                .emit(EventPayload::TimeLabelUpdate(label))
                .await;
        }
    }

    async fn set_controls_visible(&mut self, visible: bool) {
        if visible != self.controls_visible {
            self.controls_visible = visible;
            self.events.emit_controls_visibility(visible).await;
        }
    }

    async fn publish_status(&mut self) {
        let status = self.bridge.status();
        if status != self.reported_status {
            debug!("Playback status {:?} -> {:?}", self.reported_status, status);
            self.reported_status = status;
            self.events.emit(EventPayload::StatusChanged(status)).await;
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.bridge.status(),
            asset: self.asset.clone(),
            seek_state: self.coordinator.state(),
            seeks_issued: self.coordinator.issued_count(),
            time_label: self.time_label.clone(),
            ratio: self.ratio,
            controls_visible: self.controls_visible,
            play_pause_icon: self.icon,
            thumbnail_batch: self.batch,
            displayed_thumbnails: self
                .strip
                .as_ref()
                .map(|s| s.displayed_indices())
                .unwrap_or_default(),
            failed_thumbnails: self
                .strip
                .as_ref()
                .map(|s| s.failed_indices())
                .unwrap_or_default(),
            thumbnails_complete: self.strip.as_ref().is_some_and(|s| s.is_complete()),
        }
    }
}

/// Handle to send commands to the session controller
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<SessionCommand>,
    events: Arc<EventBus>,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("sender", &"<UnboundedSender>")
            .field("subscribers", &self.events.subscriber_count())
            .finish()
    }
}

impl SessionHandle {
    fn send(&self, command: SessionCommand) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| AppError::SessionClosed)
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Load media from a path or `file://` URL
    pub async fn load_asset(&self, source: &str) -> Result<Asset> {
        let (respond_to, response) = oneshot::channel();
        self.send(SessionCommand::LoadAsset {
            source: source.to_string(),
            respond_to,
        })?;
        response.await.map_err(|_| AppError::SessionClosed)?
    }

    /// Start playback, from the beginning when at the end of the media
    pub async fn play(&self) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.send(SessionCommand::Play { respond_to })?;
        response.await.map_err(|_| AppError::SessionClosed)?
    }

    pub async fn pause(&self) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.send(SessionCommand::Pause { respond_to })?;
        response.await.map_err(|_| AppError::SessionClosed)?
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.send(SessionCommand::TogglePlayPause { respond_to })?;
        response.await.map_err(|_| AppError::SessionClosed)?
    }

    pub fn scroll(&self, update: ScrollUpdate) -> Result<()> {
        self.send(SessionCommand::Scroll(update))
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (respond_to, response) = oneshot::channel();
        self.send(SessionCommand::Snapshot { respond_to })?;
        response.await.map_err(|_| AppError::SessionClosed)
    }

    pub async fn teardown(&self) -> Result<()> {
        let (respond_to, response) = oneshot::channel();
        self.send(SessionCommand::Teardown { respond_to })?;
        response.await.map_err(|_| AppError::SessionClosed)
    }
}

/// Create a session for `player` and run it on the tokio runtime
pub fn spawn_session(
    player: Arc<dyn MediaPlayer>,
    config: &Config,
) -> Result<(SessionHandle, JoinHandle<()>)> {
    let (handle, controller) = SessionController::new(player, config)?;
    let task = tokio::spawn(controller.run());
    Ok((handle, task))
}
