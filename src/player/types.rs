/// Common types shared by player backends and the session
use image::RgbaImage;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Decoded frame image. Shared so it can travel through the event bus cheaply.
pub type Bitmap = Arc<RgbaImage>;

/// A loaded, validated media asset
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub source: PathBuf,
    pub duration_secs: f64,
    pub is_playable: bool,
    pub has_protected_content: bool,
}

/// Readiness of the player's current item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Unknown,
    ReadyToPlay,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControlStatus {
    Paused,
    Playing,
    WaitingToPlay,
}

/// Session-level playback status derived from player events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    ReadyToPlay,
    Playing,
    Paused,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPauseIcon {
    Play,
    Pause,
}

impl PlayPauseIcon {
    pub fn for_time_control(status: TimeControlStatus) -> Self {
        match status {
            TimeControlStatus::Paused => PlayPauseIcon::Play,
            TimeControlStatus::Playing | TimeControlStatus::WaitingToPlay => PlayPauseIcon::Pause,
        }
    }
}

/// How far from the requested time a seek may land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekTolerance {
    pub before: Duration,
    pub after: Duration,
}

impl SeekTolerance {
    /// Exact seeking, used for scrubbing
    pub const ZERO: SeekTolerance = SeekTolerance {
        before: Duration::ZERO,
        after: Duration::ZERO,
    };
}

/// Registration handle returned by the observer methods of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(Uuid);

impl ObserverToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationKind {
    TimeControlStatus,
    ItemStatus,
    PeriodicTime,
}

impl ObservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::TimeControlStatus => "time control status",
            ObservationKind::ItemStatus => "item status",
            ObservationKind::PeriodicTime => "periodic time",
        }
    }
}

/// Notification delivered by a player to a registered observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    TimeControlChanged(TimeControlStatus),
    ItemStatusChanged(ItemStatus),
    PeriodicTime(f64),
}

impl PlayerEvent {
    pub fn kind(&self) -> ObservationKind {
        match self {
            PlayerEvent::TimeControlChanged(_) => ObservationKind::TimeControlStatus,
            PlayerEvent::ItemStatusChanged(_) => ObservationKind::ItemStatus,
            PlayerEvent::PeriodicTime(_) => ObservationKind::PeriodicTime,
        }
    }
}

/// A player event tagged with the registration that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservedEvent {
    pub token: ObserverToken,
    pub event: PlayerEvent,
}

impl ObservedEvent {
    pub fn new(token: ObserverToken, event: PlayerEvent) -> Self {
        Self { token, event }
    }

    pub fn kind(&self) -> ObservationKind {
        self.event.kind()
    }
}
