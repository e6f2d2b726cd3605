use std::time::SystemTime;
use uuid::Uuid;

use crate::player::{PlayPauseIcon, PlaybackStatus};
use crate::utils::{LoadError, SeekStateError, ThumbnailError};
use crate::workers::Thumbnail;

/// Envelope for everything a session tells its UI
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub id: Uuid,
    pub timestamp: SystemTime,
    pub payload: EventPayload,
}

impl SessionEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: SystemTime::now(),
            payload,
        }
    }

    pub fn kind(&self) -> SessionEventKind {
        self.payload.kind()
    }
}

#[derive(Debug, Clone)]
pub enum EventPayload {
    // Asset events
    AssetLoaded {
        duration_secs: f64,
        sample_count: usize,
        content_length: f64,
    },
    LoadFailed(LoadError),
    StatusChanged(PlaybackStatus),

    // Scrubbing events
    SeekError(SeekStateError),
    /// Elapsed time readout, always `MM:SS`
    TimeLabelUpdate(String),
    /// Normalized scrubber position to scroll to
    ScrubberOffsetUpdate(f64),
    /// Shift of the needle and readout while dragging past either end
    NeedleOffsetUpdate(f64),

    // Thumbnail events
    ThumbnailsAppended(Vec<Thumbnail>),
    ThumbnailError {
        index: usize,
        error: ThumbnailError,
    },
    ThumbnailBatchComplete {
        batch: u64,
        displayed: usize,
        failed: usize,
    },

    // Control events
    ControlsVisibilityChanged(bool),
    PlayPauseIconChanged(PlayPauseIcon),

    Diagnostic(String),
}

impl EventPayload {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            EventPayload::AssetLoaded { .. } => SessionEventKind::AssetLoaded,
            EventPayload::LoadFailed(_) => SessionEventKind::LoadFailed,
            EventPayload::StatusChanged(_) => SessionEventKind::StatusChanged,
            EventPayload::SeekError(_) => SessionEventKind::SeekError,
            EventPayload::TimeLabelUpdate(_) => SessionEventKind::TimeLabelUpdate,
            EventPayload::ScrubberOffsetUpdate(_) => SessionEventKind::ScrubberOffsetUpdate,
            EventPayload::NeedleOffsetUpdate(_) => SessionEventKind::NeedleOffsetUpdate,
            EventPayload::ThumbnailsAppended(_) => SessionEventKind::ThumbnailsAppended,
            EventPayload::ThumbnailError { .. } => SessionEventKind::ThumbnailError,
            EventPayload::ThumbnailBatchComplete { .. } => SessionEventKind::ThumbnailBatchComplete,
            EventPayload::ControlsVisibilityChanged(_) => {
                SessionEventKind::ControlsVisibilityChanged
            }
            EventPayload::PlayPauseIconChanged(_) => SessionEventKind::PlayPauseIconChanged,
            EventPayload::Diagnostic(_) => SessionEventKind::Diagnostic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    AssetLoaded,
    LoadFailed,
    StatusChanged,
    SeekError,
    TimeLabelUpdate,
    ScrubberOffsetUpdate,
    NeedleOffsetUpdate,
    ThumbnailsAppended,
    ThumbnailError,
    ThumbnailBatchComplete,
    ControlsVisibilityChanged,
    PlayPauseIconChanged,
    Diagnostic,
}

impl SessionEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEventKind::AssetLoaded => "asset.loaded",
            SessionEventKind::LoadFailed => "asset.load_failed",
            SessionEventKind::StatusChanged => "playback.status_changed",
            SessionEventKind::SeekError => "scrub.seek_error",
            SessionEventKind::TimeLabelUpdate => "scrub.time_label",
            SessionEventKind::ScrubberOffsetUpdate => "scrub.offset",
            SessionEventKind::NeedleOffsetUpdate => "scrub.needle_offset",
            SessionEventKind::ThumbnailsAppended => "thumbnails.appended",
            SessionEventKind::ThumbnailError => "thumbnails.error",
            SessionEventKind::ThumbnailBatchComplete => "thumbnails.complete",
            SessionEventKind::ControlsVisibilityChanged => "controls.visibility",
            SessionEventKind::PlayPauseIconChanged => "controls.play_pause_icon",
            SessionEventKind::Diagnostic => "diagnostic",
        }
    }
}
