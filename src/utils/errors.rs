use std::path::PathBuf;
use thiserror::Error;

/// Why an asset could not be opened. Fatal to the session that requested it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Media not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Media is not playable")]
    NotPlayable,

    #[error("Media contains protected content")]
    ProtectedContent,

    #[error("Failed to validate asset key '{0}'")]
    ValidationFailed(String),

    #[error("Unsupported media source scheme: {0}")]
    UnsupportedSource(String),

    #[error("Invalid media source: {0}")]
    InvalidSource(String),
}

/// A single thumbnail sample failed. The rest of the batch is unaffected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThumbnailError {
    #[error("Failed to extract frame at {time:.2}s: {reason}")]
    Extraction { time: f64, reason: String },

    #[error("Frame time {time:.2}s is outside the media duration {duration:.2}s")]
    OutOfRange { time: f64, duration: f64 },

    #[error("No asset loaded")]
    NoAsset,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeekStateError {
    #[error("Cannot seek to {requested:.2}s: player has no current item")]
    NoCurrentItem { requested: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    #[error("No asset loaded")]
    NoAsset,

    #[error("Player backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Thumbnail error: {0}")]
    Thumbnail(#[from] ThumbnailError),

    #[error("Seek error: {0}")]
    SeekState(#[from] SeekStateError),

    #[error("Playback error: {0}")]
    Player(#[from] PlayerError),

    #[error("Observer for {0} is not registered")]
    ObserverLost(&'static str),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Session is closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
