pub mod errors;
pub mod time_format;

pub use errors::{AppError, LoadError, PlayerError, Result, SeekStateError, ThumbnailError};
pub use time_format::format_timestamp;
