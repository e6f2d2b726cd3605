pub mod simulated;
pub mod source;
pub mod traits;
pub mod types;

pub use simulated::{SimulatedMedia, SimulatedPlayer};
pub use source::MediaSource;
pub use traits::{EventSink, MediaPlayer};
pub use types::{
    Asset, Bitmap, ItemStatus, ObservationKind, ObservedEvent, ObserverToken, PlayPauseIcon,
    PlaybackStatus, PlayerEvent, SeekTolerance, TimeControlStatus,
};
