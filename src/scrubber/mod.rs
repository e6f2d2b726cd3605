/// Scrubbing logic shared by the session: geometry, seek coalescing and
/// player status tracking
pub mod seek_coordinator;
pub mod status_bridge;
pub mod timeline;

pub use seek_coordinator::{SeekCoordinator, SeekDirective, SeekState};
pub use status_bridge::{BridgeNotification, PlaybackStatusBridge};
