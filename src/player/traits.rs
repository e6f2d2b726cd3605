use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

use super::types::{
    Asset, Bitmap, ItemStatus, ObservedEvent, ObserverToken, SeekTolerance, TimeControlStatus,
};
use crate::utils::{LoadError, PlayerError, ThumbnailError};

/// Sink that receives observer notifications, each tagged with the token of
/// the registration that sent it
pub type EventSink = mpsc::UnboundedSender<ObservedEvent>;

/// Capability surface of the media decode/render pipeline.
///
/// Observers deliver into a channel so the consumer decides which task
/// processes the notifications. Every registration returns a token that must be
/// handed back to `remove_observer` on teardown.
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    async fn load_asset(&self, source: &str) -> Result<Asset, LoadError>;
    async fn play(&self) -> Result<(), PlayerError>;
    async fn pause(&self) -> Result<(), PlayerError>;
    /// Resolves once the seek is done. `Ok(false)` means it was interrupted.
    async fn seek(&self, time_secs: f64, tolerance: SeekTolerance) -> Result<bool, PlayerError>;
    async fn current_time(&self) -> f64;
    /// `None` when there is no current item at all
    async fn current_item_status(&self) -> Option<ItemStatus>;
    async fn time_control_status(&self) -> TimeControlStatus;

    fn observe_time_control_status(&self, sink: EventSink) -> ObserverToken;
    fn observe_item_status(&self, sink: EventSink) -> ObserverToken;
    fn add_periodic_time_observer(&self, interval: Duration, sink: EventSink) -> ObserverToken;
    fn remove_observer(&self, token: ObserverToken);

    async fn generate_frame(&self, time_secs: f64) -> Result<Bitmap, ThumbnailError>;
}
