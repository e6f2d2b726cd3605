use std::time::Duration;
use tracing::{debug, info, trace};

use crate::player::{
    EventSink, ItemStatus, MediaPlayer, ObservationKind, ObservedEvent, ObserverToken,
    PlaybackStatus, PlayerEvent, TimeControlStatus,
};
use crate::utils::AppError;

/// What the session should react to after a player event was applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeNotification {
    TimeControlChanged(TimeControlStatus),
    ItemStatusChanged(ItemStatus),
    /// Playback advanced on its own, only produced while playing
    PeriodicTime(f64),
}

/// Translates player observer callbacks into session status.
///
/// The bridge owns the three observer registrations of a session. Periodic
/// time is only forwarded while the player is actually playing, so the
/// position the user is dragging to is never overwritten by the player
/// echoing back the seek.
#[derive(Debug)]
pub struct PlaybackStatusBridge {
    time_control_token: Option<ObserverToken>,
    item_status_token: Option<ObserverToken>,
    periodic_token: Option<ObserverToken>,
    periodic_interval: Duration,
    status: PlaybackStatus,
    time_control: TimeControlStatus,
}

impl PlaybackStatusBridge {
    pub fn new(periodic_interval: Duration) -> Self {
        Self {
            time_control_token: None,
            item_status_token: None,
            periodic_token: None,
            periodic_interval,
            status: PlaybackStatus::Idle,
            time_control: TimeControlStatus::Paused,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn time_control(&self) -> TimeControlStatus {
        self.time_control
    }

    pub fn is_attached(&self) -> bool {
        self.time_control_token.is_some()
            || self.item_status_token.is_some()
            || self.periodic_token.is_some()
    }

    /// Registers all observers on `player`, replacing earlier registrations.
    ///
    /// Status starts over from `Idle` because a fresh attach always belongs to
    /// a freshly loaded asset.
    pub fn attach(&mut self, player: &dyn MediaPlayer, sink: EventSink) {
        self.detach(player);
        self.status = PlaybackStatus::Idle;
        self.time_control = TimeControlStatus::Paused;

        self.time_control_token = Some(player.observe_time_control_status(sink.clone()));
        self.item_status_token = Some(player.observe_item_status(sink.clone()));
        self.periodic_token = Some(player.add_periodic_time_observer(self.periodic_interval, sink));

        info!(
            "Attached player observers (periodic every {:?})",
            self.periodic_interval
        );
    }

    pub fn detach(&mut self, player: &dyn MediaPlayer) {
        let tokens = [
            self.time_control_token.take(),
            self.item_status_token.take(),
            self.periodic_token.take(),
        ];

        let mut removed = 0;
        for token in tokens.into_iter().flatten() {
            player.remove_observer(token);
            removed += 1;
        }
        if removed > 0 {
            debug!("Removed {} player observers", removed);
        }
    }

    /// Records a failure that did not come through an observer, such as a
    /// rejected load
    pub fn mark_failed(&mut self) {
        self.status = PlaybackStatus::Failed;
    }

    /// Token of the current registration for `kind`, if attached
    pub fn token_for(&self, kind: ObservationKind) -> Option<ObserverToken> {
        match kind {
            ObservationKind::TimeControlStatus => self.time_control_token,
            ObservationKind::ItemStatus => self.item_status_token,
            ObservationKind::PeriodicTime => self.periodic_token,
        }
    }

    /// Applies one player event in delivery order.
    ///
    /// Events arriving while no observer of their kind is registered are
    /// reported as `ObserverLost`. Events still queued from an earlier
    /// registration are dropped.
    pub fn dispatch(
        &mut self,
        observed: ObservedEvent,
    ) -> Result<Option<BridgeNotification>, AppError> {
        let kind = observed.kind();
        match self.token_for(kind) {
            None => return Err(AppError::ObserverLost(kind.as_str())),
            Some(current) if current != observed.token => {
                trace!(
                    "Dropped {} event from replaced observer {}",
                    kind.as_str(),
                    observed.token
                );
                return Ok(None);
            }
            Some(_) => {}
        }

        let notification = match observed.event {
            PlayerEvent::TimeControlChanged(time_control) => {
                self.time_control = time_control;
                self.status = match (self.status, time_control) {
                    (PlaybackStatus::Failed, _) => PlaybackStatus::Failed,
                    (_, TimeControlStatus::Playing | TimeControlStatus::WaitingToPlay) => {
                        PlaybackStatus::Playing
                    }
                    (PlaybackStatus::Playing, TimeControlStatus::Paused) => PlaybackStatus::Paused,
                    (current, TimeControlStatus::Paused) => current,
                };
                Some(BridgeNotification::TimeControlChanged(time_control))
            }
            PlayerEvent::ItemStatusChanged(item_status) => {
                self.status = match (self.status, item_status) {
                    (_, ItemStatus::Failed) => PlaybackStatus::Failed,
                    (PlaybackStatus::Idle, ItemStatus::ReadyToPlay) => PlaybackStatus::ReadyToPlay,
                    (current, _) => current,
                };
                Some(BridgeNotification::ItemStatusChanged(item_status))
            }
            PlayerEvent::PeriodicTime(time) => {
                if self.time_control == TimeControlStatus::Playing {
                    Some(BridgeNotification::PeriodicTime(time))
                } else {
                    trace!("Suppressed periodic time {:.3}s while not playing", time);
                    None
                }
            }
        };

        Ok(notification)
    }
}
