//! Seek coalescing for scrubbing.
//!
//! Every scroll tick produces a desired time, but the decoder only ever sees
//! one seek at a time. Requests that arrive while a seek is in flight replace
//! each other, and when the in-flight seek completes the coordinator reissues
//! the latest request if it differs from what was just sought. A burst of any
//! length therefore costs at most two decoder seeks: the one already in flight
//! and one for the final position.

use tracing::{debug, trace};

use crate::player::ItemStatus;
use crate::utils::SeekStateError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekState {
    Idle,
    /// A seek is in flight and a newer target is waiting for it to finish
    SeekPending(f64),
    /// A seek for this time is in flight and nothing newer was requested
    Seeking(f64),
}

/// What the caller must do after feeding the coordinator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekDirective {
    /// Pause playback and seek the player to this time
    Issue(f64),
    /// Recorded as the latest target, a seek is already in flight
    Coalesced,
    /// The player reached the latest requested time
    Settled(f64),
    /// Nothing to do
    Unchanged,
}

#[derive(Debug, Default)]
pub struct SeekCoordinator {
    in_flight: Option<f64>,
    last_requested: Option<f64>,
    /// Playback ran while a seek was in flight, so its target must not be
    /// remembered once it settles
    settle_stale: bool,
    issued: u64,
}

impl SeekCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SeekState {
        match (self.in_flight, self.last_requested) {
            (None, _) => SeekState::Idle,
            (Some(issued), Some(latest)) if issued != latest => SeekState::SeekPending(latest),
            (Some(issued), _) => SeekState::Seeking(issued),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    pub fn last_requested(&self) -> Option<f64> {
        self.last_requested
    }

    /// Number of seeks handed to the player since creation
    pub fn issued_count(&self) -> u64 {
        self.issued
    }

    /// Feeds a desired time from a scroll tick.
    ///
    /// `item_status` is the player's current item status at the time of the
    /// request. Starting a new seek without a current item fails and leaves the
    /// coordinator idle with the request forgotten.
    pub fn request(
        &mut self,
        time: f64,
        item_status: Option<ItemStatus>,
    ) -> Result<SeekDirective, SeekStateError> {
        if self.last_requested == Some(time) {
            trace!("Ignoring duplicate seek request for {:.3}s", time);
            return Ok(SeekDirective::Unchanged);
        }

        if self.in_flight.is_some() {
            self.last_requested = Some(time);
            trace!("Coalesced seek request for {:.3}s", time);
            return Ok(SeekDirective::Coalesced);
        }

        if item_status.is_none() {
            return Err(SeekStateError::NoCurrentItem { requested: time });
        }

        self.last_requested = Some(time);
        Ok(self.issue(time))
    }

    /// Reports that the seek for `issued_time` finished (successfully or not).
    pub fn complete(&mut self, issued_time: f64) -> SeekDirective {
        if self.in_flight != Some(issued_time) {
            debug!(
                "Ignoring completion for {:.3}s, in flight is {:?}",
                issued_time, self.in_flight
            );
            return SeekDirective::Unchanged;
        }
        self.in_flight = None;

        match self.last_requested {
            Some(latest) if latest != issued_time => {
                trace!("Seek to {:.3}s is stale, reissuing {:.3}s", issued_time, latest);
                self.issue(latest)
            }
            _ => {
                if std::mem::take(&mut self.settle_stale) {
                    trace!("Forgetting {:.3}s, playback moved during the seek", issued_time);
                    self.last_requested = None;
                }
                SeekDirective::Settled(issued_time)
            }
        }
    }

    /// Playback may move away from the last target, so asking for that time
    /// again must seek again.
    ///
    /// While a seek is in flight the latest target is kept for coalescing and
    /// forgotten when the seek settles.
    pub fn invalidate_settled(&mut self) {
        if self.in_flight.is_none() {
            self.last_requested = None;
        } else {
            self.settle_stale = true;
        }
    }

    /// Forgets everything, used when the asset changes or the session ends
    pub fn reset(&mut self) {
        self.in_flight = None;
        self.last_requested = None;
        self.settle_stale = false;
    }

    fn issue(&mut self, time: f64) -> SeekDirective {
        self.in_flight = Some(time);
        self.issued += 1;
        SeekDirective::Issue(time)
    }
}
