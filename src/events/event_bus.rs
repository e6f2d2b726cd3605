use super::types::{EventPayload, SessionEvent, SessionEventKind};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{trace, warn};

use crate::constants::{DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_EVENT_HISTORY_SIZE};
use crate::player::PlayPauseIcon;
use crate::utils::format_timestamp;

/// Event subscriber handle
pub struct EventSubscriber {
    receiver: broadcast::Receiver<SessionEvent>,
    filter: Option<EventFilter>,
}

impl EventSubscriber {
    pub fn new(receiver: broadcast::Receiver<SessionEvent>, filter: Option<EventFilter>) -> Self {
        Self { receiver, filter }
    }

    fn wanted(&self, event: &SessionEvent) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter.matches(event))
    }

    /// Receive the next event matching the filter.
    ///
    /// A subscriber that fell behind skips the events it missed and carries on
    /// with the oldest one still buffered.
    pub async fn recv(&mut self) -> Result<SessionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.wanted(&event) {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Try to receive without blocking
    pub fn try_recv(&mut self) -> Result<Option<SessionEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.wanted(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Event filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    kinds: Option<Vec<SessionEventKind>>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kinds(mut self, kinds: Vec<SessionEventKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn matches(&self, event: &SessionEvent) -> bool {
        if let Some(ref kinds) = self.kinds
            && !kinds.contains(&event.kind())
        {
            return false;
        }
        true
    }
}

/// Broadcasts session events to any number of UI subscribers
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
    stats: Arc<RwLock<EventBusStats>>,
    event_history: Arc<RwLock<Vec<SessionEvent>>>,
    max_history_size: usize,
}

#[derive(Debug, Default, Clone)]
pub struct EventBusStats {
    pub total_events: u64,
    pub events_by_kind: HashMap<String, u64>,
    pub subscriber_count: usize,
    pub dropped_events: u64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_EVENT_HISTORY_SIZE)
    }
}

impl EventBus {
    /// Create a new event bus with specified buffer capacity
    pub fn new(capacity: usize, max_history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self {
            sender,
            stats: Arc::new(RwLock::new(EventBusStats::default())),
            event_history: Arc::new(RwLock::new(Vec::new())),
            max_history_size,
        }
    }

    /// Publish an event to all subscribers
    pub async fn publish(&self, event: SessionEvent) {
        trace!("Publishing event: {}", event.kind().as_str());

        {
            let mut stats = self.stats.write().await;
            stats.total_events += 1;
            *stats
                .events_by_kind
                .entry(event.kind().as_str().to_string())
                .or_insert(0) += 1;
        }

        {
            let mut history = self.event_history.write().await;
            history.push(event.clone());

            if history.len() > self.max_history_size {
                let excess = history.len() - self.max_history_size;
                history.drain(0..excess);
            }
        }

        if self.sender.send(event).is_err() {
            // No subscribers is normal, don't log
            self.stats.write().await.dropped_events += 1;
        }
    }

    pub async fn emit(&self, payload: EventPayload) {
        self.publish(SessionEvent::new(payload)).await
    }

    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber::new(self.sender.subscribe(), None)
    }

    pub fn subscribe_filtered(&self, filter: EventFilter) -> EventSubscriber {
        EventSubscriber::new(self.sender.subscribe(), Some(filter))
    }

    pub fn subscribe_to_kinds(&self, kinds: Vec<SessionEventKind>) -> EventSubscriber {
        self.subscribe_filtered(EventFilter::new().with_kinds(kinds))
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub async fn get_stats(&self) -> EventBusStats {
        let stats = self.stats.read().await;
        EventBusStats {
            subscriber_count: self.subscriber_count(),
            ..stats.clone()
        }
    }

    /// Get event history for debugging
    pub async fn get_history(&self) -> Vec<SessionEvent> {
        self.event_history.read().await.clone()
    }

    pub async fn clear_history(&self) {
        self.event_history.write().await.clear();
    }

    /// Emit the elapsed time readout for `seconds`
    pub async fn emit_time_label(&self, seconds: f64) {
        self.emit(EventPayload::TimeLabelUpdate(format_timestamp(seconds)))
            .await
    }

    pub async fn emit_scrubber_offset(&self, ratio: f64) {
        self.emit(EventPayload::ScrubberOffsetUpdate(ratio)).await
    }

    pub async fn emit_controls_visibility(&self, visible: bool) {
        self.emit(EventPayload::ControlsVisibilityChanged(visible))
            .await
    }

    pub async fn emit_play_pause_icon(&self, icon: PlayPauseIcon) {
        self.emit(EventPayload::PlayPauseIconChanged(icon)).await
    }

    pub async fn emit_diagnostic(&self, message: impl Into<String>) {
        self.emit(EventPayload::Diagnostic(message.into())).await
    }
}
