#![allow(dead_code)]

pub mod mocks;

use filmstrip::events::{EventSubscriber, SessionEvent};
use filmstrip::{Config, SessionHandle, SessionSnapshot};
use std::time::Duration;

const WAIT_LIMIT: Duration = Duration::from_secs(2);

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.thumbnails.max_concurrent_extractions = 3;
    config
}

/// Next event from `events`, failing the test if nothing arrives in time
pub async fn next_event(events: &mut EventSubscriber) -> SessionEvent {
    tokio::time::timeout(WAIT_LIMIT, events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event bus closed")
}

pub async fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !done() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub async fn wait_for_snapshot(
    handle: &SessionHandle,
    mut done: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    loop {
        let snapshot = handle.snapshot().await.expect("session closed");
        if done(&snapshot) {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session did not reach the expected state: {:?}",
            snapshot
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
