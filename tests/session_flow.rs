mod common;

use common::mocks::MockPlayer;
use common::{next_event, test_config, wait_for_snapshot, wait_until};
use filmstrip::events::{EventPayload, SessionEventKind};
use filmstrip::player::{ItemStatus, PlayPauseIcon, PlaybackStatus, PlayerEvent, TimeControlStatus};
use filmstrip::scrubber::SeekState;
use filmstrip::utils::{AppError, LoadError, SeekStateError};
use filmstrip::{ScrollUpdate, SessionHandle, spawn_session};
use std::sync::Arc;
use std::time::Duration;

const CONTENT_LENGTH: f64 = 256.0;

/// Needle at the scroll origin, so offsets map straight to ratios
fn drag_to(offset: f64) -> ScrollUpdate {
    ScrollUpdate {
        content_offset: offset,
        center_inset: 0.0,
        content_length: CONTENT_LENGTH,
        user_driven: true,
    }
}

async fn loaded_session(player: MockPlayer) -> (SessionHandle, Arc<MockPlayer>) {
    let player = Arc::new(player);
    let (handle, _task) = spawn_session(player.clone(), &test_config()).unwrap();
    handle.load_asset("/media/clip.mp4").await.unwrap();
    wait_for_snapshot(&handle, |s| s.controls_visible).await;
    (handle, player)
}

#[tokio::test]
async fn test_scrub_burst_issues_two_seeks() {
    let (handle, player) = loaded_session(MockPlayer::new(64.0).with_gated_seeks()).await;

    // 16 ticks, each 4 seconds further
    for step in 1..=16 {
        handle.scroll(drag_to(step as f64 * 16.0)).unwrap();
    }

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::SeekPending(64.0));
    assert_eq!(snapshot.time_label, "01:04");
    wait_until(|| player.seeks().len() == 1).await;

    player.release_seeks(10);
    let snapshot = wait_for_snapshot(&handle, |s| s.seek_state == SeekState::Idle).await;

    assert_eq!(player.seeks(), vec![4.0, 64.0]);
    assert_eq!(snapshot.seeks_issued, 2);
    assert_eq!(snapshot.ratio, 1.0);
}

#[tokio::test]
async fn test_seeking_pauses_and_never_resumes() {
    let (handle, player) = loaded_session(MockPlayer::new(64.0)).await;
    handle.play().await.unwrap();
    wait_for_snapshot(&handle, |s| s.status == PlaybackStatus::Playing).await;

    handle.scroll(drag_to(32.0)).unwrap();
    let snapshot = wait_for_snapshot(&handle, |s| {
        s.seek_state == SeekState::Idle && s.status == PlaybackStatus::Paused
    })
    .await;

    assert_eq!(player.seeks(), vec![8.0]);
    assert!(player.pauses() >= 1);
    assert_eq!(player.plays(), 1);
    assert_eq!(snapshot.play_pause_icon, PlayPauseIcon::Play);
}

#[tokio::test]
async fn test_duplicate_ticks_seek_once() {
    let (handle, player) = loaded_session(MockPlayer::new(64.0)).await;

    for _ in 0..5 {
        handle.scroll(drag_to(48.0)).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    wait_for_snapshot(&handle, |s| s.seek_state == SeekState::Idle).await;
    assert_eq!(player.seeks(), vec![12.0]);
}

#[tokio::test]
async fn test_programmatic_offsets_do_not_seek() {
    let (handle, player) = loaded_session(MockPlayer::new(64.0)).await;

    handle
        .scroll(ScrollUpdate {
            user_driven: false,
            ..drag_to(128.0)
        })
        .unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seeks_issued, 0);
    assert!(player.seeks().is_empty());
}

#[tokio::test]
async fn test_periodic_time_only_echoes_while_playing() {
    let (handle, player) = loaded_session(MockPlayer::new(60.0)).await;
    let mut offsets = handle
        .events()
        .subscribe_to_kinds(vec![SessionEventKind::ScrubberOffsetUpdate]);

    // Paused, so this must not move the scrubber
    player.emit(PlayerEvent::PeriodicTime(5.0));
    handle.play().await.unwrap();
    player.emit(PlayerEvent::PeriodicTime(6.0));

    let event = next_event(&mut offsets).await;
    assert!(matches!(event.payload, EventPayload::ScrubberOffsetUpdate(ratio) if ratio == 0.1));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.time_label, "00:06");
}

#[tokio::test]
async fn test_periodic_time_is_dropped_during_seek() {
    let (handle, player) = loaded_session(MockPlayer::new(64.0).with_gated_seeks()).await;
    let mut events = handle.events().subscribe_to_kinds(vec![
        SessionEventKind::ScrubberOffsetUpdate,
        SessionEventKind::PlayPauseIconChanged,
    ]);

    handle.scroll(drag_to(64.0)).unwrap();
    wait_until(|| player.seeks().len() == 1).await;

    player.emit(PlayerEvent::TimeControlChanged(TimeControlStatus::Playing));
    player.emit(PlayerEvent::PeriodicTime(30.0));
    player.emit(PlayerEvent::TimeControlChanged(TimeControlStatus::Paused));

    // The icon flips in delivery order with no scrubber move in between
    let event = next_event(&mut events).await;
    assert!(matches!(event.payload, EventPayload::PlayPauseIconChanged(PlayPauseIcon::Pause)));
    let event = next_event(&mut events).await;
    assert!(matches!(event.payload, EventPayload::PlayPauseIconChanged(PlayPauseIcon::Play)));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::Seeking(16.0));
    assert_eq!(snapshot.time_label, "00:16");
    assert_eq!(snapshot.ratio, 0.25);
}

#[tokio::test]
async fn test_play_at_end_replays_from_start() {
    let (handle, player) = loaded_session(MockPlayer::new(10.0)).await;
    player.set_position(10.0);

    handle.play().await.unwrap();
    wait_until(|| player.plays() == 1).await;

    assert_eq!(player.seeks(), vec![0.0]);
    let snapshot = wait_for_snapshot(&handle, |s| s.status == PlaybackStatus::Playing).await;
    assert_eq!(snapshot.time_label, "00:00");
}

#[tokio::test]
async fn test_scrubbing_cancels_replay() {
    let (handle, player) =
        loaded_session(MockPlayer::new(10.0).with_gated_seeks()).await;
    player.set_position(10.0);

    handle.play().await.unwrap();
    handle.scroll(drag_to(128.0)).unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::SeekPending(5.0));
    player.release_seeks(10);

    wait_for_snapshot(&handle, |s| s.seek_state == SeekState::Idle).await;
    assert_eq!(player.seeks(), vec![0.0, 5.0]);
    assert_eq!(player.plays(), 0);
}

#[tokio::test]
async fn test_replay_after_playing_through_a_seek_to_start() {
    let (handle, player) = loaded_session(MockPlayer::new(10.0).with_gated_seeks()).await;

    handle.scroll(drag_to(0.0)).unwrap();
    wait_until(|| player.seeks().len() == 1).await;
    handle.play().await.unwrap();
    wait_for_snapshot(&handle, |s| s.status == PlaybackStatus::Playing).await;
    player.release_seeks(10);
    wait_for_snapshot(&handle, |s| s.seek_state == SeekState::Idle).await;
    assert_eq!(player.plays(), 1);

    // Playback reaches the end
    player.set_position(10.0);
    player.emit(PlayerEvent::TimeControlChanged(TimeControlStatus::Paused));
    wait_for_snapshot(&handle, |s| s.status == PlaybackStatus::Paused).await;

    handle.play().await.unwrap();
    wait_until(|| player.plays() == 2).await;
    assert_eq!(player.seeks(), vec![0.0, 0.0]);
}

#[tokio::test]
async fn test_scrub_back_to_target_after_playback_seeks_again() {
    let (handle, player) = loaded_session(MockPlayer::new(10.0).with_gated_seeks()).await;

    handle.scroll(drag_to(64.0)).unwrap();
    wait_until(|| player.seeks().len() == 1).await;
    handle.play().await.unwrap();
    wait_for_snapshot(&handle, |s| s.status == PlaybackStatus::Playing).await;
    player.release_seeks(10);
    wait_for_snapshot(&handle, |s| s.seek_state == SeekState::Idle).await;

    player.set_position(7.0);
    player.emit(PlayerEvent::TimeControlChanged(TimeControlStatus::Paused));
    wait_for_snapshot(&handle, |s| s.status == PlaybackStatus::Paused).await;

    handle.scroll(drag_to(64.0)).unwrap();
    wait_until(|| player.seeks().len() == 2).await;
    assert_eq!(player.seeks(), vec![2.5, 2.5]);
}

#[tokio::test]
async fn test_seek_without_item_reports_error() {
    let (handle, player) = loaded_session(MockPlayer::new(64.0)).await;
    let mut errors = handle
        .events()
        .subscribe_to_kinds(vec![SessionEventKind::SeekError]);

    player.set_item_status(None);
    handle.scroll(drag_to(64.0)).unwrap();

    let event = next_event(&mut errors).await;
    assert!(matches!(
        event.payload,
        EventPayload::SeekError(SeekStateError::NoCurrentItem { requested }) if requested == 16.0
    ));
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.seek_state, SeekState::Idle);

    // The rejected time was not remembered, so the same tick now seeks
    player.set_item_status(Some(ItemStatus::ReadyToPlay));
    handle.scroll(drag_to(64.0)).unwrap();
    wait_for_snapshot(&handle, |s| s.seeks_issued == 1 && s.seek_state == SeekState::Idle).await;
    assert_eq!(player.seeks(), vec![16.0]);
}

#[tokio::test]
async fn test_controls_and_icon_follow_player() {
    let player = Arc::new(MockPlayer::new(30.0));
    let (handle, _task) = spawn_session(player.clone(), &test_config()).unwrap();
    let mut controls = handle.events().subscribe_to_kinds(vec![
        SessionEventKind::ControlsVisibilityChanged,
        SessionEventKind::PlayPauseIconChanged,
    ]);

    handle.load_asset("/media/clip.mp4").await.unwrap();
    let event = next_event(&mut controls).await;
    assert!(matches!(event.payload, EventPayload::ControlsVisibilityChanged(true)));

    handle.toggle_play_pause().await.unwrap();
    let event = next_event(&mut controls).await;
    assert!(matches!(event.payload, EventPayload::PlayPauseIconChanged(PlayPauseIcon::Pause)));

    player.emit(PlayerEvent::TimeControlChanged(TimeControlStatus::WaitingToPlay));
    handle.toggle_play_pause().await.unwrap();
    let event = next_event(&mut controls).await;
    assert!(matches!(event.payload, EventPayload::PlayPauseIconChanged(PlayPauseIcon::Play)));

    player.emit(PlayerEvent::ItemStatusChanged(ItemStatus::Failed));
    let event = next_event(&mut controls).await;
    assert!(matches!(event.payload, EventPayload::ControlsVisibilityChanged(false)));
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, PlaybackStatus::Failed);
}

#[tokio::test]
async fn test_rejected_asset_fails_session() {
    let player = Arc::new(MockPlayer::new(30.0).with_load_error(LoadError::ProtectedContent));
    let (handle, _task) = spawn_session(player.clone(), &test_config()).unwrap();
    let mut failures = handle
        .events()
        .subscribe_to_kinds(vec![SessionEventKind::LoadFailed]);

    let err = handle.load_asset("/media/drm.mp4").await.unwrap_err();
    assert!(matches!(err, AppError::Load(LoadError::ProtectedContent)));

    let event = next_event(&mut failures).await;
    assert!(matches!(event.payload, EventPayload::LoadFailed(LoadError::ProtectedContent)));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.status, PlaybackStatus::Failed);
    assert!(!snapshot.controls_visible);
    assert_eq!(player.observer_count(), 0);
}

#[tokio::test]
async fn test_teardown_releases_player() {
    let player = Arc::new(
        MockPlayer::new(60.0).with_frame_delay(|_| Duration::from_millis(30)),
    );
    let (handle, task) = spawn_session(player.clone(), &test_config()).unwrap();
    handle.load_asset("/media/clip.mp4").await.unwrap();
    assert_eq!(player.observer_count(), 3);

    handle.teardown().await.unwrap();
    task.await.unwrap();
    assert_eq!(player.observer_count(), 0);

    // Thumbnails still in flight finish into a closed session
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(matches!(handle.snapshot().await, Err(AppError::SessionClosed)));
}
