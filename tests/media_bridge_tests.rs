//! Integration tests for the media bridge.
//!
//! Drives a [`MediaBridge`] against [`MockMediaSession`] and the built-in
//! backends:
//! - Snapshots fully replace the displayed state
//! - Transport commands never touch local state
//! - Zero-length tracks are handled without division by zero
//! - Subscription loss and recovery

use std::sync::Arc;
use std::time::Duration;

use tempfile::NamedTempFile;

use pomodoro_widget::media::{NO_MEDIA_TITLE, UNKNOWN_ARTIST, UNKNOWN_TITLE};
use pomodoro_widget::{
    ConnectionStatus, FeedSession, ManualClock, MediaBridge, MediaConfig, MediaSession,
    MediaSnapshot, MediaState, MockMediaSession, RetryPolicy, SimulatedSession, TransportCommand,
};

// ============================================================================
// Test Helpers
// ============================================================================

type TestBridge = MediaBridge<MockMediaSession, Arc<ManualClock>>;

fn create_bridge() -> (TestBridge, Arc<MockMediaSession>, Arc<ManualClock>) {
    let session = Arc::new(MockMediaSession::new());
    let clock = Arc::new(ManualClock::new());
    let bridge = MediaBridge::with_clock(session.clone(), RetryPolicy::default(), clock.clone());
    (bridge, session, clock)
}

fn full_snapshot() -> MediaSnapshot {
    MediaSnapshot {
        title: Some("First Song".to_string()),
        artist: Some("First Band".to_string()),
        is_playing: true,
        album_art_url: Some("https://i.example/first.jpg".to_string()),
        current_time_ms: Some(30_000.0),
        total_time_ms: Some(200_000.0),
    }
}

async fn deliver(bridge: &mut TestBridge, session: &MockMediaSession, snapshot: MediaSnapshot) {
    assert_eq!(session.push_snapshot(snapshot), 1);
    let received = bridge.next_snapshot().await.expect("subscription open");
    bridge.apply_snapshot(received);
}

// ============================================================================
// Snapshot replacement
// ============================================================================

#[tokio::test]
async fn test_second_snapshot_overwrites_every_field() {
    let (mut bridge, session, _clock) = create_bridge();
    bridge.activate().unwrap();

    deliver(&mut bridge, &session, full_snapshot()).await;
    assert_eq!(bridge.state().title.as_deref(), Some("First Song"));

    deliver(
        &mut bridge,
        &session,
        MediaSnapshot {
            title: None,
            artist: None,
            is_playing: false,
            album_art_url: None,
            current_time_ms: None,
            total_time_ms: None,
        },
    )
    .await;

    assert_eq!(*bridge.state(), MediaState::no_media());
    assert_eq!(bridge.state().display_title(), NO_MEDIA_TITLE);
}

#[tokio::test]
async fn test_partial_snapshot_uses_placeholders() {
    let (mut bridge, session, _clock) = create_bridge();
    bridge.activate().unwrap();

    deliver(&mut bridge, &session, full_snapshot()).await;
    deliver(
        &mut bridge,
        &session,
        MediaSnapshot {
            title: None,
            artist: None,
            ..full_snapshot()
        },
    )
    .await;

    let state = bridge.state();
    assert_eq!(state.display_title(), UNKNOWN_TITLE);
    assert_eq!(state.display_artist(), Some(UNKNOWN_ARTIST));
    assert_eq!(state.album_art_url.as_deref(), Some("https://i.example/first.jpg"));
}

#[tokio::test]
async fn test_json_snapshot_round_trip_through_bridge() {
    let (mut bridge, session, _clock) = create_bridge();
    bridge.activate().unwrap();

    let snapshot = MediaSnapshot::from_json(
        r#"{"title":"Wire","is_playing":false,"current_time_ms":-50,"total_time_ms":1000}"#,
    )
    .unwrap();
    deliver(&mut bridge, &session, snapshot).await;

    assert_eq!(bridge.state().position_ms, 0);
    assert_eq!(bridge.state().duration_ms, 1_000);
    assert_eq!(bridge.state().artist, None);
}

// ============================================================================
// Transport commands
// ============================================================================

#[tokio::test]
async fn test_toggle_play_pause_never_mutates_is_playing() {
    let (mut bridge, session, _clock) = create_bridge();
    bridge.activate().unwrap();
    deliver(&mut bridge, &session, full_snapshot()).await;

    bridge.toggle_play_pause().await.unwrap();
    assert!(bridge.state().is_playing);

    session.set_should_fail_commands(true);
    bridge.toggle_play_pause().await.unwrap();
    assert!(bridge.state().is_playing);

    assert_eq!(session.commands(), vec![TransportCommand::TogglePlayPause]);
}

#[tokio::test]
async fn test_commands_without_subscription_still_dispatch() {
    let (bridge, session, _clock) = create_bridge();

    bridge.next_track().await.unwrap();
    bridge.previous_track().await.unwrap();

    assert_eq!(
        session.commands(),
        vec![TransportCommand::NextTrack, TransportCommand::PreviousTrack]
    );
}

// ============================================================================
// Zero duration
// ============================================================================

#[tokio::test]
async fn test_zero_duration_reports_zero_progress() {
    let (mut bridge, session, clock) = create_bridge();
    bridge.activate().unwrap();

    for total in [Some(0.0), Some(-10.0), Some(f64::NAN), None] {
        deliver(
            &mut bridge,
            &session,
            MediaSnapshot {
                total_time_ms: total,
                current_time_ms: Some(5_000.0),
                ..full_snapshot()
            },
        )
        .await;
        clock.advance(Duration::from_secs(1));

        assert_eq!(bridge.state().position_ms, 0);
        assert_eq!(bridge.state().duration_ms, 0);
        assert_eq!(bridge.state().progress_percent(), 0.0);
        assert_eq!(bridge.displayed_progress_percent(), 0.0);
    }
}

// ============================================================================
// Subscription lifecycle
// ============================================================================

#[tokio::test]
async fn test_deactivate_stops_delivery() {
    let (mut bridge, session, _clock) = create_bridge();
    bridge.activate().unwrap();
    bridge.deactivate();

    assert_eq!(session.push_snapshot(full_snapshot()), 0);
    assert_eq!(bridge.status(), ConnectionStatus::Inactive);
    assert_eq!(*bridge.state(), MediaState::no_media());
}

#[tokio::test]
async fn test_recovers_after_channel_break() {
    let (mut bridge, session, _clock) = create_bridge();
    bridge.activate().unwrap();
    deliver(&mut bridge, &session, full_snapshot()).await;

    session.break_subscriptions();
    assert_eq!(bridge.next_snapshot().await, None);
    assert!(bridge.handle_subscription_lost().is_some());

    assert_eq!(bridge.retry_subscription(), None);
    assert!(bridge.is_subscribed());
    deliver(
        &mut bridge,
        &session,
        MediaSnapshot {
            title: Some("Second Song".to_string()),
            ..full_snapshot()
        },
    )
    .await;

    assert_eq!(bridge.state().title.as_deref(), Some("Second Song"));
    assert_eq!(bridge.status(), ConnectionStatus::Connected);
}

// ============================================================================
// Built-in backends
// ============================================================================

#[tokio::test]
async fn test_simulated_backend_drives_bridge() {
    let config = MediaConfig {
        poll_interval_ms: 100,
        ..MediaConfig::default()
    };
    let session = Arc::new(SimulatedSession::new(&config));
    let mut bridge = MediaBridge::new(session.clone(), RetryPolicy::default());
    bridge.activate().unwrap();

    let snapshot = bridge.next_snapshot().await.unwrap();
    bridge.apply_snapshot(snapshot);
    assert!(bridge.state().has_media());
    assert!(bridge.state().is_playing);

    bridge.toggle_play_pause().await.unwrap();
    assert!(!session.current().is_playing);

    bridge.deactivate();
}

#[tokio::test]
async fn test_feed_backend_reads_snapshots_then_closes() {
    let feed = NamedTempFile::new().unwrap();
    std::fs::write(
        feed.path(),
        concat!(
            "{\"title\":\"One\",\"artist\":\"A\",\"is_playing\":true,\"current_time_ms\":1000,\"total_time_ms\":60000}\n",
            "not json\n",
            "\n",
            "{\"title\":\"Two\",\"is_playing\":false}\n",
        ),
    )
    .unwrap();

    let session = Arc::new(FeedSession::new(feed.path()));
    let mut bridge = MediaBridge::new(session.clone(), RetryPolicy::disabled());
    bridge.activate().unwrap();

    let first = bridge.next_snapshot().await.unwrap();
    bridge.apply_snapshot(first);
    assert_eq!(bridge.state().title.as_deref(), Some("One"));
    assert_eq!(bridge.state().duration_ms, 60_000);

    let second = bridge.next_snapshot().await.unwrap();
    bridge.apply_snapshot(second);
    assert_eq!(bridge.state().title.as_deref(), Some("Two"));
    assert_eq!(bridge.state().artist, None);

    assert_eq!(bridge.next_snapshot().await, None);
    assert_eq!(bridge.handle_subscription_lost(), None);
    assert_eq!(bridge.status(), ConnectionStatus::Disconnected);

    let err = session
        .send_command(TransportCommand::NextTrack)
        .await
        .unwrap_err();
    assert!(err.is_transport_error());
}

#[tokio::test]
async fn test_replayed_feed_exhausts_default_retry_budget() {
    let feed = NamedTempFile::new().unwrap();
    std::fs::write(
        feed.path(),
        "{\"title\":\"Stale\",\"is_playing\":true,\"current_time_ms\":0,\"total_time_ms\":60000}\n",
    )
    .unwrap();

    let policy = RetryPolicy::default();
    let clock = Arc::new(ManualClock::new());
    let session = Arc::new(FeedSession::new(feed.path()));
    let mut bridge = MediaBridge::with_clock(session, policy, clock.clone());
    bridge.activate().unwrap();

    // Every resubscribe reopens the file and replays the same line
    let mut subscribes = 1;
    let mut applied = 0;
    while subscribes <= 20 {
        match bridge.next_snapshot().await {
            Some(snapshot) => {
                bridge.apply_snapshot(snapshot);
                applied += 1;
            }
            None => match bridge.handle_subscription_lost() {
                Some(delay) => {
                    clock.advance(delay);
                    assert_eq!(bridge.retry_subscription(), None);
                    subscribes += 1;
                }
                None => break,
            },
        }
    }

    assert_eq!(subscribes, 1 + policy.max_attempts);
    assert_eq!(applied, subscribes);
    assert_eq!(bridge.status(), ConnectionStatus::Disconnected);
    assert_eq!(*bridge.state(), MediaState::no_media());
    assert!(!bridge.is_subscribed());
}
