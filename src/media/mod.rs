//! System media mini-player bridge.
//!
//! The widget never plays audio itself. It mirrors an external player's
//! state and sends transport commands back to it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  snapshots (push)  ┌──────────────────┐
//! │   MediaSession   │───────────────────▶│   MediaBridge    │──▶ watch::Receiver<MediaState>
//! │ (mpris, sim,     │                    │                  │
//! │  feed, mock)     │◀───────────────────│                  │◀── toggle / next / previous
//! └──────────────────┘  commands (spawned)└──────────────────┘
//! ```
//!
//! Sessions are injected into the bridge, so tests substitute
//! [`MockMediaSession`].

mod bridge;
mod error;
mod feed;
mod mpris;
mod simulated;
mod snapshot;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use bridge::{ConnectionStatus, MediaBridge};
pub use error::MediaError;
pub use feed::FeedSession;
pub use mpris::{snapshot_from_player, MprisSession};
pub use simulated::SimulatedSession;
pub use snapshot::{
    percent_of, MediaSnapshot, MediaState, NO_MEDIA_TITLE, UNKNOWN_ARTIST, UNKNOWN_TITLE,
};

// ============================================================================
// TransportCommand
// ============================================================================

/// One-way control request sent to the external player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportCommand {
    TogglePlayPause,
    NextTrack,
    PreviousTrack,
}

impl TransportCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportCommand::TogglePlayPause => "toggle_play_pause",
            TransportCommand::NextTrack => "next_track",
            TransportCommand::PreviousTrack => "previous_track",
        }
    }
}

impl fmt::Display for TransportCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Identifies one subscription handed out by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receiving end of a snapshot channel.
///
/// The channel closing means the subscription broke.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<MediaSnapshot>,
}

impl Subscription {
    pub fn new(id: SubscriptionId, receiver: mpsc::UnboundedReceiver<MediaSnapshot>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next snapshot in arrival order, or `None` once the channel is closed.
    ///
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<MediaSnapshot> {
        self.receiver.recv().await
    }
}

// ============================================================================
// MediaSession
// ============================================================================

/// An external media session the bridge can observe and control.
pub trait MediaSession: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Opens a new snapshot channel.
    fn subscribe(&self) -> Result<Subscription, MediaError>;

    /// Stops delivery into the given subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Asks the player to perform a transport command.
    fn send_command(
        &self,
        command: TransportCommand,
    ) -> impl Future<Output = Result<(), MediaError>> + Send;
}

/// Hands out increasing subscription ids.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator(AtomicU64);

impl IdAllocator {
    pub(crate) fn next(&self) -> SubscriptionId {
        SubscriptionId(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

// ============================================================================
// MockMediaSession
// ============================================================================

/// Locks `mutex`, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Mock media session for testing.
#[derive(Debug, Default)]
pub struct MockMediaSession {
    ids: IdAllocator,
    senders: Mutex<HashMap<SubscriptionId, mpsc::UnboundedSender<MediaSnapshot>>>,
    subscribe_calls: AtomicUsize,
    unsubscribed: Mutex<Vec<SubscriptionId>>,
    commands: Mutex<Vec<TransportCommand>>,
    should_fail_commands: AtomicBool,
    should_fail_subscribe: AtomicBool,
}

impl MockMediaSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail_commands(&self, should_fail: bool) {
        self.should_fail_commands.store(should_fail, Ordering::SeqCst);
    }

    pub fn set_should_fail_subscribe(&self, should_fail: bool) {
        self.should_fail_subscribe.store(should_fail, Ordering::SeqCst);
    }

    /// Delivers a snapshot to every open subscription.
    ///
    /// Returns the number of subscriptions it reached.
    pub fn push_snapshot(&self, snapshot: MediaSnapshot) -> usize {
        let senders = lock(&self.senders);
        senders
            .values()
            .filter(|tx| tx.send(snapshot.clone()).is_ok())
            .count()
    }

    /// Drops every sender, closing all open subscriptions.
    pub fn break_subscriptions(&self) {
        lock(&self.senders).clear();
    }

    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        lock(&self.senders).len()
    }

    #[must_use]
    pub fn subscribe_count(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn unsubscribed(&self) -> Vec<SubscriptionId> {
        lock(&self.unsubscribed).clone()
    }

    #[must_use]
    pub fn commands(&self) -> Vec<TransportCommand> {
        lock(&self.commands).clone()
    }
}

impl MediaSession for MockMediaSession {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn subscribe(&self) -> Result<Subscription, MediaError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail_subscribe.load(Ordering::SeqCst) {
            return Err(MediaError::SubscribeFailed("simulated failure".to_string()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.ids.next();
        lock(&self.senders).insert(id, tx);
        Ok(Subscription::new(id, rx))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.senders).remove(&id);
        lock(&self.unsubscribed).push(id);
    }

    fn send_command(
        &self,
        command: TransportCommand,
    ) -> impl Future<Output = Result<(), MediaError>> + Send {
        let result = if self.should_fail_commands.load(Ordering::SeqCst) {
            Err(MediaError::CommandFailed {
                command,
                reason: "simulated failure".to_string(),
            })
        } else {
            lock(&self.commands).push(command);
            Ok(())
        };
        std::future::ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_transport_command_names() {
        assert_eq!(TransportCommand::TogglePlayPause.as_str(), "toggle_play_pause");
        assert_eq!(TransportCommand::NextTrack.to_string(), "next_track");
        assert_eq!(
            serde_json::to_string(&TransportCommand::PreviousTrack).unwrap(),
            "\"previous_track\""
        );
    }

    #[test]
    fn test_id_allocator_is_increasing() {
        let ids = IdAllocator::default();
        assert_eq!(ids.next(), SubscriptionId(1));
        assert_eq!(ids.next(), SubscriptionId(2));
        assert_eq!(SubscriptionId(2).to_string(), "sub-2");
    }

    #[tokio::test]
    async fn test_mock_delivers_to_open_subscriptions() {
        let mock = MockMediaSession::new();
        let mut sub = mock.subscribe().unwrap();

        assert_eq!(mock.push_snapshot(MediaSnapshot::no_media()), 1);
        assert_eq!(sub.recv().await, Some(MediaSnapshot::no_media()));

        mock.unsubscribe(sub.id());
        assert_eq!(mock.active_subscriptions(), 0);
        assert_eq!(mock.push_snapshot(MediaSnapshot::no_media()), 0);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_mock_records_and_fails_commands() {
        let mock = MockMediaSession::new();
        mock.send_command(TransportCommand::NextTrack).await.unwrap();
        assert_eq!(mock.commands(), vec![TransportCommand::NextTrack]);

        mock.set_should_fail_commands(true);
        let err = mock
            .send_command(TransportCommand::PreviousTrack)
            .await
            .unwrap_err();
        assert!(err.is_transport_error());
        assert_eq!(mock.commands().len(), 1);
    }

    #[test]
    fn test_mock_survives_poisoned_lock() {
        let mock = Arc::new(MockMediaSession::new());
        let poisoner = Arc::clone(&mock);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.commands.lock().unwrap();
            panic!("poison the command log");
        })
        .join();
        assert!(result.is_err());
        assert!(mock.commands.is_poisoned());

        assert!(mock.commands().is_empty());
        assert_eq!(mock.active_subscriptions(), 0);
    }
}
