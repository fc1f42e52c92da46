//! Keeps the widget's media state in step with an external session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::types::RetryPolicy;

use super::error::MediaError;
use super::snapshot::{percent_of, MediaSnapshot, MediaState};
use super::{MediaSession, Subscription, TransportCommand};

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Health of the snapshot channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Never activated, or deactivated
    #[default]
    Inactive,
    /// Subscribed and receiving snapshots
    Connected,
    /// Channel broke; the last snapshot stays visible while retrying
    Reconnecting {
        /// 1-based retry attempt currently scheduled
        attempt: u32,
    },
    /// Retries exhausted; showing the "no media" sentinel
    Disconnected,
}

// ============================================================================
// MediaBridge
// ============================================================================

/// Mirrors an external media session and forwards transport commands to it.
///
/// Snapshots replace the whole [`MediaState`]; commands never touch it. Every
/// applied state is published on a `watch` channel.
pub struct MediaBridge<S: MediaSession, C: Clock = SystemClock> {
    session: Arc<S>,
    clock: C,
    state: MediaState,
    /// When the current state arrived, for position extrapolation
    snapshot_at: Option<Instant>,
    subscription: Option<Subscription>,
    /// When the current subscription was opened
    subscribed_at: Option<Instant>,
    status: ConnectionStatus,
    retry: RetryPolicy,
    retry_attempt: u32,
    changes: watch::Sender<MediaState>,
}

impl<S: MediaSession> MediaBridge<S, SystemClock> {
    /// Creates an inactive bridge on the system clock.
    pub fn new(session: Arc<S>, retry: RetryPolicy) -> Self {
        Self::with_clock(session, retry, SystemClock)
    }
}

impl<S: MediaSession, C: Clock> MediaBridge<S, C> {
    /// Creates an inactive bridge reading time from `clock`.
    pub fn with_clock(session: Arc<S>, retry: RetryPolicy, clock: C) -> Self {
        let (changes, _) = watch::channel(MediaState::no_media());
        Self {
            session,
            clock,
            state: MediaState::no_media(),
            snapshot_at: None,
            subscription: None,
            subscribed_at: None,
            status: ConnectionStatus::Inactive,
            retry,
            retry_attempt: 0,
            changes,
        }
    }

    /// Subscribes to the session's snapshot channel.
    ///
    /// Any previous subscription is torn down first, so at most one is ever
    /// open.
    pub fn activate(&mut self) -> Result<(), MediaError> {
        self.release_subscription();

        let subscription = self.session.subscribe()?;
        info!(
            session = self.session.name(),
            subscription = %subscription.id(),
            "media subscription established"
        );
        self.subscription = Some(subscription);
        self.subscribed_at = Some(self.clock.now());
        self.status = ConnectionStatus::Connected;
        Ok(())
    }

    /// Unsubscribes. When this returns no more snapshots will be delivered.
    pub fn deactivate(&mut self) {
        self.release_subscription();
        self.status = ConnectionStatus::Inactive;
    }

    fn release_subscription(&mut self) {
        self.subscribed_at = None;
        if let Some(subscription) = self.subscription.take() {
            debug!(subscription = %subscription.id(), "tearing down media subscription");
            self.session.unsubscribe(subscription.id());
        }
    }

    /// Waits for the next inbound snapshot.
    ///
    /// Returns `None` when the channel breaks; the caller should then ask
    /// [`MediaBridge::handle_subscription_lost`] what to do. Without an open
    /// subscription this never resolves. Cancel safe.
    pub async fn next_snapshot(&mut self) -> Option<MediaSnapshot> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Replaces the displayed state with `snapshot`.
    ///
    /// The retry budget is restored only once the subscription has stayed up
    /// for the policy's stability window. A source that replays a few
    /// snapshots and closes again keeps spending attempts.
    pub fn apply_snapshot(&mut self, snapshot: MediaSnapshot) {
        let now = self.clock.now();
        self.state = MediaState::from(snapshot);
        self.snapshot_at = Some(now);
        if self.retry_attempt > 0 && self.is_stable(now) {
            debug!(attempt = self.retry_attempt, "media subscription stable; retry budget restored");
            self.retry_attempt = 0;
        }
        if self.subscription.is_some() {
            self.status = ConnectionStatus::Connected;
        }
        self.changes.send_replace(self.state.clone());
    }

    fn is_stable(&self, now: Instant) -> bool {
        self.subscription.is_some()
            && self.subscribed_at.is_some_and(|at| {
                now.saturating_duration_since(at)
                    >= Duration::from_millis(self.retry.stable_after_ms)
            })
    }

    /// Records a broken snapshot channel.
    ///
    /// Returns the delay before the next resubscribe attempt, or `None` when
    /// the retry budget is spent, in which case the bridge has degraded to the
    /// "no media" state.
    pub fn handle_subscription_lost(&mut self) -> Option<Duration> {
        self.subscribed_at = None;
        if let Some(subscription) = self.subscription.take() {
            warn!(
                session = self.session.name(),
                subscription = %subscription.id(),
                "media subscription lost"
            );
            self.session.unsubscribe(subscription.id());
        }

        self.retry_attempt += 1;
        match self.retry.delay_for(self.retry_attempt) {
            Some(delay) => {
                self.status = ConnectionStatus::Reconnecting {
                    attempt: self.retry_attempt,
                };
                debug!(attempt = self.retry_attempt, ?delay, "scheduling media resubscribe");
                Some(delay)
            }
            None => {
                self.degrade();
                None
            }
        }
    }

    /// Runs a scheduled resubscribe attempt.
    ///
    /// Returns the delay before the next attempt if this one failed.
    pub fn retry_subscription(&mut self) -> Option<Duration> {
        match self.activate() {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, attempt = self.retry_attempt, "media resubscribe failed");
                self.handle_subscription_lost()
            }
        }
    }

    fn degrade(&mut self) {
        warn!(
            session = self.session.name(),
            "giving up on media session; showing no media"
        );
        self.status = ConnectionStatus::Disconnected;
        self.state = MediaState::no_media();
        self.snapshot_at = None;
        self.changes.send_replace(self.state.clone());
    }

    // ------------------------------------------------------------------------
    // Transport commands
    // ------------------------------------------------------------------------

    /// Asks the player to toggle play/pause. Does not touch local state.
    pub fn toggle_play_pause(&self) -> JoinHandle<()> {
        self.dispatch(TransportCommand::TogglePlayPause)
    }

    pub fn next_track(&self) -> JoinHandle<()> {
        self.dispatch(TransportCommand::NextTrack)
    }

    pub fn previous_track(&self) -> JoinHandle<()> {
        self.dispatch(TransportCommand::PreviousTrack)
    }

    /// Sends `command` on a spawned task and returns immediately.
    ///
    /// The outcome is only logged; the authoritative result arrives later as
    /// a snapshot.
    pub fn dispatch(&self, command: TransportCommand) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        debug!(%command, session = session.name(), "dispatching transport command");
        tokio::spawn(async move {
            match session.send_command(command).await {
                Ok(()) => debug!(%command, "transport command delivered"),
                Err(e) => warn!(%command, error = %e, "transport command failed"),
            }
        })
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> &MediaState {
        &self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Receiver that observes every state the bridge applies.
    pub fn changes(&self) -> watch::Receiver<MediaState> {
        self.changes.subscribe()
    }

    /// Position to display, advanced locally since the last snapshot while
    /// playing and capped at the track length.
    pub fn displayed_position_ms(&self) -> u64 {
        if self.state.duration_ms == 0 {
            return 0;
        }
        if !self.state.is_playing {
            return self.state.position_ms;
        }
        let elapsed = self
            .snapshot_at
            .map(|at| self.clock.now().saturating_duration_since(at))
            .unwrap_or_default();
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.state
            .position_ms
            .saturating_add(elapsed_ms)
            .min(self.state.duration_ms)
    }

    pub fn displayed_progress_percent(&self) -> f64 {
        percent_of(self.displayed_position_ms(), self.state.duration_ms)
    }
}

impl<S: MediaSession, C: Clock> Drop for MediaBridge<S, C> {
    fn drop(&mut self) {
        self.release_subscription();
    }
}

// ============================================================================
// Tests
// ============================================================================
