//! A synthetic player for platforms without a system media API.
//!
//! Plays an endless album of fixed-length tracks and honours transport
//! commands, so the whole widget can be exercised without a real player.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::types::MediaConfig;

use super::error::MediaError;
use super::snapshot::MediaSnapshot;
use super::{lock, IdAllocator, MediaSession, Subscription, SubscriptionId, TransportCommand};

/// Length of every simulated track.
pub const TRACK_LENGTH_MS: u64 = 240_000;

/// "Previous" restarts the current track after this much playback.
const RESTART_THRESHOLD_MS: u64 = 3_000;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SimulatedPlayer {
    track: u32,
    position_ms: u64,
    is_playing: bool,
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self {
            track: 1,
            position_ms: 0,
            is_playing: true,
        }
    }
}

impl SimulatedPlayer {
    fn advance(&mut self, by_ms: u64) {
        if !self.is_playing {
            return;
        }
        self.position_ms += by_ms;
        while self.position_ms >= TRACK_LENGTH_MS {
            self.position_ms -= TRACK_LENGTH_MS;
            self.track += 1;
        }
    }

    fn apply(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::TogglePlayPause => self.is_playing = !self.is_playing,
            TransportCommand::NextTrack => {
                self.track += 1;
                self.position_ms = 0;
            }
            TransportCommand::PreviousTrack => {
                if self.position_ms < RESTART_THRESHOLD_MS {
                    self.track = self.track.saturating_sub(1).max(1);
                }
                self.position_ms = 0;
            }
        }
    }

    fn snapshot(&self) -> MediaSnapshot {
        MediaSnapshot {
            title: Some(format!("Simulated Track {}", self.track)),
            artist: Some("Simulated Artist".to_string()),
            is_playing: self.is_playing,
            album_art_url: None,
            current_time_ms: Some(self.position_ms as f64),
            total_time_ms: Some(TRACK_LENGTH_MS as f64),
        }
    }
}

/// Media session driven by an in-process fake player.
#[derive(Debug)]
pub struct SimulatedSession {
    player: Arc<Mutex<SimulatedPlayer>>,
    poll_interval: Duration,
    ids: IdAllocator,
    feeders: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

impl SimulatedSession {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            player: Arc::new(Mutex::new(SimulatedPlayer::default())),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            ids: IdAllocator::default(),
            feeders: Mutex::new(HashMap::new()),
        }
    }

    /// Current snapshot of the fake player.
    pub fn current(&self) -> MediaSnapshot {
        lock(&self.player).snapshot()
    }

    fn feeders(&self) -> MutexGuard<'_, HashMap<SubscriptionId, JoinHandle<()>>> {
        lock(&self.feeders)
    }
}

impl MediaSession for SimulatedSession {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn subscribe(&self) -> Result<Subscription, MediaError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.ids.next();
        let player = Arc::clone(&self.player);
        let every = self.poll_interval;
        let step_ms = u64::try_from(every.as_millis()).unwrap_or(u64::MAX);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut first = true;
            loop {
                ticker.tick().await;
                let snapshot = {
                    let mut player = lock(&player);
                    if !first {
                        player.advance(step_ms);
                    }
                    player.snapshot()
                };
                first = false;
                if tx.send(snapshot).is_err() {
                    return;
                }
            }
        });
        self.feeders().insert(id, handle);
        Ok(Subscription::new(id, rx))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(handle) = self.feeders().remove(&id) {
            handle.abort();
        }
    }

    fn send_command(
        &self,
        command: TransportCommand,
    ) -> impl Future<Output = Result<(), MediaError>> + Send {
        let player = Arc::clone(&self.player);
        async move {
            lock(&player).apply(command);
            debug!(%command, "simulated player applied command");
            Ok(())
        }
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        for (_, handle) in self.feeders().drain() {
            handle.abort();
        }
    }
}
