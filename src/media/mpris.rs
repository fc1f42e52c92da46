//! MPRIS players on the D-Bus session bus.
//!
//! Each subscription opens its own bus connection and polls the first
//! `org.mpris.MediaPlayer2.*` name on a fixed cadence, pushing a complete
//! snapshot every time. Transport commands call `PlayPause`, `Next` and
//! `Previous` on the same player.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, trace, warn};
use zbus::fdo::DBusProxy;
use zbus::proxy::CacheProperties;
use zbus::zvariant::{OwnedValue, Value};
use zbus::Connection;

use crate::types::MediaConfig;

use super::error::MediaError;
use super::snapshot::MediaSnapshot;
use super::{lock, IdAllocator, MediaSession, Subscription, SubscriptionId, TransportCommand};

/// Bus name prefix every MPRIS player registers under.
const MPRIS_PREFIX: &str = "org.mpris.MediaPlayer2.";

#[zbus::proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2",
    gen_blocking = false
)]
trait Player {
    fn play_pause(&self) -> zbus::Result<()>;

    fn next(&self) -> zbus::Result<()>;

    fn previous(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;

    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    /// Microseconds into the current track
    #[zbus(property)]
    fn position(&self) -> zbus::Result<i64>;

    #[zbus(property)]
    fn can_go_next(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn can_go_previous(&self) -> zbus::Result<bool>;
}

/// Media session talking to MPRIS players over D-Bus.
#[derive(Debug)]
pub struct MprisSession {
    poll_interval: Duration,
    command_timeout: Duration,
    ids: IdAllocator,
    pollers: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
}

impl MprisSession {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
            ids: IdAllocator::default(),
            pollers: Mutex::new(HashMap::new()),
        }
    }

    fn pollers(&self) -> MutexGuard<'_, HashMap<SubscriptionId, JoinHandle<()>>> {
        lock(&self.pollers)
    }
}

impl MediaSession for MprisSession {
    fn name(&self) -> &'static str {
        "mpris"
    }

    fn subscribe(&self) -> Result<Subscription, MediaError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.ids.next();
        let handle = tokio::spawn(poll_player(tx, self.poll_interval, self.command_timeout));
        self.pollers().insert(id, handle);
        Ok(Subscription::new(id, rx))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(handle) = self.pollers().remove(&id) {
            handle.abort();
        }
    }

    fn send_command(
        &self,
        command: TransportCommand,
    ) -> impl Future<Output = Result<(), MediaError>> + Send {
        let limit = self.command_timeout;
        async move {
            match timeout(limit, deliver(command)).await {
                Ok(result) => result,
                Err(_) => Err(MediaError::CommandTimeout(
                    command,
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                )),
            }
        }
    }
}

impl Drop for MprisSession {
    fn drop(&mut self) {
        for (_, handle) in self.pollers().drain() {
            handle.abort();
        }
    }
}

// ============================================================================
// Bus access
// ============================================================================

async fn connect() -> Result<Connection, MediaError> {
    Connection::session()
        .await
        .map_err(|e| MediaError::PlayerUnavailable(format!("session bus: {e}")))
}

/// Proxy for the first MPRIS player on the bus, if any is running.
async fn find_player(conn: &Connection) -> zbus::Result<Option<PlayerProxy<'static>>> {
    let names = DBusProxy::new(conn).await?.list_names().await?;
    let Some(name) = names
        .into_iter()
        .find(|name| name.as_str().starts_with(MPRIS_PREFIX))
    else {
        return Ok(None);
    };

    // Position never signals changes, so nothing is cached
    let player = PlayerProxy::builder(conn)
        .destination(name.to_string())?
        .cache_properties(CacheProperties::No)
        .build()
        .await?;
    Ok(Some(player))
}

/// Polls the active player until the receiver goes away or the session bus
/// is unreachable. Returning drops `tx`, which closes the subscription.
async fn poll_player(tx: mpsc::UnboundedSender<MediaSnapshot>, every: Duration, limit: Duration) {
    let conn = match timeout(limit, connect()).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            warn!(error = %e, "closing media subscription");
            return;
        }
        Err(_) => {
            warn!("session bus connection timed out; closing media subscription");
            return;
        }
    };

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let snapshot = match timeout(limit, read_snapshot(&conn)).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                debug!(error = %e, "player query failed");
                MediaSnapshot::no_media()
            }
            Err(_) => {
                debug!("player query timed out");
                continue;
            }
        };

        if tx.send(snapshot).is_err() {
            trace!("media subscriber gone; stopping poller");
            return;
        }
    }
}

async fn read_snapshot(conn: &Connection) -> zbus::Result<MediaSnapshot> {
    let Some(player) = find_player(conn).await? else {
        return Ok(MediaSnapshot::no_media());
    };
    let metadata = player.metadata().await?;
    let status = player.playback_status().await?;
    // Not every player implements Position
    let position_us = player.position().await.ok();
    Ok(snapshot_from_player(&status, &metadata, position_us))
}

async fn deliver(command: TransportCommand) -> Result<(), MediaError> {
    let failed = move |e: zbus::Error| MediaError::CommandFailed {
        command,
        reason: e.to_string(),
    };

    let conn = connect().await?;
    let player = find_player(&conn)
        .await
        .map_err(failed)?
        .ok_or_else(|| MediaError::CommandFailed {
            command,
            reason: "no MPRIS player found".to_string(),
        })?;

    let allowed = match command {
        TransportCommand::TogglePlayPause => true,
        TransportCommand::NextTrack => player.can_go_next().await.unwrap_or(false),
        TransportCommand::PreviousTrack => player.can_go_previous().await.unwrap_or(false),
    };
    if !allowed {
        return Err(MediaError::CommandFailed {
            command,
            reason: "the player does not allow it right now".to_string(),
        });
    }

    let sent = match command {
        TransportCommand::TogglePlayPause => player.play_pause().await,
        TransportCommand::NextTrack => player.next().await,
        TransportCommand::PreviousTrack => player.previous().await,
    };
    sent.map_err(failed)?;
    debug!(%command, player = %player.inner().destination(), "MPRIS command sent");
    Ok(())
}

// ============================================================================
// Metadata decoding
// ============================================================================

/// Builds a snapshot from a player's `PlaybackStatus`, `Metadata` and
/// `Position` properties.
///
/// Times are reported by MPRIS in microseconds. A player with no title, no
/// artist and not playing is reported as no media.
pub fn snapshot_from_player(
    status: &str,
    metadata: &HashMap<String, OwnedValue>,
    position_us: Option<i64>,
) -> MediaSnapshot {
    let title = metadata.get("xesam:title").and_then(|v| text(v));
    let artist = metadata.get("xesam:artist").and_then(|v| first_text(v));
    let album_art_url = metadata.get("mpris:artUrl").and_then(|v| text(v));
    let length_us = metadata.get("mpris:length").and_then(|v| number(v));

    let is_playing = status == "Playing";
    if title.is_none() && artist.is_none() && !is_playing {
        return MediaSnapshot::no_media();
    }

    MediaSnapshot {
        title,
        artist,
        is_playing,
        album_art_url,
        current_time_ms: position_us.map(|us| us as f64 / 1000.0),
        total_time_ms: length_us.map(|us| us / 1000.0),
    }
}

fn text(value: &Value<'_>) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Value::Value(inner) => text(inner),
        _ => None,
    }
}

/// `xesam:artist` is a list; some players send a bare string instead.
fn first_text(value: &Value<'_>) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(|item| text(item)),
        Value::Value(inner) => first_text(inner),
        other => text(other),
    }
}

fn number(value: &Value<'_>) -> Option<f64> {
    match value {
        Value::I64(n) => Some(*n as f64),
        Value::U64(n) => Some(*n as f64),
        Value::I32(n) => Some(f64::from(*n)),
        Value::U32(n) => Some(f64::from(*n)),
        Value::F64(n) => Some(*n),
        Value::Value(inner) => number(inner),
        _ => None,
    }
}
