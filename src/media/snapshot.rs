//! Inbound media snapshots and the state they produce.

use serde::{Deserialize, Serialize};

use super::error::MediaError;

/// Title shown when no media session is reporting anything.
pub const NO_MEDIA_TITLE: &str = "No Media Detected";

/// Title shown when a session is active but did not report one.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Artist shown when a session is active but did not report one.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

// ============================================================================
// MediaSnapshot
// ============================================================================

/// A complete, authoritative description of the external player, as pushed
/// by a media session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub is_playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_art_url: Option<String>,
    /// Playback position in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_time_ms: Option<f64>,
    /// Track length in milliseconds; absent or `<= 0` means not applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time_ms: Option<f64>,
}

impl MediaSnapshot {
    /// The snapshot a session sends when no player is active.
    pub fn no_media() -> Self {
        Self::default()
    }

    /// Decodes one JSON snapshot.
    pub fn from_json(text: &str) -> Result<Self, MediaError> {
        serde_json::from_str(text).map_err(|e| MediaError::InvalidSnapshot(e.to_string()))
    }
}

// ============================================================================
// MediaState
// ============================================================================

/// What the mini-player displays.
///
/// Invariant: `position_ms <= duration_ms` whenever `duration_ms > 0`, and
/// `position_ms == 0` whenever `duration_ms == 0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaState {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub is_playing: bool,
    /// Absent means "draw the placeholder artwork"
    pub album_art_url: Option<String>,
    pub position_ms: u64,
    /// 0 means position and progress are not applicable
    pub duration_ms: u64,
}

impl MediaState {
    /// The "unknown / no media" sentinel.
    pub fn no_media() -> Self {
        Self::default()
    }

    /// Returns true if a player reported anything worth showing.
    pub fn has_media(&self) -> bool {
        self.title.is_some() || self.artist.is_some() || self.is_playing
    }

    pub fn display_title(&self) -> &str {
        if !self.has_media() {
            return NO_MEDIA_TITLE;
        }
        self.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }

    pub fn display_artist(&self) -> Option<&str> {
        if !self.has_media() {
            return None;
        }
        Some(self.artist.as_deref().unwrap_or(UNKNOWN_ARTIST))
    }

    /// Playback progress in percent, 0 when duration is not applicable.
    pub fn progress_percent(&self) -> f64 {
        percent_of(self.position_ms, self.duration_ms)
    }
}

impl From<MediaSnapshot> for MediaState {
    fn from(snapshot: MediaSnapshot) -> Self {
        let duration_ms = snapshot.total_time_ms.map(ms_from_wire).unwrap_or(0);
        let position_ms = if duration_ms > 0 {
            snapshot
                .current_time_ms
                .map(ms_from_wire)
                .unwrap_or(0)
                .min(duration_ms)
        } else {
            0
        };

        Self {
            title: non_empty(snapshot.title),
            artist: non_empty(snapshot.artist),
            is_playing: snapshot.is_playing,
            album_art_url: non_empty(snapshot.album_art_url),
            position_ms,
            duration_ms,
        }
    }
}

/// `position / duration * 100`, or 0 when there is no duration.
pub fn percent_of(position_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    (position_ms as f64 / duration_ms as f64 * 100.0).clamp(0.0, 100.0)
}

fn ms_from_wire(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
