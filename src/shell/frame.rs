//! Render model handed to the presentation layer.

use serde::Serialize;

use crate::media::{percent_of, ConnectionStatus, MediaState};
use crate::timer::ProgressReadout;
use crate::types::{TimerMode, TimerState};

/// One drawable frame of the widget.
///
/// Positions are truncated to whole seconds, so consecutive frames only
/// differ when something visible changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub timer: TimerFrame,
    pub media: MediaFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerFrame {
    pub mode: TimerMode,
    pub is_running: bool,
    pub remaining_seconds: u32,
    pub total_duration_seconds: u32,
    pub ring: ProgressReadout,
}

impl TimerFrame {
    pub fn new(state: &TimerState, ring: ProgressReadout) -> Self {
        Self {
            mode: state.mode,
            is_running: state.is_running,
            remaining_seconds: state.remaining_seconds,
            total_duration_seconds: state.total_duration_seconds,
            ring,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaFrame {
    pub has_media: bool,
    /// Title with the "no media" and "unknown" placeholders applied
    pub title: String,
    pub artist: Option<String>,
    pub is_playing: bool,
    pub album_art_url: Option<String>,
    pub position_seconds: u64,
    pub duration_seconds: u64,
    pub progress_percent: f64,
    pub connection: ConnectionStatus,
}

impl MediaFrame {
    /// Builds the media half of a frame from `state` and the locally
    /// extrapolated position.
    pub fn new(state: &MediaState, position_ms: u64, connection: ConnectionStatus) -> Self {
        let position_seconds = position_ms / 1000;
        let duration_seconds = state.duration_ms / 1000;
        Self {
            has_media: state.has_media(),
            title: state.display_title().to_string(),
            artist: state.display_artist().map(str::to_string),
            is_playing: state.is_playing,
            album_art_url: state.album_art_url.clone(),
            position_seconds,
            duration_seconds,
            progress_percent: percent_of(position_seconds * 1000, state.duration_ms),
            connection,
        }
    }
}

/// Formats seconds as `M:SS`.
pub fn format_track_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
