//! Display utilities for the Pomodoro widget CLI.
//!
//! This module renders:
//! - Widget frames as a status line or as JSON
//! - Results of one-shot media commands
//! - Error messages

use anyhow::{Context, Result};

use crate::media::{ConnectionStatus, TransportCommand};
use crate::shell::{format_track_time, Frame, MediaFrame, TimerFrame};
use crate::types::TimerMode;

/// Width of the text progress bar in the status line.
const BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Formats a frame as a single human-readable line.
    pub fn status_line(frame: &Frame) -> String {
        format!(
            "{} | {}",
            Self::timer_segment(&frame.timer),
            Self::media_segment(&frame.media)
        )
    }

    /// Formats a frame as one line of JSON.
    pub fn json_line(frame: &Frame) -> Result<String> {
        serde_json::to_string(frame).context("Failed to serialize frame")
    }

    /// Prints a frame to stdout.
    pub fn show_frame(frame: &Frame, json: bool) -> Result<()> {
        if json {
            println!("{}", Self::json_line(frame)?);
        } else {
            println!("{}", Self::status_line(frame));
        }
        Ok(())
    }

    /// Shows that a transport command reached the player.
    pub fn show_command_sent(command: TransportCommand, backend: &str) {
        println!("> Sent {} to {}", command, backend);
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("error: {}", message);
    }

    /// Prints the keyboard help for the interactive widget.
    pub fn show_key_help() {
        eprintln!(
            "keys: space/t toggle, s start, p pause, r reset, m play/pause, \
             n next, b previous, w <min> work, k <min> break, q quit"
        );
    }

    fn timer_segment(timer: &TimerFrame) -> String {
        let mode = match timer.mode {
            TimerMode::Work => "WORK ",
            TimerMode::Break => "BREAK",
        };
        let state = if timer.is_running { ">" } else { "||" };
        format!(
            "{} {} {} {}",
            mode,
            state,
            timer.ring.time_text,
            Self::bar(timer.ring.progress_fraction)
        )
    }

    fn media_segment(media: &MediaFrame) -> String {
        let mut line = if media.has_media {
            let state = if media.is_playing { ">" } else { "||" };
            match &media.artist {
                Some(artist) => format!("{} {} - {}", state, media.title, artist),
                None => format!("{} {}", state, media.title),
            }
        } else {
            media.title.clone()
        };

        if media.duration_seconds > 0 {
            line.push_str(&format!(
                " {}/{}",
                format_track_time(media.position_seconds),
                format_track_time(media.duration_seconds)
            ));
        }

        match media.connection {
            ConnectionStatus::Reconnecting { attempt } => {
                line.push_str(&format!(" (reconnecting #{})", attempt));
            }
            ConnectionStatus::Disconnected => line.push_str(" (disconnected)"),
            ConnectionStatus::Inactive | ConnectionStatus::Connected => {}
        }
        line
    }

    /// Renders a fraction in `[0, 1]` as a fixed-width bar.
    fn bar(fraction: f64) -> String {
        let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
        format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
    }
}

// ============================================================================
// Tests
// ============================================================================
