//! Core data types for the Pomodoro widget.
//!
//! This module defines the data structures used for:
//! - Timer mode and countdown state
//! - Timer configuration with validation
//! - Widget-wide configuration shared by the shell and the CLI

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accepted work duration in minutes.
pub const WORK_MINUTES_RANGE: RangeInclusive<u32> = 1..=60;

/// Accepted break duration in minutes.
pub const BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=30;

/// Default work duration in minutes.
pub const DEFAULT_WORK_MINUTES: u32 = 25;

/// Default break duration in minutes.
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// Lower bound for the media polling cadence.
const MIN_POLL_INTERVAL_MS: u64 = 100;

// ============================================================================
// ConfigError
// ============================================================================

/// Errors raised when validating configuration at the input boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Work duration outside 1-60 minutes.
    #[error("work duration must be between 1 and 60 minutes (got {0})")]
    WorkMinutesOutOfRange(u32),

    /// Break duration outside 1-30 minutes.
    #[error("break duration must be between 1 and 30 minutes (got {0})")]
    BreakMinutesOutOfRange(u32),

    /// Media polling interval too short to be useful.
    #[error("media poll interval must be at least {MIN_POLL_INTERVAL_MS} ms (got {0} ms)")]
    PollIntervalTooShort(u64),

    /// The feed backend was selected without a feed path.
    #[error("the feed backend requires a snapshot feed path")]
    MissingFeedPath,
}

// ============================================================================
// TimerMode
// ============================================================================

/// The phase the countdown is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Focused work interval
    #[default]
    Work,
    /// Rest interval
    Break,
}

impl TimerMode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
        }
    }

    /// Returns the mode that follows this one.
    pub fn next(&self) -> TimerMode {
        match self {
            TimerMode::Work => TimerMode::Break,
            TimerMode::Break => TimerMode::Work,
        }
    }
}

impl std::fmt::Display for TimerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TimerConfig
// ============================================================================

/// Work and break lengths for the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Work duration in minutes (1-60)
    pub work_minutes: u32,
    /// Break duration in minutes (1-30)
    pub break_minutes: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

impl TimerConfig {
    /// Creates a new configuration with the specified work duration.
    pub fn with_work_minutes(mut self, minutes: u32) -> Self {
        self.work_minutes = minutes;
        self
    }

    /// Creates a new configuration with the specified break duration.
    pub fn with_break_minutes(mut self, minutes: u32) -> Self {
        self.break_minutes = minutes;
        self
    }

    /// Length of the given mode in seconds.
    pub fn duration_seconds(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work_minutes.saturating_mul(60),
            TimerMode::Break => self.break_minutes.saturating_mul(60),
        }
    }

    /// Validates the configuration.
    ///
    /// The engine itself never sees an invalid configuration; callers run this
    /// at the input boundary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !WORK_MINUTES_RANGE.contains(&self.work_minutes) {
            return Err(ConfigError::WorkMinutesOutOfRange(self.work_minutes));
        }
        if !BREAK_MINUTES_RANGE.contains(&self.break_minutes) {
            return Err(ConfigError::BreakMinutesOutOfRange(self.break_minutes));
        }
        Ok(())
    }
}

// ============================================================================
// TimerState
// ============================================================================

/// Snapshot of the countdown.
///
/// Invariant: `0 <= remaining_seconds <= total_duration_seconds`, and
/// `total_duration_seconds` only changes on a mode transition or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    /// Current phase
    pub mode: TimerMode,
    /// Seconds left in the current phase
    pub remaining_seconds: u32,
    /// Length of the current phase when it started
    pub total_duration_seconds: u32,
    /// Whether the countdown is advancing
    pub is_running: bool,
}

impl TimerState {
    /// Creates the initial state: paused at the start of a work phase.
    pub fn new(config: &TimerConfig) -> Self {
        Self::at_phase_start(TimerMode::Work, config)
    }

    /// A paused state at the very beginning of `mode`.
    pub fn at_phase_start(mode: TimerMode, config: &TimerConfig) -> Self {
        let total = config.duration_seconds(mode);
        Self {
            mode,
            remaining_seconds: total,
            total_duration_seconds: total,
            is_running: false,
        }
    }

    /// Normalized elapsed fraction of the current phase, in `[0, 1]`.
    pub fn progress_fraction(&self) -> f64 {
        if self.total_duration_seconds == 0 {
            return 0.0;
        }
        let elapsed =
            f64::from(self.total_duration_seconds) - f64::from(self.remaining_seconds);
        (elapsed / f64::from(self.total_duration_seconds)).clamp(0.0, 1.0)
    }

    /// Returns true once the countdown has reached zero.
    pub fn is_phase_complete(&self) -> bool {
        self.remaining_seconds == 0
    }

    /// Remaining time as `MM:SS`.
    pub fn display_time(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }
}

// ============================================================================
// Widget configuration
// ============================================================================

/// Which media session implementation the widget talks to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaBackend {
    /// MPRIS players on the D-Bus session bus
    #[default]
    Mpris,
    /// Synthetic player used where no system media API is available
    Simulated,
    /// Newline-delimited JSON snapshots read from a file or FIFO
    Feed {
        /// Path of the snapshot feed
        path: PathBuf,
    },
}

/// Exponential backoff used to re-establish a broken media subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first attempt, in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Attempts before giving up; 0 disables resubscription
    pub max_attempts: u32,
    /// How long a subscription must stay up before its snapshots restore the
    /// full retry budget, in milliseconds
    #[serde(default = "default_stable_after_ms")]
    pub stable_after_ms: u64,
}

fn default_stable_after_ms() -> u64 {
    10_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: 5,
            stable_after_ms: default_stable_after_ms(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never resubscribes.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }

    /// Delay before the given attempt (1-based), or `None` once exhausted.
    ///
    /// Doubles from `initial_delay_ms`, capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
        let delay = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Some(Duration::from_millis(delay))
    }
}

/// Media side of the widget configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Session implementation
    pub backend: MediaBackend,
    /// Polling cadence for backends that poll, in milliseconds
    pub poll_interval_ms: u64,
    /// Timeout applied to each external command, in milliseconds
    pub command_timeout_ms: u64,
    /// Resubscribe policy for a broken snapshot channel
    pub retry: RetryPolicy,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            backend: MediaBackend::default(),
            poll_interval_ms: 1_000,
            command_timeout_ms: 2_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl MediaConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::PollIntervalTooShort(self.poll_interval_ms));
        }
        if let MediaBackend::Feed { path } = &self.backend {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::MissingFeedPath);
            }
        }
        Ok(())
    }
}

/// Everything the widget shell needs to start.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Countdown lengths
    pub timer: TimerConfig,
    /// Media session settings
    pub media: MediaConfig,
}

impl WidgetConfig {
    /// Validates both halves of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer.validate()?;
        self.media.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================
