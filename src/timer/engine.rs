//! Timer engine for the Pomodoro widget.
//!
//! This module provides the work/break state machine:
//! - States: {Work, Break} x {Running, Paused}
//! - One-second logical ticks
//! - Automatic pause at every phase boundary
//! - Event firing for the presentation layer

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::types::{TimerConfig, TimerMode, TimerState};

// ============================================================================
// TimerEvent
// ============================================================================

/// Change notifications published by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Countdown started or resumed
    Started {
        /// Mode that is now running
        mode: TimerMode,
    },
    /// Countdown paused by the user
    Paused {
        /// Mode that was running
        mode: TimerMode,
    },
    /// Current phase rewound to its full length
    Reset {
        /// Mode that was rewound
        mode: TimerMode,
        /// New full length in seconds
        total_duration_seconds: u32,
    },
    /// One logical second elapsed
    Tick {
        /// Remaining seconds
        remaining_seconds: u32,
    },
    /// A phase ran out and the engine flipped mode (and paused)
    PhaseCompleted {
        /// Phase that just finished
        completed: TimerMode,
        /// Phase that is now waiting to be started
        next: TimerMode,
    },
    /// New durations were stored; they apply at the next boundary or reset
    Reconfigured {
        /// The stored configuration
        config: TimerConfig,
    },
}

/// What a single call to [`TimerEngine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Engine was paused; nothing changed
    Idle,
    /// One second was counted down
    Counted {
        /// Remaining seconds after the decrement
        remaining_seconds: u32,
    },
    /// The phase was already at zero and the engine moved to the next one
    PhaseCompleted {
        /// Mode of the new phase
        next: TimerMode,
    },
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Owns the countdown state and applies user intents and ticks to it.
///
/// Every method is a synchronous in-memory transition; after it returns,
/// [`TimerEngine::state`] is already up to date.
pub struct TimerEngine {
    /// Current timer state
    state: TimerState,
    /// Durations used at the next phase start or reset
    config: TimerConfig,
    /// Event sender channel
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates a paused engine at the start of a work phase.
    ///
    /// `config` is expected to be validated already.
    pub fn new(config: TimerConfig, event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self {
            state: TimerState::new(&config),
            config,
            event_tx,
        }
    }

    /// Starts (or resumes) the countdown in the current mode.
    ///
    /// Returns false without doing anything if already running.
    pub fn start(&mut self) -> bool {
        if self.state.is_running {
            return false;
        }
        self.state.is_running = true;
        debug!(mode = %self.state.mode, remaining = self.state.remaining_seconds, "timer started");
        self.emit(TimerEvent::Started {
            mode: self.state.mode,
        });
        true
    }

    /// Pauses the countdown.
    ///
    /// Returns false without doing anything if already paused.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_running {
            return false;
        }
        self.state.is_running = false;
        debug!(mode = %self.state.mode, remaining = self.state.remaining_seconds, "timer paused");
        self.emit(TimerEvent::Paused {
            mode: self.state.mode,
        });
        true
    }

    /// Starts when paused, pauses when running.
    pub fn toggle(&mut self) {
        if self.state.is_running {
            self.pause();
        } else {
            self.start();
        }
    }

    /// Rewinds the current phase to its configured length and pauses.
    ///
    /// Idempotent: a second reset leaves the state unchanged.
    pub fn reset(&mut self) {
        self.state = TimerState::at_phase_start(self.state.mode, &self.config);
        debug!(mode = %self.state.mode, total = self.state.total_duration_seconds, "timer reset");
        self.emit(TimerEvent::Reset {
            mode: self.state.mode,
            total_duration_seconds: self.state.total_duration_seconds,
        });
    }

    /// Advances the countdown by exactly one logical second.
    ///
    /// A tick on a finished phase flips the mode, loads the new mode's
    /// length and leaves the engine paused.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.state.is_running {
            return TickOutcome::Idle;
        }

        if self.state.remaining_seconds > 0 {
            self.state.remaining_seconds -= 1;
            self.emit(TimerEvent::Tick {
                remaining_seconds: self.state.remaining_seconds,
            });
            return TickOutcome::Counted {
                remaining_seconds: self.state.remaining_seconds,
            };
        }

        self.handle_phase_complete()
    }

    /// Stores new durations without touching the phase in flight.
    pub fn reconfigure(&mut self, config: TimerConfig) {
        self.config = config;
        debug!(
            work_minutes = config.work_minutes,
            break_minutes = config.break_minutes,
            "timer reconfigured"
        );
        self.emit(TimerEvent::Reconfigured { config });
    }

    /// Handles the transition at the end of a phase.
    fn handle_phase_complete(&mut self) -> TickOutcome {
        let completed = self.state.mode;
        let next = completed.next();

        self.state = TimerState::at_phase_start(next, &self.config);
        info!(%completed, %next, "phase completed");

        self.emit(TimerEvent::PhaseCompleted { completed, next });
        TickOutcome::PhaseCompleted { next }
    }

    /// Returns a reference to the current timer state.
    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// Returns the configuration used for the next phase start or reset.
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Normalized progress of the current phase.
    pub fn progress_fraction(&self) -> f64 {
        self.state.progress_fraction()
    }

    fn emit(&self, event: TimerEvent) {
        if self.event_tx.send(event).is_err() {
            trace!("no timer event listener");
        }
    }

    /// Returns a mutable reference to the timer state (for testing).
    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut TimerState {
        &mut self.state
    }
}

// ============================================================================
// Tests
// ============================================================================
