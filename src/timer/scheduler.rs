//! Drift-corrected tick scheduling.
//!
//! Interval timers drift under load, so the number of interval wake-ups is not
//! a reliable measure of elapsed time. The scheduler instead measures elapsed
//! whole seconds on a monotonic [`Clock`] and feeds the engine exactly that
//! many ticks, carrying the sub-second remainder forward.

use std::time::{Duration, Instant};

use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

use crate::clock::Clock;

use super::engine::{TickOutcome, TimerEngine};

/// How often the shell wakes up to check for due ticks.
pub const POLL_INTERVAL_MS: u64 = 250;

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Converts monotonic elapsed time into engine ticks.
pub struct TickScheduler<C: Clock> {
    clock: C,
    /// Instant up to which elapsed seconds have been accounted for
    anchor: Instant,
}

impl<C: Clock> TickScheduler<C> {
    pub fn new(clock: C) -> Self {
        let anchor = clock.now();
        Self { clock, anchor }
    }

    /// Restarts second counting from now, dropping any partial second.
    ///
    /// Call when the countdown starts so the first tick lands one full second
    /// later.
    pub fn resync(&mut self) {
        self.anchor = self.clock.now();
    }

    /// Whole seconds elapsed since the last accounted instant.
    ///
    /// Consumes those seconds; the fractional remainder stays pending.
    pub fn due_ticks(&mut self) -> u64 {
        let elapsed = self.clock.now().saturating_duration_since(self.anchor);
        let whole = elapsed.as_secs();
        self.anchor += ONE_SECOND * u32::try_from(whole).unwrap_or(u32::MAX);
        whole
    }

    /// Applies every due tick to `engine` and returns how many were applied.
    ///
    /// While the engine is paused the elapsed time is discarded. Ticks left
    /// over after a phase boundary are dropped as well, since the engine
    /// pauses itself there.
    pub fn drive(&mut self, engine: &mut TimerEngine) -> u64 {
        if !engine.state().is_running {
            self.resync();
            return 0;
        }

        let due = self.due_ticks();
        if due > 1 {
            debug!(due, "catching up on late ticks");
        }

        let mut applied = 0;
        for _ in 0..due {
            match engine.tick() {
                TickOutcome::Idle => break,
                TickOutcome::Counted { .. } => applied += 1,
                TickOutcome::PhaseCompleted { .. } => {
                    applied += 1;
                    self.resync();
                    break;
                }
            }
        }
        applied
    }

    /// Interval at which the shell should call [`TickScheduler::drive`].
    pub fn poll_interval() -> Interval {
        let mut ticker = interval(Duration::from_millis(POLL_INTERVAL_MS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }
}

// ============================================================================
// Tests
// ============================================================================
