//! Work/break countdown.
//!
//! - `engine`: the state machine and its change events
//! - `scheduler`: drift-corrected conversion of monotonic time into ticks
//! - `progress`: circular progress ring geometry

pub mod engine;
pub mod progress;
pub mod scheduler;

pub use engine::{TickOutcome, TimerEngine, TimerEvent};
pub use progress::{ProgressReadout, ProgressRing};
pub use scheduler::{TickScheduler, POLL_INTERVAL_MS};
