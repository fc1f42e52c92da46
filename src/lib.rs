//! Pomodoro Widget Library
//!
//! This library provides the core engines behind a desktop Pomodoro widget.
//! It includes:
//! - Work/break timer engine with drift-corrected tick scheduling
//! - Circular progress ring geometry for the countdown display
//! - Media bridge mirroring an external player (MPRIS over D-Bus, a
//!   simulated player, or a JSON snapshot feed) and forwarding transport
//!   commands to it
//! - Presentation shell composing both engines in one event loop
//! - CLI command parsing and display utilities
//! - Type definitions for configuration and state

pub mod cli;
pub mod clock;
pub mod media;
pub mod shell;
pub mod timer;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    ConfigError, MediaBackend, MediaConfig, RetryPolicy, TimerConfig, TimerMode, TimerState,
    WidgetConfig,
};

pub use clock::{Clock, ManualClock, SystemClock};

pub use timer::{ProgressReadout, ProgressRing, TickOutcome, TickScheduler, TimerEngine, TimerEvent};

pub use media::{
    ConnectionStatus, FeedSession, MediaBridge, MediaError, MediaSession, MediaSnapshot,
    MediaState, MockMediaSession, MprisSession, SimulatedSession, Subscription,
    SubscriptionId, TransportCommand,
};

pub use shell::{parse_intent, Frame, Widget, WidgetIntent};
