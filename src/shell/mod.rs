//! Presentation shell.
//!
//! Wires the timer engine, the tick scheduler and the media bridge into a
//! single cooperative loop:
//!
//! ```text
//!   poll interval (250 ms) ──▶ TickScheduler::drive ──▶ TimerEngine
//!   media snapshots ─────────▶ MediaBridge::apply_snapshot
//!   retry timer ─────────────▶ MediaBridge::retry_subscription
//!   user intents ────────────▶ TimerEngine / MediaBridge commands
//!                                      │
//!                                      ▼
//!                                    Frame ──▶ renderer
//! ```
//!
//! - `intent`: keyboard grammar for user intents
//! - `frame`: serialisable render model
//! - `widget`: the event loop

pub mod frame;
pub mod intent;
pub mod widget;

pub use frame::{format_track_time, Frame, MediaFrame, TimerFrame};
pub use intent::{parse_intent, IntentError, WidgetIntent};
pub use widget::Widget;
