//! CLI module for the Pomodoro widget.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `display`: Output formatting and display logic

pub mod commands;
pub mod display;

pub use commands::{BackendArgs, BackendKind, Cli, Commands, MediaAction, RunArgs};
pub use display::Display;
