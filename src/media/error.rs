//! Media bridge error types.
//!
//! None of these errors are fatal: transport failures are logged and dropped,
//! subscription failures go through the resubscribe policy.

use thiserror::Error;

use super::TransportCommand;

/// Errors that can occur while talking to an external media session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// The external player (or the tool used to reach it) is missing.
    #[error("media player unavailable: {0}")]
    PlayerUnavailable(String),

    /// The player rejected or failed to run a transport command.
    #[error("transport command '{command}' failed: {reason}")]
    CommandFailed {
        command: TransportCommand,
        reason: String,
    },

    /// A transport command did not finish in time.
    #[error("transport command '{0}' timed out after {1} ms")]
    CommandTimeout(TransportCommand, u64),

    /// The session has no way to deliver this command.
    #[error("transport command '{0}' is not supported by this media source")]
    CommandUnsupported(TransportCommand),

    /// The snapshot channel could not be established.
    #[error("could not subscribe to media updates: {0}")]
    SubscribeFailed(String),

    /// An inbound snapshot could not be decoded.
    #[error("invalid media snapshot: {0}")]
    InvalidSnapshot(String),
}

impl MediaError {
    /// Returns true if this error came from an outbound transport command.
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::CommandFailed { .. } | Self::CommandTimeout(_, _) | Self::CommandUnsupported(_)
        )
    }

    /// Returns true if this error affects the inbound snapshot channel.
    #[must_use]
    pub fn is_subscription_error(&self) -> bool {
        matches!(self, Self::SubscribeFailed(_) | Self::PlayerUnavailable(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::PlayerUnavailable(_) => "start a D-Bus session or pick another media backend",
            Self::CommandFailed { .. } => "check that a media player is running",
            Self::CommandTimeout(_, _) => "the media player is not responding",
            Self::CommandUnsupported(_) => "this media source is read-only",
            Self::SubscribeFailed(_) => "the widget will retry in the background",
            Self::InvalidSnapshot(_) => "check the snapshot feed format",
        }
    }
}
