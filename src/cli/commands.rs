//! Command definitions for the Pomodoro widget CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::media::TransportCommand;
use crate::types::{
    ConfigError, MediaBackend, MediaConfig, RetryPolicy, TimerConfig, WidgetConfig,
    DEFAULT_BREAK_MINUTES, DEFAULT_WORK_MINUTES,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro Widget - work/break timer with a system media mini-player
#[derive(Parser, Debug)]
#[command(
    name = "pomodoro-widget",
    version,
    about = "Pomodoro timer with a system media mini-player",
    long_about = "A terminal rendition of a desktop Pomodoro widget.\n\
                  Counts down work and break phases and mirrors the system media player, \
                  with play/pause and track skipping.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the interactive widget
    Run(RunArgs),

    /// Send one transport command to the media player and exit
    Media {
        /// Command to send
        #[arg(value_enum)]
        action: MediaAction,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Transport command accepted by `media`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    /// Toggle play/pause
    Toggle,
    /// Skip to the next track
    Next,
    /// Go back to the previous track
    Previous,
}

impl From<MediaAction> for TransportCommand {
    fn from(action: MediaAction) -> Self {
        match action {
            MediaAction::Toggle => TransportCommand::TogglePlayPause,
            MediaAction::Next => TransportCommand::NextTrack,
            MediaAction::Previous => TransportCommand::PreviousTrack,
        }
    }
}

/// Media session implementation selectable on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// MPRIS players over D-Bus
    #[default]
    Mpris,
    /// Built-in fake player
    Simulated,
    /// Newline-delimited JSON snapshots from --feed
    Feed,
}

// ============================================================================
// Arguments
// ============================================================================

/// Media session options shared by `run` and `media`
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// Media session backend
    #[arg(long, value_enum, default_value_t = BackendKind::Mpris)]
    pub backend: BackendKind,

    /// Snapshot feed for the feed backend (file or FIFO)
    #[arg(long, value_name = "PATH", required_if_eq("backend", "feed"))]
    pub feed: Option<PathBuf>,

    /// Media polling interval in milliseconds
    #[arg(long = "poll-ms", value_name = "MS", default_value_t = 1_000)]
    pub poll_ms: u64,

    /// Timeout for each external player command in milliseconds
    #[arg(long = "timeout-ms", value_name = "MS", default_value_t = 2_000)]
    pub timeout_ms: u64,
}

impl Default for BackendArgs {
    fn default() -> Self {
        Self {
            backend: BackendKind::Mpris,
            feed: None,
            poll_ms: 1_000,
            timeout_ms: 2_000,
        }
    }
}

impl BackendArgs {
    /// Builds a validated media configuration with the given retry policy.
    pub fn to_media_config(&self, retry: RetryPolicy) -> Result<MediaConfig, ConfigError> {
        let backend = match self.backend {
            BackendKind::Mpris => MediaBackend::Mpris,
            BackendKind::Simulated => MediaBackend::Simulated,
            BackendKind::Feed => MediaBackend::Feed {
                path: self.feed.clone().ok_or(ConfigError::MissingFeedPath)?,
            },
        };
        let config = MediaConfig {
            backend,
            poll_interval_ms: self.poll_ms,
            command_timeout_ms: self.timeout_ms,
            retry,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Work duration in minutes (1-60)
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_WORK_MINUTES,
        value_parser = clap::value_parser!(u32).range(1..=60)
    )]
    pub work: u32,

    /// Break duration in minutes (1-30)
    #[arg(
        short = 'b',
        long = "break",
        default_value_t = DEFAULT_BREAK_MINUTES,
        value_parser = clap::value_parser!(u32).range(1..=30)
    )]
    pub break_minutes: u32,

    /// Resubscribe attempts after the media channel breaks (0 disables)
    #[arg(long, default_value_t = 5)]
    pub retries: u32,

    /// Print frames as JSON lines instead of a status line
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub media: BackendArgs,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            work: DEFAULT_WORK_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
            retries: 5,
            json: false,
            media: BackendArgs::default(),
        }
    }
}

impl RunArgs {
    /// Converts the arguments into a validated widget configuration.
    pub fn to_config(&self) -> Result<WidgetConfig, ConfigError> {
        let timer = TimerConfig::default()
            .with_work_minutes(self.work)
            .with_break_minutes(self.break_minutes);
        timer.validate()?;

        let retry = RetryPolicy {
            max_attempts: self.retries,
            ..RetryPolicy::default()
        };
        Ok(WidgetConfig {
            timer,
            media: self.media.to_media_config(retry)?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["pomodoro-widget"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_short_verbose_flag() {
            let cli = Cli::parse_from(["pomodoro-widget", "-v", "run"]);
            assert!(cli.verbose);
        }

        #[test]
        fn test_parse_media_command() {
            let cli = Cli::parse_from(["pomodoro-widget", "media", "next", "--backend", "simulated"]);
            match cli.command {
                Some(Commands::Media { action, backend }) => {
                    assert_eq!(action, MediaAction::Next);
                    assert_eq!(backend.backend, BackendKind::Simulated);
                }
                _ => panic!("Expected Media command"),
            }
        }

        #[test]
        fn test_media_action_maps_to_transport_command() {
            assert_eq!(
                TransportCommand::from(MediaAction::Toggle),
                TransportCommand::TogglePlayPause
            );
            assert_eq!(
                TransportCommand::from(MediaAction::Previous),
                TransportCommand::PreviousTrack
            );
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["pomodoro-widget", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Run Command Tests
    // ------------------------------------------------------------------------

    mod run_args_tests {
        use super::*;

        fn parse_run(args: &[&str]) -> RunArgs {
            let mut argv = vec!["pomodoro-widget", "run"];
            argv.extend_from_slice(args);
            match Cli::parse_from(argv).command {
                Some(Commands::Run(args)) => args,
                _ => panic!("Expected Run command"),
            }
        }

        #[test]
        fn test_parse_run_defaults() {
            let args = parse_run(&[]);
            assert_eq!(args.work, 25);
            assert_eq!(args.break_minutes, 5);
            assert_eq!(args.retries, 5);
            assert!(!args.json);
            assert_eq!(args.media.backend, BackendKind::Mpris);
            assert_eq!(args.media.poll_ms, 1_000);
        }

        #[test]
        fn test_parse_run_mpris_backend() {
            let args = parse_run(&["--backend", "mpris"]);
            let config = args.to_config().unwrap();
            assert_eq!(config.media.backend, MediaBackend::Mpris);
        }

        #[test]
        fn test_parse_run_all_options() {
            let args = parse_run(&[
                "-w", "50", "-b", "10", "--retries", "0", "--json", "--backend", "feed",
                "--feed", "/tmp/media.jsonl", "--poll-ms", "500",
            ]);
            assert_eq!(args.work, 50);
            assert_eq!(args.break_minutes, 10);
            assert_eq!(args.retries, 0);
            assert!(args.json);
            assert_eq!(args.media.feed, Some(PathBuf::from("/tmp/media.jsonl")));
            assert_eq!(args.media.poll_ms, 500);
        }

        #[test]
        fn test_parse_run_boundaries() {
            let args = parse_run(&["--work", "60", "--break", "30"]);
            assert_eq!(args.work, 60);
            assert_eq!(args.break_minutes, 30);

            let args = parse_run(&["--work", "1", "--break", "1"]);
            assert_eq!(args.work, 1);
            assert_eq!(args.break_minutes, 1);
        }

        #[test]
        fn test_to_config() {
            let config = parse_run(&["-w", "40", "-b", "8", "--retries", "2", "--backend", "simulated"])
                .to_config()
                .unwrap();

            assert_eq!(config.timer.work_minutes, 40);
            assert_eq!(config.timer.break_minutes, 8);
            assert_eq!(config.media.backend, MediaBackend::Simulated);
            assert_eq!(config.media.retry.max_attempts, 2);
        }

        #[test]
        fn test_to_config_rejects_short_poll_interval() {
            let args = parse_run(&["--poll-ms", "10"]);
            assert_eq!(
                args.to_config().unwrap_err(),
                ConfigError::PollIntervalTooShort(10)
            );
        }

        #[test]
        fn test_feed_backend_needs_path() {
            let args = RunArgs {
                media: BackendArgs {
                    backend: BackendKind::Feed,
                    ..BackendArgs::default()
                },
                ..RunArgs::default()
            };
            assert_eq!(args.to_config().unwrap_err(), ConfigError::MissingFeedPath);
        }

        #[test]
        fn test_run_args_default_matches_parser() {
            let parsed = parse_run(&[]);
            let default = RunArgs::default();
            assert_eq!(parsed.work, default.work);
            assert_eq!(parsed.break_minutes, default.break_minutes);
            assert_eq!(parsed.retries, default.retries);
        }
    }

    // ------------------------------------------------------------------------
    // Error Case Tests (using try_parse)
    // ------------------------------------------------------------------------

    mod error_tests {
        use super::*;

        #[test]
        fn test_parse_run_work_out_of_range() {
            assert!(Cli::try_parse_from(["pomodoro-widget", "run", "--work", "0"]).is_err());
            assert!(Cli::try_parse_from(["pomodoro-widget", "run", "--work", "61"]).is_err());
        }

        #[test]
        fn test_parse_run_break_out_of_range() {
            assert!(Cli::try_parse_from(["pomodoro-widget", "run", "--break", "0"]).is_err());
            assert!(Cli::try_parse_from(["pomodoro-widget", "run", "--break", "31"]).is_err());
        }

        #[test]
        fn test_parse_run_work_not_number() {
            assert!(Cli::try_parse_from(["pomodoro-widget", "run", "--work", "abc"]).is_err());
        }

        #[test]
        fn test_parse_feed_backend_without_path() {
            let result = Cli::try_parse_from(["pomodoro-widget", "run", "--backend", "feed"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_parse_unknown_backend() {
            let result = Cli::try_parse_from(["pomodoro-widget", "run", "--backend", "spotify"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_parse_media_unknown_action() {
            let result = Cli::try_parse_from(["pomodoro-widget", "media", "stop"]);
            assert!(result.is_err());
        }
    }
}
