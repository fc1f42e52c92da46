//! Pomodoro Widget - a work/break timer with a system media mini-player
//!
//! The widget counts down focused work and short breaks:
//! - 25 minutes of focused work
//! - 5 minutes of break
//! - automatic pause at every phase boundary
//!
//! Alongside the timer it mirrors whatever the system media player is doing.

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pomodoro_widget::cli::{BackendArgs, Cli, Commands, Display, MediaAction, RunArgs};
use pomodoro_widget::{
    parse_intent, FeedSession, MediaBackend, MediaSession, MprisSession, RetryPolicy,
    SimulatedSession, TransportCommand, Widget, WidgetConfig, WidgetIntent,
};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries the rendered frames.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Run(args)) => run(args).await?,
        Some(Commands::Media { action, backend }) => send_media_command(action, backend).await?,
        Some(Commands::Completions { shell }) => generate_completions(shell),
        None => {
            // No command provided, show help
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

// ============================================================================
// run
// ============================================================================

async fn run(args: RunArgs) -> Result<()> {
    let config = args.to_config().context("Invalid configuration")?;
    info!(?config, "starting widget");

    match config.media.backend.clone() {
        MediaBackend::Mpris => {
            run_widget(MprisSession::new(&config.media), &config, args.json).await
        }
        MediaBackend::Simulated => {
            run_widget(SimulatedSession::new(&config.media), &config, args.json).await
        }
        MediaBackend::Feed { path } => run_widget(FeedSession::new(path), &config, args.json).await,
    }
}

async fn run_widget<S: MediaSession>(session: S, config: &WidgetConfig, json: bool) -> Result<()> {
    let mut widget = Widget::new(config.timer, Arc::new(session), config.media.retry);
    let intents = spawn_input_reader();
    if !json {
        Display::show_key_help();
    }

    tokio::select! {
        result = widget.run(intents, |frame| Display::show_frame(frame, json)) => result,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for ctrl-c")?;
            info!("interrupted");
            widget.shutdown();
            Ok(())
        }
    }
}

/// Reads intents from stdin on a plain thread.
///
/// A blocking stdin read cannot be cancelled, so it must not hold up runtime
/// shutdown.
fn spawn_input_reader() -> mpsc::UnboundedReceiver<WidgetIntent> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_intent(&line) {
                Ok(Some(intent)) => {
                    if tx.send(intent).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "ignoring input"),
            }
        }
        debug!("stdin closed");
    });
    rx
}

// ============================================================================
// media
// ============================================================================

async fn send_media_command(action: MediaAction, args: BackendArgs) -> Result<()> {
    let config = args
        .to_media_config(RetryPolicy::disabled())
        .context("Invalid configuration")?;
    let command = TransportCommand::from(action);

    match config.backend.clone() {
        MediaBackend::Mpris => send_command(MprisSession::new(&config), command).await,
        MediaBackend::Simulated => send_command(SimulatedSession::new(&config), command).await,
        MediaBackend::Feed { path } => send_command(FeedSession::new(path), command).await,
    }
}

async fn send_command<S: MediaSession>(session: S, command: TransportCommand) -> Result<()> {
    if let Err(e) = session.send_command(command).await {
        let suggestion = e.suggestion();
        return Err(e).with_context(|| {
            format!("{} via {} failed ({})", command, session.name(), suggestion)
        });
    }
    Display::show_command_sent(command, session.name());
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
