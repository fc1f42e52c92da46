//! The widget event loop.

use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::{sleep, Sleep};
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::media::{MediaBridge, MediaSession, MediaSnapshot};
use crate::timer::{ProgressRing, TickScheduler, TimerEngine, TimerEvent};
use crate::types::{RetryPolicy, TimerConfig};

use super::frame::{Frame, MediaFrame, TimerFrame};
use super::intent::WidgetIntent;

/// Composes the timer and the media bridge behind one event loop.
pub struct Widget<S: MediaSession, C: Clock + Clone = SystemClock> {
    engine: TimerEngine,
    events: mpsc::UnboundedReceiver<TimerEvent>,
    scheduler: TickScheduler<C>,
    bridge: MediaBridge<S, C>,
    ring: ProgressRing,
    /// Pending resubscribe attempt, if the media channel broke
    retry_timer: Option<Pin<Box<Sleep>>>,
    last_frame: Option<Frame>,
}

impl<S: MediaSession> Widget<S, SystemClock> {
    pub fn new(timer: TimerConfig, session: Arc<S>, retry: RetryPolicy) -> Self {
        Self::with_clock(timer, session, retry, SystemClock)
    }
}

impl<S: MediaSession, C: Clock + Clone> Widget<S, C> {
    pub fn with_clock(timer: TimerConfig, session: Arc<S>, retry: RetryPolicy, clock: C) -> Self {
        let (event_tx, events) = mpsc::unbounded_channel();
        Self {
            engine: TimerEngine::new(timer, event_tx),
            events,
            scheduler: TickScheduler::new(clock.clone()),
            bridge: MediaBridge::with_clock(session, retry, clock),
            ring: ProgressRing::default(),
            retry_timer: None,
            last_frame: None,
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Opens the media subscription, scheduling a retry if that fails.
    pub fn connect(&mut self) {
        if let Err(e) = self.bridge.activate() {
            warn!(error = %e, suggestion = e.suggestion(), "could not subscribe to media session");
            let delay = self.bridge.handle_subscription_lost();
            self.schedule_retry(delay);
        }
    }

    /// Cancels any pending retry and unsubscribes from the media session.
    pub fn shutdown(&mut self) {
        self.retry_timer = None;
        self.bridge.deactivate();
        info!("widget shut down");
    }

    fn schedule_retry(&mut self, delay: Option<Duration>) {
        self.retry_timer = delay.map(|d| Box::pin(sleep(d)));
    }

    // ------------------------------------------------------------------------
    // Stimuli
    // ------------------------------------------------------------------------

    /// Applies a user intent. Returns `Break` when the user asked to quit.
    pub fn handle_intent(&mut self, intent: WidgetIntent) -> ControlFlow<()> {
        let was_running = self.engine.state().is_running;
        debug!(?intent, "handling intent");

        match intent {
            WidgetIntent::ToggleTimer => self.engine.toggle(),
            WidgetIntent::StartTimer => {
                self.engine.start();
            }
            WidgetIntent::PauseTimer => {
                self.engine.pause();
            }
            WidgetIntent::ResetTimer => self.engine.reset(),
            WidgetIntent::TogglePlayPause => {
                self.bridge.toggle_play_pause();
            }
            WidgetIntent::NextTrack => {
                self.bridge.next_track();
            }
            WidgetIntent::PreviousTrack => {
                self.bridge.previous_track();
            }
            WidgetIntent::SetWorkMinutes(minutes) => {
                let config = self.engine.config().with_work_minutes(minutes);
                self.engine.reconfigure(config);
            }
            WidgetIntent::SetBreakMinutes(minutes) => {
                let config = self.engine.config().with_break_minutes(minutes);
                self.engine.reconfigure(config);
            }
            WidgetIntent::Quit => return ControlFlow::Break(()),
        }

        // The first tick after a start lands one full second later
        if !was_running && self.engine.state().is_running {
            self.scheduler.resync();
        }
        ControlFlow::Continue(())
    }

    /// Feeds elapsed time into the engine. Returns the ticks applied.
    pub fn poll_timer(&mut self) -> u64 {
        self.scheduler.drive(&mut self.engine)
    }

    /// Applies an inbound snapshot, or starts recovery when the channel
    /// broke (`None`).
    pub fn handle_snapshot(&mut self, snapshot: Option<MediaSnapshot>) {
        match snapshot {
            Some(snapshot) => self.bridge.apply_snapshot(snapshot),
            None => {
                let delay = self.bridge.handle_subscription_lost();
                self.schedule_retry(delay);
            }
        }
    }

    /// Runs the pending resubscribe attempt.
    pub fn handle_retry(&mut self) {
        let delay = self.bridge.retry_subscription();
        self.schedule_retry(delay);
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn engine(&self) -> &TimerEngine {
        &self.engine
    }

    pub fn bridge(&self) -> &MediaBridge<S, C> {
        &self.bridge
    }

    pub fn retry_pending(&self) -> bool {
        self.retry_timer.is_some()
    }

    /// Builds the frame for the current state.
    pub fn frame(&self) -> Frame {
        let state = self.engine.state();
        Frame {
            timer: TimerFrame::new(state, self.ring.readout(state)),
            media: MediaFrame::new(
                self.bridge.state(),
                self.bridge.displayed_position_ms(),
                self.bridge.status(),
            ),
        }
    }

    // ------------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------------

    /// Runs until a quit intent arrives or `render` fails.
    ///
    /// `render` is called with every frame that differs from the previous
    /// one. The media subscription is released before this returns.
    pub async fn run<F>(
        &mut self,
        intents: mpsc::UnboundedReceiver<WidgetIntent>,
        mut render: F,
    ) -> Result<()>
    where
        F: FnMut(&Frame) -> Result<()>,
    {
        self.connect();
        let result = self.event_loop(intents, &mut render).await;
        self.shutdown();
        result
    }

    async fn event_loop<F>(
        &mut self,
        mut intents: mpsc::UnboundedReceiver<WidgetIntent>,
        render: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&Frame) -> Result<()>,
    {
        let mut ticker = TickScheduler::<C>::poll_interval();
        let mut intents_open = true;
        self.render_if_changed(render)?;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_timer();
                }
                snapshot = self.bridge.next_snapshot() => {
                    self.handle_snapshot(snapshot);
                }
                () = wait_for_retry(&mut self.retry_timer) => {
                    self.handle_retry();
                }
                Some(event) = self.events.recv() => {
                    trace!(?event, "timer event");
                }
                intent = intents.recv(), if intents_open => match intent {
                    Some(intent) => {
                        if self.handle_intent(intent).is_break() {
                            info!("quit requested");
                            return Ok(());
                        }
                    }
                    None => {
                        debug!("input closed; continuing without user intents");
                        intents_open = false;
                    }
                },
            }
            self.render_if_changed(render)?;
        }
    }

    fn render_if_changed<F>(&mut self, render: &mut F) -> Result<()>
    where
        F: FnMut(&Frame) -> Result<()>,
    {
        let frame = self.frame();
        if self.last_frame.as_ref() != Some(&frame) {
            render(&frame)?;
            self.last_frame = Some(frame);
        }
        Ok(())
    }
}

/// Resolves when the pending retry is due. Never resolves without one.
async fn wait_for_retry(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(sleep) => sleep.await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
