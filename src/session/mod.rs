//! Guided breathing session
//!
//! [`BreathSession`] owns the phase controller and the cue dispatcher and
//! drives both from one repeating one-second timer. Controls (mute, close)
//! arrive over a channel and are handled between ticks, so a tick's state
//! update and its audio cue always complete before anything else runs.

mod controller;
mod dispatcher;
mod phase;

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

pub use controller::{BreathSessionController, SessionEvent, SessionState};
pub use dispatcher::{AudioCueDispatcher, AudioPreferences, DEFAULT_AMBIENT_VOLUME};
pub use phase::{BreathPhase, CYCLE_SECS, EXHALE_START, HOLD_START, SESSION_SECS, phase_at};

use crate::voice::AudioBackend;

/// Interval between timer ticks
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// User controls accepted while a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Flip the mute preference
    ToggleMute,
    /// Set the mute preference
    SetMuted(bool),
    /// Stop the session and silence everything
    Close,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The full 60 seconds elapsed
    Completed,
    /// The user closed the session early
    Closed,
}

/// A breathing session with audio
pub struct BreathSession<B: AudioBackend> {
    controller: BreathSessionController,
    dispatcher: AudioCueDispatcher<B>,
    observer: watch::Sender<SessionState>,
}

impl<B: AudioBackend> BreathSession<B> {
    /// Create an idle session
    pub fn new(dispatcher: AudioCueDispatcher<B>) -> Self {
        let (observer, _) = watch::channel(SessionState::default());
        Self {
            controller: BreathSessionController::new(),
            dispatcher,
            observer,
        }
    }

    /// Watch state snapshots, published after every change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.observer.subscribe()
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.controller.state()
    }

    /// Cue dispatcher
    #[must_use]
    pub const fn dispatcher(&self) -> &AudioCueDispatcher<B> {
        &self.dispatcher
    }

    /// Mutable cue dispatcher
    pub fn dispatcher_mut(&mut self) -> &mut AudioCueDispatcher<B> {
        &mut self.dispatcher
    }

    /// Start (or restart) the session without running the timer
    pub fn start(&mut self) {
        let event = self.controller.start();
        self.dispatch(event);
    }

    /// Advance one second, dispatching any phase event
    pub fn tick(&mut self) -> Option<SessionEvent> {
        let event = self.controller.tick();
        if let Some(event) = event {
            self.dispatch(event);
        } else {
            self.publish();
        }
        event
    }

    /// Apply a user control; returns `true` if the session was closed
    pub fn apply(&mut self, command: SessionCommand) -> bool {
        let state = self.controller.state();
        match command {
            SessionCommand::ToggleMute => {
                self.dispatcher.toggle_mute(&state);
            }
            SessionCommand::SetMuted(muted) => self.dispatcher.set_muted(muted, &state),
            SessionCommand::Close => {
                self.close();
                return true;
            }
        }
        false
    }

    /// Stop the session and pause every sound
    ///
    /// Idempotent; safe in any state.
    pub fn close(&mut self) {
        self.controller.close();
        self.dispatcher.close();
        self.publish();
    }

    /// Start the session and run the timer until it completes or is closed
    ///
    /// Ticks fire at fixed one-second intervals from start and never overlap.
    /// A closed command channel leaves the timer running to completion.
    pub async fn run(&mut self, commands: &mut mpsc::Receiver<SessionCommand>) -> SessionOutcome {
        self.start();

        let mut ticker = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if self.apply(command) {
                            return SessionOutcome::Closed;
                        }
                    }
                    None => commands_open = false,
                },

                _ = ticker.tick() => {
                    if matches!(self.tick(), Some(SessionEvent::Completed)) {
                        return SessionOutcome::Completed;
                    }
                }
            }
        }
    }

    /// Keep handling controls for `duration` after a run ends
    ///
    /// Lets the success cue play out while mute still works. Returns `true`
    /// if a close command cut the wait short.
    pub async fn linger(
        &mut self,
        commands: &mut mpsc::Receiver<SessionCommand>,
        duration: Duration,
    ) -> bool {
        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if self.apply(command) {
                            return true;
                        }
                    }
                    None => commands_open = false,
                },

                () = &mut deadline => return false,
            }
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let state = self.controller.state();
        self.dispatcher.handle(event, &state);
        self.publish();
    }

    fn publish(&self) {
        self.observer.send_replace(self.controller.state());
    }
}
