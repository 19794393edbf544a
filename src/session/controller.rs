//! Breath session state machine
//!
//! The controller is synchronous: the session runner calls [`tick`] once per
//! second and forwards any returned event. Each call updates the remaining
//! time, the phase and the activity flag together before returning.
//!
//! [`tick`]: BreathSessionController::tick

use serde::Serialize;

use super::phase::{BreathPhase, SESSION_SECS, phase_at};

/// Snapshot of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionState {
    /// Current phase
    pub phase: BreathPhase,
    /// Seconds left, in `[0, 60]`
    pub seconds_remaining: u32,
    /// Whether the session timer is running
    pub is_active: bool,
}

impl SessionState {
    /// Seconds since start
    #[must_use]
    pub const fn elapsed(&self) -> u32 {
        SESSION_SECS - self.seconds_remaining
    }

    /// Whether ambient sound belongs in this state
    #[must_use]
    pub const fn wants_ambient(&self) -> bool {
        self.is_active && self.phase.is_breathing()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: BreathPhase::Idle,
            seconds_remaining: SESSION_SECS,
            is_active: false,
        }
    }
}

/// Edge-triggered session events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session started; phase is inhale
    Started,
    /// Phase changed to a breathing phase
    PhaseEntered(BreathPhase),
    /// Remaining time reached zero; phase is success
    Completed,
}

/// Drives phases from elapsed time
#[derive(Debug, Default)]
pub struct BreathSessionController {
    state: SessionState,
}

impl BreathSessionController {
    /// Create an idle controller
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Begin a fresh session from any state
    pub fn start(&mut self) -> SessionEvent {
        self.state = SessionState {
            phase: BreathPhase::Inhale,
            seconds_remaining: SESSION_SECS,
            is_active: true,
        };
        tracing::info!(seconds = SESSION_SECS, "breathing session started");
        SessionEvent::Started
    }

    /// Advance one second
    ///
    /// Returns an event only when the phase changed. Does nothing unless
    /// the session is active.
    pub fn tick(&mut self) -> Option<SessionEvent> {
        if !self.state.is_active {
            return None;
        }

        self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);

        if self.state.seconds_remaining == 0 {
            self.state.phase = BreathPhase::Success;
            self.state.is_active = false;
            tracing::info!("breathing session completed");
            return Some(SessionEvent::Completed);
        }

        let expected = phase_at(self.state.elapsed());
        if expected == self.state.phase {
            return None;
        }

        tracing::debug!(
            from = %self.state.phase,
            to = %expected,
            remaining = self.state.seconds_remaining,
            "phase changed"
        );
        self.state.phase = expected;
        Some(SessionEvent::PhaseEntered(expected))
    }

    /// Stop the session and return to idle
    ///
    /// Idempotent. Returns whether anything changed.
    pub fn close(&mut self) -> bool {
        let changed = self.state != SessionState::default();
        if changed {
            tracing::debug!(phase = %self.state.phase, "breathing session closed");
        }
        self.state = SessionState::default();
        changed
    }
}
