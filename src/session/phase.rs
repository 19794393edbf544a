//! Breath phases and the elapsed-time schedule
//!
//! One breath cycle is 19 seconds: 4 s inhale, 7 s hold, 8 s exhale.

use std::fmt;

use serde::Serialize;

use crate::voice::PhraseKey;

/// Length of a session in seconds
pub const SESSION_SECS: u32 = 60;

/// Length of one inhale/hold/exhale cycle in seconds
pub const CYCLE_SECS: u32 = 19;

/// Offset within a cycle where hold begins
pub const HOLD_START: u32 = 4;

/// Offset within a cycle where exhale begins
pub const EXHALE_START: u32 = 11;

/// Where the user is in the breathing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathPhase {
    /// No session running
    #[default]
    Idle,
    /// Breathing in
    Inhale,
    /// Holding
    Hold,
    /// Breathing out
    Exhale,
    /// Session completed
    Success,
}

impl BreathPhase {
    /// Phrase narrated on entering this phase; idle has none
    #[must_use]
    pub const fn cue(self) -> Option<PhraseKey> {
        match self {
            Self::Idle => None,
            Self::Inhale => Some(PhraseKey::Inhale),
            Self::Hold => Some(PhraseKey::Hold),
            Self::Exhale => Some(PhraseKey::Exhale),
            Self::Success => Some(PhraseKey::Success),
        }
    }

    /// Whether this is one of the three breathing phases
    #[must_use]
    pub const fn is_breathing(self) -> bool {
        matches!(self, Self::Inhale | Self::Hold | Self::Exhale)
    }
}

impl fmt::Display for BreathPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Inhale => "inhale",
            Self::Hold => "hold",
            Self::Exhale => "exhale",
            Self::Success => "success",
        })
    }
}

/// Breathing phase for a number of elapsed seconds
///
/// Depends on nothing but `elapsed`, so every tick can be checked on its own.
/// Terminal success is decided by the controller, not here.
#[must_use]
pub const fn phase_at(elapsed: u32) -> BreathPhase {
    let offset = elapsed % CYCLE_SECS;
    if offset < HOLD_START {
        BreathPhase::Inhale
    } else if offset < EXHALE_START {
        BreathPhase::Hold
    } else {
        BreathPhase::Exhale
    }
}
