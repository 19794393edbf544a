//! Narrated phrases spoken during a session

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a narrated line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhraseKey {
    /// Spoken once when the session starts
    Start,
    /// Breathe in
    Inhale,
    /// Hold the breath
    Hold,
    /// Breathe out
    Exhale,
    /// Spoken when the session completes
    Success,
}

impl PhraseKey {
    /// Every phrase key, in preload order
    pub const ALL: [Self; 5] = [
        Self::Start,
        Self::Inhale,
        Self::Hold,
        Self::Exhale,
        Self::Success,
    ];

    /// Lowercase name used in config files and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Inhale => "inhale",
            Self::Hold => "hold",
            Self::Exhale => "exhale",
            Self::Success => "success",
        }
    }

    /// Parse a lowercase phrase name
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Built-in narration for this key
    #[must_use]
    pub const fn default_text(self) -> &'static str {
        match self {
            Self::Start => "Get ready. Breathe in deeply.",
            Self::Inhale => "Breathe in deeply.",
            Self::Hold => "Hold your breath.",
            Self::Exhale => "Slowly breathe out.",
            Self::Success => "Very good. You made it through this urge.",
        }
    }
}

impl fmt::Display for PhraseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A narrated line and the text sent to the synthesizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    /// Cue identifier
    pub id: PhraseKey,
    /// Text to speak
    pub text: String,
}

impl Phrase {
    /// Create a phrase
    #[must_use]
    pub fn new(id: PhraseKey, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// The built-in phrase set, one per key
#[must_use]
pub fn default_phrases() -> Vec<Phrase> {
    PhraseKey::ALL
        .into_iter()
        .map(|key| Phrase::new(key, key.default_text()))
        .collect()
}
