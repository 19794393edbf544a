//! panic-breath - a guided 60-second breathing session
//!
//! This library provides the session engine behind a breathing "panic button":
//! - Voice narration synthesized up front (with retry) and cached as WAV clips
//! - A deterministic inhale/hold/exhale timer driven by elapsed time
//! - A cue dispatcher that plays narration and an ambient loop, honoring mute
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   clips    ┌────────────────────┐
//! │ VoiceSynthesisClient ├───────────►│   VoiceCueCache    │
//! │  (retry + WAV wrap)  │  (channel) │ (write-once/phrase)│
//! └──────────────────────┘            └─────────┬──────────┘
//!                                               │ handles
//! ┌──────────────────────┐   events   ┌─────────▼──────────┐
//! │ BreathSessionControl ├───────────►│ AudioCueDispatcher │──► AudioBackend
//! │   (1 s tick, pure)   │            │  (mute, ambient)   │
//! └──────────────────────┘            └────────────────────┘
//! ```
//!
//! Every audio failure degrades to a silent visual timer; nothing on the
//! session path is fatal.

pub mod config;
pub mod error;
pub mod records;
pub mod session;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use records::{DailyRecord, JsonFileStore, MemoryStore, RecordStatus, RecordStore};
pub use session::{
    AudioCueDispatcher, AudioPreferences, BreathPhase, BreathSession, BreathSessionController,
    SessionCommand, SessionEvent, SessionOutcome, SessionState,
};
pub use voice::{
    AudioBackend, AudioHandle, AudioSource, Phrase, PhraseKey, Readiness, VoiceCueCache,
    VoiceSynthesisClient,
};
