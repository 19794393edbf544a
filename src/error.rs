//! Error types for the breathing session engine

use thiserror::Error;

/// Result type alias for panic-breath operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the session engine
///
/// None of these are fatal to a running session: callers on the session
/// path log them and degrade to a silent visual timer.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device or playback error
    #[error("audio error: {0}")]
    Audio(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Audio payload could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Unknown audio handle
    #[error("unknown audio handle: {0}")]
    UnknownHandle(u64),

    /// Record store error
    #[error("record store error: {0}")]
    Record(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
