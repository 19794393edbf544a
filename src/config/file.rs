//! TOML configuration file loading
//!
//! Supports `~/.config/panic-breath/config.toml` as a persistent config
//! source. All fields are optional; the file is a partial overlay on top of
//! defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct PanicBreathConfigFile {
    /// Voice synthesis configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Playback configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Per-phrase narration overrides, keyed by phrase name
    #[serde(default)]
    pub phrases: BTreeMap<String, String>,

    /// Directory for the record store
    #[serde(default)]
    pub data_dir: Option<String>,
}

/// Voice synthesis configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Gemini API key (prefer the `GEMINI_API_KEY` env var)
    pub api_key: Option<String>,

    /// REST base URL
    pub base_url: Option<String>,

    /// Speech model (e.g. "gemini-2.5-flash-preview-tts")
    pub model: Option<String>,

    /// Prebuilt voice name (e.g. "Aoede")
    pub voice_name: Option<String>,

    /// Instruction prepended to every phrase
    pub persona_prompt: Option<String>,
}

/// Playback configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// Start sessions muted
    pub muted: Option<bool>,

    /// Ambient loop file (WAV or MP3)
    pub ambient_path: Option<String>,

    /// Ambient loop gain
    pub ambient_volume: Option<f32>,

    /// Seconds to wait for the first voice clip
    pub preload_timeout_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `PanicBreathConfigFile::default()` if the file doesn't exist or
/// can't be parsed.
pub fn load_config_file() -> PanicBreathConfigFile {
    let Some(path) = config_file_path() else {
        return PanicBreathConfigFile::default();
    };

    if !path.exists() {
        return PanicBreathConfigFile::default();
    }

    match load_from(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            PanicBreathConfigFile::default()
        }
    }
}

/// Load a config file from an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn load_from(path: &Path) -> Result<PanicBreathConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Return the config file path: `~/.config/panic-breath/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("panic-breath").join("config.toml"))
}
