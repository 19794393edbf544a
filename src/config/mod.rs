//! Configuration management
//!
//! Layered: built-in defaults, then the TOML config file, then environment
//! variables.

pub mod file;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::Result;
use crate::session::DEFAULT_AMBIENT_VOLUME;
use crate::voice::{
    AudioSource, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_PERSONA_PROMPT,
    DEFAULT_PRELOAD_TIMEOUT, DEFAULT_VOICE, GeminiTransport, Phrase, PhraseKey,
    VoiceSynthesisClient,
};

use file::PanicBreathConfigFile;

/// Runtime configuration
#[derive(Debug)]
pub struct Config {
    /// Voice synthesis configuration
    pub voice: VoiceConfig,

    /// Playback configuration
    pub audio: AudioConfig,

    /// Narrated phrases, one per key
    pub phrases: Vec<Phrase>,

    /// Directory for the record store
    pub data_dir: PathBuf,
}

/// Voice synthesis configuration
#[derive(Debug)]
pub struct VoiceConfig {
    /// Gemini API key; synthesis is disabled without one
    pub api_key: Option<SecretString>,

    /// REST base URL
    pub base_url: String,

    /// Speech model
    pub model: String,

    /// Prebuilt voice name
    pub voice_name: String,

    /// Instruction prepended to every phrase
    pub persona_prompt: String,
}

/// Playback configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Start sessions muted
    pub muted: bool,

    /// Ambient loop file
    pub ambient_path: Option<PathBuf>,

    /// Ambient loop gain
    pub ambient_volume: f32,

    /// How long to wait for the first voice clip
    pub preload_timeout: Duration,
}

impl AudioConfig {
    /// Ambient loop source, if configured
    #[must_use]
    pub fn ambient_source(&self) -> Option<AudioSource> {
        self.ambient_path.clone().map(AudioSource::File)
    }
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// An explicit `config_path` must exist and parse; the default path is
    /// optional and falls back to defaults with a warning.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be loaded
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let file = match config_path {
            Some(path) => file::load_from(path)?,
            None => file::load_config_file(),
        };
        Ok(Self::from_sources(file, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed config file with environment lookups
    pub fn from_sources(file: PanicBreathConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = env("GEMINI_API_KEY")
            .or(file.voice.api_key)
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let voice = VoiceConfig {
            api_key,
            base_url: env("PANIC_BREATH_TTS_URL")
                .or(file.voice.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: env("PANIC_BREATH_TTS_MODEL")
                .or(file.voice.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            voice_name: env("PANIC_BREATH_TTS_VOICE")
                .or(file.voice.voice_name)
                .unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            persona_prompt: file
                .voice
                .persona_prompt
                .unwrap_or_else(|| DEFAULT_PERSONA_PROMPT.to_string()),
        };

        let audio = AudioConfig {
            muted: env("PANIC_BREATH_MUTED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .or(file.audio.muted)
                .unwrap_or(false),
            ambient_path: env("PANIC_BREATH_AMBIENT")
                .or(file.audio.ambient_path)
                .map(PathBuf::from),
            ambient_volume: file
                .audio
                .ambient_volume
                .unwrap_or(DEFAULT_AMBIENT_VOLUME)
                .clamp(0.0, 1.0),
            preload_timeout: file
                .audio
                .preload_timeout_secs
                .map_or(DEFAULT_PRELOAD_TIMEOUT, Duration::from_secs),
        };

        let mut overrides = BTreeMap::new();
        for (name, text) in file.phrases {
            match PhraseKey::parse(&name) {
                Some(key) => {
                    overrides.insert(key, text);
                }
                None => tracing::warn!(phrase = %name, "ignoring unknown phrase in config"),
            }
        }
        let phrases = PhraseKey::ALL
            .into_iter()
            .map(|key| {
                let text = overrides
                    .remove(&key)
                    .unwrap_or_else(|| key.default_text().to_string());
                Phrase::new(key, text)
            })
            .collect();

        let data_dir = env("PANIC_BREATH_DATA_DIR")
            .or(file.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        Self {
            voice,
            audio,
            phrases,
            data_dir,
        }
    }

    /// Build the synthesis client, or `None` when no API key is configured
    #[must_use]
    pub fn synthesis_client(&self) -> Option<VoiceSynthesisClient> {
        let Some(api_key) = self
            .voice
            .api_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret().to_owned()))
        else {
            tracing::info!("no GEMINI_API_KEY configured, voice narration disabled");
            return None;
        };

        match GeminiTransport::with_options(
            api_key,
            self.voice.base_url.clone(),
            self.voice.model.clone(),
            self.voice.voice_name.clone(),
            self.voice.persona_prompt.clone(),
        ) {
            Ok(transport) => Some(VoiceSynthesisClient::new(Arc::new(transport))),
            Err(e) => {
                tracing::warn!(error = %e, "voice synthesis unavailable");
                None
            }
        }
    }
}

/// Default data directory (`~/.local/share/panic-breath` on Linux)
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "panic-breath", "panic-breath")
        .map_or_else(|| PathBuf::from(".panic-breath"), |d| d.data_dir().to_path_buf())
}
