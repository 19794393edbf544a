//! Voice synthesis client
//!
//! Requests narrated clips from a remote text-to-speech service. Failures are
//! retried with exponential backoff and, once exhausted, degrade to "no clip"
//! rather than surfacing an error.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::retry::RetryPolicy;
use super::wav::{DEFAULT_SAMPLE_RATE, RawVoicePayload, encode_payload};
use crate::{Error, Result};

/// Default Gemini REST base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default speech model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Default prebuilt voice
pub const DEFAULT_VOICE: &str = "Aoede";

/// Persona instruction prepended to every phrase
pub const DEFAULT_PERSONA_PROMPT: &str =
    "Speak in an extremely gentle, slow and relaxing feminine meditation voice: ";

/// One synthesis attempt against a speech backend
#[async_trait]
pub trait SynthesisTransport: Send + Sync {
    /// Request audio for `text` once
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-success status, or a response
    /// without inline audio
    async fn synthesize(&self, text: &str) -> Result<RawVoicePayload>;
}

/// Synthesis client with retry and graceful degradation
#[derive(Clone)]
pub struct VoiceSynthesisClient {
    transport: Arc<dyn SynthesisTransport>,
    policy: RetryPolicy,
}

impl VoiceSynthesisClient {
    /// Create a client with the default retry policy
    #[must_use]
    pub fn new(transport: Arc<dyn SynthesisTransport>) -> Self {
        Self::with_policy(transport, RetryPolicy::default())
    }

    /// Create a client with a custom retry policy
    #[must_use]
    pub fn with_policy(transport: Arc<dyn SynthesisTransport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Retry policy in use
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Request a voice payload for `text`
    ///
    /// Each attempt is bounded by the policy's attempt timeout. Returns
    /// `None` after every attempt has failed.
    pub async fn request_voice(&self, text: &str) -> Option<RawVoicePayload> {
        let mut attempt = 0;
        loop {
            let result = tokio::time::timeout(
                self.policy.attempt_timeout,
                self.transport.synthesize(text),
            )
            .await
            .unwrap_or_else(|_| {
                Err(Error::Tts(format!(
                    "no response within {} ms",
                    self.policy.attempt_timeout.as_millis()
                )))
            });

            match result {
                Ok(payload) => {
                    tracing::debug!(
                        attempt,
                        sample_rate = payload.sample_rate_hz,
                        bytes = payload.base64_samples.len(),
                        "voice synthesized"
                    );
                    return Some(payload);
                }
                Err(e) if self.policy.should_retry(attempt) => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "voice synthesis failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        attempts = attempt + 1,
                        error = %e,
                        "voice synthesis gave up"
                    );
                    return None;
                }
            }
        }
    }

    /// Request a voice payload and wrap it as WAV bytes
    pub async fn request_clip(&self, text: &str) -> Option<Vec<u8>> {
        self.request_voice(text)
            .await
            .map(|payload| encode_payload(&payload))
    }
}

/// Extract the sample rate from a mime type such as `audio/L16;codec=pcm;rate=24000`
///
/// A missing, zero or unparsable rate falls back to the default.
#[must_use]
pub fn parse_sample_rate(mime_type: &str) -> u32 {
    mime_type
        .split_once("rate=")
        .and_then(|(_, rest)| {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .filter(|rate| *rate > 0)
        .unwrap_or(DEFAULT_SAMPLE_RATE)
}

/// Gemini `generateContent` speech backend
pub struct GeminiTransport {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    voice: String,
    persona_prompt: String,
}

impl GeminiTransport {
    /// Create a Gemini transport with default model, voice and persona
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: SecretString) -> Result<Self> {
        Self::with_options(
            api_key,
            DEFAULT_BASE_URL.to_string(),
            DEFAULT_MODEL.to_string(),
            DEFAULT_VOICE.to_string(),
            DEFAULT_PERSONA_PROMPT.to_string(),
        )
    }

    /// Create a Gemini transport with explicit options
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn with_options(
        api_key: SecretString,
        base_url: String,
        model: String,
        voice: String,
        persona_prompt: String,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Gemini API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            voice,
            persona_prompt,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_modalities: ["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: &self.voice,
                        },
                    },
                },
            },
            model: &self.model,
        }
    }
}

#[async_trait]
impl SynthesisTransport for GeminiTransport {
    async fn synthesize(&self, text: &str) -> Result<RawVoicePayload> {
        let prompt = format!("{}{text}", self.persona_prompt);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&self.request_body(&prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("Gemini TTS error {status}: {body}")));
        }

        let body: GenerateResponse = response.json().await?;
        body.into_payload()
            .ok_or_else(|| Error::Tts("response carried no inline audio".to_string()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
    model: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: [&'static str; 1],
    speech_config: SpeechConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

impl GenerateResponse {
    fn into_payload(self) -> Option<RawVoicePayload> {
        let inline = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .inline_data?;

        if inline.data.is_empty() {
            return None;
        }

        Some(RawVoicePayload {
            sample_rate_hz: parse_sample_rate(&inline.mime_type),
            base64_samples: inline.data,
        })
    }
}
