//! Voice narration
//!
//! Speech synthesis, PCM-to-WAV conversion, the preloaded cue cache and the
//! audio backends that play it all back.

mod backend;
mod cache;
mod phrase;
mod playback;
mod retry;
mod synth;
mod wav;

pub use backend::{AudioBackend, AudioHandle, AudioSource, SilentBackend};
pub use cache::{DEFAULT_PRELOAD_TIMEOUT, Readiness, SynthesizedClip, VoiceCueCache};
pub use phrase::{Phrase, PhraseKey, default_phrases};
pub use playback::CpalBackend;
pub use retry::RetryPolicy;
pub use synth::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_PERSONA_PROMPT, DEFAULT_VOICE, GeminiTransport,
    SynthesisTransport, VoiceSynthesisClient, parse_sample_rate,
};
pub use wav::{
    DEFAULT_SAMPLE_RATE, DecodedAudio, MAX_SAMPLE_RATE, RawVoicePayload, WAV_HEADER_LEN, decode_wav,
    encode_payload, encode_pcm_base64, pcm16_to_wav,
};
