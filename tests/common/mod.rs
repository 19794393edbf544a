//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::time::Instant;

use panic_breath::voice::{
    RawVoicePayload, SynthesisTransport, VoiceSynthesisClient,
};
use panic_breath::{
    AudioBackend, AudioHandle, AudioSource, Error, Phrase, PhraseKey, Result, VoiceCueCache,
};

/// What a fake synthesis attempt does
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Return a short valid payload
    Succeed,
    /// Return a transport error
    Fail,
    /// Return a payload whose samples are not valid base64
    Malformed,
    /// Return a valid payload that reports a 0 Hz sample rate
    ZeroRate,
    /// Succeed after a delay
    SucceedAfter(Duration),
    /// Never complete
    Hang,
}

/// Scripted synthesis backend
///
/// Each text consumes its own queue of steps; once a queue is empty the
/// fallback step applies.
pub struct FakeTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    fallback: Step,
    attempts: Mutex<Vec<(String, Instant)>>,
}

impl FakeTransport {
    pub fn always(fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn scripted(fallback: Step, scripts: &[(&str, &[Step])]) -> Arc<Self> {
        let scripts = scripts
            .iter()
            .map(|(text, steps)| ((*text).to_string(), steps.iter().copied().collect()))
            .collect();
        Arc::new(Self {
            scripts: Mutex::new(scripts),
            fallback,
            attempts: Mutex::new(Vec::new()),
        })
    }

    /// Every attempt so far, with the virtual time it was made
    pub fn attempts(&self) -> Vec<(String, Instant)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, text: &str) -> Vec<Instant> {
        self.attempts()
            .into_iter()
            .filter(|(t, _)| t == text)
            .map(|(_, at)| at)
            .collect()
    }
}

#[async_trait]
impl SynthesisTransport for FakeTransport {
    async fn synthesize(&self, text: &str) -> Result<RawVoicePayload> {
        self.attempts
            .lock()
            .unwrap()
            .push((text.to_string(), Instant::now()));

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(text)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.fallback);

        match step {
            Step::Succeed => Ok(pcm_payload(4)),
            Step::Fail => Err(Error::Tts("scripted failure".to_string())),
            Step::Malformed => Ok(RawVoicePayload {
                base64_samples: "!!not base64!!".to_string(),
                sample_rate_hz: 24000,
            }),
            Step::ZeroRate => Ok(RawVoicePayload {
                sample_rate_hz: 0,
                ..pcm_payload(4)
            }),
            Step::SucceedAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(pcm_payload(4))
            }
            Step::Hang => std::future::pending().await,
        }
    }
}

/// A payload of `samples` silent 16-bit samples at 24 kHz
pub fn pcm_payload(samples: usize) -> RawVoicePayload {
    RawVoicePayload {
        base64_samples: STANDARD.encode(vec![0u8; samples * 2]),
        sample_rate_hz: 24000,
    }
}

pub fn client(transport: Arc<FakeTransport>) -> VoiceSynthesisClient {
    VoiceSynthesisClient::new(transport)
}

/// A call made against [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Acquire(AudioHandle),
    Play(AudioHandle),
    Pause(AudioHandle),
    Rewind(AudioHandle),
    SetVolume(AudioHandle, f32),
    SetLooping(AudioHandle, bool),
    Release(AudioHandle),
}

/// Backend that records every call and tracks play state
#[derive(Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub sources: HashMap<AudioHandle, AudioSource>,
    playing: HashMap<AudioHandle, bool>,
    next_id: u64,
    pub fail_acquire: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self, handle: AudioHandle) -> bool {
        self.playing.get(&handle).copied().unwrap_or(false)
    }

    pub fn is_loaded(&self, handle: AudioHandle) -> bool {
        self.playing.contains_key(&handle)
    }

    pub fn play_count(&self, handle: AudioHandle) -> usize {
        self.calls
            .iter()
            .filter(|c| **c == Call::Play(handle))
            .count()
    }

    /// Whether anything is currently playing
    pub fn any_playing(&self) -> bool {
        self.playing.values().any(|p| *p)
    }
}

impl AudioBackend for RecordingBackend {
    fn acquire(&mut self, source: AudioSource) -> Result<AudioHandle> {
        if self.fail_acquire {
            return Err(Error::Audio("scripted acquire failure".to_string()));
        }
        self.next_id += 1;
        let handle = AudioHandle::from_raw(self.next_id);
        self.sources.insert(handle, source);
        self.playing.insert(handle, false);
        self.calls.push(Call::Acquire(handle));
        Ok(handle)
    }

    fn play(&mut self, handle: AudioHandle) -> Result<()> {
        self.calls.push(Call::Play(handle));
        match self.playing.get_mut(&handle) {
            Some(playing) => {
                *playing = true;
                Ok(())
            }
            None => Err(Error::UnknownHandle(handle.raw())),
        }
    }

    fn pause(&mut self, handle: AudioHandle) {
        self.calls.push(Call::Pause(handle));
        if let Some(playing) = self.playing.get_mut(&handle) {
            *playing = false;
        }
    }

    fn rewind(&mut self, handle: AudioHandle) {
        self.calls.push(Call::Rewind(handle));
    }

    fn set_volume(&mut self, handle: AudioHandle, volume: f32) {
        self.calls.push(Call::SetVolume(handle, volume));
    }

    fn set_looping(&mut self, handle: AudioHandle, looping: bool) {
        self.calls.push(Call::SetLooping(handle, looping));
    }

    fn release(&mut self, handle: AudioHandle) {
        self.calls.push(Call::Release(handle));
        self.playing.remove(&handle);
        self.sources.remove(&handle);
    }
}

/// Fill a cache with every phrase in `phrases` using an always-succeeding fake
pub async fn voiced_cache(backend: &mut RecordingBackend, phrases: Vec<Phrase>) -> VoiceCueCache {
    let wanted = phrases.len();
    let mut cache = VoiceCueCache::new();
    cache.preload(client(FakeTransport::always(Step::Succeed)), phrases);
    cache.wait_ready(backend, Duration::from_secs(5)).await;

    for _ in 0..100 {
        if cache.len() >= wanted {
            break;
        }
        tokio::task::yield_now().await;
        cache.absorb(backend);
    }
    assert_eq!(cache.len(), wanted, "fake preload did not finish");
    cache
}

/// Phrases for the given keys with their default text
pub fn phrases(keys: &[PhraseKey]) -> Vec<Phrase> {
    keys.iter()
        .map(|key| Phrase::new(*key, key.default_text()))
        .collect()
}
