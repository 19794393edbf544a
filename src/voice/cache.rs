//! Preloaded voice cues
//!
//! Synthesis runs on a background task and hands finished clips back over a
//! channel. The cache itself has a single owner, which installs clips as they
//! arrive, so lookups during a session never contend with the loader.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::backend::{AudioBackend, AudioHandle, AudioSource};
use super::phrase::{Phrase, PhraseKey};
use super::synth::VoiceSynthesisClient;

/// How long session start may wait for the first clip
pub const DEFAULT_PRELOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// A synthesized, WAV-encoded clip on its way into the cache
#[derive(Debug)]
pub struct SynthesizedClip {
    /// Phrase this clip narrates
    pub id: PhraseKey,
    /// WAV bytes (possibly empty if the payload was malformed)
    pub wav: Vec<u8>,
}

/// Outcome of waiting for the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// At least one clip is cached
    Voiced,
    /// Timed out (or nothing to load); the session runs without narration
    Fallback,
}

/// One playable clip per phrase, write-once per id
#[derive(Default)]
pub struct VoiceCueCache {
    clips: HashMap<PhraseKey, AudioHandle>,
    incoming: Option<mpsc::UnboundedReceiver<SynthesizedClip>>,
    loader: Option<JoinHandle<()>>,
}

impl VoiceCueCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start synthesizing every phrase that is not cached yet
    ///
    /// Must be called from within a tokio runtime. Returns the number of
    /// phrases queued; a previous unfinished preload is cancelled.
    pub fn preload(&mut self, client: VoiceSynthesisClient, phrases: Vec<Phrase>) -> usize {
        let mut seen = HashSet::new();
        let missing: Vec<Phrase> = phrases
            .into_iter()
            .filter(|p| !self.clips.contains_key(&p.id) && seen.insert(p.id))
            .collect();

        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
        self.incoming = None;

        if missing.is_empty() {
            return 0;
        }

        let queued = missing.len();
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = tokio::spawn(async move {
            for phrase in missing {
                let Some(wav) = client.request_clip(&phrase.text).await else {
                    tracing::warn!(phrase = %phrase.id, "no voice clip, cue will be silent");
                    continue;
                };
                if tx.send(SynthesizedClip { id: phrase.id, wav }).is_err() {
                    break;
                }
            }
        });

        tracing::debug!(queued, "voice preload started");
        self.incoming = Some(rx);
        self.loader = Some(loader);
        queued
    }

    /// Wait until the first clip is cached or `timeout` elapses
    ///
    /// If every request fails early the full timeout is still observed, so
    /// start-up timing does not depend on how the network failed.
    pub async fn wait_ready<B: AudioBackend>(
        &mut self,
        backend: &mut B,
        timeout: Duration,
    ) -> Readiness {
        self.absorb(backend);
        if !self.clips.is_empty() {
            return Readiness::Voiced;
        }

        let deadline = Instant::now() + timeout;
        loop {
            let Some(incoming) = self.incoming.as_mut() else {
                return Readiness::Fallback;
            };

            match tokio::time::timeout_at(deadline, incoming.recv()).await {
                Ok(Some(clip)) => {
                    if self.install(backend, clip) {
                        return Readiness::Voiced;
                    }
                }
                Ok(None) => {
                    self.incoming = None;
                    tokio::time::sleep_until(deadline).await;
                    tracing::info!("no voice clips available, continuing without narration");
                    return Readiness::Fallback;
                }
                Err(_) => {
                    tracing::info!(
                        timeout_ms = timeout.as_millis(),
                        "voice preload timed out, continuing without narration"
                    );
                    return Readiness::Fallback;
                }
            }
        }
    }

    /// Install any clips that finished since the last call
    ///
    /// Returns the number of newly cached clips.
    pub fn absorb<B: AudioBackend>(&mut self, backend: &mut B) -> usize {
        let mut installed = 0;
        while let Some(clip) = self.incoming.as_mut().and_then(|rx| rx.try_recv().ok()) {
            if self.install(backend, clip) {
                installed += 1;
            }
        }
        installed
    }

    fn install<B: AudioBackend>(&mut self, backend: &mut B, clip: SynthesizedClip) -> bool {
        if self.clips.contains_key(&clip.id) {
            return false;
        }

        match backend.acquire(AudioSource::Wav(clip.wav)) {
            Ok(handle) => {
                tracing::debug!(phrase = %clip.id, %handle, "voice clip cached");
                self.clips.insert(clip.id, handle);
                true
            }
            Err(e) => {
                tracing::warn!(phrase = %clip.id, error = %e, "failed to load voice clip");
                false
            }
        }
    }

    /// Cached handle for a phrase
    #[must_use]
    pub fn get(&self, id: PhraseKey) -> Option<AudioHandle> {
        self.clips.get(&id).copied()
    }

    /// All cached handles
    pub fn handles(&self) -> impl Iterator<Item = AudioHandle> + '_ {
        self.clips.values().copied()
    }

    /// Number of cached clips
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Cancel loading and release every cached handle
    pub fn release_all<B: AudioBackend>(&mut self, backend: &mut B) {
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
        self.incoming = None;
        for (_, handle) in self.clips.drain() {
            backend.release(handle);
        }
    }
}

impl Drop for VoiceCueCache {
    fn drop(&mut self) {
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
    }
}
