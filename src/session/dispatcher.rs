//! Audio cues for session events
//!
//! Binds phase changes to narrated clips, owns the ambient loop and applies
//! the mute preference. Every playback failure is logged and swallowed: the
//! visual timer stays the source of truth when audio is unavailable.

use crate::voice::{AudioBackend, AudioHandle, AudioSource, PhraseKey, VoiceCueCache};

use super::controller::{SessionEvent, SessionState};

/// Default gain for the ambient loop
pub const DEFAULT_AMBIENT_VOLUME: f32 = 0.4;

/// User audio preferences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AudioPreferences {
    /// Suppress all session audio
    pub muted: bool,
}

/// Plays cues and ambient sound in response to session events
pub struct AudioCueDispatcher<B: AudioBackend> {
    backend: B,
    cache: VoiceCueCache,
    prefs: AudioPreferences,
    ambient_source: Option<AudioSource>,
    ambient: Option<AudioHandle>,
    ambient_volume: f32,
}

impl<B: AudioBackend> AudioCueDispatcher<B> {
    /// Create a dispatcher over a backend and a (possibly still loading) cache
    pub fn new(backend: B, cache: VoiceCueCache, prefs: AudioPreferences) -> Self {
        Self {
            backend,
            cache,
            prefs,
            ambient_source: None,
            ambient: None,
            ambient_volume: DEFAULT_AMBIENT_VOLUME,
        }
    }

    /// Set the ambient loop source, loaded on first use
    #[must_use]
    pub fn with_ambient(mut self, source: AudioSource, volume: f32) -> Self {
        self.ambient_source = Some(source);
        self.ambient_volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Current preferences
    #[must_use]
    pub const fn preferences(&self) -> AudioPreferences {
        self.prefs
    }

    /// Whether audio is muted
    #[must_use]
    pub const fn is_muted(&self) -> bool {
        self.prefs.muted
    }

    /// Voice clip cache
    #[must_use]
    pub const fn cache(&self) -> &VoiceCueCache {
        &self.cache
    }

    /// Playback backend
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Ambient loop handle, once loaded
    #[must_use]
    pub const fn ambient_handle(&self) -> Option<AudioHandle> {
        self.ambient
    }

    /// React to a controller event; `state` is the state after the event
    pub fn handle(&mut self, event: SessionEvent, state: &SessionState) {
        self.cache.absorb(&mut self.backend);

        match event {
            SessionEvent::Started => {
                if !self.prefs.muted {
                    self.start_ambient();
                    self.play_cue(PhraseKey::Start);
                }
            }
            SessionEvent::PhaseEntered(phase) => {
                if let Some(cue) = phase.cue() {
                    self.play_cue(cue);
                }
            }
            SessionEvent::Completed => {
                self.stop_ambient();
                self.play_cue(PhraseKey::Success);
            }
        }

        tracing::trace!(?event, remaining = state.seconds_remaining, "event dispatched");
    }

    /// Apply a mute preference change
    pub fn set_muted(&mut self, muted: bool, state: &SessionState) {
        if self.prefs.muted == muted {
            return;
        }
        self.prefs.muted = muted;
        tracing::info!(muted, "audio preference changed");

        if muted {
            self.pause_all();
        } else if state.wants_ambient() {
            self.start_ambient();
        }
    }

    /// Flip the mute preference; returns the new value
    pub fn toggle_mute(&mut self, state: &SessionState) -> bool {
        let muted = !self.prefs.muted;
        self.set_muted(muted, state);
        muted
    }

    /// Pause the ambient loop and every cue
    pub fn close(&mut self) {
        self.pause_all();
    }

    /// Release every handle this dispatcher owns
    pub fn shutdown(&mut self) {
        self.pause_all();
        if let Some(handle) = self.ambient.take() {
            self.backend.release(handle);
        }
        self.cache.release_all(&mut self.backend);
    }

    /// Play a cached cue from the beginning
    ///
    /// Skipped silently when muted or when the clip is missing.
    pub fn play_cue(&mut self, key: PhraseKey) {
        if self.prefs.muted {
            return;
        }

        let Some(handle) = self.cache.get(key) else {
            tracing::debug!(phrase = %key, "no clip cached, skipping cue");
            return;
        };

        self.backend.rewind(handle);
        if let Err(e) = self.backend.play(handle) {
            tracing::debug!(phrase = %key, error = %e, "cue playback rejected");
        }
    }

    fn start_ambient(&mut self) {
        let Some(handle) = self.ensure_ambient() else {
            return;
        };
        if let Err(e) = self.backend.play(handle) {
            tracing::debug!(error = %e, "ambient playback rejected");
        }
    }

    fn stop_ambient(&mut self) {
        if let Some(handle) = self.ambient {
            self.backend.pause(handle);
        }
    }

    fn ensure_ambient(&mut self) -> Option<AudioHandle> {
        if self.ambient.is_some() {
            return self.ambient;
        }

        let source = self.ambient_source.take()?;
        match self.backend.acquire(source) {
            Ok(handle) => {
                self.backend.set_looping(handle, true);
                self.backend.set_volume(handle, self.ambient_volume);
                self.ambient = Some(handle);
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load ambient sound");
                None
            }
        }
    }

    fn pause_all(&mut self) {
        self.stop_ambient();
        for handle in self.cache.handles() {
            self.backend.pause(handle);
        }
    }
}
