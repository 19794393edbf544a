//! Audio handle registry
//!
//! Every playable sound is acquired from an [`AudioBackend`] and addressed by
//! an [`AudioHandle`] until it is released. Handles are what the cue cache
//! stores and what the dispatcher plays, pauses and rewinds.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::{Error, Result};

/// Opaque identifier of an acquired sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AudioHandle(u64);

impl AudioHandle {
    /// Wrap a raw id
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Raw id
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a sound comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// In-memory WAV bytes (synthesized cues)
    Wav(Vec<u8>),
    /// Audio file on disk, WAV or MP3 by extension
    File(PathBuf),
}

/// Playback backend with explicit handle lifecycle
///
/// Calls on a released or unknown handle return [`Error::UnknownHandle`]
/// from `play` and are ignored elsewhere.
pub trait AudioBackend {
    /// Load a sound and return its handle; it starts paused at position 0
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot be read or decoded
    fn acquire(&mut self, source: AudioSource) -> Result<AudioHandle>;

    /// Start or resume playback
    ///
    /// # Errors
    ///
    /// Returns error if the host rejects playback
    fn play(&mut self, handle: AudioHandle) -> Result<()>;

    /// Pause playback, keeping the position
    fn pause(&mut self, handle: AudioHandle);

    /// Move the playback position back to the beginning
    fn rewind(&mut self, handle: AudioHandle);

    /// Set linear gain in `[0.0, 1.0]`
    fn set_volume(&mut self, handle: AudioHandle, volume: f32);

    /// Loop at end of data instead of stopping
    fn set_looping(&mut self, handle: AudioHandle, looping: bool);

    /// Stop and drop the sound
    fn release(&mut self, handle: AudioHandle);
}

/// Backend for hosts without an output device
///
/// Tracks handle state so the session logic behaves identically, but never
/// produces sound.
#[derive(Debug, Default)]
pub struct SilentBackend {
    next_id: u64,
    playing: HashMap<AudioHandle, bool>,
}

impl SilentBackend {
    /// Create a silent backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the handle is currently "playing"
    #[must_use]
    pub fn is_playing(&self, handle: AudioHandle) -> bool {
        self.playing.get(&handle).copied().unwrap_or(false)
    }
}

impl AudioBackend for SilentBackend {
    fn acquire(&mut self, _source: AudioSource) -> Result<AudioHandle> {
        self.next_id += 1;
        let handle = AudioHandle(self.next_id);
        self.playing.insert(handle, false);
        Ok(handle)
    }

    fn play(&mut self, handle: AudioHandle) -> Result<()> {
        let state = self
            .playing
            .get_mut(&handle)
            .ok_or(Error::UnknownHandle(handle.0))?;
        *state = true;
        Ok(())
    }

    fn pause(&mut self, handle: AudioHandle) {
        if let Some(state) = self.playing.get_mut(&handle) {
            *state = false;
        }
    }

    fn rewind(&mut self, _handle: AudioHandle) {}

    fn set_volume(&mut self, _handle: AudioHandle, _volume: f32) {}

    fn set_looping(&mut self, _handle: AudioHandle, _looping: bool) {}

    fn release(&mut self, handle: AudioHandle) {
        self.playing.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_backend_tracks_lifecycle() {
        let mut backend = SilentBackend::new();
        let handle = backend.acquire(AudioSource::Wav(Vec::new())).unwrap();
        assert!(!backend.is_playing(handle));

        backend.play(handle).unwrap();
        assert!(backend.is_playing(handle));

        backend.pause(handle);
        assert!(!backend.is_playing(handle));

        backend.release(handle);
        assert!(matches!(backend.play(handle), Err(Error::UnknownHandle(_))));
    }

    #[test]
    fn handles_are_distinct() {
        let mut backend = SilentBackend::new();
        let a = backend.acquire(AudioSource::Wav(Vec::new())).unwrap();
        let b = backend.acquire(AudioSource::Wav(Vec::new())).unwrap();
        assert_ne!(a, b);
    }
}
