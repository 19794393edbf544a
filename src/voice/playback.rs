//! Audio playback to speakers
//!
//! A single output stream mixes every playing handle. Sounds are decoded up
//! front and resampled to the stream rate, so the audio callback only copies
//! and sums samples.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use super::backend::{AudioBackend, AudioHandle, AudioSource};
use super::wav::{DecodedAudio, decode_wav};
use crate::{Error, Result};

/// Preferred output rate (matches the synthesized cues)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// One loaded sound
struct Voice {
    samples: Arc<[f32]>,
    position: usize,
    playing: bool,
    looping: bool,
    volume: f32,
}

impl Voice {
    fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into(),
            position: 0,
            playing: false,
            looping: false,
            volume: 1.0,
        }
    }

    /// Next sample, advancing the position
    fn next_sample(&mut self) -> f32 {
        if !self.playing {
            return 0.0;
        }
        if self.position >= self.samples.len() {
            if self.looping && !self.samples.is_empty() {
                self.position = 0;
            } else {
                self.playing = false;
                return 0.0;
            }
        }
        let sample = self.samples[self.position] * self.volume;
        self.position += 1;
        sample
    }
}

#[derive(Default)]
struct Mixer {
    voices: HashMap<AudioHandle, Voice>,
}

impl Mixer {
    fn fill(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels) {
            let mixed: f32 = self.voices.values_mut().map(Voice::next_sample).sum();
            let sample = mixed.clamp(-1.0, 1.0);
            for out in frame.iter_mut() {
                *out = sample;
            }
        }
    }
}

/// Plays sounds to the default output device
pub struct CpalBackend {
    mixer: Arc<Mutex<Mixer>>,
    sample_rate: u32,
    next_id: u64,
    _stream: Stream,
}

impl CpalBackend {
    /// Open the default output device and start the mixing stream
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supports = |c: &cpal::SupportedStreamConfigRange, channels: u16| {
            c.channels() == channels
                && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
        };

        let config: StreamConfig = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| supports(c, 1))
            .or_else(|| {
                // Fallback: try stereo
                device
                    .supported_output_configs()
                    .ok()?
                    .find(|c| supports(c, 2))
            })
            .map(|c| c.with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE)).config())
            .map_or_else(
                || {
                    device
                        .default_output_config()
                        .map(|c| c.config())
                        .map_err(|e| Error::Audio(e.to_string()))
                },
                Ok,
            )?;

        let channels = usize::from(config.channels.max(1));
        let mixer = Arc::new(Mutex::new(Mixer::default()));
        let callback_mixer = Arc::clone(&mixer);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if let Ok(mut mixer) = callback_mixer.lock() {
                        mixer.fill(data, channels);
                    } else {
                        data.fill(0.0);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        tracing::debug!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self {
            mixer,
            sample_rate: config.sample_rate.0,
            next_id: 0,
            _stream: stream,
        })
    }

    /// Output stream sample rate
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn mixer(&self) -> Result<MutexGuard<'_, Mixer>> {
        self.mixer
            .lock()
            .map_err(|_| Error::Audio("mixer lock poisoned".to_string()))
    }

    fn with_voice(&self, handle: AudioHandle, f: impl FnOnce(&mut Voice)) {
        if let Ok(mut mixer) = self.mixer() {
            if let Some(voice) = mixer.voices.get_mut(&handle) {
                f(voice);
            }
        }
    }
}

impl AudioBackend for CpalBackend {
    fn acquire(&mut self, source: AudioSource) -> Result<AudioHandle> {
        let decoded = match source {
            AudioSource::Wav(bytes) => decode_wav(&bytes)?,
            AudioSource::File(path) => decode_file(&path)?,
        };

        let samples = if decoded.sample_rate == self.sample_rate || decoded.samples.is_empty() {
            decoded.samples
        } else {
            resample_audio(&decoded.samples, decoded.sample_rate, self.sample_rate)?
        };

        self.next_id += 1;
        let handle = AudioHandle::from_raw(self.next_id);
        let len = samples.len();
        self.mixer()?.voices.insert(handle, Voice::new(samples));

        tracing::trace!(%handle, samples = len, "sound acquired");
        Ok(handle)
    }

    fn play(&mut self, handle: AudioHandle) -> Result<()> {
        let mut mixer = self.mixer()?;
        let voice = mixer
            .voices
            .get_mut(&handle)
            .ok_or(Error::UnknownHandle(handle.raw()))?;
        voice.playing = true;
        Ok(())
    }

    fn pause(&mut self, handle: AudioHandle) {
        self.with_voice(handle, |v| v.playing = false);
    }

    fn rewind(&mut self, handle: AudioHandle) {
        self.with_voice(handle, |v| v.position = 0);
    }

    fn set_volume(&mut self, handle: AudioHandle, volume: f32) {
        self.with_voice(handle, |v| v.volume = volume.clamp(0.0, 1.0));
    }

    fn set_looping(&mut self, handle: AudioHandle, looping: bool) {
        self.with_voice(handle, |v| v.looping = looping);
    }

    fn release(&mut self, handle: AudioHandle) {
        if let Ok(mut mixer) = self.mixer() {
            mixer.voices.remove(&handle);
        }
    }
}

/// Decode an audio file by extension
fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let data = std::fs::read(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "wav" | "wave" => decode_wav(&data),
        "mp3" => decode_mp3(&data),
        other => Err(Error::Decode(format!(
            "unsupported audio file type '{other}' for {}",
            path.display()
        ))),
    }
}

/// Decode MP3 bytes to mono f32 samples
#[allow(clippy::cast_sign_loss)]
fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(mp3_data);
    let mut samples = Vec::new();
    let mut sample_rate = PLAYBACK_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = frame.sample_rate as u32;
                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Decode(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}

/// Resample mono audio using rubato
///
/// The final partial chunk is zero-padded so no tail is dropped.
#[allow(clippy::cast_possible_truncation)]
fn resample_audio(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{FftFixedIn, Resampler};

    let mut resampler = FftFixedIn::<f64>::new(from_rate as usize, to_rate as usize, 1024, 2, 1)
        .map_err(|e| Error::Audio(format!("resampler init failed: {e}")))?;
    let chunk_size = resampler.input_frames_next();

    let mut output = Vec::with_capacity(samples.len() * to_rate as usize / from_rate as usize + 1);

    for chunk in samples.chunks(chunk_size) {
        let mut block: Vec<f64> = chunk.iter().map(|&s| f64::from(s)).collect();
        block.resize(chunk_size, 0.0);
        let result = resampler
            .process(&[block], None)
            .map_err(|e| Error::Audio(format!("resample failed: {e}")))?;
        output.extend(result[0].iter().map(|&s| s as f32));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_stops_at_end_without_loop() {
        let mut voice = Voice::new(vec![0.5, 0.25]);
        voice.playing = true;
        assert!((voice.next_sample() - 0.5).abs() < f32::EPSILON);
        assert!((voice.next_sample() - 0.25).abs() < f32::EPSILON);
        assert!(voice.next_sample().abs() < f32::EPSILON);
        assert!(!voice.playing);
    }

    #[test]
    fn looping_voice_wraps() {
        let mut voice = Voice::new(vec![0.5, 0.25]);
        voice.playing = true;
        voice.looping = true;
        voice.next_sample();
        voice.next_sample();
        assert!((voice.next_sample() - 0.5).abs() < f32::EPSILON);
        assert!(voice.playing);
    }

    #[test]
    fn volume_scales_output() {
        let mut voice = Voice::new(vec![1.0]);
        voice.playing = true;
        voice.volume = 0.4;
        assert!((voice.next_sample() - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn mixer_sums_and_clamps_into_every_channel() {
        let mut mixer = Mixer::default();
        for (id, level) in [(1, 0.75_f32), (2, 0.75)] {
            let mut voice = Voice::new(vec![level; 4]);
            voice.playing = true;
            mixer.voices.insert(AudioHandle::from_raw(id), voice);
        }

        let mut out = [0.0_f32; 4];
        mixer.fill(&mut out, 2);
        assert!(out.iter().all(|s| (*s - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn paused_voice_is_silent() {
        let mut mixer = Mixer::default();
        mixer
            .voices
            .insert(AudioHandle::from_raw(1), Voice::new(vec![0.9; 8]));
        let mut out = [1.0_f32; 4];
        mixer.fill(&mut out, 1);
        assert!(out.iter().all(|s| s.abs() < f32::EPSILON));
    }

    #[test]
    fn resample_changes_length_by_ratio() {
        let input = vec![0.0_f32; 4800];
        let output = resample_audio(&input, 48000, 24000).unwrap();
        assert!(output.len() >= 2400, "too short: {}", output.len());
        assert!(output.len() < 2400 + 1024, "too long: {}", output.len());
    }
}
