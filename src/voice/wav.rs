//! Raw PCM to WAV container conversion
//!
//! The synthesis service returns headerless little-endian 16-bit mono PCM as
//! base64. Players need a self-describing container, so each clip is wrapped
//! in a canonical 44-byte RIFF/WAVE header before it is cached.

use std::io::Cursor;

use base64::Engine as _;

use crate::{Error, Result};

/// Sample rate assumed when the service does not report one
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

/// Size of the canonical PCM WAV header
pub const WAV_HEADER_LEN: usize = 44;

/// Highest sample rate a mono 16-bit header can describe
pub const MAX_SAMPLE_RATE: u32 = u32::MAX / 2;

/// Raw audio as returned by the synthesis service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVoicePayload {
    /// Base64-encoded little-endian i16 mono samples
    pub base64_samples: String,
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
}

/// Encode a base64 PCM payload as WAV bytes
///
/// Never fails: malformed base64 or an odd number of PCM bytes yields an
/// empty buffer, which plays back as silence.
#[must_use]
pub fn encode_pcm_base64(base64_samples: &str, sample_rate_hz: u32) -> Vec<u8> {
    match try_encode(base64_samples, sample_rate_hz) {
        Ok(wav) => wav,
        Err(e) => {
            tracing::warn!(error = %e, "failed to convert PCM payload to WAV");
            Vec::new()
        }
    }
}

/// Encode a synthesized payload as WAV bytes
#[must_use]
pub fn encode_payload(payload: &RawVoicePayload) -> Vec<u8> {
    encode_pcm_base64(&payload.base64_samples, payload.sample_rate_hz)
}

fn try_encode(base64_samples: &str, sample_rate_hz: u32) -> Result<Vec<u8>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(base64_samples.trim())
        .map_err(|e| Error::Decode(format!("invalid base64: {e}")))?;

    if bytes.len() % 2 != 0 {
        return Err(Error::Decode(format!(
            "truncated PCM buffer: {} bytes is not a whole number of i16 samples",
            bytes.len()
        )));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]));

    pcm16_to_wav(samples, sample_rate_hz)
}

/// Write mono i16 samples into a WAV buffer
///
/// # Errors
///
/// Returns error if the sample rate is zero or too large for the header, or
/// if WAV encoding fails
pub fn pcm16_to_wav(samples: impl IntoIterator<Item = i16>, sample_rate: u32) -> Result<Vec<u8>> {
    // Byte rate is rate * 2 and must fit the header's u32 field
    if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
        return Err(Error::Decode(format!("unusable sample rate {sample_rate} Hz")));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Decoded mono audio ready for mixing
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    /// Samples in `[-1.0, 1.0]`, downmixed to mono
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Decode WAV bytes to mono f32 samples
///
/// An empty buffer decodes to empty audio at the default rate.
///
/// # Errors
///
/// Returns error if the bytes are not a readable WAV file
pub fn decode_wav(data: &[u8]) -> Result<DecodedAudio> {
    if data.is_empty() {
        return Ok(DecodedAudio {
            samples: Vec::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
        });
    }

    let mut reader =
        hound::WavReader::new(Cursor::new(data)).map_err(|e| Error::Decode(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Decode(e.to_string()))?,
        hound::SampleFormat::Int => {
            #[allow(clippy::cast_precision_loss)]
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| {
                    #[allow(clippy::cast_precision_loss)]
                    s.map(|v| v as f32 / scale)
                })
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Decode(e.to_string()))?
        }
    };

    #[allow(clippy::cast_precision_loss)]
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn u32_at(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(buf: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn header_layout_matches_canonical_pcm_wav() {
        let pcm: Vec<u8> = [0_i16, 1000, -1000, i16::MAX, i16::MIN]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let wav = encode_pcm_base64(&b64(&pcm), 24000);

        assert_eq!(wav.len(), WAV_HEADER_LEN + 10);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 36 + 10);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 24), 24000);
        assert_eq!(u32_at(&wav, 28), 48000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 10);
        assert_eq!(&wav[44..], pcm.as_slice());
    }

    #[test]
    fn sample_rate_is_carried_into_header() {
        let wav = encode_pcm_base64(&b64(&[1, 0, 2, 0]), 16000);
        assert_eq!(u32_at(&wav, 24), 16000);
        assert_eq!(u32_at(&wav, 28), 32000);
    }

    #[test]
    fn malformed_base64_yields_empty_buffer() {
        assert!(encode_pcm_base64("not base64 !!!", 24000).is_empty());
    }

    #[test]
    fn odd_byte_count_yields_empty_buffer() {
        assert!(encode_pcm_base64(&b64(&[1, 2, 3]), 24000).is_empty());
    }

    #[test]
    fn zero_sample_rate_yields_empty_buffer() {
        assert!(encode_pcm_base64(&b64(&[0; 8]), 0).is_empty());
        assert!(pcm16_to_wav([0_i16; 4], 0).is_err());
    }

    #[test]
    fn oversized_sample_rate_yields_empty_buffer() {
        assert!(encode_pcm_base64(&b64(&[0; 8]), 3_000_000_000).is_empty());
        assert!(encode_pcm_base64(&b64(&[0; 8]), MAX_SAMPLE_RATE + 1).is_empty());

        let wav = encode_pcm_base64(&b64(&[0; 8]), MAX_SAMPLE_RATE);
        assert_eq!(u32_at(&wav, 28), MAX_SAMPLE_RATE * 2);
    }

    #[test]
    fn empty_payload_is_header_only() {
        let wav = encode_pcm_base64("", 24000);
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(u32_at(&wav, 40), 0);
    }

    #[test]
    fn decode_recovers_samples() {
        let wav = pcm16_to_wav([0, 16384, -16384], 24000).unwrap();
        let decoded = decode_wav(&wav).unwrap();
        assert_eq!(decoded.sample_rate, 24000);
        assert_eq!(decoded.samples.len(), 3);
        assert!((decoded.samples[1] - 0.5).abs() < 1e-4);
        assert!((decoded.samples[2] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn decode_empty_is_silence() {
        let decoded = decode_wav(&[]).unwrap();
        assert!(decoded.samples.is_empty());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_wav(b"definitely not a wav file").is_err());
    }
}
