//! Binary, base64 and PCM conversions shared by both pipelines
//!
//! Raw PCM carries no header, so its layout travels separately as a
//! [`PcmFormat`]. The synthesis service currently returns
//! [`PcmFormat::TTS_V1`]; a change upstream needs a new format version here,
//! there is no tag in the payload to detect it.

use crate::error::CodecError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io::Cursor;

/// Divisor used to normalize 16-bit samples (2^15, the full negative range)
pub const PCM_SCALE: f32 = 32768.0;

/// Sample encoding of a raw PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmEncoding {
    /// 16-bit signed integers, little-endian
    S16Le,
}

impl PcmEncoding {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            PcmEncoding::S16Le => 2,
        }
    }
}

/// Layout contract for headerless PCM data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    /// Contract version, bumped whenever the upstream layout changes
    pub version: u16,
    pub sample_rate: u32,
    pub channels: u16,
    pub encoding: PcmEncoding,
}

impl PcmFormat {
    /// Speech synthesis output: 24 kHz, mono, S16LE
    pub const TTS_V1: PcmFormat = PcmFormat {
        version: 1,
        sample_rate: 24_000,
        channels: 1,
        encoding: PcmEncoding::S16Le,
    };

    /// Mono S16LE at the given rate (used for captured audio)
    pub fn mono_s16(sample_rate: u32) -> Self {
        Self {
            version: 1,
            sample_rate,
            channels: 1,
            encoding: PcmEncoding::S16Le,
        }
    }

    /// Size of one frame (one sample per channel) in bytes
    pub fn frame_size(&self) -> usize {
        self.encoding.bytes_per_sample() * self.channels as usize
    }

    /// Playback duration of `byte_len` bytes in this format
    pub fn duration_secs(&self, byte_len: usize) -> f32 {
        let frames = byte_len / self.frame_size().max(1);
        frames as f32 / self.sample_rate as f32
    }
}

/// Encode bytes as standard (padded) base64
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64, ignoring surrounding whitespace
pub fn decode_base64(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(STANDARD.decode(text.trim())?)
}

/// Strip a `data:<mime>;base64,` prefix if present
///
/// Browsers and some APIs hand out data URLs; the synthesis and analysis
/// endpoints only accept the bare payload.
pub fn strip_data_url(text: &str) -> &str {
    if text.starts_with("data:") {
        if let Some((header, payload)) = text.split_once(',') {
            if header.ends_with(";base64") {
                return payload;
            }
        }
    }
    text
}

/// Build a `data:` URL for a base64 payload
pub fn to_data_url(mime: &str, base64_payload: &str) -> String {
    format!("data:{};base64,{}", mime, base64_payload)
}

/// Reinterpret raw PCM bytes as normalized f32 samples
///
/// Each 16-bit sample is divided by exactly 32768, so the result lies in
/// `[-1.0, 1.0)` and the sample count is `bytes.len() / 2`.
pub fn decode_pcm(bytes: &[u8], format: &PcmFormat) -> Result<Vec<f32>, CodecError> {
    if format.channels != 1 {
        return Err(CodecError::UnsupportedFormat(format!(
            "{} channels (only mono is supported)",
            format.channels
        )));
    }

    let width = format.encoding.bytes_per_sample();
    if bytes.len() % width != 0 {
        return Err(CodecError::OddByteLength(bytes.len(), width));
    }

    let samples = match format.encoding {
        PcmEncoding::S16Le => bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM_SCALE)
            .collect(),
    };

    Ok(samples)
}

/// Decode a base64 raw PCM payload straight to normalized samples
pub fn decode_pcm_base64(payload: &str, format: &PcmFormat) -> Result<Vec<f32>, CodecError> {
    let bytes = decode_base64(strip_data_url(payload))?;
    decode_pcm(&bytes, format)
}

/// Convert a normalized f32 sample to i16, clamping out-of-range input
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

/// Serialize i16 samples as little-endian bytes
pub fn i16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Wrap raw S16LE PCM bytes in a WAV container
///
/// An empty input yields a valid 44-byte header-only file.
pub fn wrap_wav(pcm: &[u8], format: &PcmFormat) -> Result<Vec<u8>, CodecError> {
    let width = format.encoding.bytes_per_sample();
    if pcm.len() % width != 0 {
        return Err(CodecError::OddByteLength(pcm.len(), width));
    }

    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::with_capacity(44 + pcm.len()));
    let mut writer = hound::WavWriter::new(&mut buffer, spec)?;
    for pair in pcm.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
    }
    writer.finalize()?;

    Ok(buffer.into_inner())
}

/// Extract the raw S16LE data section of a WAV container
pub fn unwrap_wav(wav: &[u8]) -> Result<(PcmFormat, Vec<u8>), CodecError> {
    let reader = hound::WavReader::new(Cursor::new(wav))?;
    let spec = reader.spec();
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(CodecError::UnsupportedFormat(format!(
            "{}-bit {:?} WAV",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()?;

    let format = PcmFormat {
        version: 1,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        encoding: PcmEncoding::S16Le,
    };
    Ok((format, i16_to_le_bytes(&samples)))
}
