//! Capture session buffers and the finished clip
//!
//! Chunks arrive as raw S16LE bytes in capture order. On stop they are
//! concatenated once and wrapped in a WAV container.

use crate::codec::{self, PcmFormat};
use crate::error::CodecError;

/// One block of encoded audio produced while recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk(Vec<u8>);

impl AudioChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Encode normalized samples as an S16LE chunk
    pub fn from_samples(samples: &[f32]) -> Self {
        let ints: Vec<i16> = samples.iter().map(|&s| codec::f32_to_i16(s)).collect();
        Self(codec::i16_to_le_bytes(&ints))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Append-only chunk buffer for a single recording
#[derive(Debug)]
pub struct CaptureSession {
    format: PcmFormat,
    chunks: Vec<AudioChunk>,
}

impl CaptureSession {
    pub fn new(format: PcmFormat) -> Self {
        Self {
            format,
            chunks: Vec::new(),
        }
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Append a chunk; empty chunks are dropped
    pub fn push(&mut self, chunk: AudioChunk) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(AudioChunk::len).sum()
    }

    /// Take all buffered chunks, leaving the session empty
    pub fn take_chunks(&mut self) -> Vec<AudioChunk> {
        std::mem::take(&mut self.chunks)
    }

    /// Concatenate the buffered chunks into a WAV clip
    pub fn finish(self) -> Result<CapturedClip, CodecError> {
        CapturedClip::assemble(self.chunks, self.format)
    }
}

/// A finished recording in a WAV container
#[derive(Debug, Clone)]
pub struct CapturedClip {
    format: PcmFormat,
    wav: Vec<u8>,
}

impl CapturedClip {
    /// Concatenate chunks in order and wrap them as WAV
    pub fn assemble(chunks: Vec<AudioChunk>, format: PcmFormat) -> Result<Self, CodecError> {
        let total: usize = chunks.iter().map(AudioChunk::len).sum();
        let mut pcm = Vec::with_capacity(total);
        for chunk in &chunks {
            pcm.extend_from_slice(chunk.as_bytes());
        }

        tracing::debug!(
            "Assembling clip from {} chunk(s), {} bytes ({:.2}s)",
            chunks.len(),
            pcm.len(),
            format.duration_secs(pcm.len())
        );

        let wav = codec::wrap_wav(&pcm, &format)?;
        Ok(Self { format, wav })
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// The WAV container bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.wav
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.wav
    }

    /// Length of the PCM data section in bytes
    pub fn data_len(&self) -> usize {
        self.wav.len().saturating_sub(WAV_HEADER_LEN)
    }

    pub fn duration_secs(&self) -> f32 {
        self.format.duration_secs(self.data_len())
    }

    pub fn is_silent(&self) -> bool {
        self.data_len() == 0
    }

    /// Base64 text of the container, as handed to the caller
    pub fn to_base64(&self) -> String {
        codec::encode_base64(&self.wav)
    }
}

/// Size of the canonical PCM WAV header written for mono 16-bit clips
const WAV_HEADER_LEN: usize = 44;
