//! Error types for sathi-voice
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the sathi-voice application
#[derive(Error, Debug)]
pub enum SathiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Audio format error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to microphone capture
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Microphone access was denied: {0}\n  Check your system's privacy settings and audio group membership.")]
    PermissionDenied(String),

    #[error("No microphone is available: {0}")]
    DeviceUnavailable(String),

    #[error("Audio device not found: '{requested}'\n{available}")]
    DeviceNotFound { requested: String, available: String },

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("Recording timeout: exceeded {0} seconds")]
    Timeout(u32),

    #[error("Audio stream error: {0}")]
    StreamError(String),

    #[error("Failed to assemble recording: {0}")]
    Encode(#[from] CodecError),
}

/// Errors related to speech synthesis and playback
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Synthesized audio could not be decoded: {0}")]
    DecodeFailed(#[from] CodecError),

    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
}

impl PlaybackError {
    /// Whether the user should see this as a failed synthesis
    ///
    /// Decode failures are reported the same way as a failed remote call.
    pub fn is_synthesis_failure(&self) -> bool {
        matches!(
            self,
            PlaybackError::SynthesisFailed(_) | PlaybackError::DecodeFailed(_)
        )
    }
}

/// Errors related to base64, PCM and WAV conversions
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("PCM payload has {0} bytes, expected a multiple of {1}")]
    OddByteLength(usize, usize),

    #[error("Unsupported PCM format: {0}")]
    UnsupportedFormat(String),

    #[error("WAV container error: {0}")]
    Wav(#[from] hound::Error),
}

/// Result type alias using SathiError
pub type Result<T> = std::result::Result<T, SathiError>;
