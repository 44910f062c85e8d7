//! Audio capture module
//!
//! Provides microphone recording using cpal, which works with
//! PipeWire, PulseAudio, and ALSA backends.

pub mod clip;
pub mod cpal_capture;

pub use clip::{AudioChunk, CaptureSession, CapturedClip};

use crate::codec::PcmFormat;
use crate::config::AudioConfig;
use crate::error::CaptureError;

/// Trait for audio capture implementations
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    /// Acquire the microphone and begin buffering chunks
    async fn start(&mut self) -> Result<(), CaptureError>;

    /// Release the microphone and return the buffered chunks in capture order
    async fn stop(&mut self) -> Result<Vec<AudioChunk>, CaptureError>;

    /// Layout of the chunks this capture produces
    fn format(&self) -> PcmFormat;
}

/// Factory function to create audio capture
pub fn create_capture(config: &AudioConfig) -> Result<Box<dyn AudioCapture>, CaptureError> {
    Ok(Box::new(cpal_capture::CpalCapture::new(config)?))
}
