//! Speech synthesis module
//!
//! Turns guidance text into a base64 raw PCM payload via a hosted
//! text-to-speech model.

pub mod gemini;

use crate::config::Config;
use crate::error::{PlaybackError, SathiError};

/// Trait for speech synthesis implementations
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`, returning base64 raw PCM
    ///
    /// The payload layout is described by [`crate::codec::PcmFormat::TTS_V1`].
    fn synthesize(&self, text: &str) -> Result<String, PlaybackError>;
}

/// Factory function to create the configured synthesizer
pub fn create_synthesizer(config: &Config) -> Result<Box<dyn SpeechSynthesizer>, SathiError> {
    let api_key = config.resolve_api_key().ok_or_else(|| {
        SathiError::Config(
            "No API key for speech synthesis. Set synthesis.api_key or SATHI_API_KEY".to_string(),
        )
    })?;

    Ok(Box::new(gemini::GeminiSynthesizer::new(
        &config.synthesis,
        api_key,
    )?))
}
