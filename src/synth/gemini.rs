//! Remote speech synthesis via the Gemini generateContent API
//!
//! Requests an AUDIO response with a prebuilt voice. The audio comes back
//! as inline base64 raw PCM (24 kHz mono S16LE), not a container format.

use super::SpeechSynthesizer;
use crate::codec::PcmFormat;
use crate::config::SynthesisConfig;
use crate::error::{PlaybackError, SathiError};
use serde_json::{json, Value};
use std::time::Duration;

/// Remote synthesizer for Gemini TTS models
#[derive(Debug)]
pub struct GeminiSynthesizer {
    /// Base endpoint URL (e.g., "https://generativelanguage.googleapis.com")
    endpoint: String,
    /// TTS model name
    model: String,
    /// Prebuilt voice name
    voice: String,
    api_key: String,
    /// Request timeout
    timeout: Duration,
}

impl GeminiSynthesizer {
    /// Create a new synthesizer from config
    pub fn new(config: &SynthesisConfig, api_key: String) -> Result<Self, SathiError> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();

        // Validate endpoint URL format
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(SathiError::Config(format!(
                "synthesis.endpoint must start with http:// or https://, got: {}",
                endpoint
            )));
        }

        if endpoint.starts_with("http://")
            && !endpoint.contains("localhost")
            && !endpoint.contains("127.0.0.1")
        {
            tracing::warn!(
                "Synthesis endpoint uses HTTP without TLS. Guidance text will be sent unencrypted!"
            );
        }

        let timeout = Duration::from_secs(config.timeout_secs);

        tracing::info!(
            "Configured speech synthesis: endpoint={}, model={}, voice={}, timeout={}s",
            endpoint,
            config.model,
            config.voice,
            timeout.as_secs()
        );

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            voice: config.voice.clone(),
            api_key,
            timeout,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.voice }
                    }
                }
            }
        })
    }
}

/// Pull the inline audio payload out of a generateContent response
fn extract_audio(response: &Value) -> Result<(String, Option<String>), PlaybackError> {
    let inline = response
        .pointer("/candidates/0/content/parts/0/inlineData")
        .ok_or_else(|| PlaybackError::SynthesisFailed("No audio generated".to_string()))?;

    let data = inline
        .get("data")
        .and_then(Value::as_str)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| PlaybackError::SynthesisFailed("No audio generated".to_string()))?;

    let mime = inline
        .get("mimeType")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok((data.to_string(), mime))
}

/// Sample rate announced in a mime type such as `audio/L16;codec=pcm;rate=24000`
fn mime_sample_rate(mime: &str) -> Option<u32> {
    mime.split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
}

impl SpeechSynthesizer for GeminiSynthesizer {
    fn synthesize(&self, text: &str) -> Result<String, PlaybackError> {
        if text.trim().is_empty() {
            return Err(PlaybackError::SynthesisFailed("Nothing to speak".into()));
        }

        tracing::debug!("Requesting speech for {} characters", text.chars().count());
        let start = std::time::Instant::now();

        let response = ureq::post(&self.url())
            .timeout(self.timeout)
            .set("x-goog-api-key", &self.api_key)
            .send_json(self.request_body(text))
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => {
                    let body = resp.into_string().unwrap_or_default();
                    PlaybackError::SynthesisFailed(format!("Server returned {}: {}", code, body))
                }
                ureq::Error::Transport(t) => {
                    PlaybackError::SynthesisFailed(format!("Request failed: {}", t))
                }
            })?;

        let json: Value = response.into_json().map_err(|e| {
            PlaybackError::SynthesisFailed(format!("Failed to parse response: {}", e))
        })?;

        let (data, mime) = extract_audio(&json)?;

        // The payload has no header; a changed rate upstream would play at the wrong speed
        if let Some(rate) = mime.as_deref().and_then(mime_sample_rate) {
            if rate != PcmFormat::TTS_V1.sample_rate {
                tracing::warn!(
                    "Synthesis returned {} Hz audio, expected {} Hz ({:?})",
                    rate,
                    PcmFormat::TTS_V1.sample_rate,
                    mime
                );
            }
        }

        tracing::info!(
            "Speech synthesized in {:.2}s ({} base64 chars)",
            start.elapsed().as_secs_f32(),
            data.len()
        );

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> SynthesisConfig {
        SynthesisConfig {
            endpoint: endpoint.to_string(),
            ..SynthesisConfig::default()
        }
    }

    #[test]
    fn test_url_uses_model() {
        let synth =
            GeminiSynthesizer::new(&config("https://example.test/"), "key".into()).unwrap();
        assert_eq!(
            synth.url(),
            "https://example.test/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"
        );
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = GeminiSynthesizer::new(&config("not-a-url"), "key".into()).unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_request_body_structure() {
        let synth =
            GeminiSynthesizer::new(&config("http://localhost:8080"), "key".into()).unwrap();
        let body = synth.request_body("Take this tablet twice daily");

        assert_eq!(
            body.pointer("/contents/0/parts/0/text").and_then(Value::as_str),
            Some("Take this tablet twice daily")
        );
        assert_eq!(
            body.pointer("/generationConfig/responseModalities/0")
                .and_then(Value::as_str),
            Some("AUDIO")
        );
        assert_eq!(
            body.pointer("/generationConfig/speechConfig/voiceConfig/prebuiltVoiceConfig/voiceName")
                .and_then(Value::as_str),
            Some("Kore")
        );
    }

    #[test]
    fn test_extract_audio() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": "audio/L16;codec=pcm;rate=24000",
                            "data": "AEAAQA=="
                        }
                    }]
                }
            }]
        });

        let (data, mime) = extract_audio(&response).unwrap();
        assert_eq!(data, "AEAAQA==");
        assert_eq!(mime.as_deref().and_then(mime_sample_rate), Some(24000));
    }

    #[test]
    fn test_extract_audio_missing_payload() {
        let response = json!({ "candidates": [{ "content": { "parts": [{ "text": "hi" }] } }] });
        let err = extract_audio(&response).unwrap_err();
        assert!(matches!(err, PlaybackError::SynthesisFailed(_)));

        let empty = json!({ "candidates": [{ "content": { "parts": [{ "inlineData": { "data": "" } }] } }] });
        assert!(extract_audio(&empty).is_err());
    }

    #[test]
    fn test_mime_sample_rate() {
        assert_eq!(mime_sample_rate("audio/L16;rate=16000"), Some(16000));
        assert_eq!(mime_sample_rate("audio/L16"), None);
    }

    #[test]
    fn test_empty_text_rejected_without_request() {
        let synth =
            GeminiSynthesizer::new(&config("http://localhost:1"), "key".into()).unwrap();
        assert!(matches!(
            synth.synthesize("   "),
            Err(PlaybackError::SynthesisFailed(_))
        ));
    }
}
