//! Sathi Voice: voice capture and guidance playback for the Health Sathi portal
//!
//! This library provides two independent pipelines:
//! - Capturing a patient's spoken symptoms as a base64 WAV clip (cpal)
//! - Speaking synthesized guidance text back to the patient (Gemini TTS + rodio)
//!
//! # Architecture
//!
//! ```text
//!   Capture                                   Playback
//!   ───────                                   ────────
//!   ┌──────────────┐                          ┌──────────────┐
//!   │  Microphone  │                          │ Guidance text│
//!   │    (cpal)    │                          └──────────────┘
//!   └──────────────┘                                  │
//!          │ S16LE chunks                             ▼
//!          ▼                                  ┌──────────────┐
//!   ┌──────────────┐                          │  Synthesizer │
//!   │   Capture    │                          │ (Gemini TTS) │
//!   │   Session    │                          └──────────────┘
//!   └──────────────┘                                  │ base64 raw PCM
//!          │ stop: concatenate                        ▼
//!          ▼                                  ┌──────────────┐
//!   ┌──────────────┐                          │ PCM decode   │
//!   │ WAV (hound)  │                          │ i16 / 32768  │
//!   └──────────────┘                          └──────────────┘
//!          │                                          │ f32 buffer
//!          ▼                                          ▼
//!   ┌──────────────┐                          ┌──────────────┐
//!   │    base64    │ ──▶ callback             │Output context│
//!   └──────────────┘                          │   (rodio)    │
//!                                             └──────────────┘
//! ```

pub mod audio;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod notification;
pub mod playback;
pub mod recorder;
pub mod state;
pub mod synth;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{CaptureError, CodecError, PlaybackError, Result, SathiError};
pub use playback::TtsPlayer;
pub use recorder::VoiceRecorder;
