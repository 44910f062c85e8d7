//! Guidance speech playback
//!
//! [`TtsPlayer`] fetches synthesized speech for a piece of text, decodes the
//! raw PCM by hand and plays it through a lazily opened output context.
//!
//! ```text
//!   play(text) ──▶ Loading ──synthesize──▶ decode ──▶ Playing ──natural end──▶ Idle
//!                     │                                  │
//!                     └──── failure: alert ──▶ Idle      └──── stop() ──▶ Idle
//! ```

pub mod rodio_output;

use crate::codec::{self, PcmFormat};
use crate::error::PlaybackError;
use crate::notification::{Notifier, PLAYBACK_ALERT};
use crate::state::{PlaybackState, StateReporter, StatusName};
use crate::synth::SpeechSynthesizer;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

/// Normalized mono samples ready for the output device
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl PlaybackBuffer {
    /// Decode a base64 raw PCM payload in the given format
    pub fn from_base64(payload: &str, format: &PcmFormat) -> Result<Self, PlaybackError> {
        let samples = codec::decode_pcm_base64(payload, format)?;
        Ok(Self {
            sample_rate: format.sample_rate,
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Lifecycle of an output context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    /// Paused by the platform; must be resumed before it produces sound
    Suspended,
    Closed,
}

/// Called once when a source finishes on its own (never after `stop`)
pub type EndedCallback = Box<dyn FnOnce() + Send>;

/// A buffer that is currently playing
pub trait PlaybackSource: Send {
    fn stop(&mut self);
}

/// A persistent audio output context at a fixed sample rate
pub trait OutputContext {
    fn state(&self) -> ContextState;

    fn resume(&mut self) -> Result<(), PlaybackError>;

    /// Start playing `buffer` right away
    fn start(
        &mut self,
        buffer: PlaybackBuffer,
        on_ended: EndedCallback,
    ) -> Result<Box<dyn PlaybackSource>, PlaybackError>;

    fn close(&mut self);
}

/// Opens output contexts
pub trait OutputBackend {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn OutputContext>, PlaybackError>;
}

/// State shared with the natural-end handler
struct Shared {
    state: PlaybackState,
    active: Option<Box<dyn PlaybackSource>>,
    /// Bumped per playback so a stale end event cannot clear a newer source
    generation: u64,
    watchers: watch::Sender<PlaybackState>,
}

impl Shared {
    fn set(&mut self, state: PlaybackState) {
        self.state = state;
        self.watchers.send_replace(state);
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Text-to-speech playback component
pub struct TtsPlayer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    backend: Box<dyn OutputBackend>,
    context: Option<Box<dyn OutputContext>>,
    format: PcmFormat,
    shared: Arc<Mutex<Shared>>,
    notifier: Arc<dyn Notifier>,
    reporter: StateReporter<PlaybackState>,
}

impl TtsPlayer {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        backend: Box<dyn OutputBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            synthesizer,
            backend,
            context: None,
            format: PcmFormat::TTS_V1,
            shared: Arc::new(Mutex::new(Shared {
                state: PlaybackState::Idle,
                active: None,
                generation: 0,
                watchers: watch::channel(PlaybackState::Idle).0,
            })),
            notifier,
            reporter: StateReporter::default(),
        }
    }

    /// Override the expected payload layout
    pub fn with_format(mut self, format: PcmFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_reporter(mut self, reporter: StateReporter<PlaybackState>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.shared).state
    }

    /// Receiver that sees every state transition
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        lock(&self.shared).watchers.subscribe()
    }

    pub fn has_active_source(&self) -> bool {
        lock(&self.shared).active.is_some()
    }

    /// Whether the output context has been opened (and not closed)
    pub fn has_context(&self) -> bool {
        self.context
            .as_ref()
            .is_some_and(|c| c.state() != ContextState::Closed)
    }

    fn set_state(&self, state: PlaybackState) {
        lock(&self.shared).set(state);
        self.reporter.report(state);
    }

    /// Synthesize `text` and start playing it
    ///
    /// Only legal from `Idle`. Failures are alerted once and leave the
    /// player `Idle` without touching the output context.
    pub async fn play(&mut self, text: &str) -> Result<(), PlaybackError> {
        let current = self.state();
        if current != PlaybackState::Idle {
            return Err(PlaybackError::InvalidState {
                action: "play",
                state: current.status_name(),
            });
        }

        self.set_state(PlaybackState::Loading);

        match self.load_and_start(text).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!("Playback failed: {}", e);
                self.notifier.alert("Playback failed", PLAYBACK_ALERT);
                self.set_state(PlaybackState::Idle);
                Err(e)
            }
        }
    }

    async fn load_and_start(&mut self, text: &str) -> Result<(), PlaybackError> {
        let synthesizer = self.synthesizer.clone();
        let owned = text.to_string();
        let payload = tokio::task::spawn_blocking(move || synthesizer.synthesize(&owned))
            .await
            .map_err(|e| PlaybackError::SynthesisFailed(format!("Synthesis task failed: {}", e)))??;

        let buffer = PlaybackBuffer::from_base64(&payload, &self.format)?;
        tracing::debug!(
            "Decoded {} samples ({:.2}s) at {} Hz",
            buffer.len(),
            buffer.duration().as_secs_f32(),
            buffer.sample_rate
        );

        self.ensure_context()?;
        let context = self
            .context
            .as_mut()
            .ok_or_else(|| PlaybackError::OutputUnavailable("No output context".to_string()))?;
        if context.state() == ContextState::Suspended {
            tracing::debug!("Resuming suspended output context");
            context.resume()?;
        }

        let generation = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.set(PlaybackState::Playing);
            shared.generation
        };

        let on_ended: EndedCallback = {
            let shared = self.shared.clone();
            let reporter = self.reporter.clone();
            Box::new(move || {
                let finished = {
                    let mut shared = lock(&shared);
                    if shared.generation == generation && shared.state == PlaybackState::Playing {
                        shared.set(PlaybackState::Idle);
                        shared.active = None;
                        true
                    } else {
                        false
                    }
                };
                if finished {
                    tracing::debug!("Playback finished");
                    reporter.report(PlaybackState::Idle);
                }
            })
        };

        // The end handler may run before `start` returns for very short clips
        let source = match context.start(buffer, on_ended) {
            Ok(source) => source,
            Err(e) => {
                lock(&self.shared).set(PlaybackState::Loading);
                return Err(e);
            }
        };

        let mut shared = lock(&self.shared);
        if shared.generation == generation && shared.state == PlaybackState::Playing {
            shared.active = Some(source);
            drop(shared);
            tracing::info!("Playing synthesized guidance");
            self.reporter.report(PlaybackState::Playing);
        }

        Ok(())
    }

    /// Open the output context on first use, or after it was closed
    fn ensure_context(&mut self) -> Result<(), PlaybackError> {
        if !self.has_context() {
            tracing::debug!("Opening output context at {} Hz", self.format.sample_rate);
            self.context = Some(self.backend.open(self.format.sample_rate)?);
        }
        Ok(())
    }

    /// Stop the active playback
    ///
    /// Returns false (and does nothing) unless currently playing.
    pub fn stop(&mut self) -> bool {
        let source = {
            let mut shared = lock(&self.shared);
            if shared.state != PlaybackState::Playing {
                return false;
            }
            shared.generation += 1;
            shared.set(PlaybackState::Idle);
            shared.active.take()
        };

        if let Some(mut source) = source {
            source.stop();
        }
        tracing::info!("Playback stopped");
        self.reporter.report(PlaybackState::Idle);
        true
    }

    /// Button behaviour: stop when playing, otherwise play `text`
    pub async fn toggle(&mut self, text: &str) -> Result<(), PlaybackError> {
        if self.state() == PlaybackState::Playing {
            self.stop();
            Ok(())
        } else {
            self.play(text).await
        }
    }

    /// Wait until the player returns to `Idle`
    pub async fn wait_until_idle(&self) {
        let mut states = self.subscribe();
        // The sender lives as long as `self`, so this only ends on Idle
        let _ = states.wait_for(|state| *state == PlaybackState::Idle).await;
    }

    /// Stop any playback and release the output context
    pub fn close(&mut self) {
        self.stop();
        if let Some(mut context) = self.context.take() {
            tracing::debug!("Closing output context");
            context.close();
        }
    }
}

impl Drop for TtsPlayer {
    fn drop(&mut self) {
        self.close();
    }
}
