//! Voice recorder: microphone to base64 WAV clip
//!
//! Owns one [`AudioCapture`] for its whole lifetime. `start_capture` opens
//! a session, `stop_capture` assembles the clip and hands its base64 text
//! to the completion callback.

use crate::audio::{AudioCapture, CapturedClip};
use crate::error::CaptureError;
use crate::notification::{Notifier, MICROPHONE_ALERT, RECORDING_ALERT};
use crate::state::{RecorderState, StateReporter};
use std::io::BufRead;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

/// Receives the base64 text of each finished clip
pub type ClipCallback = Box<dyn FnMut(String) + Send>;

pub struct VoiceRecorder {
    capture: Box<dyn AudioCapture>,
    on_captured: ClipCallback,
    notifier: Arc<dyn Notifier>,
    reporter: StateReporter<RecorderState>,
    state: RecorderState,
}

impl VoiceRecorder {
    pub fn new(
        capture: Box<dyn AudioCapture>,
        notifier: Arc<dyn Notifier>,
        on_captured: ClipCallback,
    ) -> Self {
        Self {
            capture,
            on_captured,
            notifier,
            reporter: StateReporter::default(),
            state: RecorderState::Idle,
        }
    }

    pub fn with_reporter(mut self, reporter: StateReporter<RecorderState>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state.is_listening()
    }

    fn set_state(&mut self, state: RecorderState) {
        self.state = state;
        self.reporter.report(state);
    }

    /// Open the microphone and begin a capture session
    ///
    /// Returns once the device is streaming. A second call while a session
    /// is open fails with [`CaptureError::AlreadyRecording`].
    pub async fn start_capture(&mut self) -> Result<(), CaptureError> {
        if !matches!(self.state, RecorderState::Idle) {
            tracing::warn!("start_capture ignored: recorder is {}", self.state);
            return Err(CaptureError::AlreadyRecording);
        }

        match self.capture.start().await {
            Ok(()) => {
                tracing::info!("Recording started");
                self.set_state(RecorderState::Listening {
                    started_at: Instant::now(),
                });
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error accessing microphone: {}", e);
                self.notifier.alert("Microphone unavailable", MICROPHONE_ALERT);
                Err(e)
            }
        }
    }

    /// Finish the session and deliver the clip to the callback
    ///
    /// A no-op when nothing is recording. The microphone is released before
    /// the clip is assembled, including when assembly fails.
    pub async fn stop_capture(&mut self) -> Result<(), CaptureError> {
        let duration = match self.state.recording_duration() {
            Some(d) => d,
            None => {
                tracing::debug!("stop_capture called with no active session");
                return Ok(());
            }
        };

        tracing::info!("Recording stopped ({:.1}s)", duration.as_secs_f32());
        self.set_state(RecorderState::Busy);

        let result = self.finish_session().await;
        self.set_state(RecorderState::Idle);

        match result {
            Ok(encoded) => {
                (self.on_captured)(encoded);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to finish recording: {}", e);
                self.notifier.alert("Recording failed", RECORDING_ALERT);
                Err(e)
            }
        }
    }

    async fn finish_session(&mut self) -> Result<String, CaptureError> {
        let format = self.capture.format();
        let chunks = self.capture.stop().await?;

        // Encoding a long clip is CPU-bound, keep it off the async task
        let encoded = tokio::task::spawn_blocking(move || {
            CapturedClip::assemble(chunks, format).map(|clip| {
                tracing::debug!(
                    "Clip ready: {} bytes ({:.2}s)",
                    clip.as_bytes().len(),
                    clip.duration_secs()
                );
                clip.to_base64()
            })
        })
        .await
        .map_err(|e| CaptureError::StreamError(format!("Clip encoding task failed: {}", e)))??;

        Ok(encoded)
    }
}

/// Resolve once `reader` yields a line or reaches end of input
///
/// The read happens on its own thread. A blocking terminal read cannot be
/// cancelled, so the caller is free to stop waiting and exit.
pub fn line_signal<R>(mut reader: R) -> oneshot::Receiver<()>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        if let Err(e) = reader.read_line(&mut line) {
            tracing::debug!("Stop input unreadable: {}", e);
        }
        let _ = tx.send(());
    });
    rx
}
