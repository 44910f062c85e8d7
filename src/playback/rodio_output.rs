//! rodio-based output context
//!
//! One `OutputStream` is held open for the lifetime of the context. Each
//! playback gets its own `Sink`, watched by a short-lived thread that fires
//! the end handler when the sink drains.

use super::{ContextState, EndedCallback, OutputBackend, OutputContext, PlaybackBuffer, PlaybackSource};
use crate::error::PlaybackError;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Opens contexts on the default output device
#[derive(Debug, Clone)]
pub struct RodioBackend {
    volume: f32,
}

impl RodioBackend {
    pub fn new(volume: f32) -> Self {
        Self { volume }
    }
}

impl OutputBackend for RodioBackend {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn OutputContext>, PlaybackError> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| PlaybackError::OutputUnavailable(format!("Failed to open audio output: {}", e)))?;

        tracing::debug!("Opened audio output ({} Hz buffers)", sample_rate);

        Ok(Box::new(RodioContext {
            stream: Some(stream),
            handle,
            sample_rate,
            volume: self.volume,
            state: ContextState::Running,
        }))
    }
}

/// Persistent output context backed by the default device
pub struct RodioContext {
    stream: Option<OutputStream>,
    handle: OutputStreamHandle,
    sample_rate: u32,
    volume: f32,
    state: ContextState,
}

impl OutputContext for RodioContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            ContextState::Closed => Err(PlaybackError::OutputUnavailable(
                "Output context is closed".to_string(),
            )),
            _ => {
                self.state = ContextState::Running;
                Ok(())
            }
        }
    }

    fn start(
        &mut self,
        buffer: PlaybackBuffer,
        on_ended: EndedCallback,
    ) -> Result<Box<dyn PlaybackSource>, PlaybackError> {
        if self.state == ContextState::Closed || self.stream.is_none() {
            return Err(PlaybackError::OutputUnavailable(
                "Output context is closed".to_string(),
            ));
        }

        if buffer.sample_rate != self.sample_rate {
            tracing::debug!(
                "Buffer at {} Hz on a {} Hz context, rodio will resample",
                buffer.sample_rate,
                self.sample_rate
            );
        }

        let sink = Sink::try_new(&self.handle).map_err(|e| {
            PlaybackError::OutputUnavailable(format!("Failed to create audio sink: {}", e))
        })?;

        let source = SamplesBuffer::new(1, buffer.sample_rate, buffer.samples).amplify(self.volume);
        sink.append(source);

        let sink = Arc::new(sink);
        let stopped = Arc::new(AtomicBool::new(false));

        let watcher_sink = sink.clone();
        let watcher_stopped = stopped.clone();
        thread::spawn(move || {
            watcher_sink.sleep_until_end();
            if !watcher_stopped.load(Ordering::SeqCst) {
                on_ended();
            }
        });

        Ok(Box::new(RodioSource { sink, stopped }))
    }

    fn close(&mut self) {
        // Dropping the stream releases the device
        self.stream = None;
        self.state = ContextState::Closed;
    }
}

/// A sink playing one buffer
struct RodioSource {
    sink: Arc<Sink>,
    stopped: Arc<AtomicBool>,
}

impl PlaybackSource for RodioSource {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.sink.stop();
    }
}
