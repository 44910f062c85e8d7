//! State machines for the recorder and playback components
//!
//! Recorder: Idle → Listening → Busy (assembling clip) → Idle
//! Player:   Idle → Loading → Playing → Idle

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Name written to the state file for external integrations
pub trait StatusName {
    fn status_name(&self) -> &'static str;
}

/// Voice recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    /// No capture session
    Idle,

    /// Microphone open, chunks being buffered
    Listening {
        /// When recording started
        started_at: Instant,
    },

    /// Capture stopped, clip being assembled and encoded
    Busy,
}

impl RecorderState {
    pub fn is_listening(&self) -> bool {
        matches!(self, RecorderState::Listening { .. })
    }

    /// Get recording duration if currently listening
    pub fn recording_duration(&self) -> Option<std::time::Duration> {
        match self {
            RecorderState::Listening { started_at } => Some(started_at.elapsed()),
            _ => None,
        }
    }
}

impl StatusName for RecorderState {
    fn status_name(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::Listening { .. } => "listening",
            RecorderState::Busy => "busy",
        }
    }
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecorderState::Idle => write!(f, "Idle"),
            RecorderState::Listening { started_at } => {
                write!(f, "Listening ({:.1}s)", started_at.elapsed().as_secs_f32())
            }
            RecorderState::Busy => write!(f, "Encoding clip"),
        }
    }
}

/// Guidance playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    /// Waiting on speech synthesis
    Loading,
    Playing,
}

impl StatusName for PlaybackState {
    fn status_name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "busy",
            PlaybackState::Playing => "playing",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Loading => write!(f, "Loading"),
            PlaybackState::Playing => write!(f, "Playing"),
        }
    }
}

/// Callback invoked on every state transition
pub type StateListener<S> = Arc<dyn Fn(S) + Send + Sync>;

/// Fans state transitions out to an optional listener and state file
pub struct StateReporter<S> {
    state_file: Option<PathBuf>,
    listener: Option<StateListener<S>>,
}

impl<S> Clone for StateReporter<S> {
    fn clone(&self) -> Self {
        Self {
            state_file: self.state_file.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl<S> Default for StateReporter<S> {
    fn default() -> Self {
        Self {
            state_file: None,
            listener: None,
        }
    }
}

impl<S: StatusName + Copy> StateReporter<S> {
    pub fn new(state_file: Option<PathBuf>) -> Self {
        Self {
            state_file,
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: StateListener<S>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn report(&self, state: S) {
        tracing::trace!("State changed: {}", state.status_name());
        if let Some(ref path) = self.state_file {
            write_state_file(path, state.status_name());
        }
        if let Some(ref listener) = self.listener {
            listener(state);
        }
    }

    /// Remove the state file on shutdown
    pub fn cleanup(&self) {
        if let Some(ref path) = self.state_file {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!("Failed to remove state file: {}", e);
                }
            }
        }
    }
}

fn write_state_file(path: &PathBuf, state: &str) {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    if let Err(e) = std::fs::write(path, state) {
        tracing::warn!("Failed to write state file: {}", e);
    }
}
