//! Configuration loading and types for sathi-voice
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/sathi-voice/config.toml)
//! 3. Environment variables (SATHI_*)
//! 4. CLI arguments (highest priority)

use crate::error::SathiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Sathi Voice Configuration
#
# Location: ~/.config/sathi-voice/config.toml
# All settings can be overridden via CLI flags

# State file for external integrations (Waybar, polybar, etc.)
# Use "auto" for default location ($XDG_RUNTIME_DIR/sathi-voice/state),
# a custom path, or "disabled" to turn off. Written with "idle",
# "listening", "busy" or "playing" whenever the state changes.
state_file = "auto"

[audio]
# Audio input device ("default" uses system default)
# List devices with: pactl list sources short
device = "default"

# Sample rate of captured clips in Hz
sample_rate = 16000

# Maximum recording duration in seconds (safety limit)
max_duration_secs = 120

[playback]
# Output context sample rate in Hz (speech synthesis returns 24 kHz PCM)
sample_rate = 24000

# Volume level (0.0 to 1.0)
volume = 1.0

[synthesis]
# Base URL of the generative language API
endpoint = "https://generativelanguage.googleapis.com"

# Speech model and prebuilt voice
model = "gemini-2.5-flash-preview-tts"
voice = "Kore"

# API key (or set SATHI_API_KEY / GEMINI_API_KEY)
# api_key = "..."

# Request timeout in seconds
timeout_secs = 30

[notification]
# Show a desktop notification when capture or playback fails
enabled = true
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub notification: NotificationConfig,

    /// Optional path to state file for external integrations
    /// Example: "/run/user/1000/sathi-voice/state" or use "auto" for default location
    #[serde(default)]
    pub state_file: Option<String>,
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// PipeWire/PulseAudio device name, or "default"
    #[serde(default = "default_device")]
    pub device: String,

    /// Sample rate of captured clips in Hz
    #[serde(default = "default_capture_rate")]
    pub sample_rate: u32,

    /// Maximum recording duration in seconds (safety limit)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: u32,
}

/// Playback output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Output context sample rate in Hz
    #[serde(default = "default_playback_rate")]
    pub sample_rate: u32,

    /// Volume level (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

/// Remote speech synthesis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_tts_model")]
    pub model: String,

    /// Prebuilt voice name
    #[serde(default = "default_voice")]
    pub voice: String,

    /// API key; falls back to SATHI_API_KEY / GEMINI_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Show a desktop notification when an operation fails
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_capture_rate() -> u32 {
    16000
}

fn default_max_duration() -> u32 {
    120
}

fn default_playback_rate() -> u32 {
    24000
}

fn default_volume() -> f32 {
    1.0
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_voice() -> String {
    "Kore".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_capture_rate(),
            max_duration_secs: default_max_duration(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_playback_rate(),
            volume: default_volume(),
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_tts_model(),
            voice: default_voice(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            playback: PlaybackConfig::default(),
            synthesis: SynthesisConfig::default(),
            notification: NotificationConfig::default(),
            state_file: Some("auto".to_string()),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "sathi-voice")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (state)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to /tmp
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("sathi-voice")
    }

    /// Resolve the state file path from config
    /// Returns None if state_file is not configured or explicitly disabled
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        self.state_file.as_ref().and_then(|path| {
            match path.to_lowercase().as_str() {
                "disabled" | "none" | "off" | "false" => None,
                "auto" => Some(Self::runtime_dir().join("state")),
                _ => Some(PathBuf::from(path)),
            }
        })
    }

    /// Resolve the synthesis API key from config or environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.synthesis
            .api_key
            .clone()
            .or_else(|| std::env::var("SATHI_API_KEY").ok())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, SathiError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| SathiError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| SathiError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(device) = std::env::var("SATHI_AUDIO_DEVICE") {
        config.audio.device = device;
    }
    if let Ok(model) = std::env::var("SATHI_TTS_MODEL") {
        config.synthesis.model = model;
    }
    if let Ok(endpoint) = std::env::var("SATHI_TTS_ENDPOINT") {
        config.synthesis.endpoint = endpoint;
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), SathiError> {
    if config.audio.sample_rate == 0 || config.playback.sample_rate == 0 {
        return Err(SathiError::Config("sample_rate must be greater than 0".into()));
    }
    if !(0.0..=1.0).contains(&config.playback.volume) {
        return Err(SathiError::Config(format!(
            "playback.volume must be between 0.0 and 1.0, got {}",
            config.playback.volume
        )));
    }
    Ok(())
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<(), SathiError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| SathiError::Config(format!("Failed to create config dir: {}", e)))?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| SathiError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, contents)
        .map_err(|e| SathiError::Config(format!("Failed to write config: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audio.device, "default");
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.playback.sample_rate, 24000);
        assert_eq!(config.synthesis.model, "gemini-2.5-flash-preview-tts");
        assert_eq!(config.synthesis.voice, "Kore");
        assert!(config.notification.enabled);
    }

    #[test]
    fn test_default_config_text_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.audio.max_duration_secs, 120);
        assert_eq!(config.playback.volume, 1.0);
        assert_eq!(config.synthesis.timeout_secs, 30);
        assert_eq!(config.state_file.as_deref(), Some("auto"));
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            [audio]
            device = "usb mic"

            [synthesis]
            voice = "Puck"
            api_key = "test-key"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.audio.device, "usb mic");
        assert_eq!(config.audio.sample_rate, 16000); // default
        assert_eq!(config.synthesis.voice, "Puck");
        assert_eq!(config.synthesis.model, "gemini-2.5-flash-preview-tts");
        assert_eq!(config.resolve_api_key().as_deref(), Some("test-key"));
    }

    #[test]
    fn test_state_file_resolution() {
        let mut config = Config::default();
        config.state_file = Some("disabled".to_string());
        assert!(config.resolve_state_file().is_none());

        config.state_file = Some("/tmp/sathi-state".to_string());
        assert_eq!(
            config.resolve_state_file(),
            Some(PathBuf::from("/tmp/sathi-state"))
        );

        config.state_file = Some("auto".to_string());
        assert!(config.resolve_state_file().unwrap().ends_with("sathi-voice/state"));
    }

    #[test]
    fn test_load_and_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.audio.max_duration_secs = 15;
        save_config(&config, &path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.audio.max_duration_secs, 15);
    }

    #[test]
    fn test_saved_device_override_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        // What `config --save --device "USB Mic"` writes
        let mut config = Config::default();
        config.audio.device = "USB Mic".to_string();
        save_config(&config, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("USB Mic"));
        assert!(!written.contains("api_key"));

        let loaded: Config = toml::from_str(&written).unwrap();
        assert_eq!(loaded.audio.device, "USB Mic");
        assert_eq!(loaded.playback.sample_rate, 24000);
    }

    #[test]
    fn test_invalid_volume_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[playback]\nvolume = 3.0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("volume"));
    }
}
