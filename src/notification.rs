//! User-visible failure alerts
//!
//! Failures are reported once, at the point they happen, through a
//! [`Notifier`]. The desktop implementation shells out to:
//! - Linux: notify-send (libnotify)
//! - macOS: osascript (AppleScript)

use std::process::Stdio;

/// Alert shown when the microphone cannot be opened
pub const MICROPHONE_ALERT: &str = "Could not access microphone. Please check permissions.";

/// Alert shown when a finished recording cannot be turned into a clip
pub const RECORDING_ALERT: &str = "Could not save the recording. Please try again.";

/// Alert shown when guidance audio cannot be synthesized or played
pub const PLAYBACK_ALERT: &str = "Could not play audio. Please try again.";

/// Sink for user-visible alerts
pub trait Notifier: Send + Sync {
    fn alert(&self, title: &str, body: &str);
}

/// Desktop notifications, best-effort
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Notifier for DesktopNotifier {
    fn alert(&self, title: &str, body: &str) {
        tracing::warn!("{}: {}", title, body);
        if self.enabled {
            send_sync(title, body);
        }
    }
}

/// Send a notification without waiting for the helper process.
///
/// Failures are logged but don't propagate errors (notifications are best-effort).
pub fn send_sync(title: &str, body: &str) {
    #[cfg(target_os = "linux")]
    send_linux_sync(title, body);

    #[cfg(target_os = "macos")]
    send_macos_sync(title, body);

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        tracing::debug!("Notifications not supported on this platform");
        let _ = (title, body);
    }
}

/// Send a notification on Linux using notify-send
#[cfg(target_os = "linux")]
fn send_linux_sync(title: &str, body: &str) {
    let result = std::process::Command::new("notify-send")
        .args(["--app-name=Sathi Voice", "--expire-time=5000", title, body])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}

/// Send a notification on macOS using osascript
#[cfg(target_os = "macos")]
fn send_macos_sync(title: &str, body: &str) {
    let script = format!(
        r#"display notification "{}" with title "{}""#,
        escape_applescript(body),
        escape_applescript(title)
    );

    let result = std::process::Command::new("osascript")
        .args(["-e", &script])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn escape_applescript(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
