//! cpal-based audio capture
//!
//! Uses the cpal crate for cross-platform audio input.
//! Works with PipeWire, PulseAudio, and ALSA backends.
//!
//! Note: cpal::Stream is not Send, so we run the audio capture in a
//! dedicated thread and communicate via channels. Dropping the command
//! sender ends the thread, which drops the stream and frees the microphone.

use super::{AudioCapture, AudioChunk, CaptureSession};
use crate::codec::PcmFormat;
use crate::config::AudioConfig;
use crate::error::CaptureError;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;

/// Commands sent to the audio capture thread
enum CaptureCommand {
    Stop(oneshot::Sender<Vec<AudioChunk>>),
}

/// Parameters for building an audio input stream
struct StreamBuildParams {
    session: Arc<Mutex<CaptureSession>>,
    source_rate: u32,
    target_rate: u32,
    source_channels: usize,
}

/// cpal-based audio capture implementation
pub struct CpalCapture {
    /// Audio configuration
    config: AudioConfig,
    /// Command sender to the capture thread
    cmd_tx: Option<std::sync::mpsc::Sender<CaptureCommand>>,
    /// Handle to the capture thread
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl CpalCapture {
    /// Create a new cpal audio capture instance
    pub fn new(config: &AudioConfig) -> Result<Self, CaptureError> {
        Ok(Self {
            config: config.clone(),
            cmd_tx: None,
            thread_handle: None,
        })
    }

    /// Tear down the capture thread without collecting samples
    fn release(&mut self) {
        // Closing the command channel ends the thread's wait
        self.cmd_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        if self.cmd_tx.is_some() {
            tracing::debug!("Releasing microphone from dropped capture");
        }
        self.release();
    }
}

/// Map a backend-specific cpal error onto the capture taxonomy
///
/// Backends only report permission problems as free text.
fn classify_backend_error(description: String) -> CaptureError {
    let lower = description.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not permitted")
    {
        CaptureError::PermissionDenied(description)
    } else if lower.contains("busy") || lower.contains("no such device") {
        CaptureError::DeviceUnavailable(description)
    } else {
        CaptureError::StreamError(description)
    }
}

fn map_config_error(e: cpal::DefaultStreamConfigError) -> CaptureError {
    match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("device is no longer available".to_string())
        }
        cpal::DefaultStreamConfigError::BackendSpecific { err } => {
            classify_backend_error(err.description)
        }
        other => CaptureError::StreamError(other.to_string()),
    }
}

fn map_build_error(e: cpal::BuildStreamError) -> CaptureError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("device is no longer available".to_string())
        }
        cpal::BuildStreamError::BackendSpecific { err } => classify_backend_error(err.description),
        other => CaptureError::StreamError(other.to_string()),
    }
}

fn map_play_error(e: cpal::PlayStreamError) -> CaptureError {
    match e {
        cpal::PlayStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("device is no longer available".to_string())
        }
        cpal::PlayStreamError::BackendSpecific { err } => classify_backend_error(err.description),
    }
}

/// Find an audio input device by name with flexible matching.
///
/// Matching strategy (in order):
/// 1. Exact match (case-sensitive)
/// 2. Exact match (case-insensitive)
/// 3. Substring match: device name contains the search term (case-insensitive)
fn find_audio_device(host: &cpal::Host, device_name: &str) -> Result<cpal::Device, CaptureError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let devices: Vec<(String, cpal::Device)> = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
        .filter_map(|d| d.name().ok().map(|name| (name, d)))
        .collect();

    let names: Vec<String> = devices.iter().map(|(name, _)| name.clone()).collect();
    let Some(index) = match_device_name(&names, device_name) else {
        let available = if names.is_empty() {
            "No audio input devices found.".to_string()
        } else {
            format!(
                "Available devices:\n{}",
                names
                    .iter()
                    .map(|n| format!("  - {}", n))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };
        return Err(CaptureError::DeviceNotFound {
            requested: device_name.to_string(),
            available,
        });
    };

    tracing::debug!(
        "Matched audio device {:?} (searched for: {:?})",
        names[index],
        device_name
    );
    devices
        .into_iter()
        .nth(index)
        .map(|(_, device)| device)
        .ok_or_else(|| CaptureError::DeviceUnavailable(device_name.to_string()))
}

/// Pick the best device name for a search term
fn match_device_name(names: &[String], search: &str) -> Option<usize> {
    let search_lower = search.to_lowercase();

    names
        .iter()
        .position(|n| n == search)
        .or_else(|| names.iter().position(|n| n.to_lowercase() == search_lower))
        .or_else(|| {
            names
                .iter()
                .position(|n| n.to_lowercase().contains(&search_lower))
        })
}

#[async_trait::async_trait]
impl AudioCapture for CpalCapture {
    async fn start(&mut self) -> Result<(), CaptureError> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

        if self.cmd_tx.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        // Get the device info before spawning the thread
        let device = {
            let host = cpal::default_host();
            if self.config.device == "default" {
                host.default_input_device().ok_or_else(|| {
                    CaptureError::DeviceUnavailable("no default input device".to_string())
                })?
            } else {
                find_audio_device(&host, &self.config.device)?
            }
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        tracing::info!("Using audio device: {}", device_name);

        // Get supported config
        let supported_config = device.default_input_config().map_err(map_config_error)?;

        let source_sample_rate = supported_config.sample_rate().0;
        let source_channels = supported_config.channels() as usize;
        let target_sample_rate = self.config.sample_rate;
        let sample_format = supported_config.sample_format();

        tracing::debug!(
            "Device config: {} Hz, {} channel(s), format: {:?}",
            source_sample_rate,
            source_channels,
            sample_format
        );

        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel::<CaptureCommand>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), CaptureError>>();

        let session = Arc::new(Mutex::new(CaptureSession::new(PcmFormat::mono_s16(
            target_sample_rate,
        ))));

        // Spawn audio capture thread
        let thread_handle = thread::spawn(move || {
            // Build stream config
            let stream_config = cpal::StreamConfig {
                channels: supported_config.channels(),
                sample_rate: supported_config.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            };

            let err_fn = |err| tracing::error!("Audio stream error: {}", err);

            let make_params = || StreamBuildParams {
                session: session.clone(),
                source_rate: source_sample_rate,
                target_rate: target_sample_rate,
                source_channels,
            };

            let stream_result = match sample_format {
                cpal::SampleFormat::F32 => {
                    build_stream::<f32>(&device, &stream_config, make_params(), err_fn)
                }
                cpal::SampleFormat::I16 => {
                    build_stream::<i16>(&device, &stream_config, make_params(), err_fn)
                }
                cpal::SampleFormat::U16 => {
                    build_stream::<u16>(&device, &stream_config, make_params(), err_fn)
                }
                format => Err(CaptureError::StreamError(format!(
                    "Unsupported sample format: {:?}",
                    format
                ))),
            };

            let stream = match stream_result {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(map_play_error(e)));
                return;
            }

            let _ = ready_tx.send(Ok(()));
            tracing::debug!("Audio capture thread started");

            // Wait for stop command; a closed channel also ends the session
            if let Ok(CaptureCommand::Stop(response_tx)) = cmd_rx.recv() {
                // Stop the stream (drop it)
                drop(stream);

                let chunks = match session.lock() {
                    Ok(mut guard) => guard.take_chunks(),
                    Err(poisoned) => poisoned.into_inner().take_chunks(),
                };

                let _ = response_tx.send(chunks);
            }

            tracing::debug!("Audio capture thread stopped");
        });

        self.cmd_tx = Some(cmd_tx);
        self.thread_handle = Some(thread_handle);

        match ready_rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.release();
                Err(e)
            }
            Err(_) => {
                self.release();
                Err(CaptureError::StreamError(
                    "Capture thread exited during start-up".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<Vec<AudioChunk>, CaptureError> {
        let Some(cmd_tx) = self.cmd_tx.take() else {
            return Ok(Vec::new());
        };

        let (response_tx, response_rx) = oneshot::channel();
        let result = if cmd_tx.send(CaptureCommand::Stop(response_tx)).is_ok() {
            // Wait for response (with timeout)
            match tokio::time::timeout(std::time::Duration::from_secs(2), response_rx).await {
                Ok(Ok(chunks)) => Ok(chunks),
                Ok(Err(_)) => Err(CaptureError::StreamError("Channel closed".to_string())),
                Err(_) => Err(CaptureError::Timeout(2)),
            }
        } else {
            Err(CaptureError::StreamError(
                "Capture thread is not running".to_string(),
            ))
        };

        drop(cmd_tx);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        let chunks = result?;
        let bytes: usize = chunks.iter().map(AudioChunk::len).sum();
        tracing::debug!(
            "Audio capture stopped: {} chunk(s), {} bytes ({:.2}s)",
            chunks.len(),
            bytes,
            self.format().duration_secs(bytes)
        );

        Ok(chunks)
    }

    fn format(&self) -> PcmFormat {
        PcmFormat::mono_s16(self.config.sample_rate)
    }
}

/// Build an input stream for a specific sample type
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    params: StreamBuildParams,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    use cpal::traits::DeviceTrait;

    let StreamBuildParams {
        session,
        source_rate,
        target_rate,
        source_channels,
    } = params;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Convert to f32 and mix to mono
                let mono_f32: Vec<f32> = data
                    .chunks(source_channels)
                    .map(|frame| {
                        let sum: f32 = frame
                            .iter()
                            .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
                            .sum();
                        sum / source_channels as f32
                    })
                    .collect();

                let resampled = resample(&mono_f32, source_rate, target_rate);

                if let Ok(mut guard) = session.lock() {
                    guard.push(AudioChunk::from_samples(&resampled));
                }
            },
            err_fn,
            None,
        )
        .map_err(map_build_error)
}

/// Linear interpolation resampling
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples.get(idx).copied().unwrap_or(0.0)
        };

        output.push(sample);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate() {
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_downsample() {
        let samples = vec![0.0; 48];
        // 48 kHz -> 16 kHz keeps one sample in three
        assert_eq!(resample(&samples, 48000, 16000).len(), 16);
    }

    #[test]
    fn test_resample_upsample_interpolates() {
        let result = resample(&[0.0, 1.0], 8000, 16000);
        assert_eq!(result.len(), 4);
        assert_eq!(result[1], 0.5);
    }

    #[test]
    fn test_match_device_name_priority() {
        let names = vec![
            "alsa_input.usb-Blue_Yeti-00.analog-stereo".to_string(),
            "Headset".to_string(),
            "headset".to_string(),
        ];
        assert_eq!(match_device_name(&names, "headset"), Some(2));
        assert_eq!(match_device_name(&names, "HEADSET"), Some(1));
        assert_eq!(match_device_name(&names, "blue_yeti"), Some(0));
        assert_eq!(match_device_name(&names, "webcam"), None);
    }

    #[test]
    fn test_classify_backend_error() {
        assert!(matches!(
            classify_backend_error("Permission denied (os error 13)".into()),
            CaptureError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_backend_error("Device or resource busy".into()),
            CaptureError::DeviceUnavailable(_)
        ));
        assert!(matches!(
            classify_backend_error("underrun".into()),
            CaptureError::StreamError(_)
        ));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let mut capture = CpalCapture::new(&AudioConfig::default()).unwrap();
        let chunks = capture.stop().await.unwrap();
        assert!(chunks.is_empty());
    }
}
