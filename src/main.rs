//! Sathi Voice - voice capture and guidance playback
//!
//! Use `sathi-voice record` to capture a clip from the microphone.
//! Use `sathi-voice speak <text>` to hear synthesized guidance.
//! Use `sathi-voice decode <payload> -o out.wav` to inspect a TTS payload.

use clap::Parser;
use sathi_voice::audio;
use sathi_voice::codec::{self, PcmFormat};
use sathi_voice::config::{self, Config};
use sathi_voice::notification::DesktopNotifier;
use sathi_voice::playback::rodio_output::RodioBackend;
use sathi_voice::state::StateReporter;
use sathi_voice::recorder::line_signal;
use sathi_voice::{synth, Cli, Commands, TtsPlayer, VoiceRecorder};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("sathi_voice={},warn", log_level))),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(device) = cli.device {
        config.audio.device = device;
    }

    match cli.command {
        Commands::Record {
            output,
            duration,
            data_url,
        } => {
            record(&config, output.as_deref(), duration, data_url).await?;
        }

        Commands::Speak { text } => {
            speak(&config, &text).await?;
        }

        Commands::Decode { payload, output } => {
            decode_payload(&config, &payload, &output)?;
        }

        Commands::Config { save } => {
            if save {
                let path = cli
                    .config
                    .clone()
                    .or_else(Config::default_path)
                    .ok_or_else(|| anyhow::anyhow!("No config directory available"))?;
                config::save_config(&config, &path)?;
                eprintln!("Saved configuration to {:?}", path);
            }
            show_config(&config);
        }
    }

    Ok(())
}

/// Record one clip and print or save it
async fn record(
    config: &Config,
    output: Option<&Path>,
    duration: Option<u32>,
    data_url: bool,
) -> anyhow::Result<()> {
    let limit = duration
        .unwrap_or(config.audio.max_duration_secs)
        .min(config.audio.max_duration_secs);

    let (clip_tx, mut clip_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let reporter = StateReporter::new(config.resolve_state_file());
    let mut recorder = VoiceRecorder::new(
        audio::create_capture(&config.audio)?,
        Arc::new(DesktopNotifier::new(config.notification.enabled)),
        Box::new(move |clip| {
            let _ = clip_tx.send(clip);
        }),
    )
    .with_reporter(reporter.clone());

    recorder.start_capture().await?;
    eprintln!("Listening... press Enter to stop (limit {}s)", limit);

    let enter = line_signal(std::io::BufReader::new(std::io::stdin()));
    tokio::select! {
        _ = enter => {}
        _ = tokio::time::sleep(Duration::from_secs(limit as u64)) => {
            tracing::info!("Recording limit of {}s reached", limit);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, finishing clip");
        }
    }

    let stopped = recorder.stop_capture().await;
    reporter.cleanup();
    stopped?;

    let clip = clip_rx
        .recv()
        .await
        .ok_or_else(|| anyhow::anyhow!("Recorder finished without a clip"))?;

    match output {
        Some(path) => {
            let wav = codec::decode_base64(&clip)?;
            std::fs::write(path, &wav)?;
            eprintln!("Saved {} bytes to {:?}", wav.len(), path);
        }
        None if data_url => println!("{}", codec::to_data_url("audio/wav", &clip)),
        None => println!("{}", clip),
    }

    Ok(())
}

/// Synthesize and play text, waiting for it to finish
async fn speak(config: &Config, text: &str) -> anyhow::Result<()> {
    let synthesizer: Arc<dyn synth::SpeechSynthesizer> =
        Arc::from(synth::create_synthesizer(config)?);
    let format = PcmFormat {
        sample_rate: config.playback.sample_rate,
        ..PcmFormat::TTS_V1
    };
    let reporter = StateReporter::new(config.resolve_state_file());

    let mut player = TtsPlayer::new(
        synthesizer,
        Box::new(RodioBackend::new(config.playback.volume)),
        Arc::new(DesktopNotifier::new(config.notification.enabled)),
    )
    .with_format(format)
    .with_reporter(reporter.clone());

    let result = player.play(text).await;
    if result.is_ok() {
        let interrupted = tokio::select! {
            _ = player.wait_until_idle() => false,
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            player.stop();
        }
    }

    player.close();
    reporter.cleanup();
    result?;
    Ok(())
}

/// Write a stored TTS payload out as WAV
fn decode_payload(config: &Config, payload: &Path, output: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(payload)?;
    let format = PcmFormat {
        sample_rate: config.playback.sample_rate,
        ..PcmFormat::TTS_V1
    };

    let bytes = codec::decode_base64(codec::strip_data_url(&text))?;
    // Validates the layout the same way playback does
    let samples = codec::decode_pcm(&bytes, &format)?;
    let wav = codec::wrap_wav(&bytes, &format)?;
    std::fs::write(output, &wav)?;

    println!(
        "Decoded {} samples ({:.2}s at {} Hz) to {:?}",
        samples.len(),
        format.duration_secs(bytes.len()),
        format.sample_rate,
        output
    );
    Ok(())
}

/// Show current configuration
fn show_config(config: &Config) {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[audio]");
    println!("  device = {:?}", config.audio.device);
    println!("  sample_rate = {}", config.audio.sample_rate);
    println!("  max_duration_secs = {}", config.audio.max_duration_secs);

    println!("\n[playback]");
    println!("  sample_rate = {}", config.playback.sample_rate);
    println!("  volume = {}", config.playback.volume);

    println!("\n[synthesis]");
    println!("  endpoint = {:?}", config.synthesis.endpoint);
    println!("  model = {:?}", config.synthesis.model);
    println!("  voice = {:?}", config.synthesis.voice);
    println!(
        "  api_key = {}",
        if config.resolve_api_key().is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
    println!("  timeout_secs = {}", config.synthesis.timeout_secs);

    println!("\n[notification]");
    println!("  enabled = {}", config.notification.enabled);

    println!("\nstate_file = {:?}", config.resolve_state_file());

    if let Some(path) = Config::default_path() {
        println!("\nConfig file: {:?}", path);
    }
}
