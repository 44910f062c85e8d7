// Command-line interface definitions for sathi-voice
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sathi-voice")]
#[command(author, version, about = "Voice capture and guidance playback for Health Sathi")]
#[command(long_about = "
Sathi Voice records spoken symptoms as a WAV clip ready for upload, and
reads medical guidance aloud using a hosted text-to-speech model.

SETUP:
  1. Make sure a microphone and speakers are available
  2. Set SATHI_API_KEY (or synthesis.api_key in the config file)
  3. Run: sathi-voice config (to check the effective settings)

USAGE:
  sathi-voice record              Press Enter to stop, prints base64 WAV
  sathi-voice speak \"Take this tablet twice daily\"
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override audio input device
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record from the microphone until Enter is pressed
    Record {
        /// Write the WAV clip to a file instead of printing base64
        #[arg(short, long, value_name = "FILE")]
        output: Option<std::path::PathBuf>,

        /// Stop automatically after this many seconds
        #[arg(short, long, value_name = "SECS")]
        duration: Option<u32>,

        /// Print a data: URL instead of bare base64
        #[arg(long)]
        data_url: bool,
    },

    /// Synthesize text and play it (Ctrl+C stops playback)
    Speak {
        /// Text to read aloud
        text: String,
    },

    /// Convert a saved base64 raw PCM payload to a WAV file
    Decode {
        /// File containing the base64 payload
        payload: std::path::PathBuf,

        /// Destination WAV file
        #[arg(short, long, value_name = "FILE")]
        output: std::path::PathBuf,
    },

    /// Show current configuration
    Config {
        /// Write the effective settings (including --device) to the config file
        #[arg(long)]
        save: bool,
    },
}
