//! Command-line parsing

use clap::Parser;
use sathi_voice::{Cli, Commands};

#[test]
fn config_save_flag_parses() {
    let cli = Cli::try_parse_from(["sathi-voice", "--device", "USB Mic", "config", "--save"]).unwrap();
    assert_eq!(cli.device.as_deref(), Some("USB Mic"));
    assert!(matches!(cli.command, Commands::Config { save: true }));
}

#[test]
fn config_shows_without_saving_by_default() {
    let cli = Cli::try_parse_from(["sathi-voice", "config"]).unwrap();
    assert!(matches!(cli.command, Commands::Config { save: false }));
}

#[test]
fn record_limits_parse() {
    let cli = Cli::try_parse_from(["sathi-voice", "record", "-d", "5", "--data-url"]).unwrap();
    match cli.command {
        Commands::Record {
            output,
            duration,
            data_url,
        } => {
            assert!(output.is_none());
            assert_eq!(duration, Some(5));
            assert!(data_url);
        }
        _ => panic!("expected record"),
    }
}
