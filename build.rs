//! Build script for sathi-voice
//!
//! Renders man pages from the clap definitions in `src/cli.rs`. Pages are
//! only produced for release builds, or when `SATHI_GEN_MANPAGES` is set.
//! `SATHI_MAN_DIR` overrides the output directory (default `$OUT_DIR/man`).

use clap::CommandFactory;
use clap_mangen::Man;
use std::env;
use std::fs::{self, File};
use std::io::Error;
use std::path::{Path, PathBuf};

include!("src/cli.rs");

fn main() -> Result<(), Error> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed=SATHI_GEN_MANPAGES");
    println!("cargo:rerun-if-env-changed=SATHI_MAN_DIR");

    let release = env::var("PROFILE").is_ok_and(|p| p == "release");
    if !release && env::var_os("SATHI_GEN_MANPAGES").is_none() {
        return Ok(());
    }

    let man_dir = match env::var_os("SATHI_MAN_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => PathBuf::from(env::var_os("OUT_DIR").unwrap_or_else(|| "target".into())).join("man"),
    };
    fs::create_dir_all(&man_dir)?;

    let cli = Cli::command();
    let bin = cli.get_name().to_string();
    let mut written = vec![render_page(cli.clone(), &man_dir, &bin)?];

    // sathi-voice-record.1, sathi-voice-speak.1, ...
    for sub in cli.get_subcommands().filter(|s| s.get_name() != "help") {
        let page = format!("{}-{}", bin, sub.get_name());
        written.push(render_page(sub.clone(), &man_dir, &page)?);
    }

    println!(
        "cargo:warning={} man page(s) written to {}",
        written.len(),
        man_dir.display()
    );
    Ok(())
}

/// Write `<name>.1` for one command and return its path
fn render_page(cmd: clap::Command, dir: &Path, name: &str) -> Result<PathBuf, Error> {
    let path = dir.join(format!("{}.1", name));
    let mut file = File::create(&path)?;
    Man::new(cmd).render(&mut file)?;
    Ok(path)
}
