//! # Chorus Engine
//!
//! Composition root for the Chorus sound system.
//!
//! Loads `chorus.toml`, opens an output device (or falls back to headless
//! playback), wires every configured clip into the sound manager and runs a
//! scripted sound check.
//!
//! ```text
//! chorus                 # config from the platform config directory
//! chorus path/to.toml    # explicit config file
//! chorus --init [path]   # write the default config and exit
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod audio_assets;
mod config;
mod timing;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::SoundConfig;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("chorus=info".parse()?))
        .init();

    info!("Chorus starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let mut config = match args.next() {
        Some(flag) if flag == "--init" => {
            let path = args.next().map_or_else(SoundConfig::config_path, PathBuf::from);
            SoundConfig::default()
                .save_to(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            return Ok(());
        },
        Some(path) => SoundConfig::load_from(path),
        None => SoundConfig::load(),
    };
    config.validate();

    app::run(config)?;

    info!("Chorus shutdown complete");
    Ok(())
}
