//! Sound configuration.
//!
//! Declares the mixer channels, the clip file and channel of every sound,
//! and the playback loop settings. Loaded from and saved to `chorus.toml`.

use chorus_kernel::SoundId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "chorus.toml";

/// A mixer channel declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel name, referenced by clips.
    pub name: String,
    /// Channel gain (0.0 - 1.0)
    #[serde(default = "default_channel_volume")]
    pub volume: f32,
}

fn default_channel_volume() -> f32 {
    1.0
}

impl ChannelConfig {
    fn new(name: &str, volume: f32) -> Self {
        Self {
            name: name.to_string(),
            volume,
        }
    }
}

/// Wiring of one sound to a clip file and a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipConfig {
    /// Sound being wired.
    pub sound: SoundId,
    /// Clip file, relative to the asset root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Channel name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl ClipConfig {
    fn new(sound: SoundId, file: &str, channel: &str) -> Self {
        Self {
            sound,
            path: Some(PathBuf::from(file)),
            channel: Some(channel.to_string()),
        }
    }
}

/// Sound configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Update ticks per second
    pub tick_rate_hz: u32,
    /// Directory clip paths are resolved against
    pub asset_root: PathBuf,
    /// Skip the output device and simulate playback
    pub prefer_headless: bool,
    /// Mixer channels
    pub channels: Vec<ChannelConfig>,
    /// Sound wiring
    pub clips: Vec<ClipConfig>,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            tick_rate_hz: 60,
            asset_root: PathBuf::from("assets/sounds"),
            prefer_headless: false,

            channels: vec![
                ChannelConfig::new("Ui", 1.0),
                ChannelConfig::new("Sfx", 1.0),
                ChannelConfig::new("Ambient", 0.7),
            ],

            clips: vec![
                ClipConfig::new(SoundId::ButtonClick, "button_click.wav", "Ui"),
                ClipConfig::new(SoundId::ButtonHover, "button_hover.wav", "Ui"),
                ClipConfig::new(SoundId::MarkerHover, "marker_hover.wav", "Ui"),
                ClipConfig::new(SoundId::CardAnimIn, "card_in.wav", "Sfx"),
                ClipConfig::new(SoundId::CardAnimOut, "card_out.wav", "Sfx"),
                ClipConfig::new(SoundId::TableMoveUp, "table_up.wav", "Sfx"),
                ClipConfig::new(SoundId::TableMoveDown, "table_down.wav", "Sfx"),
                ClipConfig::new(SoundId::EarthAmbience, "earth_ambience.mp3", "Ambient"),
                ClipConfig::new(SoundId::RoomAmbience, "room_ambience.mp3", "Ambient"),
                ClipConfig::new(SoundId::ExitButtonClick, "exit_click.wav", "Ui"),
                ClipConfig::new(SoundId::GcBusClick, "bus_click.wav", "Ui"),
                ClipConfig::new(SoundId::GcBusZoom, "bus_zoom.wav", "Sfx"),
            ],
        }
    }
}

impl SoundConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs_config_path() {
            config_dir.join("chorus").join(CONFIG_FILE)
        } else {
            PathBuf::from(CONFIG_FILE)
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    ///
    /// Duplicate channel names keep the first declaration. Duplicate clip
    /// entries are left alone; building the registry rejects them.
    pub fn validate(&mut self) {
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.tick_rate_hz = self.tick_rate_hz.clamp(10, 240);

        let mut seen = HashSet::new();
        self.channels.retain(|channel| {
            if channel.name.is_empty() {
                warn!("Dropping channel with empty name");
                return false;
            }
            if !seen.insert(channel.name.clone()) {
                warn!("Dropping duplicate channel {}", channel.name);
                return false;
            }
            true
        });
        for channel in &mut self.channels {
            channel.volume = channel.volume.clamp(0.0, 1.0);
        }
    }

    /// Look up a declared channel by name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|channel| channel.name == name)
    }
}

/// Get platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}
