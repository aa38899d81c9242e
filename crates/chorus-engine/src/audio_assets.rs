//! Audio asset loading.
//!
//! This module provides:
//! - Decoding clip files (WAV/MP3) under the configured asset root
//! - Path caching so sounds sharing a file share one clip
//! - Declaring the configured mixer channels on the backend
//! - Building the [`ClipRegistry`] from the `[[clips]]` table
//!
//! A missing or undecodable file leaves the sound's clip unset and an
//! unknown channel name leaves its channel unset. Both are reported and the
//! sound fails with a configuration error when played.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chorus_kernel::audio::{
    decode_file, AudioError, ClipEntry, ClipId, ClipRegistry, MixerChannel, PlaybackBackend,
    SoundId,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SoundConfig;

/// Errors that can occur during audio asset operations.
#[derive(Debug, Error)]
pub enum AudioAssetError {
    /// File not found.
    #[error("Audio file for {sound} not found: {path}")]
    NotFound {
        /// Sound wired to the file.
        sound: SoundId,
        /// Resolved path.
        path: PathBuf,
    },

    /// File could not be decoded or stored.
    #[error("Failed to load {sound} from {path}: {source}")]
    LoadFailed {
        /// Sound wired to the file.
        sound: SoundId,
        /// Resolved path.
        path: PathBuf,
        /// Underlying error.
        source: AudioError,
    },

    /// Clip names a channel that was never declared.
    #[error("Unknown channel {channel} for {sound}")]
    UnknownChannel {
        /// Sound naming the channel.
        sound: SoundId,
        /// Channel name.
        channel: String,
    },

    /// The wiring itself is invalid.
    #[error("Invalid clip registry: {0}")]
    Registry(#[from] AudioError),
}

/// Result type for audio asset operations.
pub type AudioAssetResult<T> = Result<T, AudioAssetError>;

/// Statistics for the clip loader.
#[derive(Debug, Default, Clone)]
pub struct LoaderStats {
    /// Number of files decoded.
    pub decoded: usize,
    /// Number of loads served from the path cache.
    pub cache_hits: usize,
    /// Number of missing files.
    pub missing_files: usize,
}

/// Decodes clip files into a backend.
#[derive(Debug)]
pub struct ClipLoader {
    /// Base path for assets.
    asset_root: PathBuf,
    /// Clips already loaded, by resolved path.
    cache: HashMap<PathBuf, ClipId>,
    /// Statistics.
    stats: LoaderStats,
}

impl ClipLoader {
    /// Creates a loader for files under `asset_root`.
    #[must_use]
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        let asset_root = asset_root.into();
        info!("Loading clips from {}", asset_root.display());

        Self {
            asset_root,
            cache: HashMap::new(),
            stats: LoaderStats::default(),
        }
    }

    /// Returns the loader statistics.
    #[must_use]
    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    /// Loads the clip file for `sound` into the backend.
    pub fn load<B: PlaybackBackend>(
        &mut self,
        sound: SoundId,
        file: &Path,
        backend: &mut B,
    ) -> AudioAssetResult<ClipId> {
        let path = self.asset_root.join(file);

        if let Some(&clip) = self.cache.get(&path) {
            self.stats.cache_hits += 1;
            debug!("{} shares clip {:?} ({})", sound, clip, path.display());
            return Ok(clip);
        }

        if !path.exists() {
            self.stats.missing_files += 1;
            return Err(AudioAssetError::NotFound { sound, path });
        }

        let loaded = decode_file(&path).and_then(|decoded| {
            backend.load_samples(
                decoded.samples,
                decoded.sample_rate,
                decoded.channels,
                Some(path.as_path()),
            )
        });
        let clip = match loaded {
            Ok(clip) => clip,
            Err(source) => return Err(AudioAssetError::LoadFailed { sound, path, source }),
        };

        self.stats.decoded += 1;
        debug!("Loaded {} from {}", sound, path.display());
        self.cache.insert(path, clip);
        Ok(clip)
    }
}

/// Outcome of building the registry.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Sounds fully wired.
    pub wired: usize,
    /// Loader statistics.
    pub stats: LoaderStats,
    /// Non-fatal problems; each leaves one sound partly unwired.
    pub problems: Vec<AudioAssetError>,
}

impl LoadReport {
    /// Check if every sound was wired without problems.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    /// Log a summary and every problem.
    pub fn log(&self) {
        if self.is_clean() {
            info!("All configured sounds wired");
        }
        for problem in &self.problems {
            warn!("{problem}");
        }
        info!(
            "Wired {} sounds ({} files decoded, {} shared, {} problems)",
            self.wired,
            self.stats.decoded,
            self.stats.cache_hits,
            self.problems.len()
        );
    }
}

/// Declare every configured channel and the master volume on the backend.
pub fn declare_channels<B: PlaybackBackend>(config: &SoundConfig, backend: &mut B) {
    backend.set_master_volume(config.master_volume);
    for channel in &config.channels {
        backend.declare_channel(&MixerChannel::new(channel.name.as_str()), channel.volume);
    }
    debug!("Declared {} channels", config.channels.len());
}

/// Load every configured clip and build the registry.
///
/// Fails only when the wiring itself is invalid (a sound listed twice).
pub fn build_registry<B: PlaybackBackend>(
    config: &SoundConfig,
    backend: &mut B,
) -> AudioAssetResult<(ClipRegistry, LoadReport)> {
    let mut loader = ClipLoader::new(&config.asset_root);
    let mut report = LoadReport::default();
    let mut entries = Vec::with_capacity(config.clips.len());

    for clip_config in &config.clips {
        let sound = clip_config.sound;

        let clip = clip_config
            .path
            .as_deref()
            .and_then(|file| match loader.load(sound, file, backend) {
                Ok(clip) => Some(clip),
                Err(e) => {
                    report.problems.push(e);
                    None
                },
            });

        let channel = clip_config
            .channel
            .as_deref()
            .and_then(|name| match config.channel(name) {
                Some(_) => Some(MixerChannel::new(name)),
                None => {
                    report.problems.push(AudioAssetError::UnknownChannel {
                        sound,
                        channel: name.to_string(),
                    });
                    None
                },
            });

        let entry = ClipEntry {
            sound,
            clip,
            channel,
        };
        if entry.is_wired() {
            report.wired += 1;
        }
        entries.push(entry);
    }

    let registry = ClipRegistry::new(entries)?;
    report.stats = loader.stats().clone();
    Ok((registry, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelConfig, ClipConfig};
    use chorus_kernel::audio::HeadlessBackend;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes a silent 16-bit mono WAV.
    fn write_silent_wav(path: &Path, sample_rate: u32, num_samples: u32) {
        let data_size = num_samples * 2;
        let mut wav = Vec::with_capacity(44 + data_size as usize);

        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_size).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&1u16.to_le_bytes()); // mono
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());

        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_size.to_le_bytes());
        wav.resize(44 + data_size as usize, 0);

        std::fs::write(path, wav).expect("write wav");
    }

    fn clip(sound: SoundId, path: Option<&str>, channel: Option<&str>) -> ClipConfig {
        ClipConfig {
            sound,
            path: path.map(PathBuf::from),
            channel: channel.map(str::to_string),
        }
    }

    fn config(root: &Path, clips: Vec<ClipConfig>) -> SoundConfig {
        SoundConfig {
            asset_root: root.to_path_buf(),
            channels: vec![ChannelConfig {
                name: "Ui".to_string(),
                volume: 0.5,
            }],
            clips,
            ..SoundConfig::default()
        }
    }

    #[test]
    fn test_build_registry_loads_clips() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        write_silent_wav(&temp_dir.path().join("click.wav"), 8000, 4000);

        let config = config(
            temp_dir.path(),
            vec![clip(SoundId::ButtonClick, Some("click.wav"), Some("Ui"))],
        );
        let mut backend = HeadlessBackend::new();
        declare_channels(&config, &mut backend);

        let (registry, report) = build_registry(&config, &mut backend).expect("registry");
        assert!(report.is_clean());
        assert_eq!(report.wired, 1);

        let clip = registry.lookup_clip(SoundId::ButtonClick).expect("clip");
        assert_eq!(
            backend.clip_duration(clip).expect("duration"),
            Duration::from_millis(500)
        );
        assert_eq!(
            registry
                .lookup_mixer_channel(SoundId::ButtonClick)
                .ok()
                .map(MixerChannel::name),
            Some("Ui")
        );
    }

    #[test]
    fn test_shared_file_decoded_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        write_silent_wav(&temp_dir.path().join("click.wav"), 8000, 800);

        let config = config(
            temp_dir.path(),
            vec![
                clip(SoundId::ButtonClick, Some("click.wav"), Some("Ui")),
                clip(SoundId::ExitButtonClick, Some("click.wav"), Some("Ui")),
            ],
        );
        let mut backend = HeadlessBackend::new();
        declare_channels(&config, &mut backend);

        let (registry, report) = build_registry(&config, &mut backend).expect("registry");
        assert_eq!(report.stats.decoded, 1);
        assert_eq!(report.stats.cache_hits, 1);
        assert_eq!(
            registry.lookup_clip(SoundId::ButtonClick).ok(),
            registry.lookup_clip(SoundId::ExitButtonClick).ok()
        );
    }

    #[test]
    fn test_missing_file_leaves_clip_unset() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = config(
            temp_dir.path(),
            vec![clip(SoundId::MarkerHover, Some("gone.wav"), Some("Ui"))],
        );
        let mut backend = HeadlessBackend::new();

        let (registry, report) = build_registry(&config, &mut backend).expect("registry");
        assert_eq!(report.wired, 0);
        assert_eq!(report.stats.missing_files, 1);
        assert!(matches!(
            report.problems.as_slice(),
            [AudioAssetError::NotFound {
                sound: SoundId::MarkerHover,
                ..
            }]
        ));
        assert_eq!(registry.unwired(), vec![SoundId::MarkerHover]);
        assert!(registry.lookup_clip(SoundId::MarkerHover).is_err());
    }

    #[test]
    fn test_undecodable_file_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join("noise.wav"), b"not a wav").expect("write");

        let config = config(
            temp_dir.path(),
            vec![clip(SoundId::GcBusClick, Some("noise.wav"), Some("Ui"))],
        );
        let mut backend = HeadlessBackend::new();

        let (_, report) = build_registry(&config, &mut backend).expect("registry");
        assert!(matches!(
            report.problems.as_slice(),
            [AudioAssetError::LoadFailed { .. }]
        ));
    }

    #[test]
    fn test_unknown_channel_leaves_channel_unset() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        write_silent_wav(&temp_dir.path().join("zoom.wav"), 8000, 800);

        let config = config(
            temp_dir.path(),
            vec![clip(SoundId::GcBusZoom, Some("zoom.wav"), Some("Music"))],
        );
        let mut backend = HeadlessBackend::new();

        let (registry, report) = build_registry(&config, &mut backend).expect("registry");
        assert!(registry.lookup_clip(SoundId::GcBusZoom).is_ok());
        assert!(matches!(
            registry.lookup_mixer_channel(SoundId::GcBusZoom),
            Err(AudioError::ChannelNotFound(SoundId::GcBusZoom))
        ));
        assert!(matches!(
            report.problems.as_slice(),
            [AudioAssetError::UnknownChannel { .. }]
        ));
    }

    #[test]
    fn test_duplicate_sound_is_fatal() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = config(
            temp_dir.path(),
            vec![
                clip(SoundId::CardAnimIn, None, Some("Ui")),
                clip(SoundId::CardAnimIn, None, Some("Ui")),
            ],
        );
        let mut backend = HeadlessBackend::new();

        let result = build_registry(&config, &mut backend);
        assert!(matches!(
            result,
            Err(AudioAssetError::Registry(AudioError::DuplicateEntry(
                SoundId::CardAnimIn
            )))
        ));
    }
}
