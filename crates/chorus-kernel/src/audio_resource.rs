//! Audio Resource Management
//!
//! Provides the resource-side types shared by every backend:
//! - `ClipId`: Identifier of a loaded audio clip
//! - `AudioClip`: Decoded samples plus natural duration
//! - `ClipStore`: Owner of all loaded clips
//! - `VoiceId`: Identifier of one instantiated, playing sound
//! - `MixerChannel` / `ChannelVolumes`: named routing targets and their gains
//! - `SpatialParams`: positional playback parameters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐      ┌──────────────┐      ┌─────────────┐
//! │  AudioClip  │──────│ MixerChannel │──────│   VoiceId   │
//! │  (loaded)   │      │  (routing)   │      │  (playing)  │
//! └─────────────┘      └──────────────┘      └─────────────┘
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use tracing::{debug, warn};

/// Maximum number of loaded clips.
pub const MAX_LOADED_CLIPS: usize = 256;

/// Audio clip identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(u32);

impl ClipId {
    /// Create a new clip ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Unique identifier for a playing sound instance.
///
/// Ids are never reused, so a stale id held after the voice was destroyed
/// simply refers to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(u64);

impl VoiceId {
    /// Create a voice id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Voice id generator, owned by the backend that creates the voices.
#[derive(Debug, Default)]
pub struct VoiceIdGenerator {
    next_id: u64,
}

impl VoiceIdGenerator {
    /// Create a new generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Generate a new unique voice id.
    pub fn next(&mut self) -> VoiceId {
        let id = VoiceId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Decoded audio clip.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Unique clip identifier.
    pub id: ClipId,
    /// Audio sample data (interleaved f32). Empty for metadata-only clips.
    pub samples: Arc<Vec<f32>>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Natural duration of the clip at pitch 1.0.
    pub duration: Duration,
    /// Original file path (if loaded from file).
    pub source_path: Option<PathBuf>,
}

impl AudioClip {
    /// Create a new clip from decoded samples.
    #[must_use]
    pub fn new(id: ClipId, samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        let duration = if sample_rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(frames as f64 / f64::from(sample_rate))
        };

        Self {
            id,
            samples: Arc::new(samples),
            sample_rate,
            channels,
            duration,
            source_path: None,
        }
    }

    /// Create a clip that only carries a duration (no sample data).
    #[must_use]
    pub fn silent(id: ClipId, duration: Duration) -> Self {
        Self {
            id,
            samples: Arc::new(Vec::new()),
            sample_rate: 0,
            channels: 1,
            duration,
            source_path: None,
        }
    }

    /// Create with source path.
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}

/// Owner of all loaded clips.
#[derive(Debug, Default)]
pub struct ClipStore {
    clips: HashMap<ClipId, AudioClip>,
    path_to_id: HashMap<PathBuf, ClipId>,
    next_id: u32,
}

impl ClipStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clip by ID.
    #[must_use]
    pub fn get(&self, id: ClipId) -> Option<&AudioClip> {
        self.clips.get(&id)
    }

    /// Add decoded samples.
    ///
    /// Returns `None` if the store is full.
    pub fn add(&mut self, samples: Vec<f32>, sample_rate: u32, channels: u16) -> Option<ClipId> {
        let id = self.allocate()?;
        self.insert(AudioClip::new(id, samples, sample_rate, channels));
        Some(id)
    }

    /// Add decoded samples loaded from `path`.
    ///
    /// Loading the same path twice returns the existing id.
    pub fn add_with_path(
        &mut self,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        path: impl Into<PathBuf>,
    ) -> Option<ClipId> {
        let path = path.into();
        if let Some(&id) = self.path_to_id.get(&path) {
            return Some(id);
        }

        let id = self.allocate()?;
        let clip = AudioClip::new(id, samples, sample_rate, channels).with_source_path(&path);
        self.path_to_id.insert(path, id);
        self.insert(clip);
        Some(id)
    }

    /// Add a metadata-only clip of the given duration.
    pub fn add_silent(&mut self, duration: Duration) -> Option<ClipId> {
        let id = self.allocate()?;
        self.insert(AudioClip::silent(id, duration));
        Some(id)
    }

    fn allocate(&mut self) -> Option<ClipId> {
        if self.clips.len() >= MAX_LOADED_CLIPS {
            warn!("Audio clip store full ({} clips)", MAX_LOADED_CLIPS);
            return None;
        }
        let id = ClipId::new(self.next_id);
        self.next_id += 1;
        Some(id)
    }

    fn insert(&mut self, clip: AudioClip) {
        debug!("Stored audio clip {:?} ({:?})", clip.id, clip.duration);
        self.clips.insert(clip.id, clip);
    }
}

/// A named mixer channel a sound is routed through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MixerChannel {
    name: String,
}

impl MixerChannel {
    /// Create a channel reference by name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Get the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Gains for the master bus and every named channel.
#[derive(Debug, Clone)]
pub struct ChannelVolumes {
    master: f32,
    channels: HashMap<String, f32>,
}

impl Default for ChannelVolumes {
    fn default() -> Self {
        Self {
            master: 1.0,
            channels: HashMap::new(),
        }
    }
}

impl ChannelVolumes {
    /// Declare a channel with its gain. Re-declaring updates the gain.
    pub fn declare(&mut self, channel: &MixerChannel, volume: f32) {
        self.channels
            .insert(channel.name().to_string(), volume.clamp(0.0, 1.0));
    }

    /// Check if a channel has been declared.
    #[must_use]
    pub fn contains(&self, channel: &MixerChannel) -> bool {
        self.channels.contains_key(channel.name())
    }

    /// Get the gain for a channel (1.0 when undeclared).
    #[must_use]
    pub fn get(&self, channel: &MixerChannel) -> f32 {
        self.channels.get(channel.name()).copied().unwrap_or(1.0)
    }

    /// Get the master gain.
    #[must_use]
    pub const fn master(&self) -> f32 {
        self.master
    }

    /// Set the master gain.
    pub fn set_master(&mut self, volume: f32) {
        self.master = volume.clamp(0.0, 1.0);
    }

    /// Get effective gain for a channel (includes master).
    #[must_use]
    pub fn effective(&self, channel: &MixerChannel) -> f32 {
        self.master * self.get(channel)
    }
}

/// Positional playback parameters for spatial sounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialParams {
    /// World position of the emitter.
    pub position: Vec3,
    /// 0.0 = fully flat, 1.0 = fully positional.
    pub spatial_blend: f32,
    /// Stereo spread in degrees (0-360).
    pub spread: f32,
}

impl SpatialParams {
    /// Create spatial parameters.
    #[must_use]
    pub const fn new(position: Vec3, spatial_blend: f32, spread: f32) -> Self {
        Self {
            position,
            spatial_blend,
            spread,
        }
    }

    /// Check that every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.spatial_blend.is_finite() && self.spread.is_finite()
    }

    /// Clamp blend and spread to their valid ranges.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            position: self.position,
            spatial_blend: self.spatial_blend.clamp(0.0, 1.0),
            spread: self.spread.clamp(0.0, 360.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_id_generator() {
        let mut gen = VoiceIdGenerator::new();
        let v1 = gen.next();
        let v2 = gen.next();
        let v3 = gen.next();

        assert_ne!(v1, v2);
        assert_ne!(v2, v3);
        assert_eq!(v1, VoiceId::new(0));
        assert_eq!(v3, VoiceId::new(2));
    }

    #[test]
    fn test_audio_clip_duration() {
        let samples = vec![0.0f32; 44100 * 2]; // 1 second stereo
        let clip = AudioClip::new(ClipId::new(0), samples, 44100, 2);

        assert_eq!(clip.sample_rate, 44100);
        assert!(clip.duration >= Duration::from_millis(999));
        assert!(clip.duration <= Duration::from_millis(1001));
    }

    #[test]
    fn test_silent_clip() {
        let clip = AudioClip::silent(ClipId::new(3), Duration::from_millis(250));
        assert_eq!(clip.duration, Duration::from_millis(250));
        assert!(clip.samples.is_empty());
    }

    #[test]
    fn test_clip_store() {
        let mut store = ClipStore::new();

        let id = store.add(vec![0.0f32; 1000], 44100, 2).expect("should have id");
        let silent = store.add_silent(Duration::from_secs(1)).expect("should have id");
        assert_ne!(id, silent);
        assert_eq!(store.get(silent).map(|clip| clip.duration), Some(Duration::from_secs(1)));
        assert_eq!(store.get(id).map(|clip| clip.channels), Some(2));
        assert!(store.get(ClipId::new(99)).is_none());
    }

    #[test]
    fn test_clip_store_path_dedup() {
        let mut store = ClipStore::new();
        let path = PathBuf::from("/sounds/click.wav");

        let id = store.add_with_path(vec![0.0; 10], 44100, 1, path.clone());
        let id2 = store.add_with_path(vec![0.0; 10], 44100, 1, path.clone());
        assert_eq!(id, id2);
        let clip = id.and_then(|id| store.get(id)).expect("stored");
        assert_eq!(clip.source_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_channel_volumes() {
        let mut volumes = ChannelVolumes::default();
        let ui = MixerChannel::new("Ui");

        assert!(!volumes.contains(&ui));
        assert!((volumes.get(&ui) - 1.0).abs() < f32::EPSILON);

        volumes.declare(&ui, 0.5);
        volumes.set_master(0.8);
        assert!(volumes.contains(&ui));
        assert!((volumes.effective(&ui) - 0.4).abs() < f32::EPSILON);

        volumes.declare(&ui, 3.0);
        assert!((volumes.get(&ui) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_spatial_params() {
        let params = SpatialParams::new(Vec3::ZERO, 1.5, -10.0).normalized();
        assert!((params.spatial_blend - 1.0).abs() < f32::EPSILON);
        assert!(params.spread.abs() < f32::EPSILON);
        assert!(params.is_finite());

        let bad = SpatialParams::new(Vec3::new(f32::NAN, 0.0, 0.0), 1.0, 0.0);
        assert!(!bad.is_finite());
    }
}
