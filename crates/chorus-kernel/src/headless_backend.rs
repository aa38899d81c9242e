//! Deviceless playback backend.
//!
//! Simulates voices without touching an audio device: playback position
//! advances with [`PlaybackBackend::update`], non-looping voices fall silent
//! once their clip has played through. Used when no output device is
//! available and by the test suites.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use tracing::{debug, trace};

use crate::audio_backend::{PlaybackBackend, MAX_VOICES};
use crate::audio_resource::{
    ChannelVolumes, ClipId, ClipStore, MixerChannel, SpatialParams, VoiceId, VoiceIdGenerator,
};
use crate::error::{AudioError, AudioResult};

/// Simulated voice.
#[derive(Debug, Clone)]
pub struct HeadlessVoice {
    /// Clip the voice plays.
    pub clip: ClipId,
    /// Channel the voice is routed through.
    pub channel: MixerChannel,
    /// Voice volume (before channel gain).
    pub volume: f32,
    /// Playback speed multiplier.
    pub pitch: f32,
    /// Whether the voice repeats.
    pub looping: bool,
    /// Positional parameters, if spatial.
    pub spatial: Option<SpatialParams>,
    /// Whether the voice is producing sound.
    pub playing: bool,
    /// Playback position within the clip.
    pub position: Duration,
    duration: Duration,
}

/// Playback backend that only keeps books.
#[derive(Debug)]
pub struct HeadlessBackend {
    clips: ClipStore,
    voices: HashMap<VoiceId, HeadlessVoice>,
    ids: VoiceIdGenerator,
    volumes: ChannelVolumes,
    listener: Vec3,
    max_voices: usize,
    created: usize,
    destroyed: usize,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::with_max_voices(MAX_VOICES)
    }
}

impl HeadlessBackend {
    /// Create an empty backend with the default voice limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend that holds at most `max_voices` voices.
    #[must_use]
    pub fn with_max_voices(max_voices: usize) -> Self {
        debug!("Created headless playback backend ({} voices)", max_voices);
        Self {
            clips: ClipStore::new(),
            voices: HashMap::new(),
            ids: VoiceIdGenerator::new(),
            volumes: ChannelVolumes::default(),
            listener: Vec3::ZERO,
            max_voices,
            created: 0,
            destroyed: 0,
        }
    }

    /// Register a clip that has a duration but no samples.
    pub fn load_silent(&mut self, duration: Duration) -> AudioResult<ClipId> {
        self.clips
            .add_silent(duration)
            .ok_or_else(|| AudioError::DecodeFailed("Clip store full".to_string()))
    }

    /// Get a voice by id.
    #[must_use]
    pub fn voice(&self, voice: VoiceId) -> Option<&HeadlessVoice> {
        self.voices.get(&voice)
    }

    /// Check if a voice exists (has not been destroyed).
    #[must_use]
    pub fn exists(&self, voice: VoiceId) -> bool {
        self.voices.contains_key(&voice)
    }

    /// Number of existing voices.
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Number of voices ever created.
    #[must_use]
    pub const fn created_count(&self) -> usize {
        self.created
    }

    /// Number of voices destroyed.
    #[must_use]
    pub const fn destroyed_count(&self) -> usize {
        self.destroyed
    }

    /// Volume a voice would be heard at, including channel and master gain.
    #[must_use]
    pub fn effective_volume(&self, voice: VoiceId) -> Option<f32> {
        self.voices
            .get(&voice)
            .map(|v| self.volumes.effective(&v.channel) * v.volume)
    }

    /// Current listener position.
    #[must_use]
    pub const fn listener(&self) -> Vec3 {
        self.listener
    }
}

impl PlaybackBackend for HeadlessBackend {
    fn load_samples(
        &mut self,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        path: Option<&Path>,
    ) -> AudioResult<ClipId> {
        let id = match path {
            Some(path) => self.clips.add_with_path(samples, sample_rate, channels, path),
            None => self.clips.add(samples, sample_rate, channels),
        };
        id.ok_or_else(|| AudioError::DecodeFailed("Clip store full".to_string()))
    }

    fn declare_channel(&mut self, channel: &MixerChannel, volume: f32) {
        self.volumes.declare(channel, volume);
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.volumes.set_master(volume);
    }

    fn clip_duration(&self, clip: ClipId) -> AudioResult<Duration> {
        self.clips
            .get(clip)
            .map(|c| c.duration)
            .ok_or(AudioError::ClipNotLoaded(clip))
    }

    fn create_voice(&mut self, clip: ClipId, channel: &MixerChannel) -> AudioResult<VoiceId> {
        let duration = self.clip_duration(clip)?;
        if !self.volumes.contains(channel) {
            return Err(AudioError::UnknownChannel(channel.name().to_string()));
        }
        if self.voices.len() >= self.max_voices {
            return Err(AudioError::NoFreeVoices {
                max: self.max_voices,
            });
        }

        let voice = self.ids.next();
        self.voices.insert(
            voice,
            HeadlessVoice {
                clip,
                channel: channel.clone(),
                volume: 1.0,
                pitch: 1.0,
                looping: false,
                spatial: None,
                playing: false,
                position: Duration::ZERO,
                duration,
            },
        );
        self.created += 1;
        trace!("Created headless voice {:?}", voice);
        Ok(voice)
    }

    fn set_volume(&mut self, voice: VoiceId, volume: f32) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.volume = volume.clamp(0.0, 1.0);
        }
    }

    fn set_pitch(&mut self, voice: VoiceId, pitch: f32) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.pitch = pitch.clamp(0.1, 4.0);
        }
    }

    fn set_looping(&mut self, voice: VoiceId, looping: bool) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.looping = looping;
        }
    }

    fn set_spatial(&mut self, voice: VoiceId, params: &SpatialParams) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.spatial = Some(params.normalized());
        }
    }

    fn play(&mut self, voice: VoiceId) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.playing = true;
            v.position = Duration::ZERO;
        }
    }

    fn stop(&mut self, voice: VoiceId) {
        if let Some(v) = self.voices.get_mut(&voice) {
            v.playing = false;
        }
    }

    fn is_playing(&self, voice: VoiceId) -> bool {
        self.voices.get(&voice).is_some_and(|v| v.playing)
    }

    fn destroy(&mut self, voice: VoiceId) {
        if self.voices.remove(&voice).is_some() {
            self.destroyed += 1;
            trace!("Destroyed headless voice {:?}", voice);
        }
    }

    fn set_listener_position(&mut self, position: Vec3) {
        self.listener = position;
    }

    fn update(&mut self, delta: Duration) {
        for v in self.voices.values_mut().filter(|v| v.playing) {
            let advanced = (delta.as_nanos() as f64 * f64::from(v.pitch)).round();
            v.position += Duration::from_nanos(advanced as u64);
            if v.position >= v.duration {
                if v.looping && !v.duration.is_zero() {
                    let cycles = v.position.as_nanos() / v.duration.as_nanos();
                    let consumed = v.duration.as_nanos() * cycles;
                    v.position = Duration::from_nanos((v.position.as_nanos() - consumed) as u64);
                } else {
                    v.position = v.duration;
                    v.playing = false;
                }
            }
        }
    }
}
