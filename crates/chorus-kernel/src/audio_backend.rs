//! Playback Backends
//!
//! This module defines the playback primitive the sound manager drives and
//! the rodio implementation of it. It includes:
//!
//! - `PlaybackBackend`: create/configure/start/stop/destroy voices
//! - `AudioDevice`: Wrapper around rodio's output stream
//! - `RodioBackend`: One rodio sink per voice, flat or spatial
//! - `decode_file` / `decode_bytes`: clip decoding through rodio
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      RodioBackend                        │
//! │  ┌───────────────┐  ┌────────────────┐  ┌─────────────┐  │
//! │  │  AudioDevice  │──│  VoiceState    │──│  ClipStore  │  │
//! │  │  (rodio)      │  │  (per voice)   │  │  (decoded)  │  │
//! │  └───────────────┘  └────────────────┘  └─────────────┘  │
//! │           │                  │                  │        │
//! │           ▼                  ▼                  ▼        │
//! │     OutputStream     Sink / SpatialSink    AudioClip     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! A voice is created paused. Parameters set before `play` are applied when
//! the sink is built; parameters set afterwards are pushed to the live sink.

use std::collections::HashMap;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source, SpatialSink};
use tracing::{debug, info, trace, warn};

use crate::audio_resource::{
    ChannelVolumes, ClipId, ClipStore, MixerChannel, SpatialParams, VoiceId, VoiceIdGenerator,
};
use crate::error::{AudioError, AudioResult};

/// Maximum number of simultaneous voices.
pub const MAX_VOICES: usize = 32;

/// Half the distance between the listener's ears, in world units.
pub const EAR_OFFSET: f32 = 0.1;

/// The audio playback primitive.
///
/// Implementations own every voice they create; callers only hold the
/// [`VoiceId`]. Operations on an unknown or destroyed voice are ignored.
pub trait PlaybackBackend {
    /// Register decoded samples as a clip.
    fn load_samples(
        &mut self,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        path: Option<&Path>,
    ) -> AudioResult<ClipId>;

    /// Declare a mixer channel and its gain.
    fn declare_channel(&mut self, channel: &MixerChannel, volume: f32);

    /// Set the master gain applied on top of every channel.
    fn set_master_volume(&mut self, volume: f32);

    /// Natural duration of a clip at pitch 1.0.
    fn clip_duration(&self, clip: ClipId) -> AudioResult<Duration>;

    /// Create a stopped voice bound to a clip and a channel.
    fn create_voice(&mut self, clip: ClipId, channel: &MixerChannel) -> AudioResult<VoiceId>;

    /// Set the voice volume (0.0-1.0, before channel gain).
    fn set_volume(&mut self, voice: VoiceId, volume: f32);

    /// Set the playback speed/pitch multiplier.
    fn set_pitch(&mut self, voice: VoiceId, pitch: f32);

    /// Set whether the voice repeats.
    fn set_looping(&mut self, voice: VoiceId, looping: bool);

    /// Make the voice positional.
    fn set_spatial(&mut self, voice: VoiceId, params: &SpatialParams);

    /// Start playback.
    fn play(&mut self, voice: VoiceId);

    /// Halt playback. The voice still exists until destroyed.
    fn stop(&mut self, voice: VoiceId);

    /// Check if a voice is currently producing sound.
    fn is_playing(&self, voice: VoiceId) -> bool;

    /// Destroy a voice and free its resources.
    fn destroy(&mut self, voice: VoiceId);

    /// Move the listener used by spatial voices.
    fn set_listener_position(&mut self, position: Vec3);

    /// Advance backend time by one tick.
    fn update(&mut self, _delta: Duration) {}
}

impl<B: PlaybackBackend + ?Sized> PlaybackBackend for &mut B {
    fn load_samples(
        &mut self,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        path: Option<&Path>,
    ) -> AudioResult<ClipId> {
        (**self).load_samples(samples, sample_rate, channels, path)
    }

    fn declare_channel(&mut self, channel: &MixerChannel, volume: f32) {
        (**self).declare_channel(channel, volume);
    }

    fn set_master_volume(&mut self, volume: f32) {
        (**self).set_master_volume(volume);
    }

    fn clip_duration(&self, clip: ClipId) -> AudioResult<Duration> {
        (**self).clip_duration(clip)
    }

    fn create_voice(&mut self, clip: ClipId, channel: &MixerChannel) -> AudioResult<VoiceId> {
        (**self).create_voice(clip, channel)
    }

    fn set_volume(&mut self, voice: VoiceId, volume: f32) {
        (**self).set_volume(voice, volume);
    }

    fn set_pitch(&mut self, voice: VoiceId, pitch: f32) {
        (**self).set_pitch(voice, pitch);
    }

    fn set_looping(&mut self, voice: VoiceId, looping: bool) {
        (**self).set_looping(voice, looping);
    }

    fn set_spatial(&mut self, voice: VoiceId, params: &SpatialParams) {
        (**self).set_spatial(voice, params);
    }

    fn play(&mut self, voice: VoiceId) {
        (**self).play(voice);
    }

    fn stop(&mut self, voice: VoiceId) {
        (**self).stop(voice);
    }

    fn is_playing(&self, voice: VoiceId) -> bool {
        (**self).is_playing(voice)
    }

    fn destroy(&mut self, voice: VoiceId) {
        (**self).destroy(voice);
    }

    fn set_listener_position(&mut self, position: Vec3) {
        (**self).set_listener_position(position);
    }

    fn update(&mut self, delta: Duration) {
        (**self).update(delta);
    }
}

/// Samples decoded from an audio file.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved f32 samples.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
}

/// Decode an audio file (WAV/MP3/...) fully into memory.
pub fn decode_file(path: impl AsRef<Path>) -> AudioResult<DecodedAudio> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| AudioError::LoadFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    decode(BufReader::new(file)).map_err(|e| AudioError::LoadFailed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Decode in-memory audio file bytes.
pub fn decode_bytes(data: &[u8]) -> AudioResult<DecodedAudio> {
    decode(Cursor::new(data.to_vec()))
}

fn decode<R>(reader: R) -> AudioResult<DecodedAudio>
where
    R: Read + Seek + Send + Sync + 'static,
{
    let decoder = Decoder::new(reader).map_err(|e| AudioError::DecodeFailed(e.to_string()))?;
    let sample_rate = decoder.sample_rate();
    let channels = decoder.channels();
    let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Wraps rodio's output stream for audio playback.
pub struct AudioDevice {
    /// The output stream (must be kept alive).
    _stream: OutputStream,
    /// Handle for creating sinks.
    handle: OutputStreamHandle,
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice").finish_non_exhaustive()
    }
}

impl AudioDevice {
    /// Open the default output device.
    pub fn new() -> AudioResult<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceInitFailed(e.to_string()))?;

        info!("Audio device initialized");

        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    /// Get a reference to the output stream handle.
    #[must_use]
    pub fn handle(&self) -> &OutputStreamHandle {
        &self.handle
    }
}

/// Live rodio sink behind a voice.
enum VoiceSink {
    Flat(Sink),
    Spatial(SpatialSink),
}

impl VoiceSink {
    fn set_volume(&self, volume: f32) {
        match self {
            Self::Flat(sink) => sink.set_volume(volume),
            Self::Spatial(sink) => sink.set_volume(volume),
        }
    }

    fn set_speed(&self, speed: f32) {
        match self {
            Self::Flat(sink) => sink.set_speed(speed),
            Self::Spatial(sink) => sink.set_speed(speed),
        }
    }

    fn append(&self, source: SamplesBuffer<f32>, looping: bool) {
        match (self, looping) {
            (Self::Flat(sink), true) => sink.append(source.repeat_infinite()),
            (Self::Flat(sink), false) => sink.append(source),
            (Self::Spatial(sink), true) => sink.append(source.repeat_infinite()),
            (Self::Spatial(sink), false) => sink.append(source),
        }
    }

    fn play(&self) {
        match self {
            Self::Flat(sink) => sink.play(),
            Self::Spatial(sink) => sink.play(),
        }
    }

    fn stop(&self) {
        match self {
            Self::Flat(sink) => sink.stop(),
            Self::Spatial(sink) => sink.stop(),
        }
    }

    fn is_playing(&self) -> bool {
        match self {
            Self::Flat(sink) => !sink.empty() && !sink.is_paused(),
            Self::Spatial(sink) => !sink.empty() && !sink.is_paused(),
        }
    }
}

/// State of one voice.
struct VoiceState {
    clip: ClipId,
    channel: MixerChannel,
    volume: f32,
    pitch: f32,
    looping: bool,
    spatial: Option<SpatialParams>,
    sink: Option<VoiceSink>,
}

impl std::fmt::Debug for VoiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceState")
            .field("clip", &self.clip)
            .field("channel", &self.channel)
            .field("volume", &self.volume)
            .field("pitch", &self.pitch)
            .field("looping", &self.looping)
            .field("spatial", &self.spatial)
            .field("started", &self.sink.is_some())
            .finish()
    }
}

/// Blend the emitter between the listener (flat) and its real position.
fn blended_emitter(listener: Vec3, params: &SpatialParams) -> [f32; 3] {
    listener.lerp(params.position, params.spatial_blend).to_array()
}

fn ears(listener: Vec3) -> ([f32; 3], [f32; 3]) {
    let offset = Vec3::new(EAR_OFFSET, 0.0, 0.0);
    ((listener - offset).to_array(), (listener + offset).to_array())
}

/// rodio-backed playback.
#[derive(Debug)]
pub struct RodioBackend {
    device: AudioDevice,
    clips: ClipStore,
    voices: HashMap<VoiceId, VoiceState>,
    ids: VoiceIdGenerator,
    volumes: ChannelVolumes,
    listener: Vec3,
    max_voices: usize,
}

impl RodioBackend {
    /// Open the default device with the default voice limit.
    pub fn new_default() -> AudioResult<Self> {
        Self::new(MAX_VOICES)
    }

    /// Open the default device.
    pub fn new(max_voices: usize) -> AudioResult<Self> {
        let device = AudioDevice::new()?;
        info!("Rodio backend ready ({} voices)", max_voices);

        Ok(Self {
            device,
            clips: ClipStore::new(),
            voices: HashMap::new(),
            ids: VoiceIdGenerator::new(),
            volumes: ChannelVolumes::default(),
            listener: Vec3::ZERO,
            max_voices,
        })
    }

    /// Number of existing voices (playing or not).
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn effective_volume(&self, state: &VoiceState) -> f32 {
        self.volumes.effective(&state.channel) * state.volume
    }

    fn build_sink(&self, state: &VoiceState) -> AudioResult<VoiceSink> {
        let handle = self.device.handle();
        match &state.spatial {
            Some(params) => {
                let (left, right) = ears(self.listener);
                SpatialSink::try_new(handle, blended_emitter(self.listener, params), left, right)
                    .map(VoiceSink::Spatial)
                    .map_err(|e| AudioError::DeviceInitFailed(e.to_string()))
            },
            None => Sink::try_new(handle)
                .map(VoiceSink::Flat)
                .map_err(|e| AudioError::DeviceInitFailed(e.to_string())),
        }
    }
}

impl PlaybackBackend for RodioBackend {
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
        for state in self.voices.values() {
            if state.channel == *channel {
                if let Some(sink) = &state.sink {
                    sink.set_volume(self.effective_volume(state));
                }
            }
        }
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.volumes.set_master(volume);
        for state in self.voices.values() {
            if let Some(sink) = &state.sink {
                sink.set_volume(self.effective_volume(state));
            }
        }
    }

    fn clip_duration(&self, clip: ClipId) -> AudioResult<Duration> {
        self.clips
            .get(clip)
            .map(|c| c.duration)
            .ok_or(AudioError::ClipNotLoaded(clip))
    }

    fn create_voice(&mut self, clip: ClipId, channel: &MixerChannel) -> AudioResult<VoiceId> {
        if self.clips.get(clip).is_none() {
            return Err(AudioError::ClipNotLoaded(clip));
        }
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
            VoiceState {
                clip,
                channel: channel.clone(),
                volume: 1.0,
                pitch: 1.0,
                looping: false,
                spatial: None,
                sink: None,
            },
        );
        trace!("Created voice {:?} for clip {:?}", voice, clip);
        Ok(voice)
    }

    fn set_volume(&mut self, voice: VoiceId, volume: f32) {
        let Some(state) = self.voices.get_mut(&voice) else {
            return;
        };
        state.volume = volume.clamp(0.0, 1.0);
        let state = &self.voices[&voice];
        if let Some(sink) = &state.sink {
            sink.set_volume(self.effective_volume(state));
        }
    }

    fn set_pitch(&mut self, voice: VoiceId, pitch: f32) {
        if let Some(state) = self.voices.get_mut(&voice) {
            state.pitch = pitch.clamp(0.1, 4.0);
            if let Some(sink) = &state.sink {
                sink.set_speed(state.pitch);
            }
        }
    }

    fn set_looping(&mut self, voice: VoiceId, looping: bool) {
        if let Some(state) = self.voices.get_mut(&voice) {
            if state.sink.is_some() && state.looping != looping {
                // rodio cannot change repetition of an appended source.
                trace!("Loop change on started voice {:?} applies on next play", voice);
            }
            state.looping = looping;
        }
    }

    fn set_spatial(&mut self, voice: VoiceId, params: &SpatialParams) {
        let listener = self.listener;
        if let Some(state) = self.voices.get_mut(&voice) {
            let params = params.normalized();
            if let Some(VoiceSink::Spatial(sink)) = &state.sink {
                sink.set_emitter_position(blended_emitter(listener, &params));
            }
            state.spatial = Some(params);
        }
    }

    fn play(&mut self, voice: VoiceId) {
        let Some(state) = self.voices.get(&voice) else {
            return;
        };
        let Some(clip) = self.clips.get(state.clip) else {
            warn!("Voice {:?} refers to unloaded clip {:?}", voice, state.clip);
            return;
        };

        let sink = match self.build_sink(state) {
            Ok(sink) => sink,
            Err(e) => {
                warn!("Failed to start voice {:?}: {}", voice, e);
                return;
            },
        };

        let source = SamplesBuffer::new(clip.channels, clip.sample_rate, (*clip.samples).clone());
        sink.set_volume(self.effective_volume(state));
        sink.set_speed(state.pitch);
        sink.append(source, state.looping);
        sink.play();

        debug!("Playing voice {:?} (clip {:?})", voice, state.clip);
        if let Some(state) = self.voices.get_mut(&voice) {
            // Replacing an older sink drops and silences it.
            state.sink = Some(sink);
        }
    }

    fn stop(&mut self, voice: VoiceId) {
        if let Some(state) = self.voices.get_mut(&voice) {
            if let Some(sink) = state.sink.take() {
                sink.stop();
            }
        }
    }

    fn is_playing(&self, voice: VoiceId) -> bool {
        self.voices
            .get(&voice)
            .and_then(|state| state.sink.as_ref())
            .is_some_and(VoiceSink::is_playing)
    }

    fn destroy(&mut self, voice: VoiceId) {
        if let Some(state) = self.voices.remove(&voice) {
            if let Some(sink) = state.sink {
                sink.stop();
            }
            trace!("Destroyed voice {:?}", voice);
        }
    }

    fn set_listener_position(&mut self, position: Vec3) {
        self.listener = position;
        let (left, right) = ears(position);
        for state in self.voices.values() {
            if let (Some(VoiceSink::Spatial(sink)), Some(params)) = (&state.sink, &state.spatial) {
                sink.set_left_ear_position(left);
                sink.set_right_ear_position(right);
                sink.set_emitter_position(blended_emitter(position, params));
            }
        }
    }
}
