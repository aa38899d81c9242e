//! Audio System
//!
//! Re-exports everything a caller needs to drive sound playback.
//!
//! # Modules
//!
//! - [`sounds`](crate::sounds): The closed set of sound identifiers
//! - [`clip_registry`](crate::clip_registry): Sound id to clip and channel wiring
//! - [`sound_manager`](crate::sound_manager): Play, stop, fade and tick
//! - [`audio_backend`](crate::audio_backend): Backend trait and rodio playback
//! - [`headless_backend`](crate::headless_backend): Deviceless playback
//!
//! # Quick Start
//!
//! ```ignore
//! use chorus_kernel::audio::*;
//!
//! let mut backend = RodioBackend::new_default()?;
//! let ui = MixerChannel::new("Ui");
//! backend.declare_channel(&ui, 1.0);
//!
//! let decoded = decode_file("assets/sounds/click.wav")?;
//! let clip = backend.load_samples(decoded.samples, decoded.sample_rate, decoded.channels, None)?;
//!
//! let registry = ClipRegistry::new([ClipEntry::new(SoundId::ButtonClick, clip, ui)])?;
//! let mut sounds = SoundManager::new(registry, backend);
//!
//! sounds.play_flat(SoundId::ButtonClick, 1.0, 1.0, false, None)?;
//!
//! // Each frame
//! sounds.tick(delta);
//! ```
//!
//! # Channels and Volume
//!
//! Every sound is routed through a named [`MixerChannel`]. The level a voice
//! is heard at is `master * channel * voice`:
//!
//! ```ignore
//! backend.set_master_volume(0.8);
//! backend.declare_channel(&MixerChannel::new("Ambient"), 0.6);
//! ```

pub use glam::Vec3;

pub use crate::audio_backend::{
    decode_bytes, decode_file, AudioDevice, DecodedAudio, PlaybackBackend, RodioBackend,
    EAR_OFFSET, MAX_VOICES,
};
pub use crate::audio_resource::{
    AudioClip, ChannelVolumes, ClipId, ClipStore, MixerChannel, SpatialParams, VoiceId,
    VoiceIdGenerator, MAX_LOADED_CLIPS,
};
pub use crate::clip_registry::{ClipEntry, ClipRegistry};
pub use crate::error::{AudioError, AudioResult};
pub use crate::fade::{FadeKind, FadeScheduler, FadeState, FadeTask};
pub use crate::headless_backend::{HeadlessBackend, HeadlessVoice};
pub use crate::playback_tracker::{PlaybackHandle, PlaybackTracker};
pub use crate::sound_manager::{PlayOutcome, PlayRequest, SoundManager};
pub use crate::sounds::SoundId;
