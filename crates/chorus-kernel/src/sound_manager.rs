//! Sound Manager
//!
//! The service the rest of the application talks to. It plays sounds by
//! [`SoundId`], keeps at most one instance of each looping sound alive,
//! releases one-shots after their clip has played, and drives fades.
//!
//! # Example
//!
//! ```ignore
//! use chorus_kernel::audio::*;
//!
//! let mut sounds = SoundManager::new(registry, RodioBackend::new_default()?);
//!
//! // One-shot UI click
//! sounds.play_flat(SoundId::ButtonClick, 1.0, 1.0, false, None)?;
//!
//! // Looping ambience at a position, fading in over two seconds
//! sounds.play_spatial(
//!     SoundId::EarthAmbience,
//!     Vec3::new(0.0, 0.0, 5.0),
//!     1.0,
//!     0.8,
//!     1.0,
//!     0.0,
//!     true,
//!     Some(Duration::from_secs(2)),
//! )?;
//!
//! // Every frame
//! sounds.tick(frame_delta);
//!
//! // Later
//! sounds.fade_out(SoundId::EarthAmbience, Duration::from_secs(3));
//! ```
//!
//! Everything runs on the thread that owns the manager; `tick` is the only
//! place time advances.

use std::time::Duration;

use glam::Vec3;
use tracing::{debug, error, info, warn};

use crate::audio_backend::PlaybackBackend;
use crate::audio_resource::{SpatialParams, VoiceId};
use crate::clip_registry::ClipRegistry;
use crate::error::{AudioError, AudioResult};
use crate::fade::{FadeScheduler, FadeState, FadeTask};
use crate::playback_tracker::{release_voice, PlaybackHandle, PlaybackTracker};
use crate::sounds::SoundId;

/// Everything needed to start one sound.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest {
    /// Sound to play.
    pub sound: SoundId,
    /// Volume (0.0-1.0, before channel gain).
    pub volume: f32,
    /// Speed/pitch multiplier.
    pub pitch: f32,
    /// Positional parameters; `None` plays the sound flat.
    pub spatial: Option<SpatialParams>,
    /// Whether the sound repeats until stopped.
    pub looping: bool,
    /// Fade-in duration, if any.
    pub fade_in: Option<Duration>,
}

impl PlayRequest {
    /// Non-positional request.
    #[must_use]
    pub const fn flat(sound: SoundId, pitch: f32, volume: f32) -> Self {
        Self {
            sound,
            volume,
            pitch,
            spatial: None,
            looping: false,
            fade_in: None,
        }
    }

    /// Positional request.
    #[must_use]
    pub const fn spatial(sound: SoundId, params: SpatialParams, pitch: f32, volume: f32) -> Self {
        Self {
            sound,
            volume,
            pitch,
            spatial: Some(params),
            looping: false,
            fade_in: None,
        }
    }

    /// Set looping.
    #[must_use]
    pub const fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Set fade-in duration.
    #[must_use]
    pub const fn with_fade_in(mut self, fade_in: Option<Duration>) -> Self {
        self.fade_in = fade_in;
        self
    }

    fn validate(&self) -> AudioResult<()> {
        let invalid = |reason: &str| AudioError::InvalidParameters {
            sound: self.sound,
            reason: reason.to_string(),
        };

        if !self.volume.is_finite() {
            return Err(invalid("volume is not finite"));
        }
        if !self.pitch.is_finite() {
            return Err(invalid("pitch is not finite"));
        }
        if self.spatial.is_some_and(|params| !params.is_finite()) {
            return Err(invalid("spatial parameters are not finite"));
        }
        Ok(())
    }
}

/// Result of a play request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A new voice started.
    Started(VoiceId),
    /// The looping sound is already playing; nothing was done.
    Skipped,
}

impl PlayOutcome {
    /// The started voice, if any.
    #[must_use]
    pub const fn voice(self) -> Option<VoiceId> {
        match self {
            Self::Started(voice) => Some(voice),
            Self::Skipped => None,
        }
    }
}

/// One-shot waiting for its clip to finish.
#[derive(Debug)]
struct PendingRelease {
    sound: SoundId,
    voice: VoiceId,
    remaining: Duration,
}

/// Plays, tracks, stops and fades sound effects.
#[derive(Debug)]
pub struct SoundManager<B: PlaybackBackend> {
    registry: ClipRegistry,
    tracker: PlaybackTracker,
    fades: FadeScheduler,
    pending: Vec<PendingRelease>,
    backend: B,
}

impl<B: PlaybackBackend> SoundManager<B> {
    /// Create a manager over a built registry and a backend whose clips and
    /// channels the registry refers to.
    pub fn new(registry: ClipRegistry, backend: B) -> Self {
        let unwired = registry.unwired();
        if !unwired.is_empty() {
            warn!("Sounds without clip or channel: {:?}", unwired);
        }
        info!("Sound manager ready with {} sounds", registry.len());

        Self {
            registry,
            tracker: PlaybackTracker::new(),
            fades: FadeScheduler::new(),
            pending: Vec::new(),
            backend,
        }
    }

    // ============================================
    // Playback
    // ============================================

    /// Play a sound.
    ///
    /// A looping sound whose tracked voice is still playing is skipped.
    /// One-shots are not de-duplicated and may overlap.
    pub fn play(&mut self, request: PlayRequest) -> AudioResult<PlayOutcome> {
        if let Err(e) = request.validate() {
            error!("Rejected play request: {}", e);
            return Err(e);
        }

        if self.tracker.is_live(request.sound, &self.backend) {
            debug!("{} already playing, skipped", request.sound);
            return Ok(PlayOutcome::Skipped);
        }

        match self.start(&request) {
            Ok(voice) => Ok(PlayOutcome::Started(voice)),
            Err(e) => {
                error!("Failed to play {}: {}", request.sound, e);
                Err(e)
            },
        }
    }

    /// Play a non-positional sound.
    pub fn play_flat(
        &mut self,
        sound: SoundId,
        pitch: f32,
        volume: f32,
        looping: bool,
        fade_in: Option<Duration>,
    ) -> AudioResult<PlayOutcome> {
        self.play(
            PlayRequest::flat(sound, pitch, volume)
                .with_looping(looping)
                .with_fade_in(fade_in),
        )
    }

    /// Play a positional sound.
    pub fn play_spatial(
        &mut self,
        sound: SoundId,
        position: Vec3,
        pitch: f32,
        volume: f32,
        spatial_blend: f32,
        spread: f32,
        looping: bool,
        fade_in: Option<Duration>,
    ) -> AudioResult<PlayOutcome> {
        let params = SpatialParams::new(position, spatial_blend, spread);
        self.play(
            PlayRequest::spatial(sound, params, pitch, volume)
                .with_looping(looping)
                .with_fade_in(fade_in),
        )
    }

    fn start(&mut self, request: &PlayRequest) -> AudioResult<VoiceId> {
        let sound = request.sound;
        let clip = self.registry.lookup_clip(sound)?;
        let channel = self.registry.lookup_mixer_channel(sound)?.clone();
        let duration = self.backend.clip_duration(clip)?;

        let fade_in = match request.fade_in {
            Some(_) if !request.looping => {
                warn!("Fade-in ignored for one-shot {}", sound);
                None
            },
            fade_in => fade_in,
        };
        // Backends clamp what they play; fades must ramp over the same range.
        let volume = request.volume.clamp(0.0, 1.0);
        let initial_volume = if fade_in.is_some() { 0.0 } else { volume };

        let voice = self.backend.create_voice(clip, &channel)?;
        self.backend.set_volume(voice, initial_volume);
        self.backend.set_pitch(voice, request.pitch);
        self.backend.set_looping(voice, request.looping);
        if let Some(params) = &request.spatial {
            self.backend.set_spatial(voice, params);
        }
        self.backend.play(voice);

        if request.looping {
            let handle = PlaybackHandle {
                sound,
                voice,
                volume: initial_volume,
                looping: true,
                channel,
                duration,
            };
            if let Some(stale) = self.tracker.track(handle) {
                debug!("Replaced stale voice {:?} for {}", stale.voice, sound);
                release_voice(&mut self.backend, &stale);
            }
            if let Some(fade_in) = fade_in {
                self.fades
                    .schedule(FadeTask::fade_in(sound, volume, fade_in));
            }
        } else {
            self.pending.push(PendingRelease {
                sound,
                voice,
                remaining: duration,
            });
        }

        debug!(
            "Playing {} on {:?} (looping: {}, spatial: {})",
            sound,
            voice,
            request.looping,
            request.spatial.is_some()
        );
        Ok(voice)
    }

    // ============================================
    // Stopping and fading
    // ============================================

    /// Stop a looping sound immediately. Does nothing if it is not tracked.
    pub fn stop(&mut self, sound: SoundId) {
        if let Some(handle) = self.tracker.release(sound) {
            release_voice(&mut self.backend, &handle);
            debug!("Stopped {}", sound);
        }
    }

    /// Fade a looping sound out and release it.
    ///
    /// Returns `false` if the sound is not tracked.
    pub fn fade_out(&mut self, sound: SoundId, duration: Duration) -> bool {
        let Some(handle) = self.tracker.get(sound) else {
            debug!("Fade-out of {} ignored: not tracked", sound);
            return false;
        };
        self.fades
            .schedule(FadeTask::fade_out(sound, handle.volume, duration));
        true
    }

    /// Release every voice: tracked loops, pending one-shots and fades.
    pub fn stop_all(&mut self) {
        self.fades.clear();
        for handle in self.tracker.drain() {
            release_voice(&mut self.backend, &handle);
        }
        for pending in self.pending.drain(..) {
            self.backend.stop(pending.voice);
            self.backend.destroy(pending.voice);
        }
        info!("Stopped all sounds");
    }

    // ============================================
    // Update
    // ============================================

    /// Advance time (call each frame).
    ///
    /// Steps the backend, every fade, and releases one-shots whose clip
    /// duration has elapsed.
    pub fn tick(&mut self, delta: Duration) {
        self.backend.update(delta);

        for (sound, state) in self.fades.tick(delta, &mut self.tracker, &mut self.backend) {
            if state == FadeState::Aborted {
                debug!("Fade on {} ended early", sound);
            }
        }

        let backend = &mut self.backend;
        self.pending.retain_mut(|pending| {
            pending.remaining = pending.remaining.saturating_sub(delta);
            if !pending.remaining.is_zero() {
                return true;
            }
            backend.destroy(pending.voice);
            debug!("Released one-shot {} ({:?})", pending.sound, pending.voice);
            false
        });
    }

    // ============================================
    // Queries
    // ============================================

    /// Check if a sound is loop-tracked.
    #[must_use]
    pub fn is_tracked(&self, sound: SoundId) -> bool {
        self.tracker.contains(sound)
    }

    /// Number of loop-tracked sounds.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.tracker.len()
    }

    /// Number of one-shots waiting to be released.
    #[must_use]
    pub fn pending_release_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of running fades.
    #[must_use]
    pub fn active_fade_count(&self) -> usize {
        self.fades.len()
    }

    /// Current volume of a tracked sound.
    #[must_use]
    pub fn volume(&self, sound: SoundId) -> Option<f32> {
        self.tracker.get(sound).map(|handle| handle.volume)
    }

    /// Voice of a tracked sound.
    #[must_use]
    pub fn tracked_voice(&self, sound: SoundId) -> Option<VoiceId> {
        self.tracker.get(sound).map(|handle| handle.voice)
    }

    /// Check if nothing is playing, pending or fading.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.tracker.is_empty() && self.pending.is_empty() && self.fades.is_empty()
    }

    /// The registry.
    #[must_use]
    pub const fn registry(&self) -> &ClipRegistry {
        &self.registry
    }

    /// The backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Move the listener used by spatial sounds.
    pub fn set_listener_position(&mut self, position: Vec3) {
        self.backend.set_listener_position(position);
    }
}

impl<B: PlaybackBackend> Drop for SoundManager<B> {
    fn drop(&mut self) {
        if !self.is_idle() {
            self.stop_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_resource::MixerChannel;
    use crate::clip_registry::ClipEntry;
    use crate::headless_backend::HeadlessBackend;

    const CLICK_LEN: Duration = Duration::from_millis(500);
    const FRAME: Duration = Duration::from_millis(100);

    fn manager() -> SoundManager<HeadlessBackend> {
        let (registry, backend) = wired(HeadlessBackend::new());
        SoundManager::new(registry, backend)
    }

    fn wired(mut backend: HeadlessBackend) -> (ClipRegistry, HeadlessBackend) {
        let ui = MixerChannel::new("Ui");
        let ambient = MixerChannel::new("Ambient");
        backend.declare_channel(&ui, 1.0);
        backend.declare_channel(&ambient, 1.0);

        let click = backend.load_silent(CLICK_LEN).expect("click clip");
        let earth = backend.load_silent(Duration::from_secs(4)).expect("earth clip");
        let room = backend.load_silent(Duration::from_secs(6)).expect("room clip");

        let registry = ClipRegistry::new([
            ClipEntry::new(SoundId::ButtonClick, click, ui.clone()),
            ClipEntry::new(SoundId::EarthAmbience, earth, ambient.clone()),
            ClipEntry::new(SoundId::RoomAmbience, room, ambient),
            ClipEntry {
                sound: SoundId::CardAnimIn,
                clip: Some(click),
                channel: None,
            },
            ClipEntry::unwired(SoundId::GcBusZoom),
        ])
        .expect("registry");

        (registry, backend)
    }

    fn started(outcome: AudioResult<PlayOutcome>) -> VoiceId {
        match outcome {
            Ok(PlayOutcome::Started(voice)) => voice,
            other => panic!("expected a started voice, got {other:?}"),
        }
    }

    fn voice_volume(sounds: &SoundManager<HeadlessBackend>, voice: VoiceId) -> f32 {
        sounds.backend().voice(voice).map_or(f32::NAN, |v| v.volume)
    }

    #[test]
    fn test_unregistered_sound_is_configuration_error() {
        let mut sounds = manager();

        for sound in [SoundId::TableMoveUp, SoundId::GcBusZoom] {
            let err = sounds
                .play_flat(sound, 1.0, 1.0, false, None)
                .expect_err("should fail");
            assert!(err.is_configuration());
        }
        assert!(matches!(
            sounds.play_flat(SoundId::CardAnimIn, 1.0, 1.0, true, None),
            Err(AudioError::ChannelNotFound(SoundId::CardAnimIn))
        ));
        assert_eq!(sounds.backend().created_count(), 0);
        assert!(sounds.is_idle());
    }

    #[test]
    fn test_invalid_parameters_create_nothing() {
        let mut sounds = manager();

        let err = sounds
            .play_flat(SoundId::ButtonClick, 1.0, f32::NAN, false, None)
            .expect_err("should fail");
        assert!(matches!(err, AudioError::InvalidParameters { .. }));

        let err = sounds
            .play_spatial(
                SoundId::EarthAmbience,
                Vec3::new(f32::INFINITY, 0.0, 0.0),
                1.0,
                1.0,
                1.0,
                0.0,
                true,
                None,
            )
            .expect_err("should fail");
        assert!(!err.is_configuration());
        assert_eq!(sounds.backend().created_count(), 0);
    }

    #[test]
    fn test_looping_sound_is_deduplicated() {
        let mut sounds = manager();

        let voice = started(sounds.play_flat(SoundId::RoomAmbience, 1.0, 0.7, true, None));
        let second = sounds
            .play_flat(SoundId::RoomAmbience, 1.0, 0.7, true, None)
            .expect("should not fail");

        assert_eq!(second, PlayOutcome::Skipped);
        assert_eq!(second.voice(), None);
        assert_eq!(sounds.backend().voice_count(), 1);
        assert_eq!(sounds.tracked_voice(SoundId::RoomAmbience), Some(voice));
    }

    #[test]
    fn test_one_shots_overlap() {
        let mut sounds = manager();

        let first = started(sounds.play_flat(SoundId::ButtonClick, 1.0, 1.0, false, None));
        let second = started(sounds.play_flat(SoundId::ButtonClick, 1.0, 1.0, false, None));

        assert_ne!(first, second);
        assert_eq!(sounds.backend().voice_count(), 2);
        assert!(!sounds.is_tracked(SoundId::ButtonClick));
        assert_eq!(sounds.pending_release_count(), 2);
    }

    #[test]
    fn test_stop_untracked_is_noop() {
        let mut sounds = manager();
        let click = started(sounds.play_flat(SoundId::ButtonClick, 1.0, 1.0, false, None));

        sounds.stop(SoundId::EarthAmbience);
        sounds.stop(SoundId::ButtonClick);

        assert_eq!(sounds.backend().created_count(), 1);
        assert_eq!(sounds.backend().destroyed_count(), 0);
        assert!(sounds.backend().is_playing(click));
    }

    #[test]
    fn test_one_shot_released_after_clip_duration() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(SoundId::ButtonClick, 1.0, 1.0, false, None));
        assert!(!sounds.is_tracked(SoundId::ButtonClick));

        for _ in 0..4 {
            sounds.tick(FRAME);
        }
        assert!(sounds.backend().exists(voice));

        sounds.tick(FRAME);
        assert!(!sounds.backend().exists(voice));
        assert!(!sounds.is_tracked(SoundId::ButtonClick));
        assert!(sounds.is_idle());
    }

    #[test]
    fn test_spatial_loop_then_stop() {
        let mut sounds = manager();
        let voice = started(sounds.play_spatial(
            SoundId::EarthAmbience,
            Vec3::ZERO,
            1.0,
            0.8,
            1.0,
            0.0,
            true,
            None,
        ));

        let simulated = sounds.backend().voice(voice).expect("voice").clone();
        assert!(simulated.looping);
        assert_eq!(
            simulated.spatial,
            Some(SpatialParams::new(Vec3::ZERO, 1.0, 0.0))
        );
        assert!(sounds.is_tracked(SoundId::EarthAmbience));

        sounds.stop(SoundId::EarthAmbience);

        assert!(!sounds.is_tracked(SoundId::EarthAmbience));
        assert!(!sounds.backend().is_playing(voice));
        assert!(!sounds.backend().exists(voice));
    }

    #[test]
    fn test_flat_play_has_no_spatial_params() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(SoundId::RoomAmbience, 1.2, 0.5, true, None));
        let simulated = sounds.backend().voice(voice).expect("voice");
        assert!(simulated.spatial.is_none());
        assert!((simulated.pitch - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_looping_voice_outlives_clip_duration() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(SoundId::EarthAmbience, 1.0, 1.0, true, None));

        for _ in 0..100 {
            sounds.tick(FRAME);
        }
        assert!(sounds.backend().is_playing(voice));
        assert!(sounds.is_tracked(SoundId::EarthAmbience));
    }

    #[test]
    fn test_fade_in() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(
            SoundId::RoomAmbience,
            1.0,
            0.8,
            true,
            Some(Duration::from_secs(2)),
        ));
        assert!(voice_volume(&sounds, voice).abs() < f32::EPSILON);
        assert_eq!(sounds.active_fade_count(), 1);

        for _ in 0..5 {
            sounds.tick(FRAME);
        }
        assert!((voice_volume(&sounds, voice) - 0.2).abs() < 1e-4);
        assert!((sounds.volume(SoundId::RoomAmbience).expect("tracked") - 0.2).abs() < 1e-4);

        for _ in 0..15 {
            sounds.tick(FRAME);
        }
        assert_eq!(sounds.active_fade_count(), 0);
        assert!((voice_volume(&sounds, voice) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_fade_in_ignored_for_one_shot() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(
            SoundId::ButtonClick,
            1.0,
            0.6,
            false,
            Some(Duration::from_secs(1)),
        ));
        assert_eq!(sounds.active_fade_count(), 0);
        assert!((voice_volume(&sounds, voice) - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fade_out_releases_sound() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(SoundId::EarthAmbience, 1.0, 0.8, true, None));

        assert!(sounds.fade_out(SoundId::EarthAmbience, Duration::from_secs(1)));
        for _ in 0..5 {
            sounds.tick(FRAME);
        }
        assert!((voice_volume(&sounds, voice) - 0.4).abs() < 1e-4);
        assert!(sounds.is_tracked(SoundId::EarthAmbience));

        for _ in 0..5 {
            sounds.tick(FRAME);
        }
        assert!(!sounds.is_tracked(SoundId::EarthAmbience));
        assert!(!sounds.backend().exists(voice));
        assert!(sounds.is_idle());
    }

    #[test]
    fn test_stop_during_fade_out() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(SoundId::EarthAmbience, 1.0, 0.8, true, None));
        sounds.fade_out(SoundId::EarthAmbience, Duration::from_secs(1));
        sounds.tick(FRAME);
        sounds.tick(FRAME);

        sounds.stop(SoundId::EarthAmbience);
        assert!(!sounds.backend().exists(voice));
        assert!(!sounds.is_tracked(SoundId::EarthAmbience));
        assert_eq!(sounds.active_fade_count(), 1);

        sounds.tick(FRAME);
        assert_eq!(sounds.active_fade_count(), 0);
        assert_eq!(sounds.backend().destroyed_count(), 1);
    }

    #[test]
    fn test_stop_during_fade_in() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(
            SoundId::RoomAmbience,
            1.0,
            1.0,
            true,
            Some(Duration::from_secs(1)),
        ));
        sounds.tick(FRAME);
        sounds.tick(FRAME);

        sounds.stop(SoundId::RoomAmbience);
        assert!(!sounds.backend().exists(voice));

        sounds.tick(FRAME);
        assert_eq!(sounds.active_fade_count(), 0);
        assert!(sounds.is_idle());

        // A later play is not touched by the old fade.
        let again = started(sounds.play_flat(SoundId::RoomAmbience, 1.0, 0.6, true, None));
        sounds.tick(FRAME);
        assert!((voice_volume(&sounds, again) - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fade_out_during_fade_in() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(
            SoundId::RoomAmbience,
            1.0,
            1.0,
            true,
            Some(Duration::from_secs(1)),
        ));
        for _ in 0..5 {
            sounds.tick(FRAME);
        }
        assert!((voice_volume(&sounds, voice) - 0.5).abs() < 1e-4);

        // Fade out from 0.5 over 1s while the fade-in still has 0.5s left.
        assert!(sounds.fade_out(SoundId::RoomAmbience, Duration::from_secs(1)));
        assert_eq!(sounds.active_fade_count(), 2);

        sounds.tick(FRAME);
        assert!((voice_volume(&sounds, voice) - 0.45).abs() < 1e-4);

        for _ in 0..4 {
            sounds.tick(FRAME);
        }
        // The fade-in completed this tick and the fade-out wrote after it.
        assert_eq!(sounds.active_fade_count(), 1);
        assert!((voice_volume(&sounds, voice) - 0.25).abs() < 1e-4);

        for _ in 0..5 {
            sounds.tick(FRAME);
        }
        assert!(!sounds.is_tracked(SoundId::RoomAmbience));
        assert!(!sounds.backend().exists(voice));
        assert!(sounds.is_idle());
    }

    #[test]
    fn test_out_of_range_volume_fades_linearly() {
        let mut sounds = manager();
        let voice = started(sounds.play_flat(SoundId::RoomAmbience, 1.0, 2.0, true, None));
        assert_eq!(sounds.volume(SoundId::RoomAmbience), Some(1.0));

        sounds.fade_out(SoundId::RoomAmbience, Duration::from_secs(1));
        for _ in 0..5 {
            sounds.tick(FRAME);
        }
        assert!((voice_volume(&sounds, voice) - 0.5).abs() < 1e-4);

        let faded_in = started(sounds.play_flat(
            SoundId::EarthAmbience,
            1.0,
            1.5,
            true,
            Some(Duration::from_secs(1)),
        ));
        for _ in 0..5 {
            sounds.tick(FRAME);
        }
        assert!((voice_volume(&sounds, faded_in) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_no_free_voices() {
        let (registry, backend) = wired(HeadlessBackend::with_max_voices(1));
        let mut sounds = SoundManager::new(registry, backend);
        started(sounds.play_flat(SoundId::ButtonClick, 1.0, 1.0, false, None));

        let err = sounds
            .play_flat(SoundId::RoomAmbience, 1.0, 1.0, true, None)
            .expect_err("should fail");
        assert!(matches!(err, AudioError::NoFreeVoices { max: 1 }));
        assert!(!err.is_configuration());
        assert!(!sounds.is_tracked(SoundId::RoomAmbience));
    }

    #[test]
    fn test_drop_releases_every_voice() {
        let (registry, mut backend) = wired(HeadlessBackend::new());
        {
            let mut sounds = SoundManager::new(registry, &mut backend);
            started(sounds.play_flat(SoundId::RoomAmbience, 1.0, 1.0, true, Some(FRAME)));
            started(sounds.play_flat(SoundId::EarthAmbience, 1.0, 1.0, true, None));
            started(sounds.play_flat(SoundId::ButtonClick, 1.0, 1.0, false, None));
            assert!(!sounds.is_idle());
        }

        assert_eq!(backend.created_count(), 3);
        assert_eq!(backend.destroyed_count(), 3);
        assert_eq!(backend.voice_count(), 0);
    }

    #[test]
    fn test_fade_out_untracked_returns_false() {
        let mut sounds = manager();
        assert!(!sounds.fade_out(SoundId::RoomAmbience, Duration::from_secs(1)));
        assert_eq!(sounds.active_fade_count(), 0);
    }

    #[test]
    fn test_stale_loop_entry_is_replaced() {
        let mut sounds = manager();
        let first = started(sounds.play_flat(SoundId::RoomAmbience, 1.0, 1.0, true, None));

        // The voice went silent without a stop() call.
        sounds.backend_mut().stop(first);

        let second = started(sounds.play_flat(SoundId::RoomAmbience, 1.0, 1.0, true, None));
        assert_ne!(first, second);
        assert_eq!(sounds.tracked_voice(SoundId::RoomAmbience), Some(second));
        assert!(!sounds.backend().exists(first));
        assert_eq!(sounds.backend().voice_count(), 1);
    }

    #[test]
    fn test_replay_after_stop() {
        let mut sounds = manager();
        started(sounds.play_flat(SoundId::RoomAmbience, 1.0, 1.0, true, None));
        sounds.stop(SoundId::RoomAmbience);

        let again = sounds
            .play_flat(SoundId::RoomAmbience, 1.0, 1.0, true, None)
            .expect("should play");
        assert!(matches!(again, PlayOutcome::Started(_)));
    }

    #[test]
    fn test_stop_all() {
        let mut sounds = manager();
        started(sounds.play_flat(SoundId::RoomAmbience, 1.0, 1.0, true, Some(FRAME)));
        started(sounds.play_flat(SoundId::EarthAmbience, 1.0, 1.0, true, None));
        started(sounds.play_flat(SoundId::ButtonClick, 1.0, 1.0, false, None));

        sounds.stop_all();

        assert!(sounds.is_idle());
        assert_eq!(sounds.backend().voice_count(), 0);
        assert_eq!(sounds.backend().destroyed_count(), 3);
    }

    #[test]
    fn test_listener_forwarded() {
        let mut sounds = manager();
        sounds.set_listener_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(sounds.backend().listener(), Vec3::new(1.0, 2.0, 3.0));
    }
}
