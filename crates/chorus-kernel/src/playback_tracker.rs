//! Loop tracking.
//!
//! The tracker remembers the live handle of every looping sound so it can be
//! stopped or faded by identifier later. Non-looping sounds expire on their
//! own and never appear here, so absence means "not loop-tracked", not
//! "silent".

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use crate::audio_backend::PlaybackBackend;
use crate::audio_resource::{MixerChannel, VoiceId};
use crate::sounds::SoundId;

/// One instantiated sound.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackHandle {
    /// Sound this handle plays.
    pub sound: SoundId,
    /// Backend voice owned by this handle.
    pub voice: VoiceId,
    /// Current volume (0.0-1.0, before channel gain).
    pub volume: f32,
    /// Whether the voice repeats.
    pub looping: bool,
    /// Channel the voice is routed through.
    pub channel: MixerChannel,
    /// Natural clip duration.
    pub duration: Duration,
}

/// Silence a handle's voice and free it on the backend.
pub(crate) fn release_voice<B: PlaybackBackend + ?Sized>(backend: &mut B, handle: &PlaybackHandle) {
    backend.set_looping(handle.voice, false);
    backend.stop(handle.voice);
    backend.destroy(handle.voice);
}

/// Sound id to looping handle table.
#[derive(Debug, Default)]
pub struct PlaybackTracker {
    handles: HashMap<SoundId, PlaybackHandle>,
}

impl PlaybackTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// De-duplication check: a handle is tracked for `sound` and the backend
    /// still reports it playing.
    pub fn is_live<B: PlaybackBackend + ?Sized>(&self, sound: SoundId, backend: &B) -> bool {
        self.handles
            .get(&sound)
            .is_some_and(|handle| backend.is_playing(handle.voice))
    }

    /// Record the handle for its sound, returning whatever was tracked before.
    pub fn track(&mut self, handle: PlaybackHandle) -> Option<PlaybackHandle> {
        trace!("Tracking {} on {:?}", handle.sound, handle.voice);
        self.handles.insert(handle.sound, handle)
    }

    /// Stop bookkeeping: remove and return the tracked handle.
    pub fn release(&mut self, sound: SoundId) -> Option<PlaybackHandle> {
        let handle = self.handles.remove(&sound);
        if let Some(handle) = &handle {
            trace!("Released {} ({:?})", sound, handle.voice);
        }
        handle
    }

    /// Get the tracked handle for a sound.
    #[must_use]
    pub fn get(&self, sound: SoundId) -> Option<&PlaybackHandle> {
        self.handles.get(&sound)
    }

    /// Get the tracked handle for a sound mutably.
    pub fn get_mut(&mut self, sound: SoundId) -> Option<&mut PlaybackHandle> {
        self.handles.get_mut(&sound)
    }

    /// Check if a sound is loop-tracked.
    #[must_use]
    pub fn contains(&self, sound: SoundId) -> bool {
        self.handles.contains_key(&sound)
    }

    /// Remove and return every tracked handle.
    pub fn drain(&mut self) -> Vec<PlaybackHandle> {
        self.handles.drain().map(|(_, handle)| handle).collect()
    }

    /// Number of tracked handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Check if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
