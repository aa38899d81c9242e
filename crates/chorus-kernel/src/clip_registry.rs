//! Sound-to-clip registry.
//!
//! Maps every [`SoundId`] to the clip it plays and the mixer channel it is
//! routed through. Built once at startup from an ordered list of entries and
//! read-only afterwards.

use std::collections::HashMap;

use tracing::{debug, error};

use crate::audio_resource::{ClipId, MixerChannel};
use crate::error::{AudioError, AudioResult};
use crate::sounds::SoundId;

/// One registry entry.
///
/// The clip and the channel may be unset for sounds that are declared but
/// not wired up yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipEntry {
    /// Sound this entry describes.
    pub sound: SoundId,
    /// Loaded clip, if any.
    pub clip: Option<ClipId>,
    /// Output channel, if any.
    pub channel: Option<MixerChannel>,
}

impl ClipEntry {
    /// Create a fully wired entry.
    #[must_use]
    pub fn new(sound: SoundId, clip: ClipId, channel: MixerChannel) -> Self {
        Self {
            sound,
            clip: Some(clip),
            channel: Some(channel),
        }
    }

    /// Create an entry with neither clip nor channel.
    #[must_use]
    pub const fn unwired(sound: SoundId) -> Self {
        Self {
            sound,
            clip: None,
            channel: None,
        }
    }

    /// Check if both clip and channel are set.
    #[must_use]
    pub const fn is_wired(&self) -> bool {
        self.clip.is_some() && self.channel.is_some()
    }
}

/// Read-only sound registry.
#[derive(Debug, Clone, Default)]
pub struct ClipRegistry {
    entries: HashMap<SoundId, ClipEntry>,
}

impl ClipRegistry {
    /// Build the registry from an ordered list of entries.
    ///
    /// Fails on the first sound that appears twice.
    pub fn new(entries: impl IntoIterator<Item = ClipEntry>) -> AudioResult<Self> {
        let mut map = HashMap::new();
        for entry in entries {
            let sound = entry.sound;
            if map.insert(sound, entry).is_some() {
                error!("Duplicate registry entry for {}", sound);
                return Err(AudioError::DuplicateEntry(sound));
            }
        }

        debug!("Built clip registry with {} entries", map.len());
        Ok(Self { entries: map })
    }

    /// Look up the clip for a sound.
    pub fn lookup_clip(&self, sound: SoundId) -> AudioResult<ClipId> {
        self.entries
            .get(&sound)
            .and_then(|entry| entry.clip)
            .ok_or(AudioError::ClipNotFound(sound))
    }

    /// Look up the mixer channel for a sound.
    pub fn lookup_mixer_channel(&self, sound: SoundId) -> AudioResult<&MixerChannel> {
        self.entries
            .get(&sound)
            .and_then(|entry| entry.channel.as_ref())
            .ok_or(AudioError::ChannelNotFound(sound))
    }

    /// Check if a sound has an entry (wired or not).
    #[must_use]
    pub fn contains(&self, sound: SoundId) -> bool {
        self.entries.contains_key(&sound)
    }

    /// Sounds that have an entry but are missing a clip or a channel.
    #[must_use]
    pub fn unwired(&self) -> Vec<SoundId> {
        let mut sounds: Vec<_> = self
            .entries
            .values()
            .filter(|entry| !entry.is_wired())
            .map(|entry| entry.sound)
            .collect();
        sounds.sort();
        sounds
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
