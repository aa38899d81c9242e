//! Error types for sound playback.

use std::path::PathBuf;

use thiserror::Error;

use crate::audio_resource::ClipId;
use crate::sounds::SoundId;

/// Errors reported by the registry, the sound manager and the backends.
///
/// None of these are fatal: a failed request degrades to "nothing audible
/// happens" and the error is logged and returned to the caller.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No clip is registered for the sound, or its clip is unset.
    #[error("Sound {0} has no registered audio clip")]
    ClipNotFound(SoundId),

    /// No mixer channel is registered for the sound, or its channel is unset.
    #[error("Sound {0} has no registered mixer channel")]
    ChannelNotFound(SoundId),

    /// The registry configuration lists the same sound twice.
    #[error("Sound {0} is registered more than once")]
    DuplicateEntry(SoundId),

    /// Play parameters are not usable.
    #[error("Invalid play parameters for {sound}: {reason}")]
    InvalidParameters {
        /// Sound the request was for.
        sound: SoundId,
        /// What was wrong.
        reason: String,
    },

    /// Failed to initialize audio device.
    #[error("Failed to initialize audio device: {0}")]
    DeviceInitFailed(String),

    /// Failed to load audio file.
    #[error("Failed to load audio file '{path}': {message}")]
    LoadFailed {
        /// Path to the file that failed to load.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to decode audio data.
    #[error("Failed to decode audio: {0}")]
    DecodeFailed(String),

    /// The backend has no clip with this id.
    #[error("Audio clip not loaded: {0:?}")]
    ClipNotLoaded(ClipId),

    /// The backend has no mixer channel with this name.
    #[error("Unknown mixer channel '{0}'")]
    UnknownChannel(String),

    /// Every voice slot is in use.
    #[error("No free voices (max: {max})")]
    NoFreeVoices {
        /// Voice limit of the backend.
        max: usize,
    },
}

impl AudioError {
    /// Check if this error comes from missing or inconsistent sound wiring.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ClipNotFound(_) | Self::ChannelNotFound(_) | Self::DuplicateEntry(_)
        )
    }
}

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
