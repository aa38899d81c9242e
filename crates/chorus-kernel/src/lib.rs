//! # Chorus Kernel
//!
//! Sound-effect playback for interactive scenes.
//!
//! This crate provides:
//! - A closed set of sound identifiers and the registry that wires each one
//!   to a decoded clip and a mixer channel
//! - A sound manager that plays sounds flat or positioned, keeps one live
//!   instance per looping sound and releases one-shots when they finish
//! - Linear volume fades driven by a per-frame tick
//! - A rodio playback backend and a deviceless backend for tests and
//!   machines without an output device
//!
//! ## Threading
//!
//! The manager is owned by one thread and mutated through `&mut self`.
//! Time only advances in [`SoundManager::tick`], so fades and one-shot
//! releases are deterministic for a given sequence of deltas.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod audio;
pub mod audio_backend;
pub mod audio_resource;
pub mod clip_registry;
pub mod error;
pub mod fade;
pub mod headless_backend;
pub mod playback_tracker;
pub mod sound_manager;
pub mod sounds;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::audio::*;
}

pub use prelude::*;
