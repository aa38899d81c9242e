//! Volume fades.
//!
//! A fade is a small state machine stepped once per tick. It never holds on
//! to a handle between steps: every step looks the sound up in the tracker
//! again, and a missing entry (the sound was stopped meanwhile) ends the
//! fade as [`FadeState::Aborted`].
//!
//! Fade-outs that run to completion release the tracked handle; an aborted
//! fade leaves everything as it found it.

use std::time::Duration;

use tracing::debug;

use crate::audio_backend::PlaybackBackend;
use crate::playback_tracker::{release_voice, PlaybackTracker};
use crate::sounds::SoundId;

/// Direction and endpoints of a fade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeKind {
    /// Ramp from silence up to `target`.
    In {
        /// Volume reached at the end of the fade.
        target: f32,
    },
    /// Ramp from `from` down to silence, then release the sound.
    Out {
        /// Volume at the start of the fade.
        from: f32,
    },
}

impl FadeKind {
    const fn endpoints(self) -> (f32, f32) {
        match self {
            Self::In { target } => (0.0, target),
            Self::Out { from } => (from, 0.0),
        }
    }
}

/// Fade task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    /// Still ramping.
    Running,
    /// Reached its end volume.
    Completed,
    /// Its sound was no longer tracked.
    Aborted,
}

/// A single fade.
#[derive(Debug, Clone)]
pub struct FadeTask {
    sound: SoundId,
    kind: FadeKind,
    duration: Duration,
    elapsed: Duration,
    state: FadeState,
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t.clamp(0.0, 1.0)
}

impl FadeTask {
    /// Fade a tracked sound in from silence to `target`.
    #[must_use]
    pub fn fade_in(sound: SoundId, target: f32, duration: Duration) -> Self {
        Self::new(sound, FadeKind::In { target }, duration)
    }

    /// Fade a tracked sound out from `from` to silence.
    #[must_use]
    pub fn fade_out(sound: SoundId, from: f32, duration: Duration) -> Self {
        Self::new(sound, FadeKind::Out { from }, duration)
    }

    fn new(sound: SoundId, kind: FadeKind, duration: Duration) -> Self {
        Self {
            sound,
            kind,
            duration,
            elapsed: Duration::ZERO,
            state: FadeState::Running,
        }
    }

    /// Sound the fade targets.
    #[must_use]
    pub const fn sound(&self) -> SoundId {
        self.sound
    }

    /// Fade direction.
    #[must_use]
    pub const fn kind(&self) -> FadeKind {
        self.kind
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> FadeState {
        self.state
    }

    /// Time since the fade started.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Fraction of the fade done, 0.0-1.0.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    /// Volume the fade prescribes at its current progress.
    #[must_use]
    pub fn volume(&self) -> f32 {
        let (from, to) = self.kind.endpoints();
        lerp(from, to, self.progress())
    }

    /// Advance the fade by `delta` and apply the new volume.
    pub fn step<B: PlaybackBackend + ?Sized>(
        &mut self,
        delta: Duration,
        tracker: &mut PlaybackTracker,
        backend: &mut B,
    ) -> FadeState {
        if self.state != FadeState::Running {
            return self.state;
        }

        self.elapsed += delta;

        let Some(handle) = tracker.get_mut(self.sound) else {
            debug!("Fade on {} aborted: sound no longer tracked", self.sound);
            self.state = FadeState::Aborted;
            return self.state;
        };

        // Completion lands exactly on the end volume.
        let volume = self.volume();
        handle.volume = volume;
        backend.set_volume(handle.voice, volume);

        if self.elapsed >= self.duration {
            self.state = FadeState::Completed;
            if matches!(self.kind, FadeKind::Out { .. }) {
                if let Some(handle) = tracker.release(self.sound) {
                    release_voice(backend, &handle);
                    debug!("Faded out and released {}", self.sound);
                }
            }
        }

        self.state
    }
}

/// Runs every active fade once per tick.
#[derive(Debug, Default)]
pub struct FadeScheduler {
    tasks: Vec<FadeTask>,
}

impl FadeScheduler {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fade. Fades on the same sound all run; the one scheduled
    /// last writes the volume last in each tick.
    pub fn schedule(&mut self, task: FadeTask) {
        debug!(
            "Scheduled {:?} on {} over {:?}",
            task.kind, task.sound, task.duration
        );
        self.tasks.push(task);
    }

    /// Step every fade and drop the finished ones.
    ///
    /// Returns the sounds whose fades finished this tick with their final
    /// state.
    pub fn tick<B: PlaybackBackend + ?Sized>(
        &mut self,
        delta: Duration,
        tracker: &mut PlaybackTracker,
        backend: &mut B,
    ) -> Vec<(SoundId, FadeState)> {
        let mut finished = Vec::new();
        for task in &mut self.tasks {
            let state = task.step(delta, tracker, backend);
            if state != FadeState::Running {
                finished.push((task.sound, state));
            }
        }
        self.tasks.retain(|task| task.state == FadeState::Running);
        finished
    }

    /// Drop every fade without touching volumes.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Number of running fades.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if no fade is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
