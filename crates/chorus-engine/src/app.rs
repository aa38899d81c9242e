//! Application lifecycle management.
//!
//! Opens a playback backend, wires the configured clips and runs a scripted
//! sound check through the sound manager until everything has gone quiet.

use std::time::Duration;

use anyhow::Result;
use chorus_kernel::audio::{
    AudioError, HeadlessBackend, PlayOutcome, PlayRequest, PlaybackBackend, RodioBackend,
    SoundId, SoundManager, SpatialParams, Vec3,
};
use tracing::{debug, info, warn};

use crate::audio_assets;
use crate::config::SoundConfig;
use crate::timing::TickTiming;

/// Hard stop for the sound check, in case a loop is never released.
const TIME_LIMIT: Duration = Duration::from_secs(30);

/// One scripted action.
#[derive(Debug, Clone)]
pub enum Cue {
    /// Play a sound.
    Play(PlayRequest),
    /// Fade a looping sound out.
    FadeOut {
        /// Sound to fade.
        sound: SoundId,
        /// Fade duration.
        duration: Duration,
    },
    /// Stop a looping sound.
    Stop(SoundId),
    /// Move the listener.
    MoveListener(Vec3),
}

/// Counts of what the script's play cues did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckStats {
    /// Voices started.
    pub started: usize,
    /// Loops already playing.
    pub skipped: usize,
    /// Plays that failed.
    pub failed: usize,
}

/// Timed cue list driven by the tick loop.
#[derive(Debug)]
pub struct SoundCheck {
    cues: Vec<(Duration, Cue)>,
    next: usize,
    elapsed: Duration,
    stats: CheckStats,
}

impl SoundCheck {
    /// Create a script from `(time, cue)` pairs.
    #[must_use]
    pub fn new(mut cues: Vec<(Duration, Cue)>) -> Self {
        cues.sort_by_key(|(at, _)| *at);
        Self {
            cues,
            next: 0,
            elapsed: Duration::ZERO,
            stats: CheckStats::default(),
        }
    }

    /// Walk through every sound: one-shots, a positioned ambience bed that
    /// fades in and out, and a flat bed that is stopped outright.
    #[must_use]
    pub fn default_script() -> Self {
        let ms = Duration::from_millis;
        let flat = |sound| Cue::Play(PlayRequest::flat(sound, 1.0, 1.0));
        let earth = PlayRequest::spatial(
            SoundId::EarthAmbience,
            SpatialParams::new(Vec3::new(4.0, 0.0, 2.0), 1.0, 0.0),
            1.0,
            0.8,
        )
        .with_looping(true)
        .with_fade_in(Some(ms(1500)));

        Self::new(vec![
            (ms(0), Cue::MoveListener(Vec3::ZERO)),
            (ms(0), flat(SoundId::ButtonHover)),
            (ms(200), flat(SoundId::ButtonClick)),
            (ms(600), flat(SoundId::CardAnimIn)),
            (ms(1200), flat(SoundId::CardAnimOut)),
            (ms(1500), Cue::Play(earth.clone())),
            (ms(2000), Cue::Play(earth)),
            (ms(2500), Cue::MoveListener(Vec3::new(2.0, 0.0, 0.0))),
            (
                ms(3000),
                Cue::Play(
                    PlayRequest::flat(SoundId::RoomAmbience, 1.0, 0.5).with_looping(true),
                ),
            ),
            (ms(3500), flat(SoundId::TableMoveUp)),
            (ms(4000), flat(SoundId::TableMoveDown)),
            (ms(4200), flat(SoundId::MarkerHover)),
            (ms(4400), flat(SoundId::GcBusClick)),
            (ms(4600), flat(SoundId::GcBusZoom)),
            (ms(5000), Cue::Stop(SoundId::RoomAmbience)),
            (
                ms(5500),
                Cue::FadeOut {
                    sound: SoundId::EarthAmbience,
                    duration: ms(2000),
                },
            ),
            (ms(6000), flat(SoundId::ExitButtonClick)),
        ])
    }

    /// Fire every cue that is due, then advance the sound manager.
    pub fn step<B: PlaybackBackend>(&mut self, delta: Duration, sounds: &mut SoundManager<B>) {
        self.elapsed += delta;

        while let Some((at, cue)) = self.cues.get(self.next) {
            if *at > self.elapsed {
                break;
            }
            let cue = cue.clone();
            self.next += 1;
            self.fire(cue, sounds);
        }

        sounds.tick(delta);

        if self.elapsed >= TIME_LIMIT && !sounds.is_idle() {
            warn!("Sound check ran past {:?}, stopping everything", TIME_LIMIT);
            sounds.stop_all();
        }
    }

    fn fire<B: PlaybackBackend>(&mut self, cue: Cue, sounds: &mut SoundManager<B>) {
        match cue {
            Cue::Play(request) => match sounds.play(request) {
                Ok(PlayOutcome::Started(_)) => self.stats.started += 1,
                Ok(PlayOutcome::Skipped) => self.stats.skipped += 1,
                Err(_) => self.stats.failed += 1,
            },
            Cue::FadeOut { sound, duration } => {
                sounds.fade_out(sound, duration);
            },
            Cue::Stop(sound) => sounds.stop(sound),
            Cue::MoveListener(position) => sounds.set_listener_position(position),
        }
    }

    /// Check if every cue has fired and nothing is left playing.
    #[must_use]
    pub fn is_done<B: PlaybackBackend>(&self, sounds: &SoundManager<B>) -> bool {
        self.next >= self.cues.len() && sounds.is_idle()
    }

    /// Play statistics so far.
    #[must_use]
    pub fn stats(&self) -> CheckStats {
        self.stats
    }

    /// Script time elapsed.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Wire the backend from config and run the sound check in real time.
fn run_with<B: PlaybackBackend>(mut backend: B, config: &SoundConfig) -> Result<()> {
    audio_assets::declare_channels(config, &mut backend);
    let (registry, report) = audio_assets::build_registry(config, &mut backend)?;
    report.log();

    let mut sounds = SoundManager::new(registry, backend);
    let mut script = SoundCheck::default_script();
    let mut timing = TickTiming::new(config.tick_rate_hz);

    info!(
        "Running sound check at {} Hz ({:?} per tick)",
        timing.tick_rate_hz(),
        timing.tick_budget()
    );
    while !script.is_done(&sounds) {
        let delta = timing.delta();
        script.step(delta, &mut sounds);
        timing.sleep_remainder();
    }

    let stats = script.stats();
    debug!("Average tick: {:.2} ms", timing.average_delta_ms());
    info!(
        "Sound check finished after {:.1}s: {} started, {} skipped, {} failed",
        script.elapsed().as_secs_f32(),
        stats.started,
        stats.skipped,
        stats.failed
    );
    Ok(())
}

/// Run the application.
pub fn run(config: SoundConfig) -> Result<()> {
    info!("Configuration loaded:");
    info!("  Master volume: {}", config.master_volume);
    info!("  Tick rate: {} Hz", config.tick_rate_hz);
    info!("  Assets: {}", config.asset_root.display());

    if config.prefer_headless {
        info!("Headless playback requested");
        return run_with(HeadlessBackend::new(), &config);
    }

    match RodioBackend::new_default() {
        Ok(backend) => run_with(backend, &config),
        Err(AudioError::DeviceInitFailed(e)) => {
            warn!("No audio device ({e}), falling back to headless playback");
            run_with(HeadlessBackend::new(), &config)
        },
        Err(e) => Err(e.into()),
    }
}
