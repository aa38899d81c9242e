//! Tick timing.
//!
//! Measures the real time between update ticks and paces the loop to the
//! configured tick rate.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Longest delta handed to the sound manager in one tick.
const MAX_DELTA: Duration = Duration::from_millis(250);

/// Number of recent deltas kept for averaging.
const MAX_SAMPLES: usize = 120;

/// Tick pacing and delta measurement.
#[derive(Debug)]
pub struct TickTiming {
    /// Ticks per second
    tick_rate_hz: u32,
    /// Time budget per tick
    tick_budget: Duration,
    /// Start of the current tick
    last_tick: Instant,
    /// Recent deltas for averaging
    deltas: VecDeque<Duration>,
}

impl Default for TickTiming {
    fn default() -> Self {
        Self::new(60)
    }
}

impl TickTiming {
    /// Create a tick timer for the given rate.
    #[must_use]
    pub fn new(tick_rate_hz: u32) -> Self {
        let tick_rate_hz = tick_rate_hz.max(1);
        Self {
            tick_rate_hz,
            tick_budget: Duration::from_secs_f64(1.0 / f64::from(tick_rate_hz)),
            last_tick: Instant::now(),
            deltas: VecDeque::with_capacity(MAX_SAMPLES),
        }
    }

    /// Time since the previous call, clamped so a stall does not skip
    /// through fades in a single step.
    pub fn delta(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        self.record(delta)
    }

    fn record(&mut self, delta: Duration) -> Duration {
        let delta = delta.min(MAX_DELTA);
        self.deltas.push_back(delta);
        if self.deltas.len() > MAX_SAMPLES {
            self.deltas.pop_front();
        }
        delta
    }

    /// Sleep for whatever is left of the current tick budget.
    pub fn sleep_remainder(&self) {
        let elapsed = self.last_tick.elapsed();
        if elapsed < self.tick_budget {
            std::thread::sleep(self.tick_budget - elapsed);
        }
    }

    /// Average of recent deltas in milliseconds.
    #[must_use]
    pub fn average_delta_ms(&self) -> f32 {
        if self.deltas.is_empty() {
            return 0.0;
        }

        let total: Duration = self.deltas.iter().sum();
        total.as_secs_f32() * 1000.0 / self.deltas.len() as f32
    }

    /// Ticks per second.
    #[must_use]
    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    /// Time budget per tick.
    #[must_use]
    pub fn tick_budget(&self) -> Duration {
        self.tick_budget
    }
}
