//! Game-time bookkeeping for the tactical loop.
//!
//! The tactical layer runs on its own cadence, independent of the frame rate and of the
//! faster movement loop. Time is game time fed in by the host, never wall-clock time, so
//! the same sequence of `advance` calls always produces the same ticks.

/// Fixed-cadence scheduler for tactical ticks.
#[derive(Debug, Clone)]
pub struct TickClock {
    /// Interval between tactical ticks in seconds.
    interval: f32,
    /// Game time accumulated since the last tick.
    accumulator: f32,
    /// Total game time seen by the clock.
    elapsed: f32,
    /// Number of ticks fired so far.
    tick_count: u64,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl TickClock {
    /// Create a clock that fires every `interval` seconds of game time.
    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(f32::EPSILON),
            accumulator: 0.0,
            elapsed: 0.0,
            tick_count: 0,
        }
    }

    /// Feed `dt` seconds of game time. Returns true when a tick is due and consumes it.
    ///
    /// At most one tick fires per call; a backlog longer than one interval is dropped so a
    /// long frame never causes a burst of catch-up ticks.
    pub fn advance(&mut self, dt: f32) -> bool {
        let dt = dt.max(0.0);
        self.elapsed += dt;
        self.accumulator += dt;
        if self.accumulator < self.interval {
            return false;
        }
        let skipped = (self.accumulator / self.interval) as u64 - 1;
        if skipped > 0 {
            log::debug!("tactical clock dropped {} backlogged ticks", skipped);
        }
        self.accumulator %= self.interval;
        self.tick_count += 1;
        true
    }

    /// Fire a tick immediately without consuming accumulated time.
    pub fn force_tick(&mut self) {
        self.tick_count += 1;
    }

    /// Total game time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed
    }

    /// Number of ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Tick interval in seconds.
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Change the tick interval in seconds.
    pub fn set_interval(&mut self, interval: f32) {
        self.interval = interval.max(f32::EPSILON);
    }
}
