//! Frame timing.

use std::time::Instant;

/// Monotonic clock that hands out per-frame delta times.
///
/// The render loop calls [`FrameClock::tick`] once per iteration and passes
/// the returned delta to the user's frame callback.
pub struct FrameClock {
    started: Instant,
    last_tick: Instant,
}

impl FrameClock {
    /// Creates a clock whose first tick measures from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last_tick: now,
        }
    }

    /// Returns the seconds elapsed since the previous tick and restarts
    /// the interval.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;
        delta
    }

    /// Seconds since the clock was created.
    pub fn elapsed_secs(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_tick_is_non_negative() {
        let mut clock = FrameClock::new();
        assert!(clock.tick() >= 0.0);
    }

    #[test]
    fn test_tick_measures_interval() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(10));
        let delta = clock.tick();
        assert!(delta >= 0.009, "expected at least ~10ms, got {delta}");
    }

    #[test]
    fn test_tick_resets_interval() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(5));
        let first = clock.tick();
        let second = clock.tick();
        assert!(second <= first);
    }

    #[test]
    fn test_elapsed_accumulates() {
        let clock = FrameClock::new();
        thread::sleep(Duration::from_millis(5));
        assert!(clock.elapsed_secs() >= 0.004);
    }
}
