//! Time sources for the frame loop.
//!
//! [`Clock`] measures wall time from the moment it was created and works in
//! the browser as well. [`ManualClock`] only moves when told to, which makes
//! animation and frame-loop tests deterministic.

use std::{cell::Cell, rc::Rc, time::Duration};

/// Monotonic elapsed time since start. Never reset.
pub trait TimeSource {
    fn elapsed(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct Clock {
    start: instant::Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            start: instant::Instant::now(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

impl TimeSource for Clock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clones share the same reading.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Moving backwards is ignored.
    pub fn set(&self, to: Duration) {
        if to >= self.now.get() {
            self.now.set(to);
        }
    }
}

impl TimeSource for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_and_monotonic() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(Duration::from_millis(250));
        assert_eq!(clock.elapsed(), Duration::from_millis(250));
        handle.set(Duration::from_millis(100));
        assert_eq!(clock.elapsed(), Duration::from_millis(250));
        handle.set(Duration::from_secs(2));
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn wall_clock_never_goes_backwards() {
        let clock = Clock::start();
        let first = clock.elapsed();
        let second = clock.elapsed();
        assert!(second >= first);
    }
}
