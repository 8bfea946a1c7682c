// Animation clocks. Each clock is an explicit value owned by whoever animates with it;
// the time itself comes from a shared `TimeSource` so tests can drive it by hand.

#[cfg(test)]
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic "now", measured from an arbitrary origin.
pub trait TimeSource {
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction.
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl TimeSource for MonotonicTime {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Time that only moves when told to.
#[cfg(test)]
#[derive(Default)]
pub struct ManualTime {
    now: Cell<Duration>,
}

#[cfg(test)]
impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, secs: f32) {
        self.now.set(self.now.get() + Duration::from_secs_f32(secs));
    }
}

#[cfg(test)]
impl TimeSource for ManualTime {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Stopwatch with per-call delta.
///
/// `start()` resets elapsed time to zero. `delta()` returns the time since the
/// previous `delta()`/`elapsed_time()` call (never negative) and accumulates it
/// into the elapsed total while running. An auto-start clock starts itself on
/// the first query.
pub struct AnimationClock {
    time: Rc<dyn TimeSource>,
    auto_start: bool,
    running: bool,
    old_time: Duration,
    elapsed: f32,
}

impl AnimationClock {
    pub fn new(time: Rc<dyn TimeSource>, auto_start: bool) -> Self {
        Self { time, auto_start, running: false, old_time: Duration::ZERO, elapsed: 0.0 }
    }

    pub fn start(&mut self) {
        self.old_time = self.time.now();
        self.elapsed = 0.0;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.elapsed_time();
        self.running = false;
        self.auto_start = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Elapsed seconds as of the last update (does not touch the clock).
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Update, then return elapsed seconds since `start()`.
    pub fn elapsed_time(&mut self) -> f32 {
        self.delta();
        self.elapsed
    }

    /// Seconds since the previous update.
    pub fn delta(&mut self) -> f32 {
        if self.auto_start && !self.running {
            self.start();
            return 0.0;
        }
        if !self.running {
            return 0.0;
        }
        let now = self.time.now();
        let diff = now.saturating_sub(self.old_time).as_secs_f32();
        self.old_time = now;
        self.elapsed += diff;
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual() -> (Rc<ManualTime>, Rc<dyn TimeSource>) {
        let t = Rc::new(ManualTime::new());
        let dyn_t: Rc<dyn TimeSource> = t.clone();
        (t, dyn_t)
    }

    #[test]
    fn stopped_clock_reports_nothing() {
        let (t, src) = manual();
        let mut c = AnimationClock::new(src, false);
        t.advance(1.0);
        assert!(!c.is_running());
        assert_eq!(c.delta(), 0.0);
        assert_eq!(c.elapsed_time(), 0.0);
    }

    #[test]
    fn auto_start_begins_on_first_query() {
        let (t, src) = manual();
        t.advance(5.0);
        let mut c = AnimationClock::new(src, true);
        assert_eq!(c.elapsed_time(), 0.0);
        assert!(c.is_running());
        t.advance(0.5);
        assert!((c.elapsed_time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn delta_measures_between_calls() {
        let (t, src) = manual();
        let mut c = AnimationClock::new(src, false);
        c.start();
        t.advance(0.25);
        assert!((c.delta() - 0.25).abs() < 1e-6);
        t.advance(0.5);
        assert!((c.delta() - 0.5).abs() < 1e-6);
        assert!((c.elapsed() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn restart_resets_elapsed() {
        let (t, src) = manual();
        let mut c = AnimationClock::new(src, false);
        c.start();
        t.advance(2.0);
        c.stop();
        assert!((c.elapsed() - 2.0).abs() < 1e-6);
        t.advance(3.0);
        c.start();
        t.advance(0.5);
        assert!((c.elapsed_time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stop_disables_auto_start() {
        let (t, src) = manual();
        let mut c = AnimationClock::new(src, true);
        c.elapsed_time();
        c.stop();
        t.advance(1.0);
        assert_eq!(c.delta(), 0.0);
        assert!(!c.is_running());
    }
}
