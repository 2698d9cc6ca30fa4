//! Pause-aware running-duration bookkeeping.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Tracks how long the search has actually been running.
///
/// Invariant: [`current`](Stopwatch::current) equals the accumulated
/// total while paused, and the accumulated total plus the time since the
/// last resume while running. Mutated only by the session commands and
/// by the controller when the worker ends.
#[derive(Debug, Default)]
pub struct Stopwatch {
    inner: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    accumulated: Duration,
    resumed_at: Option<Instant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to zero and begin running.
    pub fn start(&self) {
        let mut state = self.lock();
        state.accumulated = Duration::ZERO;
        state.resumed_at = Some(Instant::now());
    }

    /// Fold the current running interval into the total and stop
    /// counting. No effect when already paused.
    pub fn pause(&self) {
        let mut state = self.lock();
        if let Some(resumed_at) = state.resumed_at.take() {
            state.accumulated += resumed_at.elapsed();
        }
    }

    /// Begin a new running interval. No effect when already running, so
    /// a resume while running never double-counts.
    pub fn resume(&self) {
        let mut state = self.lock();
        if state.resumed_at.is_none() {
            state.resumed_at = Some(Instant::now());
        }
    }

    /// Total running time so far.
    pub fn current(&self) -> Duration {
        let state = self.lock();
        match state.resumed_at {
            Some(resumed_at) => state.accumulated + resumed_at.elapsed(),
            None => state.accumulated,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_zero_before_start() {
        let watch = Stopwatch::new();
        assert_eq!(watch.current(), Duration::ZERO);
    }

    #[test]
    fn test_grows_while_running() {
        let watch = Stopwatch::new();
        watch.start();
        sleep(Duration::from_millis(20));
        let first = watch.current();
        sleep(Duration::from_millis(20));
        let second = watch.current();

        assert!(first >= Duration::from_millis(20));
        assert!(second > first);
    }

    #[test]
    fn test_constant_while_paused() {
        let watch = Stopwatch::new();
        watch.start();
        sleep(Duration::from_millis(20));
        watch.pause();

        let frozen = watch.current();
        sleep(Duration::from_millis(30));
        assert_eq!(watch.current(), frozen);

        watch.resume();
        sleep(Duration::from_millis(20));
        assert!(watch.current() > frozen);
    }

    #[test]
    fn test_resume_while_running_does_not_double_count() {
        let watch = Stopwatch::new();
        watch.start();
        sleep(Duration::from_millis(20));
        watch.resume();
        watch.pause();

        // one interval, counted once
        let total = watch.current();
        assert!(total >= Duration::from_millis(20));
        assert!(total < Duration::from_millis(500));
    }

    #[test]
    fn test_start_resets_accumulated_time() {
        let watch = Stopwatch::new();
        watch.start();
        sleep(Duration::from_millis(20));
        watch.pause();

        watch.start();
        assert!(watch.current() < Duration::from_millis(20));
    }
}
