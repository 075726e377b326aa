//! Rate-limiting primitives for scroll-driven view updates.
//!
//! Two distinct contracts, kept deliberately small:
//!
//! * [`Throttle`] — leading-edge: the first call in a window executes
//!   immediately, later calls inside the window are dropped (not queued, no
//!   trailing call). Once the window elapses, the next call executes and
//!   restarts the window.
//! * [`Debounce`] — trailing-edge: every call resets a pending deadline;
//!   only the last call in a burst fires, after the burst settles.
//!
//! Both take an explicit `now: Instant` instead of reading the clock, so
//! timer behavior is deterministic and testable without sleeping. Each bound
//! handler owns its own instance; timer state is never shared.

use std::time::{Duration, Instant};

/// Leading-edge rate limiter: at most one execution per `interval`.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    window_start: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
        }
    }

    /// Ask to execute at `now`. Returns true exactly when the caller should
    /// run the wrapped work; a true return restarts the window.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.window_start {
            Some(start) if now.duration_since(start) < self.interval => false,
            _ => {
                self.window_start = Some(now);
                true
            }
        }
    }

    /// Forget the current window so the next `admit` executes immediately.
    pub fn reset(&mut self) {
        self.window_start = None;
    }
}

/// Trailing-edge rate limiter: fires `wait` after the last trigger.
#[derive(Debug)]
pub struct Debounce {
    wait: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(wait: Duration) -> Self {
        Self {
            wait,
            deadline: None,
        }
    }

    /// Record a call at `now`. A pending deadline is superseded, never queued.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.wait);
    }

    /// Fire if the quiet period has elapsed. Consumes the deadline, so a
    /// settled burst fires exactly once.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending deadline without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }
}
