//! Cancel-and-reschedule timer used to coalesce bursts of events (viewport
//! resizes) into one action once input goes quiet.
//!
//! The timer never looks at the clock itself: callers pass `now`, which keeps
//! it usable from an event loop, a scripted replay, and tests alike.

use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, deadline: None }
    }

    /// (Re)arm the timer; any earlier deadline is dropped.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once per arming, on the first call at or after
    /// the deadline.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Fire immediately if armed, without waiting for the deadline.
    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}
