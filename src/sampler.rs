//! Fixed-cadence tick pacing.

use std::thread;
use std::time::{Duration, Instant};

/// Paces sampling ticks with deadline scheduling
///
/// A late tick moves the next deadline forward from now instead of firing a
/// burst of back-to-back ticks to catch up.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: Duration,
    next_deadline: Option<Instant>,
}

impl FrameSampler {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_deadline: None,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the next tick is due and return its timestamp
    pub fn wait(&mut self) -> Instant {
        if let Some(deadline) = self.next_deadline {
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
        }
        let now = Instant::now();
        self.schedule_after(now);
        now
    }

    /// Whether a tick is due at `now`, scheduling the following one if so
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_deadline {
            Some(deadline) if now < deadline => false,
            _ => {
                self.schedule_after(now);
                true
            }
        }
    }

    /// Forget the schedule; the next tick fires immediately
    pub fn reset(&mut self) {
        self.next_deadline = None;
    }

    fn schedule_after(&mut self, now: Instant) {
        let next = match self.next_deadline {
            Some(deadline) if deadline + self.interval > now => deadline + self.interval,
            _ => now + self.interval,
        };
        self.next_deadline = Some(next);
    }
}
