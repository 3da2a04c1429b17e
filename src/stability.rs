//! Stability tracking over recent face positions.
//!
//! The tracker keeps a time-bounded history of face centers and reports the
//! subject as holding still once enough samples agree within a pixel threshold.

use crate::config::{StabilityBaseline, StabilityConfig};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// One observed face center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub x: f64,
    pub y: f64,
    /// Face box width, used to catch leaning in or out
    pub width: f64,
    pub at: Instant,
}

/// Largest deviation of the retained samples from the baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub dx: f64,
    pub dy: f64,
    /// Width deviation; zero for the mean baseline
    pub dwidth: f64,
}

impl Spread {
    /// Largest component
    #[must_use]
    pub fn max(&self) -> f64 {
        self.dx.max(self.dy).max(self.dwidth)
    }
}

/// Time-windowed stillness detector
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    window: Duration,
    min_samples: usize,
    capacity: usize,
    max_deviation: f64,
    baseline: StabilityBaseline,
    history: VecDeque<PositionSample>,
}

impl Default for StabilityTracker {
    fn default() -> Self {
        Self::new(&StabilityConfig::default())
    }
}

impl StabilityTracker {
    /// Create a new tracker
    #[must_use]
    pub fn new(config: &StabilityConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            window: config.window(),
            min_samples: config.min_samples.max(1),
            capacity,
            max_deviation: config.max_deviation_px,
            baseline: config.baseline,
            history: VecDeque::with_capacity(capacity),
        }
    }

    /// Record a face center observed now and report whether the subject is still
    pub fn observe(&mut self, x: f64, y: f64, width: f64) -> bool {
        self.observe_at(x, y, width, Instant::now())
    }

    /// Record a face center observed at `at`
    pub fn observe_at(&mut self, x: f64, y: f64, width: f64, at: Instant) -> bool {
        if self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(PositionSample { x, y, width, at });
        self.evict_older_than(at);

        self.is_stable()
    }

    /// Whether the retained history currently counts as holding still
    #[must_use]
    pub fn is_stable(&self) -> bool {
        if self.history.len() < self.min_samples {
            return false;
        }

        self.spread().is_some_and(|s| s.max() < self.max_deviation)
    }

    /// Current deviation from the baseline, `None` when empty
    #[must_use]
    pub fn spread(&self) -> Option<Spread> {
        let first = self.history.front()?;

        let (bx, by, bw) = match self.baseline {
            StabilityBaseline::FirstSample => (first.x, first.y, Some(first.width)),
            StabilityBaseline::Mean => {
                #[allow(clippy::cast_precision_loss)]
                let n = self.history.len() as f64;
                let mx = self.history.iter().map(|s| s.x).sum::<f64>() / n;
                let my = self.history.iter().map(|s| s.y).sum::<f64>() / n;
                (mx, my, None)
            }
        };

        Some(self.history.iter().fold(
            Spread {
                dx: 0.0,
                dy: 0.0,
                dwidth: 0.0,
            },
            |acc, s| Spread {
                dx: acc.dx.max((s.x - bx).abs()),
                dy: acc.dy.max((s.y - by).abs()),
                dwidth: bw.map_or(acc.dwidth, |bw| acc.dwidth.max((s.width - bw).abs())),
            },
        ))
    }

    /// Number of retained samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Reset the tracker
    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn evict_older_than(&mut self, now: Instant) {
        while let Some(oldest) = self.history.front() {
            if now.saturating_duration_since(oldest.at) > self.window {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    fn feed(tracker: &mut StabilityTracker, start: Instant, points: &[(f64, f64)]) -> Vec<bool> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| tracker.observe_at(x, y, 200.0, start + TICK * i as u32))
            .collect()
    }

    #[test]
    fn test_still_subject_becomes_stable() {
        let mut tracker = StabilityTracker::default();
        let results = feed(&mut tracker, Instant::now(), &[(320.0, 240.0); 8]);

        assert!(results[..5].iter().all(|stable| !stable), "needs min samples first");
        assert!(results[5]);
        assert!(results[7]);
    }

    #[test]
    fn test_jump_breaks_stability() {
        let mut tracker = StabilityTracker::default();
        let start = Instant::now();
        let mut points = vec![(320.0, 240.0); 7];
        points.push((360.0, 240.0));
        let results = feed(&mut tracker, start, &points);

        assert!(results[6]);
        assert!(!results[7]);
    }

    #[test]
    fn test_width_change_breaks_stability() {
        let mut tracker = StabilityTracker::default();
        let start = Instant::now();
        for i in 0..6 {
            tracker.observe_at(320.0, 240.0, 200.0, start + TICK * i);
        }
        assert!(tracker.is_stable());
        assert!(!tracker.observe_at(320.0, 240.0, 260.0, start + TICK * 6));
    }

    #[test]
    fn test_mean_baseline_ignores_width() {
        let config = StabilityConfig {
            baseline: StabilityBaseline::Mean,
            ..StabilityConfig::default()
        };
        let mut tracker = StabilityTracker::new(&config);
        let start = Instant::now();
        for i in 0..6 {
            tracker.observe_at(320.0 + f64::from(i), 240.0, 200.0 + 30.0 * f64::from(i), start + TICK * i);
        }
        assert!(tracker.is_stable());
        assert_eq!(tracker.spread().unwrap().dwidth, 0.0);
    }

    #[test]
    fn test_old_samples_are_evicted() {
        let mut tracker = StabilityTracker::default();
        let start = Instant::now();
        tracker.observe_at(0.0, 0.0, 200.0, start);
        tracker.observe_at(0.0, 0.0, 200.0, start + Duration::from_secs(5));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_capacity_bounds_history() {
        let config = StabilityConfig {
            capacity: 8,
            ..StabilityConfig::default()
        };
        let mut tracker = StabilityTracker::new(&config);
        let start = Instant::now();
        for i in 0..20 {
            tracker.observe_at(1.0, 1.0, 1.0, start + Duration::from_millis(10) * i);
        }
        assert_eq!(tracker.len(), 8);
    }

    #[test]
    fn test_slow_drift_at_60hz_is_not_still() {
        let mut tracker = StabilityTracker::default();
        let start = Instant::now();
        let mut stable = true;
        for i in 0..120u32 {
            let x = 320.0 + 0.5 * f64::from(i);
            stable = tracker.observe_at(x, 240.0, 200.0, start + Duration::from_millis(16) * i);
        }

        // The whole window is retained, not just the newest samples
        assert!(tracker.len() > 90);
        assert!(tracker.spread().unwrap().dx > 40.0);
        assert!(!stable);
    }

    #[test]
    fn test_reset_requires_fresh_samples() {
        let mut tracker = StabilityTracker::default();
        let start = Instant::now();
        feed(&mut tracker, start, &[(320.0, 240.0); 10]);
        assert!(tracker.is_stable());

        tracker.reset();
        assert!(tracker.is_empty());
        let results = feed(&mut tracker, start + Duration::from_secs(2), &[(320.0, 240.0); 5]);
        assert!(results.iter().all(|stable| !stable));
    }
}
