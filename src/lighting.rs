//! Lighting estimation from a sparse brightness sample.
//!
//! Brightness is the mean of `(R + G + B) / 3` over every `sample_stride`-th
//! pixel in both axes. The score rescales brightness into `[0, 50]` and adds a
//! bonus of 50 inside the good band, so a good frame always outscores an okay one.

use crate::config::LightingConfig;
use crate::constants::{LIGHTING_GOOD_BONUS, LIGHTING_SCORE_SCALE, MAX_CHANNEL_VALUE};
use crate::frame::Frame;
use serde::Serialize;

/// Lighting classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightingLevel {
    TooDark,
    Okay,
    Good,
    TooBright,
}

/// Lighting verdict for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LightingSignal {
    /// Classification
    pub level: LightingLevel,
    /// Mean sampled brightness in `[0, 255]`
    pub brightness: f64,
    /// Score in `[0, 100]`
    pub score: f64,
}

impl LightingSignal {
    /// Signal for frames with no usable pixels
    #[must_use]
    pub fn dark() -> Self {
        Self {
            level: LightingLevel::TooDark,
            brightness: 0.0,
            score: 0.0,
        }
    }

    #[must_use]
    pub fn is_good(&self) -> bool {
        self.level == LightingLevel::Good
    }
}

/// Stateless lighting estimator
#[derive(Debug, Clone)]
pub struct LightingEstimator {
    config: LightingConfig,
}

impl Default for LightingEstimator {
    fn default() -> Self {
        Self::new(LightingConfig::default())
    }
}

impl LightingEstimator {
    #[must_use]
    pub fn new(config: LightingConfig) -> Self {
        Self { config }
    }

    /// Estimate the lighting of a frame
    #[must_use]
    pub fn estimate(&self, frame: &Frame) -> LightingSignal {
        match mean_brightness(frame, self.config.sample_stride) {
            Some(brightness) => self.classify(brightness),
            None => LightingSignal::dark(),
        }
    }

    /// Classify a brightness value
    #[must_use]
    pub fn classify(&self, brightness: f64) -> LightingSignal {
        let c = &self.config;
        let level = if brightness > c.good_min && brightness < c.good_max {
            LightingLevel::Good
        } else if brightness <= c.dark_threshold {
            LightingLevel::TooDark
        } else if brightness >= c.bright_threshold {
            LightingLevel::TooBright
        } else {
            LightingLevel::Okay
        };

        let mut score = brightness.clamp(0.0, MAX_CHANNEL_VALUE) / MAX_CHANNEL_VALUE * LIGHTING_SCORE_SCALE;
        if level == LightingLevel::Good {
            score += LIGHTING_GOOD_BONUS;
        }

        LightingSignal {
            level,
            brightness,
            score: score.clamp(0.0, 100.0),
        }
    }
}

/// Estimate lighting with the default bands
#[must_use]
pub fn estimate_lighting(frame: &Frame) -> LightingSignal {
    LightingEstimator::default().estimate(frame)
}

/// Mean of `(R + G + B) / 3` over a strided sample, `None` for empty frames
#[allow(clippy::cast_precision_loss)]
fn mean_brightness(frame: &Frame, stride: usize) -> Option<f64> {
    let (sum, count) = frame.strided(stride).fold((0.0_f64, 0_usize), |(sum, count), (_, _, [r, g, b])| {
        (sum + (f64::from(r) + f64::from(g) + f64::from(b)) / 3.0, count + 1)
    });

    (count > 0).then(|| sum / count as f64)
}
