use super::{FaceBounds, FaceRegion, FaceRegionEstimator, RegionRules};
use crate::config::FaceDetectionConfig;
use crate::constants::{
    CHROMA_OFFSET, DEFAULT_MIN_SKIN_SAMPLES, DEFAULT_SKIN_STRIDE, SKIN_CB_MAX, SKIN_CB_MIN, SKIN_CR_MAX,
    SKIN_CR_MIN, SKIN_Y_MIN,
};
use crate::frame::Frame;
use crate::utils::span;
use crate::Result;

/// Convert an RGB triple to `(Y, Cb, Cr)` using BT.601 full-range coefficients
#[must_use]
pub fn rgb_to_ycbcr([r, g, b]: [u8; 3]) -> (f64, f64, f64) {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = CHROMA_OFFSET - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = CHROMA_OFFSET + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (y, cb, cr)
}

/// Whether a pixel falls in the skin band
///
/// The band is a color-presence test wide enough for a range of skin tones
/// under indoor light; it is not a face detector.
#[must_use]
pub fn is_skin(rgb: [u8; 3]) -> bool {
    let (y, cb, cr) = rgb_to_ycbcr(rgb);
    cr > SKIN_CR_MIN && cr < SKIN_CR_MAX && cb > SKIN_CB_MIN && cb < SKIN_CB_MAX && y > SKIN_Y_MIN
}

/// Skin-color bounding box estimator
#[derive(Debug, Clone)]
pub struct ColorHeuristicEstimator {
    sample_stride: usize,
    min_skin_samples: usize,
    rules: RegionRules,
}

impl Default for ColorHeuristicEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SKIN_STRIDE, DEFAULT_MIN_SKIN_SAMPLES, RegionRules::default())
    }
}

impl ColorHeuristicEstimator {
    #[must_use]
    pub fn new(sample_stride: usize, min_skin_samples: usize, rules: RegionRules) -> Self {
        Self {
            sample_stride: sample_stride.max(1),
            min_skin_samples,
            rules,
        }
    }

    #[must_use]
    pub fn from_config(config: &FaceDetectionConfig) -> Self {
        Self::new(config.sample_stride, config.min_skin_samples, RegionRules::from(config))
    }

    /// Bounding box of the sampled skin pixels, `None` below the sample minimum
    #[must_use]
    pub fn skin_bounds(&self, frame: &Frame) -> Option<FaceBounds> {
        let mut count = 0_usize;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0_u32, 0_u32);

        for (x, y, rgb) in frame.strided(self.sample_stride) {
            if is_skin(rgb) {
                count += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        if count == 0 || count < self.min_skin_samples {
            return None;
        }

        let (center_x, width) = span(f64::from(min_x), f64::from(max_x));
        let (center_y, height) = span(f64::from(min_y), f64::from(max_y));
        Some(FaceBounds {
            center_x,
            center_y,
            width,
            height,
        })
    }
}

impl FaceRegionEstimator for ColorHeuristicEstimator {
    fn estimate(&mut self, frame: &Frame) -> Result<FaceRegion> {
        Ok(match self.skin_bounds(frame) {
            Some(bounds) => self.rules.classify(bounds, frame.width(), frame.height()),
            None => FaceRegion::not_detected(),
        })
    }

    fn name(&self) -> &str {
        "ColorHeuristicEstimator"
    }
}
