//! Face region estimation.
//!
//! A [`FaceRegionEstimator`] turns a [`Frame`] into a [`FaceRegion`]: an optional
//! bounding box plus the centering and distance verdicts derived from it. Two
//! implementations share the same contract and the same geometric rules:
//!
//! - [`skin_color::ColorHeuristicEstimator`] classifies strided pixels as skin in
//!   YCbCr space and uses their bounding box as a face proxy.
//! - [`model_backed::ModelBackedEstimator`] delegates to a [`model_backed::FaceDetectorBackend`]
//!   (an ONNX detector with the `onnx` feature).
//!
//! [`select_estimator`] picks one at startup from configuration.

/// YCbCr skin-color heuristic estimator
pub mod skin_color;

/// Estimator backed by a face detection model
pub mod model_backed;

/// SCRFD face detector running on ONNX Runtime
#[cfg(feature = "onnx")]
pub mod scrfd;

use crate::config::{DetectorBackend, FaceDetectionConfig};
use crate::frame::Frame;
use crate::Result;
use log::{info, warn};
use serde::Serialize;

pub use model_backed::{Detection, FaceDetectorBackend, ModelBackedEstimator};
pub use skin_color::ColorHeuristicEstimator;

/// Axis-aligned face box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceBounds {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Distance verdict from the face height ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceDistance {
    TooFar,
    Good,
    TooClose,
}

/// Per-frame face verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceRegion {
    /// Present only when a face was detected
    pub bounds: Option<FaceBounds>,
    /// Face center within tolerance of the frame center
    pub centered: bool,
    /// `TooFar` when nothing was detected
    pub distance: FaceDistance,
}

impl FaceRegion {
    /// Region for a frame with no face
    #[must_use]
    pub fn not_detected() -> Self {
        Self {
            bounds: None,
            centered: false,
            distance: FaceDistance::TooFar,
        }
    }

    #[must_use]
    pub fn detected(&self) -> bool {
        self.bounds.is_some()
    }
}

/// Centering and distance thresholds shared by every estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRules {
    /// Allowed center offset as a fraction of the frame dimension
    pub center_tolerance: f64,
    /// Height ratio below which the face is too far
    pub too_far_ratio: f64,
    /// Height ratio above which the face is too close
    pub too_close_ratio: f64,
}

impl From<&FaceDetectionConfig> for RegionRules {
    fn from(config: &FaceDetectionConfig) -> Self {
        Self {
            center_tolerance: config.center_tolerance,
            too_far_ratio: config.too_far_ratio,
            too_close_ratio: config.too_close_ratio,
        }
    }
}

impl Default for RegionRules {
    fn default() -> Self {
        Self::from(&FaceDetectionConfig::default())
    }
}

impl RegionRules {
    /// Build a detected region from a bounding box in a `frame_width` x `frame_height` frame
    #[must_use]
    pub fn classify(&self, bounds: FaceBounds, frame_width: u32, frame_height: u32) -> FaceRegion {
        let (fw, fh) = (f64::from(frame_width), f64::from(frame_height));
        if fw <= 0.0 || fh <= 0.0 {
            return FaceRegion::not_detected();
        }

        let dx = (bounds.center_x - fw / 2.0).abs();
        let dy = (bounds.center_y - fh / 2.0).abs();
        let centered = dx < self.center_tolerance * fw && dy < self.center_tolerance * fh;

        let ratio = bounds.height / fh;
        let distance = if ratio < self.too_far_ratio {
            FaceDistance::TooFar
        } else if ratio > self.too_close_ratio {
            FaceDistance::TooClose
        } else {
            FaceDistance::Good
        };

        FaceRegion {
            bounds: Some(bounds),
            centered,
            distance,
        }
    }
}

/// Trait for all face region estimators
pub trait FaceRegionEstimator: Send {
    /// Estimate the face region of a frame
    ///
    /// # Errors
    ///
    /// Returns an error when the frame cannot be processed; callers treat it as a
    /// transient per-tick failure.
    fn estimate(&mut self, frame: &Frame) -> Result<FaceRegion>;

    /// Get estimator name
    fn name(&self) -> &str;
}

/// Outcome of estimator selection
pub enum FaceCapability {
    /// An estimator is ready
    Available(Box<dyn FaceRegionEstimator>),
    /// Face checks cannot run in this session
    Unavailable {
        /// Why detection is unavailable
        reason: String,
    },
}

impl FaceCapability {
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Name of the selected estimator, if any
    #[must_use]
    pub fn estimator_name(&self) -> Option<&str> {
        match self {
            Self::Available(estimator) => Some(estimator.name()),
            Self::Unavailable { .. } => None,
        }
    }

    /// Run the selected estimator
    ///
    /// # Errors
    ///
    /// Returns `DetectionUnavailable` when no estimator was selected, otherwise
    /// whatever the estimator reports
    pub fn estimate(&mut self, frame: &Frame) -> Result<FaceRegion> {
        match self {
            Self::Available(estimator) => estimator.estimate(frame),
            Self::Unavailable { reason } => Err(crate::Error::DetectionUnavailable(reason.clone())),
        }
    }
}

impl std::fmt::Debug for FaceCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available(estimator) => f.debug_tuple("Available").field(&estimator.name()).finish(),
            Self::Unavailable { reason } => f.debug_struct("Unavailable").field("reason", reason).finish(),
        }
    }
}

/// Select the face region estimator described by `config`
///
/// A model backend that fails to load falls back to the color heuristic when
/// `fallback_to_color` is set; otherwise detection is reported unavailable.
#[must_use]
pub fn select_estimator(config: &FaceDetectionConfig) -> FaceCapability {
    match config.backend {
        DetectorBackend::Color => {
            info!("Using color heuristic face estimator");
            FaceCapability::Available(Box::new(ColorHeuristicEstimator::from_config(config)))
        }
        DetectorBackend::Model => match load_model_estimator(config) {
            Ok(estimator) => {
                info!("Using model-backed face estimator: {}", estimator.name());
                FaceCapability::Available(estimator)
            }
            Err(e) if config.fallback_to_color => {
                warn!("Failed to load face model ({}), falling back to color heuristic", e);
                FaceCapability::Available(Box::new(ColorHeuristicEstimator::from_config(config)))
            }
            Err(e) => {
                warn!("Face detection unavailable: {}", e);
                FaceCapability::Unavailable { reason: e.to_string() }
            }
        },
    }
}

#[cfg(feature = "onnx")]
fn load_model_estimator(config: &FaceDetectionConfig) -> Result<Box<dyn FaceRegionEstimator>> {
    let backend = scrfd::ScrfdDetector::new(&config.model_path, config.confidence_threshold, config.nms_threshold)?;
    Ok(Box::new(ModelBackedEstimator::new(backend, config)))
}

#[cfg(not(feature = "onnx"))]
fn load_model_estimator(config: &FaceDetectionConfig) -> Result<Box<dyn FaceRegionEstimator>> {
    Err(crate::Error::ModelError(format!(
        "cannot load {}: built without the `onnx` feature",
        config.model_path.display()
    )))
}
