//! Configuration management for the capture gate

use crate::constants::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Library configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera and capture configuration
    pub camera: CameraConfig,

    /// Lighting estimator configuration
    pub lighting: LightingConfig,

    /// Face region estimator configuration
    pub face_detection: FaceDetectionConfig,

    /// Stability tracker configuration
    pub stability: StabilityConfig,

    /// Capture gate timing
    pub gate: GateConfig,
}

/// Camera acquisition and still capture parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index
    pub index: i32,

    /// Requested frame width
    pub width: u32,

    /// Requested frame height
    pub height: u32,

    /// The live preview is mirrored, so stills are mirrored back
    pub mirror_preview: bool,

    /// Sampling cadence in milliseconds
    pub sample_interval_ms: u64,

    /// JPEG quality for captured stills (1-100)
    pub jpeg_quality: u8,

    /// Consecutive failed reads after which the camera counts as lost
    pub max_failed_reads: u32,
}

/// Lighting classification bands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Pixel stride in each axis
    pub sample_stride: usize,

    /// Brightness at or below which the frame is too dark
    pub dark_threshold: f64,

    /// Exclusive lower bound of the good band
    pub good_min: f64,

    /// Exclusive upper bound of the good band
    pub good_max: f64,

    /// Brightness at or above which the frame is too bright
    pub bright_threshold: f64,
}

/// Which face region estimator to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorBackend {
    /// YCbCr skin-color heuristic
    Color,
    /// ONNX face detector
    Model,
}

/// Face region estimation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Estimator selected at startup
    pub backend: DetectorBackend,

    /// Path to the face detector model (model backend only)
    pub model_path: PathBuf,

    /// Fall back to the color heuristic when the model cannot be loaded
    pub fallback_to_color: bool,

    /// Confidence threshold for model detections (0.0-1.0)
    pub confidence_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub nms_threshold: f32,

    /// Pixel stride in each axis for skin sampling
    pub sample_stride: usize,

    /// Minimum skin-classified samples for a detection
    pub min_skin_samples: usize,

    /// Allowed center offset as a fraction of the frame dimension
    pub center_tolerance: f64,

    /// Face height ratio below which the face is too far
    pub too_far_ratio: f64,

    /// Face height ratio above which the face is too close
    pub too_close_ratio: f64,
}

/// Baseline used when measuring positional deviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityBaseline {
    /// Compare against the oldest retained sample, including box width
    FirstSample,
    /// Compare against the mean of the retained samples
    Mean,
}

/// Stability tracker parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Trailing window in milliseconds
    pub window_ms: u64,

    /// Minimum retained samples before stability can be reported
    pub min_samples: usize,

    /// Maximum retained samples
    pub capacity: usize,

    /// Maximum deviation in pixels
    pub max_deviation_px: f64,

    /// Deviation baseline
    pub baseline: StabilityBaseline,
}

/// Capture gate timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Continuous all-pass time before the countdown starts
    pub sustained_ms: u64,

    /// First countdown value
    pub countdown_from: u8,

    /// Duration of one countdown step
    pub countdown_step_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            mirror_preview: true,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_failed_reads: DEFAULT_MAX_FAILED_READS,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sample_stride: DEFAULT_LIGHTING_STRIDE,
            dark_threshold: DEFAULT_DARK_THRESHOLD,
            good_min: DEFAULT_GOOD_MIN,
            good_max: DEFAULT_GOOD_MAX,
            bright_threshold: DEFAULT_BRIGHT_THRESHOLD,
        }
    }
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            backend: DetectorBackend::Color,
            model_path: PathBuf::from("assets/face_detector.onnx"),
            fallback_to_color: true,
            confidence_threshold: DEFAULT_MODEL_CONFIDENCE,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            sample_stride: DEFAULT_SKIN_STRIDE,
            min_skin_samples: DEFAULT_MIN_SKIN_SAMPLES,
            center_tolerance: DEFAULT_CENTER_TOLERANCE,
            too_far_ratio: DEFAULT_TOO_FAR_RATIO,
            too_close_ratio: DEFAULT_TOO_CLOSE_RATIO,
        }
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_STABILITY_WINDOW_MS,
            min_samples: DEFAULT_STABILITY_MIN_SAMPLES,
            capacity: DEFAULT_STABILITY_CAPACITY,
            max_deviation_px: DEFAULT_MAX_DEVIATION_PX,
            baseline: StabilityBaseline::FirstSample,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            sustained_ms: DEFAULT_SUSTAINED_MS,
            countdown_from: DEFAULT_COUNTDOWN_FROM,
            countdown_step_ms: DEFAULT_COUNTDOWN_STEP_MS,
        }
    }
}

impl CameraConfig {
    /// Sampling cadence as a `Duration`
    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl StabilityConfig {
    /// Trailing window as a `Duration`
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl GateConfig {
    /// Sustained all-pass duration
    #[must_use]
    pub fn sustained(&self) -> Duration {
        Duration::from_millis(self.sustained_ms)
    }

    /// Countdown step duration
    #[must_use]
    pub fn countdown_step(&self) -> Duration {
        Duration::from_millis(self.countdown_step_ms)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let camera = &self.camera;
        if camera.sample_interval_ms == 0 {
            return Err(Error::ConfigError("Sample interval must be greater than 0".to_string()));
        }
        if !(1..=100).contains(&camera.jpeg_quality) {
            return Err(Error::ConfigError("JPEG quality must be between 1 and 100".to_string()));
        }
        if camera.max_failed_reads == 0 {
            return Err(Error::ConfigError("max_failed_reads must be greater than 0".to_string()));
        }

        let lighting = &self.lighting;
        if lighting.sample_stride == 0 {
            return Err(Error::ConfigError("Lighting sample stride must be greater than 0".to_string()));
        }
        let ordered = lighting.dark_threshold <= lighting.good_min
            && lighting.good_min < lighting.good_max
            && lighting.good_max <= lighting.bright_threshold;
        if !ordered {
            return Err(Error::ConfigError(
                "Lighting bands must satisfy dark <= good_min < good_max <= bright".to_string(),
            ));
        }

        let face = &self.face_detection;
        if face.sample_stride == 0 {
            return Err(Error::ConfigError("Skin sample stride must be greater than 0".to_string()));
        }
        if !(0.0..=1.0).contains(&face.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&face.nms_threshold) {
            return Err(Error::ConfigError("NMS threshold must be between 0.0 and 1.0".to_string()));
        }
        if !(0.0..=0.5).contains(&face.center_tolerance) {
            return Err(Error::ConfigError("Center tolerance must be between 0.0 and 0.5".to_string()));
        }
        if !(face.too_far_ratio > 0.0 && face.too_far_ratio < face.too_close_ratio && face.too_close_ratio <= 1.0) {
            return Err(Error::ConfigError(
                "Distance ratios must satisfy 0 < too_far < too_close <= 1".to_string(),
            ));
        }
        if face.backend == DetectorBackend::Model && !face.fallback_to_color && !face.model_path.exists() {
            return Err(Error::ConfigError(format!(
                "Face detector model not found: {}",
                face.model_path.display()
            )));
        }

        let stability = &self.stability;
        if stability.window_ms == 0 {
            return Err(Error::ConfigError("Stability window must be greater than 0".to_string()));
        }
        if stability.min_samples == 0 || stability.min_samples > stability.capacity {
            return Err(Error::ConfigError(
                "Stability min_samples must be in 1..=capacity".to_string(),
            ));
        }
        let per_window = stability.window_ms / camera.sample_interval_ms + 1;
        if (stability.capacity as u64) < per_window {
            return Err(Error::ConfigError(format!(
                "Stability capacity {} cannot hold a {} ms window sampled every {} ms (needs {})",
                stability.capacity, stability.window_ms, camera.sample_interval_ms, per_window
            )));
        }
        if stability.max_deviation_px <= 0.0 {
            return Err(Error::ConfigError("Stability deviation threshold must be positive".to_string()));
        }

        if self.gate.countdown_from == 0 {
            return Err(Error::ConfigError("Countdown must start above 0".to_string()));
        }
        if self.gate.countdown_step_ms == 0 {
            return Err(Error::ConfigError("Countdown step must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face Capture Gate Configuration

# Camera and capture
camera:
  index: 0
  width: 1280
  height: 720
  mirror_preview: true
  sample_interval_ms: 150
  jpeg_quality: 90
  max_failed_reads: 10

# Lighting bands (mean of (R+G+B)/3)
lighting:
  sample_stride: 10
  dark_threshold: 50.0
  good_min: 80.0
  good_max: 200.0
  bright_threshold: 220.0

# Face region estimation
face_detection:
  backend: color
  model_path: "assets/face_detector.onnx"
  fallback_to_color: true
  confidence_threshold: 0.5
  nms_threshold: 0.4
  sample_stride: 8
  min_skin_samples: 50
  center_tolerance: 0.15
  too_far_ratio: 0.30
  too_close_ratio: 0.70

# Stability tracking
stability:
  window_ms: 1500
  min_samples: 6
  capacity: 100
  max_deviation_px: 20.0
  baseline: first_sample

# Capture gate timing
gate:
  sustained_ms: 2000
  countdown_from: 3
  countdown_step_ms: 1000
"#;
