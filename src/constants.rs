//! Constants used throughout the library

/// Pixel stride (both axes) for lighting sampling
pub const DEFAULT_LIGHTING_STRIDE: usize = 10;

/// Brightness at or below which a frame is too dark
pub const DEFAULT_DARK_THRESHOLD: f64 = 50.0;

/// Lower (exclusive) bound of the good lighting band
pub const DEFAULT_GOOD_MIN: f64 = 80.0;

/// Upper (exclusive) bound of the good lighting band
pub const DEFAULT_GOOD_MAX: f64 = 200.0;

/// Brightness at or above which a frame is too bright
pub const DEFAULT_BRIGHT_THRESHOLD: f64 = 220.0;

/// Share of the lighting score derived from raw brightness
pub const LIGHTING_SCORE_SCALE: f64 = 50.0;

/// Score bonus for the good lighting band
pub const LIGHTING_GOOD_BONUS: f64 = 50.0;

/// Maximum value of an 8-bit channel
pub const MAX_CHANNEL_VALUE: f64 = 255.0;

/// Pixel stride (both axes) for skin classification
pub const DEFAULT_SKIN_STRIDE: usize = 8;

/// Minimum number of skin-classified samples for a detection
pub const DEFAULT_MIN_SKIN_SAMPLES: usize = 50;

/// Skin band in YCbCr space (all bounds exclusive)
pub const SKIN_CR_MIN: f64 = 135.0;
pub const SKIN_CR_MAX: f64 = 180.0;
pub const SKIN_CB_MIN: f64 = 85.0;
pub const SKIN_CB_MAX: f64 = 135.0;
pub const SKIN_Y_MIN: f64 = 80.0;

/// Chroma offset for 8-bit YCbCr
pub const CHROMA_OFFSET: f64 = 128.0;

/// Allowed center offset as a fraction of the frame dimension
pub const DEFAULT_CENTER_TOLERANCE: f64 = 0.15;

/// Face height / frame height below which the subject is too far
pub const DEFAULT_TOO_FAR_RATIO: f64 = 0.30;

/// Face height / frame height above which the subject is too close
pub const DEFAULT_TOO_CLOSE_RATIO: f64 = 0.70;

/// Default confidence threshold for model-backed detection
pub const DEFAULT_MODEL_CONFIDENCE: f32 = 0.5;

/// Default IOU threshold for non-maximum suppression
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;

/// Image normalization constants for the SCRFD detector
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Stability window in milliseconds
pub const DEFAULT_STABILITY_WINDOW_MS: u64 = 1500;

/// Minimum retained samples before stability can be reported
pub const DEFAULT_STABILITY_MIN_SAMPLES: usize = 6;

/// Hard cap on retained position samples; covers the window at 60 samples/s
pub const DEFAULT_STABILITY_CAPACITY: usize = 100;

/// Maximum per-axis deviation (pixels) for a still subject
pub const DEFAULT_MAX_DEVIATION_PX: f64 = 20.0;

/// Continuous all-pass time before the countdown starts
pub const DEFAULT_SUSTAINED_MS: u64 = 2000;

/// First countdown value
pub const DEFAULT_COUNTDOWN_FROM: u8 = 3;

/// Duration of a single countdown step
pub const DEFAULT_COUNTDOWN_STEP_MS: u64 = 1000;

/// Default sampling interval
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 150;

/// Consecutive failed frame reads after which the camera counts as lost
pub const DEFAULT_MAX_FAILED_READS: u32 = 10;

/// Ideal camera resolution
pub const DEFAULT_CAMERA_WIDTH: u32 = 1280;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 720;

/// JPEG quality for captured stills
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
