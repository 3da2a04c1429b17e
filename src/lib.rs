//! Face capture quality gate for real-time photo capture.
//!
//! The library watches a live camera stream and only takes a photo once the
//! subject is well lit, centered, at a good distance and holding still:
//! - Lighting estimation from sampled pixel brightness
//! - Face region estimation by skin-color heuristics, or by a pluggable
//!   detection model (feature `onnx`)
//! - Temporal stability tracking over recent face positions
//! - A countdown state machine that triggers the capture
//!
//! The per-tick pipeline consists of:
//! 1. Sampling a frame from a [`camera::FrameSource`] at a fixed cadence
//! 2. Extracting the lighting and face signals
//! 3. Aggregating them into a [`checks::ChecksState`]
//! 4. Feeding the checks to the [`capture_gate::CaptureGate`]
//! 5. On capture, encoding a JPEG still and handing it to an
//!    [`analysis::AnalysisClient`]
//!
//! # Examples
//!
//! ## Per-frame signals
//!
//! ```no_run
//! use face_capture_gate::face_detection::{ColorHeuristicEstimator, FaceRegionEstimator};
//! use face_capture_gate::lighting::estimate_lighting;
//! use face_capture_gate::utils::image_conversion::load_frame;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let frame = load_frame("selfie.jpg")?;
//!
//! let lighting = estimate_lighting(&frame);
//! println!("Lighting: {:?} ({:.0}/100)", lighting.level, lighting.score);
//!
//! let mut estimator = ColorHeuristicEstimator::default();
//! let face = estimator.estimate(&frame)?;
//! println!("Face detected: {}, centered: {}", face.detected(), face.centered);
//! # Ok(())
//! # }
//! ```
//!
//! ## Complete session
//!
//! ```no_run
//! use face_capture_gate::{
//!     analysis::SnapshotAnalysisClient,
//!     camera::ImageSequenceSource,
//!     capture_gate::GateState,
//!     config::Config,
//!     face_detection::select_estimator,
//!     sampler::FrameSampler,
//!     session::CaptureSession,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut session = CaptureSession::new(
//!     &config,
//!     ImageSequenceSource::new("frames/"),
//!     select_estimator(&config.face_detection),
//!     SnapshotAnalysisClient::new("captures/"),
//! );
//! let mut sampler = FrameSampler::new(config.camera.sample_interval());
//!
//! session.start()?;
//! while !matches!(session.state(), GateState::Captured | GateState::Error(_)) {
//!     if let Some(report) = session.tick(sampler.wait()) {
//!         println!("{} [{}]", report.status, report.state);
//!     }
//! }
//! if let Some(path) = session.report() {
//!     println!("Stored at {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

/// Owned RGB frame buffer
pub mod frame;

/// Lighting estimation from frame brightness
pub mod lighting;

/// Face region estimation: skin-color heuristic and model-backed detectors
pub mod face_detection;

/// Temporal stability tracking of the face position
pub mod stability;

/// Per-tick check aggregation and user-facing status
pub mod checks;

/// Auto-capture countdown state machine
pub mod capture_gate;

/// Frame sources (image sequences, and webcams with the `opencv` feature)
pub mod camera;

/// Fixed-cadence tick pacing
pub mod sampler;

/// Captured still hand-off to the analysis collaborator
pub mod analysis;

/// Session wiring the camera, extractors, gate and analysis together
pub mod session;

/// Utility functions for image conversion and safe casting
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
