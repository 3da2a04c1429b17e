//! Error types for the face capture gate library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(String),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// The user (or the OS) refused access to the camera
    #[error("Camera permission denied: {0}")]
    CameraPermissionDenied(String),

    /// No usable camera device, or the stream could not be started
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Face detection cannot run in this session
    #[error("Face detection unavailable: {0}")]
    DetectionUnavailable(String),

    /// Grabbing or encoding the still image failed
    #[error("Capture error: {0}")]
    CaptureError(String),

    /// The external analysis collaborator failed
    #[error("Analysis error: {0}")]
    AnalysisError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A gate action was requested in a state that does not allow it
    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
}

impl Error {
    /// Whether this error came from acquiring or reading the camera device
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::CameraPermissionDenied(_) | Self::CameraUnavailable(_))
    }
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for Error {
    fn from(e: opencv::Error) -> Self {
        Self::OpenCV(e.to_string())
    }
}

#[cfg(feature = "onnx")]
impl From<ort::OrtError> for Error {
    fn from(e: ort::OrtError) -> Self {
        Self::OnnxRuntime(e.to_string())
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
