//! Frame sources: the camera contract and its implementations.

use crate::frame::Frame;
use crate::utils::image_conversion::load_frame;
use crate::{Error, Result};
use log::{debug, info};
use std::io;
use std::path::{Path, PathBuf};

/// A stream of frames from a camera-like device
pub trait FrameSource {
    /// Acquire the device and start streaming
    ///
    /// # Errors
    ///
    /// Returns `CameraPermissionDenied` when access is refused and
    /// `CameraUnavailable` when there is no usable device
    fn open(&mut self) -> Result<()>;

    /// Grab the current frame
    ///
    /// # Errors
    ///
    /// Device errors mean the stream is gone; any other error is transient
    fn read_frame(&mut self) -> Result<Frame>;

    /// Stop streaming and release the device. Safe to call repeatedly.
    fn release(&mut self);

    fn is_open(&self) -> bool;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn read_frame(&mut self) -> Result<Frame> {
        (**self).read_frame()
    }

    fn release(&mut self) {
        (**self).release();
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Map an I/O failure while acquiring a device onto the camera error taxonomy
pub(crate) fn device_error(err: &io::Error, what: &str) -> Error {
    match err.kind() {
        io::ErrorKind::PermissionDenied => Error::CameraPermissionDenied(format!("{what}: {err}")),
        _ => Error::CameraUnavailable(format!("{what}: {err}")),
    }
}

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Replays a directory of still images as a camera stream
///
/// Files are read in name order. By default the sequence loops; with looping
/// disabled the stream reports the device as gone after the last image.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    position: usize,
    looping: bool,
    open: bool,
}

impl ImageSequenceSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            paths: Vec::new(),
            position: 0,
            looping: true,
            open: false,
        }
    }

    #[must_use]
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Number of images found by the last `open`
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn scan(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| device_error(&e, &format!("cannot read {}", self.dir.display())))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if is_image && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<()> {
        let paths = self.scan()?;
        if paths.is_empty() {
            return Err(Error::CameraUnavailable(format!(
                "no images in {}",
                self.dir.display()
            )));
        }
        info!("Replaying {} images from {}", paths.len(), self.dir.display());
        self.paths = paths;
        self.position = 0;
        self.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        if !self.open {
            return Err(Error::CameraUnavailable("image sequence is not open".to_string()));
        }
        if self.position >= self.paths.len() {
            if !self.looping {
                return Err(Error::CameraUnavailable("end of image sequence".to_string()));
            }
            self.position = 0;
        }

        let path = &self.paths[self.position];
        self.position += 1;
        debug!("Reading {}", path.display());
        load_frame(path).map_err(|e| Error::CaptureError(format!("{}: {}", path.display(), e)))
    }

    fn release(&mut self) {
        if self.open {
            debug!("Releasing image sequence {}", self.dir.display());
        }
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(feature = "opencv")]
pub use self::opencv_camera::OpenCvCamera;

#[cfg(feature = "opencv")]
mod opencv_camera {
    use super::{device_error, FrameSource};
    use crate::config::CameraConfig;
    use crate::frame::Frame;
    use crate::utils::image_conversion::mat_bgr_to_frame;
    use crate::{Error, Result};
    use log::{info, warn};
    use opencv::{
        core::Mat,
        prelude::*,
        videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
    };

    /// Webcam stream via `OpenCV`
    pub struct OpenCvCamera {
        index: i32,
        width: u32,
        height: u32,
        capture: Option<VideoCapture>,
    }

    impl OpenCvCamera {
        #[must_use]
        pub fn new(config: &CameraConfig) -> Self {
            Self {
                index: config.index,
                width: config.width,
                height: config.height,
                capture: None,
            }
        }

        /// `VideoCapture` reports a refused device as a plain failure, so
        /// check the device node first on Linux
        fn probe_device(&self) -> Result<()> {
            if !cfg!(target_os = "linux") {
                return Ok(());
            }
            let node = format!("/dev/video{}", self.index);
            std::fs::OpenOptions::new()
                .read(true)
                .open(&node)
                .map(drop)
                .map_err(|e| device_error(&e, &node))
        }
    }

    impl FrameSource for OpenCvCamera {
        fn open(&mut self) -> Result<()> {
            if self.capture.is_some() {
                return Ok(());
            }
            self.probe_device()?;

            info!("Opening camera {}", self.index);
            let mut cap = VideoCapture::new(self.index, videoio::CAP_ANY)
                .map_err(|e| Error::CameraUnavailable(e.to_string()))?;
            if !cap.is_opened()? {
                return Err(Error::CameraUnavailable(format!("camera {} did not open", self.index)));
            }

            cap.set(CAP_PROP_FRAME_WIDTH, f64::from(self.width))?;
            cap.set(CAP_PROP_FRAME_HEIGHT, f64::from(self.height))?;
            // Latest frame only
            cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
            info!("Camera {} streaming, requested {}x{}", self.index, self.width, self.height);

            self.capture = Some(cap);
            Ok(())
        }

        fn read_frame(&mut self) -> Result<Frame> {
            let cap = self
                .capture
                .as_mut()
                .ok_or_else(|| Error::CameraUnavailable("camera is not open".to_string()))?;

            let mut mat = Mat::default();
            if !cap.read(&mut mat)? || mat.empty() {
                if !cap.is_opened()? {
                    return Err(Error::CameraUnavailable(format!("camera {} closed while streaming", self.index)));
                }
                return Err(Error::CaptureError("failed to read frame".to_string()));
            }
            mat_bgr_to_frame(&mat)
        }

        fn release(&mut self) {
            if let Some(mut cap) = self.capture.take() {
                if let Err(e) = cap.release() {
                    warn!("Failed to release camera {}: {}", self.index, e);
                }
                info!("Camera {} released", self.index);
            }
        }

        fn is_open(&self) -> bool {
            self.capture.is_some()
        }
    }

    impl Drop for OpenCvCamera {
        fn drop(&mut self) {
            self.release();
        }
    }
}
