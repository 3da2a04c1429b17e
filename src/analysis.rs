//! Hand-off of the captured still to the external analysis collaborator.

use crate::{Error, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// JPEG MIME type
pub const JPEG_MIME: &str = "image/jpeg";

/// Encoded still ready for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub mime: &'static str,
}

impl EncodedImage {
    #[must_use]
    pub fn jpeg(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            bytes,
            width,
            height,
            mime: JPEG_MIME,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// External analysis collaborator
///
/// The report is opaque to the capture pipeline; it is only stored and handed
/// back to the caller.
pub trait AnalysisClient {
    type Report;

    /// Analyze one captured still
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator fails; the still is kept for retry
    fn analyze(&mut self, image: &EncodedImage) -> Result<Self::Report>;
}

/// Writes each still into a directory and reports the written path
#[derive(Debug, Clone)]
pub struct SnapshotAnalysisClient {
    output_dir: PathBuf,
    written: u32,
}

impl SnapshotAnalysisClient {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            written: 0,
        }
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn next_path(&self) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        self.output_dir
            .join(format!("capture-{stamp}-{:03}.jpg", self.written + 1))
    }
}

impl AnalysisClient for SnapshotAnalysisClient {
    type Report = PathBuf;

    fn analyze(&mut self, image: &EncodedImage) -> Result<PathBuf> {
        if image.is_empty() {
            return Err(Error::AnalysisError("empty image".to_string()));
        }
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            Error::AnalysisError(format!("cannot create {}: {}", self.output_dir.display(), e))
        })?;

        let path = self.next_path();
        fs::write(&path, &image.bytes)
            .map_err(|e| Error::AnalysisError(format!("cannot write {}: {}", path.display(), e)))?;
        self.written += 1;

        info!(
            "Stored {}x{} capture ({} bytes) at {}",
            image.width,
            image.height,
            image.len(),
            path.display()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = SnapshotAnalysisClient::new(dir.path().join("captures"));
        let image = EncodedImage::jpeg(vec![0xFF, 0xD8, 0xFF, 0xD9], 2, 2);

        let first = client.analyze(&image).unwrap();
        let second = client.analyze(&image).unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), image.bytes);
        assert_eq!(first.extension().unwrap(), "jpg");
    }

    #[test]
    fn test_empty_image_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut client = SnapshotAnalysisClient::new(dir.path());
        let err = client.analyze(&EncodedImage::jpeg(Vec::new(), 0, 0)).unwrap_err();
        assert!(matches!(err, Error::AnalysisError(_)));
    }

    #[test]
    fn test_unwritable_dir_is_analysis_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"x").unwrap();
        let mut client = SnapshotAnalysisClient::new(blocker.join("sub"));
        let err = client.analyze(&EncodedImage::jpeg(vec![1, 2, 3], 1, 1)).unwrap_err();
        assert!(matches!(err, Error::AnalysisError(_)));
    }
}
