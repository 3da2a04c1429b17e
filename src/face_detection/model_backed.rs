use super::{FaceBounds, FaceRegion, FaceRegionEstimator, RegionRules};
use crate::config::FaceDetectionConfig;
use crate::frame::Frame;
use crate::Result;

/// Scored face box from a detector, `(x1, y1)` top-left and `(x2, y2)` bottom-right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl Detection {
    /// Box as `[x1, y1, x2, y2]`
    #[must_use]
    pub fn corners(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Clip to the frame and convert to center/extent form
    #[must_use]
    pub fn to_bounds(&self, frame_width: u32, frame_height: u32) -> Option<FaceBounds> {
        let (fw, fh) = (f64::from(frame_width), f64::from(frame_height));
        let x1 = f64::from(self.x1).clamp(0.0, fw);
        let y1 = f64::from(self.y1).clamp(0.0, fh);
        let x2 = f64::from(self.x2).clamp(0.0, fw);
        let y2 = f64::from(self.y2).clamp(0.0, fh);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(FaceBounds {
            center_x: (x1 + x2) / 2.0,
            center_y: (y1 + y2) / 2.0,
            width: x2 - x1,
            height: y2 - y1,
        })
    }
}

/// Face detection model contract
pub trait FaceDetectorBackend: Send {
    /// Detect faces in a frame
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Get backend name
    fn name(&self) -> &str;
}

/// Face region estimator driven by a detection model
pub struct ModelBackedEstimator<B> {
    backend: B,
    confidence_threshold: f32,
    rules: RegionRules,
}

impl<B: FaceDetectorBackend> ModelBackedEstimator<B> {
    #[must_use]
    pub fn new(backend: B, config: &FaceDetectionConfig) -> Self {
        Self {
            backend,
            confidence_threshold: config.confidence_threshold,
            rules: RegionRules::from(config),
        }
    }

    /// Access the wrapped backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: FaceDetectorBackend> FaceRegionEstimator for ModelBackedEstimator<B> {
    fn estimate(&mut self, frame: &Frame) -> Result<FaceRegion> {
        if frame.is_empty() {
            return Ok(FaceRegion::not_detected());
        }

        let (width, height) = (frame.width(), frame.height());
        let detections = self.backend.detect(frame)?;
        let best = detections
            .iter()
            .filter(|d| d.score >= self.confidence_threshold)
            .filter_map(|d| d.to_bounds(width, height).map(|bounds| (d.score, bounds)))
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(best.map_or_else(FaceRegion::not_detected, |(_, bounds)| {
            self.rules.classify(bounds, width, height)
        }))
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_detection::FaceDistance;
    use crate::Error;

    struct FixedBackend(Vec<Detection>);

    impl FaceDetectorBackend for FixedBackend {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "FixedBackend"
        }
    }

    struct FailingBackend;

    impl FaceDetectorBackend for FailingBackend {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
            Err(Error::ModelError("inference failed".to_string()))
        }

        fn name(&self) -> &str {
            "FailingBackend"
        }
    }

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Detection {
        Detection { x1, y1, x2, y2, score }
    }

    #[test]
    fn test_picks_highest_score_above_threshold() {
        let backend = FixedBackend(vec![
            det(0.0, 0.0, 50.0, 50.0, 0.55),
            det(220.0, 120.0, 420.0, 360.0, 0.95),
            det(500.0, 0.0, 600.0, 100.0, 0.2),
        ]);
        let mut estimator = ModelBackedEstimator::new(backend, &FaceDetectionConfig::default());
        let frame = Frame::filled(640, 480, [0, 0, 0]).unwrap();

        let region = estimator.estimate(&frame).unwrap();
        let bounds = region.bounds.unwrap();
        assert_eq!(bounds.center_x, 320.0);
        assert_eq!(bounds.height, 240.0);
        assert!(region.centered);
        assert_eq!(region.distance, FaceDistance::Good);
        assert_eq!(estimator.name(), "FixedBackend");
    }

    #[test]
    fn test_unusable_top_box_falls_back_to_next() {
        let backend = FixedBackend(vec![
            det(700.0, 500.0, 800.0, 600.0, 0.99),
            det(300.0, 300.0, 300.0, 400.0, 0.97),
            det(220.0, 120.0, 420.0, 360.0, 0.8),
        ]);
        let mut estimator = ModelBackedEstimator::new(backend, &FaceDetectionConfig::default());
        let frame = Frame::filled(640, 480, [0, 0, 0]).unwrap();

        let bounds = estimator.estimate(&frame).unwrap().bounds.unwrap();
        assert_eq!(bounds.center_x, 320.0);
        assert_eq!(bounds.center_y, 240.0);
    }

    #[test]
    fn test_low_confidence_is_not_detected() {
        let backend = FixedBackend(vec![det(220.0, 120.0, 420.0, 360.0, 0.1)]);
        let mut estimator = ModelBackedEstimator::new(backend, &FaceDetectionConfig::default());
        let frame = Frame::filled(640, 480, [0, 0, 0]).unwrap();
        assert!(!estimator.estimate(&frame).unwrap().detected());
    }

    #[test]
    fn test_backend_errors_propagate() {
        let mut estimator = ModelBackedEstimator::new(FailingBackend, &FaceDetectionConfig::default());
        let frame = Frame::filled(8, 8, [0, 0, 0]).unwrap();
        assert!(estimator.estimate(&frame).is_err());
    }

    #[test]
    fn test_detection_clipped_to_frame() {
        let bounds = det(-20.0, -20.0, 40.0, 40.0, 1.0).to_bounds(100, 100).unwrap();
        assert_eq!(bounds.width, 40.0);
        assert_eq!(bounds.center_x, 20.0);
        assert!(det(120.0, 0.0, 150.0, 10.0, 1.0).to_bounds(100, 100).is_none());
    }
}
