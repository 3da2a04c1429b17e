use super::model_backed::{Detection, FaceDetectorBackend};
use crate::constants::{IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE};
use crate::frame::Frame;
use crate::utils::{image_conversion::frame_to_rgb_image, iou, safe_cast::f32_to_u32_clamp};
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array2, Array4, CowArray};
use ort::{Environment, GraphOptimizationLevel, LoggingLevel, Session, SessionBuilder, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// SCRFD face detector using ONNX Runtime
pub struct ScrfdDetector {
    session: Session,
    input_size: (u32, u32),
    conf_threshold: f32,
    nms_threshold: f32,
    num_anchors: usize,
    strides: Vec<u32>,
    offset: usize,
    center_cache: HashMap<(u32, u32, u32), Array2<f32>>,
}

impl ScrfdDetector {
    /// Load a detector from an ONNX model file
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(Error::ModelError(format!("Model not found: {}", model_path.display())));
        }

        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(LoggingLevel::Warning)
                .build()?,
        );

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelError("Model has no inputs".to_string()))?;

        // [batch, channels, height, width]
        let dims = &input_meta.dimensions;
        let input_size = if dims.len() >= 4 {
            let height = dims[2].unwrap_or(640);
            let width = dims[3].unwrap_or(640);
            (width as u32, height as u32)
        } else {
            (640, 640)
        };

        let (offset, strides, num_anchors) = match session.outputs.len() {
            6 | 9 => (3, vec![8, 16, 32], 2),
            10 | 15 => (5, vec![8, 16, 32, 64, 128], 1),
            n => {
                log::warn!("Unknown SCRFD configuration with {} outputs, using defaults", n);
                (3, vec![8, 16, 32], 2)
            }
        };

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            nms_threshold,
            num_anchors,
            strides,
            offset,
            center_cache: HashMap::new(),
        })
    }

    /// Letterbox the frame into the model input and return the scale applied
    fn preprocess(&self, frame: &Frame) -> Result<(Array4<f32>, f32)> {
        let image = frame_to_rgb_image(frame)?;
        let (input_width, input_height) = self.input_size;

        let ratio_img = frame.height() as f32 / frame.width() as f32;
        let ratio_model = input_height as f32 / input_width as f32;
        let (new_width, new_height) = if ratio_img > ratio_model {
            (f32_to_u32_clamp(input_height as f32 / ratio_img, input_width), input_height)
        } else {
            (input_width, f32_to_u32_clamp(input_width as f32 * ratio_img, input_height))
        };
        let (new_width, new_height) = (new_width.max(1), new_height.max(1));
        let det_scale = new_height as f32 / frame.height() as f32;

        let resized = imageops::resize(&image, new_width, new_height, FilterType::Triangle);
        let mut padded = RgbImage::new(input_width, input_height);
        imageops::replace(&mut padded, &resized, 0, 0);

        let (w, h) = (input_width as usize, input_height as usize);
        let mut tensor = Array4::<f32>::zeros((1, 3, h, w));
        for (x, y, pixel) in padded.enumerate_pixels() {
            for ch in 0..3 {
                tensor[[0, ch, y as usize, x as usize]] =
                    (f32::from(pixel.0[ch]) - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE;
            }
        }

        Ok((tensor, det_scale))
    }

    /// Run the model and decode candidate boxes in model input coordinates
    fn forward(&mut self, inputs: Array4<f32>) -> Result<Vec<Detection>> {
        let input_height = inputs.shape()[2] as u32;
        let input_width = inputs.shape()[3] as u32;

        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut candidates = Vec::new();
        for (idx, &stride) in self.strides.clone().iter().enumerate() {
            let scores_output = outputs[idx].try_extract::<f32>()?;
            let scores_view = scores_output.view();
            let scores = scores_view
                .as_slice()
                .ok_or_else(|| Error::ModelError("Non-contiguous score tensor".to_string()))?;

            let bbox_output = outputs[idx + self.offset].try_extract::<f32>()?;
            let bbox_view = bbox_output.view();
            let distances = bbox_view
                .as_slice()
                .ok_or_else(|| Error::ModelError("Non-contiguous bbox tensor".to_string()))?;

            let key = (input_height / stride, input_width / stride, stride);
            let centers = match self.center_cache.get(&key) {
                Some(centers) => centers.clone(),
                None => {
                    let centers = self.anchor_centers(key.0, key.1, stride)?;
                    self.center_cache.insert(key, centers.clone());
                    centers
                }
            };

            let stride = stride as f32;
            for (i, &score) in scores.iter().enumerate() {
                if score < self.conf_threshold || i >= centers.nrows() || i * 4 + 3 >= distances.len() {
                    continue;
                }
                let (cx, cy) = (centers[[i, 0]], centers[[i, 1]]);
                let d = &distances[i * 4..i * 4 + 4];
                candidates.push(Detection {
                    x1: cx - d[0] * stride,
                    y1: cy - d[1] * stride,
                    x2: cx + d[2] * stride,
                    y2: cy + d[3] * stride,
                    score,
                });
            }
        }

        Ok(candidates)
    }

    /// Anchor centers for one stride level
    fn anchor_centers(&self, height: u32, width: u32, stride: u32) -> Result<Array2<f32>> {
        let mut centers = Vec::with_capacity((height * width) as usize * self.num_anchors * 2);
        for y in 0..height {
            for x in 0..width {
                for _ in 0..self.num_anchors {
                    centers.push((x * stride) as f32);
                    centers.push((y * stride) as f32);
                }
            }
        }

        let n_points = (height * width) as usize * self.num_anchors;
        Array2::from_shape_vec((n_points, 2), centers)
            .map_err(|e| Error::ModelError(format!("Failed to create anchor centers: {}", e)))
    }
}

/// Greedy non-maximum suppression, highest score first
#[must_use]
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in detections {
        if keep.iter().all(|k| iou(k.corners(), candidate.corners()) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

impl FaceDetectorBackend for ScrfdDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let (inputs, det_scale) = self.preprocess(frame)?;
        let candidates = self.forward(inputs)?;

        let scaled = candidates
            .into_iter()
            .map(|d| Detection {
                x1: d.x1 / det_scale,
                y1: d.y1 / det_scale,
                x2: d.x2 / det_scale,
                y2: d.y2 / det_scale,
                score: d.score,
            })
            .collect();

        Ok(non_max_suppression(scaled, self.nms_threshold))
    }

    fn name(&self) -> &str {
        "ScrfdDetector"
    }
}
