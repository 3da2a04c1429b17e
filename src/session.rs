//! Capture session: one owned pipeline from camera frame to analysis report.

use crate::analysis::{AnalysisClient, EncodedImage};
use crate::camera::FrameSource;
use crate::capture_gate::{CaptureGate, GateEvent, GateState, RetryAction};
use crate::checks::{ChecksState, StatusMessage};
use crate::config::Config;
use crate::face_detection::{FaceCapability, FaceRegion};
use crate::frame::Frame;
use crate::lighting::{LightingEstimator, LightingSignal};
use crate::stability::StabilityTracker;
use crate::utils::image_conversion::{encode_jpeg, mirror_horizontal};
use crate::{Error, Result};
use log::{debug, info, warn};
use std::time::Instant;

/// Everything one tick produced, for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub checks: ChecksState,
    pub lighting: LightingSignal,
    /// `None` when face detection is unavailable
    pub face: Option<FaceRegion>,
    pub status: StatusMessage,
    pub event: GateEvent,
    pub state: GateState,
}

/// Owns the camera, the signal extractors, the stability tracker, the gate
/// and the analysis collaborator
///
/// The camera is released on `stop` and when the session is dropped.
pub struct CaptureSession<S: FrameSource, A: AnalysisClient> {
    source: S,
    client: A,
    face: FaceCapability,
    lighting: LightingEstimator,
    tracker: StabilityTracker,
    gate: CaptureGate,
    mirror_still: bool,
    jpeg_quality: u8,
    max_failed_reads: u32,
    failed_reads: u32,
    image: Option<EncodedImage>,
    report: Option<A::Report>,
}

impl<S: FrameSource, A: AnalysisClient> CaptureSession<S, A> {
    pub fn new(config: &Config, source: S, face: FaceCapability, client: A) -> Self {
        if let FaceCapability::Unavailable { reason } = &face {
            warn!("Face checks disabled for this session: {}", reason);
        }
        Self {
            source,
            client,
            face,
            lighting: LightingEstimator::new(config.lighting.clone()),
            tracker: StabilityTracker::new(&config.stability),
            gate: CaptureGate::new(&config.gate),
            mirror_still: config.camera.mirror_preview,
            jpeg_quality: config.camera.jpeg_quality,
            max_failed_reads: config.camera.max_failed_reads.max(1),
            failed_reads: 0,
            image: None,
            report: None,
        }
    }

    /// Acquire the camera and begin monitoring
    ///
    /// # Errors
    ///
    /// Returns the device error; the gate is left in `Error(Device)`
    pub fn start(&mut self) -> Result<()> {
        if let Err(e) = self.source.open() {
            self.gate.device_failed(e.to_string());
            return Err(e);
        }
        self.failed_reads = 0;
        self.tracker.reset();
        self.gate.camera_ready();
        info!("Capture session started");
        Ok(())
    }

    /// Release the camera and return to idle
    pub fn stop(&mut self) {
        if self.source.is_open() {
            self.source.release();
            info!("Capture session stopped");
        }
        self.tracker.reset();
        self.gate.stop();
    }

    /// Run one sampling tick
    ///
    /// Returns `None` when nothing was sampled: the gate is not monitoring, or
    /// the frame or a signal extractor failed. A skipped tick counts as a
    /// failing one for the gate. A lost camera, or `max_failed_reads` failed
    /// reads in a row, moves the gate to `Error(Device)`.
    pub fn tick(&mut self, now: Instant) -> Option<TickReport> {
        if !self.gate.state().is_sampling() {
            return None;
        }

        let frame = match self.source.read_frame() {
            Ok(frame) => {
                self.failed_reads = 0;
                frame
            }
            Err(e) if e.is_device_error() => {
                self.device_lost(e.to_string());
                return None;
            }
            Err(e) => {
                self.failed_reads += 1;
                if self.failed_reads >= self.max_failed_reads {
                    self.device_lost(format!("{} frame reads failed in a row, last: {}", self.failed_reads, e));
                } else {
                    warn!("Skipping tick, frame unavailable: {}", e);
                    self.skip_tick();
                }
                return None;
            }
        };

        let (lighting, face) = match self.extract(&frame) {
            Ok(signals) => signals,
            Err(e) => {
                warn!("Skipping tick, signal extraction failed: {}", e);
                self.skip_tick();
                return None;
            }
        };

        let holding_still = match face.as_ref().and_then(|region| region.bounds) {
            Some(bounds) => self
                .tracker
                .observe_at(bounds.center_x, bounds.center_y, bounds.width, now),
            None => {
                self.tracker.reset();
                false
            }
        };

        let checks = ChecksState::from_signals(&lighting, face.as_ref(), holding_still);
        let status = StatusMessage::derive(&lighting, face.as_ref(), &checks);
        let event = self.gate.tick(&checks, now);
        debug!("Tick: {} ({:?}) -> {}", status, event, self.gate.state());

        match event {
            GateEvent::CountdownStarted(n) | GateEvent::CountdownStep(n) => info!("Capturing in {}", n),
            GateEvent::CountdownCancelled => info!("Countdown cancelled: {}", status),
            GateEvent::CaptureTriggered => self.capture(frame),
            GateEvent::None => {}
        }

        Some(TickReport {
            checks,
            lighting,
            face,
            status,
            event,
            state: self.gate.state().clone(),
        })
    }

    /// Capture immediately, bypassing the checks
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` while capturing or before the camera is
    /// ready. Failures after the gate accepted the request land in the gate's
    /// error state instead.
    pub fn capture_now(&mut self) -> Result<()> {
        self.gate.capture_now()?;
        match self.source.read_frame() {
            Ok(frame) => self.capture(frame),
            Err(e) if e.is_device_error() => self.device_lost(e.to_string()),
            Err(e) => self.gate.capture_failed(e.to_string()),
        }
        Ok(())
    }

    /// Retry after a capture or analysis failure
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside a retriable error state
    pub fn retry(&mut self) -> Result<()> {
        match self.gate.retry()? {
            RetryAction::ResendAnalysis => self.run_analysis(),
            RetryAction::Resume => {
                self.image = None;
                self.tracker.reset();
            }
        }
        Ok(())
    }

    /// Discard the capture and its report and resume monitoring
    pub fn retake(&mut self) {
        self.image = None;
        self.report = None;
        self.tracker.reset();
        self.gate.retake();
    }

    #[must_use]
    pub fn state(&self) -> &GateState {
        self.gate.state()
    }

    #[must_use]
    pub fn gate(&self) -> &CaptureGate {
        &self.gate
    }

    /// The analysis report, once captured
    #[must_use]
    pub fn report(&self) -> Option<&A::Report> {
        self.report.as_ref()
    }

    /// The still handed to the analysis collaborator
    #[must_use]
    pub fn captured_image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn detection_available(&self) -> bool {
        self.face.is_available()
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn client(&self) -> &A {
        &self.client
    }

    fn device_lost(&mut self, message: String) {
        self.source.release();
        self.failed_reads = 0;
        self.tracker.reset();
        self.gate.device_failed(message);
    }

    fn skip_tick(&mut self) {
        if self.gate.frame_skipped() == GateEvent::CountdownCancelled {
            info!("Countdown cancelled: no usable frame");
        }
    }

    fn extract(&mut self, frame: &Frame) -> Result<(LightingSignal, Option<FaceRegion>)> {
        let lighting = self.lighting.estimate(frame);
        let face = match self.face.estimate(frame) {
            Ok(region) => Some(region),
            Err(Error::DetectionUnavailable(_)) => None,
            Err(e) => return Err(e),
        };
        Ok((lighting, face))
    }

    fn capture(&mut self, frame: Frame) {
        self.tracker.reset();
        match self.encode(frame) {
            Ok(image) => {
                info!("Captured {}x{} still ({} bytes)", image.width, image.height, image.len());
                self.image = Some(image);
                self.run_analysis();
            }
            Err(e) => self.gate.capture_failed(e.to_string()),
        }
    }

    fn encode(&self, frame: Frame) -> Result<EncodedImage> {
        if frame.is_empty() {
            return Err(Error::CaptureError("camera delivered an empty frame".to_string()));
        }
        let still = if self.mirror_still {
            mirror_horizontal(&frame)?
        } else {
            frame
        };
        let bytes = encode_jpeg(&still, self.jpeg_quality)?;
        Ok(EncodedImage::jpeg(bytes, still.width(), still.height()))
    }

    fn run_analysis(&mut self) {
        let Some(image) = &self.image else {
            self.gate.capture_failed("no captured image to analyze");
            return;
        };

        let outcome = match self.client.analyze(image) {
            Ok(report) => {
                self.report = Some(report);
                self.gate.analysis_succeeded()
            }
            Err(e) => self.gate.analysis_failed(e.to_string()),
        };
        if let Err(e) = outcome {
            warn!("Analysis outcome dropped: {}", e);
        }
    }
}

impl<S: FrameSource, A: AnalysisClient> Drop for CaptureSession<S, A> {
    fn drop(&mut self) {
        self.stop();
    }
}
