//! Headless capture application: paces the session loop for the CLI.

use crate::{
    analysis::SnapshotAnalysisClient,
    camera::{FrameSource, ImageSequenceSource},
    capture_gate::{FailureKind, GateState},
    checks::StatusMessage,
    config::Config,
    error::{Error, Result},
    face_detection::select_estimator,
    sampler::FrameSampler,
    session::CaptureSession,
};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where frames come from
    pub video_source: VideoSource,
    /// Directory receiving captured stills
    pub output_dir: PathBuf,
    /// Capture on the first tick without waiting for the checks
    pub manual: bool,
    /// Give up after this long without a capture
    pub timeout: Option<Duration>,
    /// Library configuration
    pub config: Config,
}

/// Video source type
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Directory of still images replayed as a stream
    Images(PathBuf),
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Still captured and stored at the path
    Captured(PathBuf),
    /// No capture before the timeout
    TimedOut,
}

/// Main application struct
pub struct CaptureApp {
    session: CaptureSession<Box<dyn FrameSource>, SnapshotAnalysisClient>,
    sampler: FrameSampler,
    manual: bool,
    timeout: Option<Duration>,
}

impl CaptureApp {
    /// Create a new capture application
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the requested video
    /// source cannot be built
    pub fn new(app_config: AppConfig) -> Result<Self> {
        info!("Initializing face capture application");
        let AppConfig {
            video_source,
            output_dir,
            manual,
            timeout,
            config,
        } = app_config;
        config.validate()?;

        let source = open_source(&video_source, &config)?;
        let face = select_estimator(&config.face_detection);
        let client = SnapshotAnalysisClient::new(output_dir);
        let sampler = FrameSampler::new(config.camera.sample_interval());

        Ok(Self {
            session: CaptureSession::new(&config, source, face, client),
            sampler,
            manual,
            timeout,
        })
    }

    /// Run the main application loop until a still is captured
    ///
    /// # Errors
    ///
    /// Returns the device, capture or analysis error that stopped the run
    pub fn run(&mut self) -> Result<RunOutcome> {
        self.session.start()?;
        let outcome = self.run_loop();
        self.session.stop();
        info!("Application shutting down");
        outcome
    }

    fn run_loop(&mut self) -> Result<RunOutcome> {
        let started = Instant::now();
        let mut last_status: Option<StatusMessage> = None;

        if self.manual {
            self.session.capture_now()?;
        }

        info!("Entering main loop");
        loop {
            match self.session.state() {
                GateState::Captured => {
                    return self.session.report().cloned().map(RunOutcome::Captured).ok_or_else(|| {
                        Error::AnalysisError("capture finished without a report".to_string())
                    });
                }
                GateState::Error(failure) => {
                    warn!("Stopping after {:?} failure", failure.kind);
                    return Err(failure_error(failure.kind, &failure.message));
                }
                _ => {}
            }

            if self.timeout.is_some_and(|limit| started.elapsed() >= limit) {
                warn!("No capture within {:?}", started.elapsed());
                return Ok(RunOutcome::TimedOut);
            }

            let now = self.sampler.wait();
            if let Some(report) = self.session.tick(now) {
                if last_status != Some(report.status) {
                    info!("{}", report.status);
                    last_status = Some(report.status);
                }
                debug!(
                    "brightness {:.1} score {:.0} checks {:?}",
                    report.lighting.brightness, report.lighting.score, report.checks
                );
            }
        }
    }
}

fn open_source(video_source: &VideoSource, config: &Config) -> Result<Box<dyn FrameSource>> {
    match video_source {
        VideoSource::Images(dir) => {
            info!("Using image sequence {}", dir.display());
            Ok(Box::new(ImageSequenceSource::new(dir)))
        }
        VideoSource::Camera(index) => camera_source(*index, config),
    }
}

#[cfg(feature = "opencv")]
fn camera_source(index: i32, config: &Config) -> Result<Box<dyn FrameSource>> {
    let camera = crate::config::CameraConfig {
        index,
        ..config.camera.clone()
    };
    Ok(Box::new(crate::camera::OpenCvCamera::new(&camera)))
}

#[cfg(not(feature = "opencv"))]
fn camera_source(index: i32, _config: &Config) -> Result<Box<dyn FrameSource>> {
    Err(Error::CameraUnavailable(format!(
        "camera {index} requested but built without the `opencv` feature; use --images"
    )))
}

fn failure_error(kind: FailureKind, message: &str) -> Error {
    match kind {
        FailureKind::Device => Error::CameraUnavailable(message.to_string()),
        FailureKind::Capture => Error::CaptureError(message.to_string()),
        FailureKind::Analysis => Error::AnalysisError(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::utils::image_conversion::frame_to_rgb_image;

    fn write_frames(dir: &std::path::Path, count: usize) {
        let mut frame = Frame::filled(320, 240, [120, 120, 120]).unwrap();
        frame.fill_rect(110, 60, 100, 120, [220, 170, 140]);
        let image = frame_to_rgb_image(&frame).unwrap();
        for i in 0..count {
            image.save(dir.join(format!("frame_{i:03}.png"))).unwrap();
        }
    }

    fn app_config(frames: PathBuf, output: PathBuf, manual: bool) -> AppConfig {
        let mut config = Config::default();
        config.camera.sample_interval_ms = 10;
        config.stability.window_ms = 500;
        config.gate.sustained_ms = 50;
        config.gate.countdown_step_ms = 20;
        AppConfig {
            video_source: VideoSource::Images(frames),
            output_dir: output,
            manual,
            timeout: Some(Duration::from_secs(10)),
            config,
        }
    }

    #[test]
    fn test_manual_run_captures_immediately() {
        let frames = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_frames(frames.path(), 1);

        let mut app = CaptureApp::new(app_config(frames.path().into(), output.path().into(), true)).unwrap();
        match app.run().unwrap() {
            RunOutcome::Captured(path) => assert!(path.starts_with(output.path())),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_auto_run_captures_from_sequence() {
        let frames = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_frames(frames.path(), 3);

        let mut app = CaptureApp::new(app_config(frames.path().into(), output.path().into(), false)).unwrap();
        assert!(matches!(app.run().unwrap(), RunOutcome::Captured(_)));
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_source_fails_start() {
        let output = tempfile::tempdir().unwrap();
        let mut app = CaptureApp::new(app_config("/nonexistent/frames".into(), output.path().into(), false)).unwrap();
        assert!(app.run().unwrap_err().is_device_error());
    }
}
