//! Error handling tests: device, capture, analysis and extraction failures

mod test_helpers;

use face_capture_gate::{
    capture_gate::{CaptureGate, FailureKind, GateState},
    config::{Config, DetectorBackend, FaceDetectionConfig},
    face_detection::{select_estimator, FaceCapability, FaceRegion, FaceRegionEstimator},
    frame::Frame,
    session::CaptureSession,
    Error, Result,
};
use std::time::Instant;
use test_helpers::*;

fn failure_kind(state: &GateState) -> Option<FailureKind> {
    match state {
        GateState::Error(failure) => Some(failure.kind),
        _ => None,
    }
}

#[test]
fn test_permission_denied_on_start() {
    let config = Config::default();
    let (source, log) = ScriptedSource::denied();
    let mut session = scripted_session(&config, source, RecordingClient::default());

    let err = session.start().unwrap_err();
    assert!(matches!(err, Error::CameraPermissionDenied(_)));
    assert_eq!(failure_kind(session.state()), Some(FailureKind::Device));

    // No automatic retry, no sampling, no manual capture
    assert!(session.tick(Instant::now()).is_none());
    assert!(session.capture_now().is_err());
    assert!(session.retry().is_err());
    assert_eq!(log.borrow().reads, 0);
}

#[test]
fn test_lost_camera_moves_to_device_error() {
    let config = Config::default();
    let (source, log) = ScriptedSource::repeating(centered_face_frame());
    let source = source.then(Ok(centered_face_frame())).then(Err(Error::CameraUnavailable(
        "device unplugged".to_string(),
    )));
    let mut session = scripted_session(&config, source, RecordingClient::default());
    session.start().unwrap();

    let now = Instant::now();
    assert!(session.tick(now).is_some());
    assert!(session.tick(now + TICK).is_none());
    assert_eq!(failure_kind(session.state()), Some(FailureKind::Device));
    assert!(!log.borrow().open);

    // Restarting the camera resumes monitoring
    session.start().unwrap();
    assert_eq!(session.state(), &GateState::Monitoring);
    assert_eq!(log.borrow().opened, 2);
}

#[test]
fn test_camera_returning_nothing_counts_as_lost() {
    let mut config = Config::default();
    config.camera.max_failed_reads = 3;
    let (mut source, log) = ScriptedSource::repeating(centered_face_frame());
    for _ in 0..3 {
        source = source.then(Err(Error::CaptureError("failed to read frame".to_string())));
    }
    let mut session = scripted_session(&config, source, RecordingClient::default());
    session.start().unwrap();

    let mut at = ticks(Instant::now(), 3);
    assert!(session.tick(at.next().unwrap()).is_none());
    assert!(session.tick(at.next().unwrap()).is_none());
    assert_eq!(session.state(), &GateState::Monitoring);
    assert!(log.borrow().open);

    assert!(session.tick(at.next().unwrap()).is_none());
    assert_eq!(failure_kind(session.state()), Some(FailureKind::Device));
    assert!(!log.borrow().open);
    assert_eq!(log.borrow().released, 1);
    assert!(session.retry().is_err());
}

#[test]
fn test_read_failures_must_be_consecutive() {
    let mut config = Config::default();
    config.camera.max_failed_reads = 2;
    let dropped = || Err(Error::CaptureError("dropped frame".to_string()));
    let (source, _log) = ScriptedSource::repeating(centered_face_frame());
    let source = source
        .then(dropped())
        .then(Ok(centered_face_frame()))
        .then(dropped())
        .then(Ok(centered_face_frame()));
    let mut session = scripted_session(&config, source, RecordingClient::default());
    session.start().unwrap();

    for t in ticks(Instant::now(), 4) {
        session.tick(t);
    }
    assert_eq!(session.state(), &GateState::Monitoring);
}

#[test]
fn test_empty_still_is_capture_error_and_retriable() {
    let config = Config::default();
    let (source, _log) = ScriptedSource::repeating(centered_face_frame());
    let source = source.then(Ok(Frame::empty()));
    let client = RecordingClient::default();
    let received = client.received.clone();
    let mut session = scripted_session(&config, source, client);
    session.start().unwrap();

    session.capture_now().unwrap();
    assert_eq!(failure_kind(session.state()), Some(FailureKind::Capture));
    assert!(received.borrow().is_empty());

    session.retry().unwrap();
    assert_eq!(session.state(), &GateState::Monitoring);
    session.capture_now().unwrap();
    assert_eq!(session.state(), &GateState::Captured);
}

#[test]
fn test_dropped_frame_on_manual_capture_is_capture_error() {
    let config = Config::default();
    let (source, _log) = ScriptedSource::repeating(centered_face_frame());
    let source = source.then(Err(Error::CaptureError("dropped".to_string())));
    let mut session = scripted_session(&config, source, RecordingClient::default());
    session.start().unwrap();

    session.capture_now().unwrap();
    assert_eq!(failure_kind(session.state()), Some(FailureKind::Capture));
}

#[test]
fn test_analysis_failure_retry_resends_same_image() {
    let config = Config::default();
    let (source, _log) = ScriptedSource::repeating(centered_face_frame());
    let client = RecordingClient::failing(2);
    let received = client.received.clone();
    let mut session = scripted_session(&config, source, client);
    session.start().unwrap();

    session.capture_now().unwrap();
    match session.state() {
        GateState::Error(failure) => {
            assert_eq!(failure.kind, FailureKind::Analysis);
            assert!(failure.retriable());
            assert!(failure.message.contains("unavailable"));
        }
        other => panic!("expected analysis error, got {other}"),
    }

    session.retry().unwrap();
    assert_eq!(failure_kind(session.state()), Some(FailureKind::Analysis));
    session.retry().unwrap();
    assert_eq!(session.state(), &GateState::Captured);

    let received = received.borrow();
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|image| image.bytes == received[0].bytes));
}

#[test]
fn test_retake_after_analysis_failure() {
    let config = Config::default();
    let (source, _log) = ScriptedSource::repeating(centered_face_frame());
    let mut session = scripted_session(&config, source, RecordingClient::failing(1));
    session.start().unwrap();
    session.capture_now().unwrap();
    assert!(session.captured_image().is_some());

    session.retake();
    assert_eq!(session.state(), &GateState::Monitoring);
    assert!(session.captured_image().is_none());
}

/// Estimator failing on every other frame
struct FlakyEstimator {
    calls: usize,
}

impl FaceRegionEstimator for FlakyEstimator {
    fn estimate(&mut self, _frame: &Frame) -> Result<FaceRegion> {
        self.calls += 1;
        if self.calls % 2 == 0 {
            Err(Error::ModelError("inference timeout".to_string()))
        } else {
            Ok(FaceRegion::not_detected())
        }
    }

    fn name(&self) -> &str {
        "FlakyEstimator"
    }
}

#[test]
fn test_extraction_failure_skips_tick() {
    let config = Config::default();
    let (source, _log) = ScriptedSource::repeating(centered_face_frame());
    let face = FaceCapability::Available(Box::new(FlakyEstimator { calls: 0 }));
    let mut session = CaptureSession::new(&config, source, face, RecordingClient::default());
    session.start().unwrap();

    let results: Vec<bool> = ticks(Instant::now(), 6).map(|t| session.tick(t).is_some()).collect();
    assert_eq!(results, vec![true, false, true, false, true, false]);
    assert_eq!(session.state(), &GateState::Monitoring);
}

#[test]
fn test_missing_model_without_fallback_is_unavailable() {
    let config = FaceDetectionConfig {
        backend: DetectorBackend::Model,
        model_path: "assets/does_not_exist.onnx".into(),
        fallback_to_color: false,
        ..FaceDetectionConfig::default()
    };
    let capability = select_estimator(&config);
    assert!(!capability.is_available());

    let fallback = select_estimator(&FaceDetectionConfig {
        fallback_to_color: true,
        ..config
    });
    assert_eq!(fallback.estimator_name(), Some("ColorHeuristicEstimator"));
}

#[test]
fn test_gate_rejects_out_of_order_actions() {
    let mut gate = CaptureGate::default();
    assert!(matches!(gate.analysis_succeeded(), Err(Error::InvalidTransition(_))));
    assert!(matches!(gate.analysis_failed("late"), Err(Error::InvalidTransition(_))));
    assert!(matches!(gate.retry(), Err(Error::InvalidTransition(_))));
    assert!(matches!(gate.capture_now(), Err(Error::InvalidTransition(_))));
    assert_eq!(gate.state(), &GateState::Idle);
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = Config::default();
    config.lighting.good_min = 210.0;
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

    let mut config = Config::default();
    config.stability.min_samples = config.stability.capacity + 1;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.camera.sample_interval_ms = 5;
    assert!(config.validate().is_err());

    assert!(Config::from_yaml("gate: [not, a, map]").is_err());
}
