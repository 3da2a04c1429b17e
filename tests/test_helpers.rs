//! Helper functions and utilities for tests
#![allow(dead_code)]

use face_capture_gate::{
    analysis::{AnalysisClient, EncodedImage},
    camera::FrameSource,
    config::Config,
    face_detection::{ColorHeuristicEstimator, FaceCapability},
    frame::Frame,
    session::CaptureSession,
    Error, Result,
};
use rand::Rng;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

pub const SKIN: [u8; 3] = [220, 170, 140];
pub const BACKGROUND: [u8; 3] = [120, 120, 120];

/// Virtual tick spacing matching the default sample interval
pub const TICK: Duration = Duration::from_millis(150);

/// Frame with a skin-colored rectangle on a neutral background
pub fn face_frame(width: u32, height: u32, x: u32, y: u32, face_w: u32, face_h: u32) -> Frame {
    let mut frame = Frame::filled(width, height, BACKGROUND).unwrap();
    frame.fill_rect(x, y, face_w, face_h, SKIN);
    frame
}

/// 640x480 frame with a well-sized face in the middle
pub fn centered_face_frame() -> Frame {
    face_frame(640, 480, 220, 120, 200, 240)
}

/// Same face pushed against the left edge
pub fn off_center_face_frame() -> Frame {
    face_frame(640, 480, 0, 120, 200, 240)
}

pub fn empty_room_frame() -> Frame {
    Frame::filled(640, 480, BACKGROUND).unwrap()
}

/// Add uniform noise of up to `amplitude` to every channel
pub fn add_noise<R: Rng>(frame: &Frame, amplitude: i16, rng: &mut R) -> Frame {
    let data = frame
        .as_bytes()
        .iter()
        .map(|&v| {
            let noisy = i16::from(v) + rng.gen_range(-amplitude..=amplitude);
            noisy.clamp(0, 255) as u8
        })
        .collect();
    Frame::new(frame.width(), frame.height(), data).unwrap()
}

/// Observable side of a [`ScriptedSource`]
#[derive(Debug, Default)]
pub struct SourceLog {
    pub opened: usize,
    pub released: usize,
    pub reads: usize,
    pub open: bool,
}

/// Frame source replaying queued results, then repeating a fallback frame
pub struct ScriptedSource {
    queue: VecDeque<Result<Frame>>,
    fallback: Frame,
    deny_permission: bool,
    log: Rc<RefCell<SourceLog>>,
}

impl ScriptedSource {
    pub fn repeating(frame: Frame) -> (Self, Rc<RefCell<SourceLog>>) {
        let log = Rc::new(RefCell::new(SourceLog::default()));
        let source = Self {
            queue: VecDeque::new(),
            fallback: frame,
            deny_permission: false,
            log: Rc::clone(&log),
        };
        (source, log)
    }

    pub fn denied() -> (Self, Rc<RefCell<SourceLog>>) {
        let (mut source, log) = Self::repeating(Frame::empty());
        source.deny_permission = true;
        (source, log)
    }

    pub fn then(mut self, result: Result<Frame>) -> Self {
        self.queue.push_back(result);
        self
    }
}

impl FrameSource for ScriptedSource {
    fn open(&mut self) -> Result<()> {
        if self.deny_permission {
            return Err(Error::CameraPermissionDenied("user refused camera access".to_string()));
        }
        let mut log = self.log.borrow_mut();
        log.opened += 1;
        log.open = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let mut log = self.log.borrow_mut();
        if !log.open {
            return Err(Error::CameraUnavailable("not open".to_string()));
        }
        log.reads += 1;
        self.queue.pop_front().unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn release(&mut self) {
        let mut log = self.log.borrow_mut();
        if log.open {
            log.released += 1;
        }
        log.open = false;
    }

    fn is_open(&self) -> bool {
        self.log.borrow().open
    }
}

/// Analysis collaborator recording every still it receives
#[derive(Default)]
pub struct RecordingClient {
    pub received: Rc<RefCell<Vec<EncodedImage>>>,
    pub failures_left: usize,
}

impl RecordingClient {
    pub fn failing(times: usize) -> Self {
        Self {
            failures_left: times,
            ..Self::default()
        }
    }
}

impl AnalysisClient for RecordingClient {
    type Report = String;

    fn analyze(&mut self, image: &EncodedImage) -> Result<String> {
        self.received.borrow_mut().push(image.clone());
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(Error::AnalysisError("analysis service unavailable".to_string()));
        }
        Ok(format!("skin report for {}x{}", image.width, image.height))
    }
}

pub fn color_estimator(config: &Config) -> FaceCapability {
    FaceCapability::Available(Box::new(ColorHeuristicEstimator::from_config(&config.face_detection)))
}

/// Session over a scripted source with the color estimator
pub fn scripted_session(
    config: &Config,
    source: ScriptedSource,
    client: RecordingClient,
) -> CaptureSession<ScriptedSource, RecordingClient> {
    CaptureSession::new(config, source, color_estimator(config), client)
}

/// Timestamps `start + TICK * i`
pub fn ticks(start: Instant, count: u32) -> impl Iterator<Item = Instant> {
    (0..count).map(move |i| start + TICK * i)
}
