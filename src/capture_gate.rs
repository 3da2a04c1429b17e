//! Capture gate: the countdown state machine deciding when auto-capture fires.
//!
//! ```text
//! Idle --camera_ready--> Monitoring --all checks pass for `sustained`--> Countdown(n)
//! Countdown(n) --any failing tick--> Monitoring
//! Countdown(n) --`countdown_step` elapsed--> Countdown(n-1) ... Countdown(1) --> Capturing
//! Capturing --analysis ok--> Captured      Capturing --failure--> Error
//! ```
//!
//! The sustained-duration counter is wall-clock based and is cleared on every
//! failing tick, so a regression during the countdown restarts the full wait.
//! A tick that produced no usable frame counts as failing.

use crate::checks::ChecksState;
use crate::config::GateConfig;
use crate::{Error, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Which stage of the pipeline failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Camera permission denied, unavailable or lost
    Device,
    /// Grabbing or encoding the still failed
    Capture,
    /// The analysis collaborator failed
    Analysis,
}

/// Failure surfaced as gate state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GateFailure {
    /// Capture and analysis failures can be retried in place; device failures
    /// need the camera to be re-acquired
    #[must_use]
    pub fn retriable(&self) -> bool {
        matches!(self.kind, FailureKind::Capture | FailureKind::Analysis)
    }
}

/// Gate state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    /// Camera not ready
    Idle,
    /// Camera ready, evaluating checks
    Monitoring,
    /// Counting down; the value is the number shown to the user
    Countdown(u8),
    /// Still grabbed and handed to the analysis collaborator
    Capturing,
    /// Analysis finished
    Captured,
    /// Terminal failure until a user action
    Error(GateFailure),
}

impl GateState {
    /// States in which frames are sampled and checks evaluated
    #[must_use]
    pub fn is_sampling(&self) -> bool {
        matches!(self, Self::Monitoring | Self::Countdown(_))
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Monitoring => f.write_str("monitoring"),
            Self::Countdown(n) => write!(f, "countdown({n})"),
            Self::Capturing => f.write_str("capturing"),
            Self::Captured => f.write_str("captured"),
            Self::Error(failure) => write!(f, "error({:?}: {})", failure.kind, failure.message),
        }
    }
}

/// What a tick changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateEvent {
    None,
    CountdownStarted(u8),
    CountdownStep(u8),
    CountdownCancelled,
    CaptureTriggered,
}

/// What `retry` asks the caller to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Send the held still to the analysis collaborator again
    ResendAnalysis,
    /// Resume monitoring for a new capture
    Resume,
}

/// Countdown state machine
#[derive(Debug, Clone)]
pub struct CaptureGate {
    sustained: Duration,
    countdown_from: u8,
    countdown_step: Duration,
    state: GateState,
    camera_ready: bool,
    sustained_since: Option<Instant>,
    step_started: Option<Instant>,
    captures: u64,
}

impl Default for CaptureGate {
    fn default() -> Self {
        Self::new(&GateConfig::default())
    }
}

impl CaptureGate {
    #[must_use]
    pub fn new(config: &GateConfig) -> Self {
        Self {
            sustained: config.sustained(),
            countdown_from: config.countdown_from.max(1),
            countdown_step: config.countdown_step(),
            state: GateState::Idle,
            camera_ready: false,
            sustained_since: None,
            step_started: None,
            captures: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Number of captures triggered since creation
    #[must_use]
    pub fn captures(&self) -> u64 {
        self.captures
    }

    /// How long the checks have been passing continuously
    #[must_use]
    pub fn sustained_for(&self, now: Instant) -> Duration {
        self.sustained_since
            .map_or(Duration::ZERO, |since| now.saturating_duration_since(since))
    }

    /// The manual capture escape hatch is usable
    #[must_use]
    pub fn manual_capture_enabled(&self) -> bool {
        self.camera_ready && self.state != GateState::Capturing
    }

    /// The camera stream started
    pub fn camera_ready(&mut self) {
        self.camera_ready = true;
        if matches!(self.state, GateState::Idle | GateState::Error(_)) {
            self.enter(GateState::Monitoring);
        }
    }

    /// Evaluate one tick of checks
    pub fn tick(&mut self, checks: &ChecksState, now: Instant) -> GateEvent {
        match self.state {
            GateState::Monitoring => {
                if !checks.all_pass() {
                    self.sustained_since = None;
                    return GateEvent::None;
                }
                let since = *self.sustained_since.get_or_insert(now);
                if now.saturating_duration_since(since) >= self.sustained {
                    let n = self.countdown_from;
                    self.step_started = Some(now);
                    self.enter(GateState::Countdown(n));
                    return GateEvent::CountdownStarted(n);
                }
                GateEvent::None
            }
            GateState::Countdown(n) => {
                if !checks.all_pass() {
                    self.clear_counters();
                    self.enter(GateState::Monitoring);
                    return GateEvent::CountdownCancelled;
                }
                let started = *self.step_started.get_or_insert(now);
                if now.saturating_duration_since(started) < self.countdown_step {
                    return GateEvent::None;
                }
                if n <= 1 {
                    self.begin_capture();
                    GateEvent::CaptureTriggered
                } else {
                    self.step_started = Some(now);
                    self.enter(GateState::Countdown(n - 1));
                    GateEvent::CountdownStep(n - 1)
                }
            }
            _ => GateEvent::None,
        }
    }

    /// A tick produced no usable frame; nothing was verified, so it counts as failing
    pub fn frame_skipped(&mut self) -> GateEvent {
        match self.state {
            GateState::Monitoring => {
                self.sustained_since = None;
                GateEvent::None
            }
            GateState::Countdown(_) => {
                self.clear_counters();
                self.enter(GateState::Monitoring);
                GateEvent::CountdownCancelled
            }
            _ => GateEvent::None,
        }
    }

    /// Capture immediately, regardless of the checks
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` while already capturing or before the camera is ready
    pub fn capture_now(&mut self) -> Result<()> {
        if self.state == GateState::Capturing {
            return Err(Error::InvalidTransition("capture already in progress".to_string()));
        }
        if !self.camera_ready {
            return Err(Error::InvalidTransition("camera is not ready".to_string()));
        }
        info!("Manual capture requested in state {}", self.state);
        self.begin_capture();
        Ok(())
    }

    /// Camera acquisition or streaming failed
    pub fn device_failed(&mut self, message: impl Into<String>) {
        self.camera_ready = false;
        self.fail(FailureKind::Device, message.into());
    }

    /// Grabbing or encoding the still failed
    pub fn capture_failed(&mut self, message: impl Into<String>) {
        self.fail(FailureKind::Capture, message.into());
    }

    /// The analysis collaborator returned a result
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless capturing
    pub fn analysis_succeeded(&mut self) -> Result<()> {
        self.expect_capturing("analysis result")?;
        self.enter(GateState::Captured);
        Ok(())
    }

    /// The analysis collaborator failed
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless capturing
    pub fn analysis_failed(&mut self, message: impl Into<String>) -> Result<()> {
        self.expect_capturing("analysis failure")?;
        self.fail(FailureKind::Analysis, message.into());
        Ok(())
    }

    /// User-initiated retry from an error state
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside a retriable error state
    pub fn retry(&mut self) -> Result<RetryAction> {
        let GateState::Error(failure) = &self.state else {
            return Err(Error::InvalidTransition(format!("nothing to retry in state {}", self.state)));
        };
        let kind = failure.kind;
        match kind {
            FailureKind::Analysis => {
                self.enter(GateState::Capturing);
                Ok(RetryAction::ResendAnalysis)
            }
            FailureKind::Capture if self.camera_ready => {
                self.clear_counters();
                self.enter(GateState::Monitoring);
                Ok(RetryAction::Resume)
            }
            _ => Err(Error::InvalidTransition(
                "camera must be re-acquired before retrying".to_string(),
            )),
        }
    }

    /// Discard the current capture and start monitoring again
    pub fn retake(&mut self) {
        self.clear_counters();
        let next = if self.camera_ready {
            GateState::Monitoring
        } else {
            GateState::Idle
        };
        self.enter(next);
    }

    /// Camera released
    pub fn stop(&mut self) {
        self.camera_ready = false;
        self.clear_counters();
        self.enter(GateState::Idle);
    }

    fn begin_capture(&mut self) {
        self.clear_counters();
        self.captures += 1;
        self.enter(GateState::Capturing);
    }

    fn expect_capturing(&self, what: &str) -> Result<()> {
        if self.state == GateState::Capturing {
            Ok(())
        } else {
            Err(Error::InvalidTransition(format!("{what} received in state {}", self.state)))
        }
    }

    fn fail(&mut self, kind: FailureKind, message: String) {
        warn!("Capture gate failure ({:?}): {}", kind, message);
        self.clear_counters();
        self.enter(GateState::Error(GateFailure { kind, message }));
    }

    fn clear_counters(&mut self) {
        self.sustained_since = None;
        self.step_started = None;
    }

    fn enter(&mut self, next: GateState) {
        if self.state != next {
            debug!("Capture gate: {} -> {}", self.state, next);
            self.state = next;
        }
    }
}
