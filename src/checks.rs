//! Per-tick check aggregation and status messages.

use crate::face_detection::{FaceDistance, FaceRegion};
use crate::lighting::{LightingLevel, LightingSignal};
use serde::Serialize;
use std::fmt;

/// Aggregate per-tick verdict consumed by the capture gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChecksState {
    pub face_detected: bool,
    pub face_centered: bool,
    pub good_distance: bool,
    pub good_lighting: bool,
    pub holding_still: bool,
    /// False when no face estimator could be selected
    pub detection_available: bool,
}

impl ChecksState {
    /// Combine the per-tick signals
    #[must_use]
    pub fn from_signals(lighting: &LightingSignal, face: Option<&FaceRegion>, holding_still: bool) -> Self {
        let good_lighting = lighting.is_good();
        match face {
            Some(region) => Self {
                face_detected: region.detected(),
                face_centered: region.detected() && region.centered,
                good_distance: region.detected() && region.distance == FaceDistance::Good,
                good_lighting,
                holding_still: region.detected() && holding_still,
                detection_available: true,
            },
            None => Self {
                good_lighting,
                ..Self::default()
            },
        }
    }

    /// All five checks pass
    #[must_use]
    pub fn all_pass(&self) -> bool {
        self.detection_available
            && self.face_detected
            && self.face_centered
            && self.good_distance
            && self.good_lighting
            && self.holding_still
    }
}

/// Human-readable guidance derived from one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusMessage {
    TooDark,
    TooBright,
    DimLighting,
    NoFace,
    NotCentered,
    TooFar,
    TooClose,
    HoldStill,
    DetectionUnavailable,
    Ready,
}

impl StatusMessage {
    /// Pick the most relevant message: lighting, then face presence and
    /// centering, then distance, then stillness
    #[must_use]
    pub fn derive(lighting: &LightingSignal, face: Option<&FaceRegion>, checks: &ChecksState) -> Self {
        match lighting.level {
            LightingLevel::TooDark => return Self::TooDark,
            LightingLevel::TooBright => return Self::TooBright,
            LightingLevel::Okay => return Self::DimLighting,
            LightingLevel::Good => {}
        }

        let Some(region) = face else {
            return Self::DetectionUnavailable;
        };

        if !region.detected() {
            Self::NoFace
        } else if !region.centered {
            Self::NotCentered
        } else if region.distance == FaceDistance::TooFar {
            Self::TooFar
        } else if region.distance == FaceDistance::TooClose {
            Self::TooClose
        } else if !checks.holding_still {
            Self::HoldStill
        } else {
            Self::Ready
        }
    }

    /// Whether this message means every condition is met
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self == Self::Ready
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TooDark => "Too dark - find better lighting",
            Self::TooBright => "Too bright - avoid direct light",
            Self::DimLighting => "Lighting could be better",
            Self::NoFace => "Position your face in the frame",
            Self::NotCentered => "Center your face in the frame",
            Self::TooFar => "Move closer",
            Self::TooClose => "Move back a little",
            Self::HoldStill => "Hold still",
            Self::DetectionUnavailable => "Face checks unavailable - use manual capture",
            Self::Ready => "All conditions met",
        };
        f.write_str(text)
    }
}
