//! The engine's last decision as a structured value. Presentation layers
//! format it; the `Display` impl is the default debug rendering.

use crate::{
    alignment::{AlignmentState, CalibrationPath},
    exercise::RepState,
    limb::{Limb, Side},
    quality::DetectionQuality,
};
use std::fmt;

/// The part of the body a decision needed to see.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Region {
    Limb(Limb),
    Torso,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limb(limb) => write!(f, "{}", limb),
            Self::Torso => f.write_str("shoulder and hip"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Status {
    /// No session has been started.
    Idle,
    /// The pose model produced no frame yet.
    ModelWarmingUp,
    Detection {
        quality: DetectionQuality,
        average: usize,
    },
    UpstreamFailure(String),
    /// The user overrode the detection quality gate.
    DetectionForced,
    Alignment {
        state: AlignmentState,
        visible: usize,
        required: usize,
    },
    Countdown {
        remaining: u32,
    },
    Calibrated(CalibrationPath),
    OverrideUnavailable {
        remaining_secs: u32,
    },
    InsufficientConfidence(Region),
    LimbAngle {
        exercise: &'static str,
        side: Side,
        limb: Limb,
        angle: f32,
        state: RepState,
    },
    RepStarted {
        exercise: &'static str,
        angle: f32,
    },
    RepCompleted {
        count: u32,
    },
    PlankOffset {
        offset: f32,
        holding: bool,
    },
    HoldStarted,
    HoldLost,
    UnrecognizedExercise,
    /// A clock second passed without any frame; nothing accrued.
    NoFrames,
    Stopped {
        count: u32,
        seconds: u64,
    },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Waiting to start"),
            Self::ModelWarmingUp => write!(f, "Waiting for the pose model"),
            Self::Detection {
                quality: DetectionQuality::None,
                average,
            } => write!(
                f,
                "Detection poor: only {} keypoints visible. Try adjusting lighting or position.",
                average
            ),
            Self::Detection { quality, average } => {
                write!(f, "Detection {}: {} keypoints visible", quality, average)
            }
            Self::UpstreamFailure(message) => write!(f, "Upstream failure: {}", message),
            Self::DetectionForced => write!(f, "Detection forced by user"),
            Self::Alignment {
                state,
                visible,
                required,
            } => write!(
                f,
                "Alignment {}: {} of {} keypoints visible",
                state, visible, required
            ),
            Self::Countdown { remaining } => write!(f, "Hold still: {}", remaining),
            Self::Calibrated(path) => write!(f, "Calibration complete ({})", path),
            Self::OverrideUnavailable { remaining_secs } => write!(
                f,
                "Manual calibration available in {} s",
                remaining_secs
            ),
            Self::InsufficientConfidence(region) => write!(
                f,
                "Insufficient joint confidence: {} keypoints not visible enough",
                region
            ),
            Self::LimbAngle {
                exercise,
                side,
                limb,
                angle,
                state,
            } => write!(
                f,
                "{} {} {} angle: {:.1}°, state: {}",
                exercise, side, limb, angle, state
            ),
            Self::RepStarted { exercise, angle } => {
                write!(f, "{} started: {:.1}°", exercise, angle)
            }
            Self::RepCompleted { count } => write!(f, "Rep completed! Count: {}", count),
            Self::PlankOffset { offset, holding } => write!(
                f,
                "Plank detection: y-diff={:.1}, horizontal={}",
                offset, holding
            ),
            Self::HoldStarted => write!(f, "Plank position detected!"),
            Self::HoldLost => write!(f, "Plank position lost"),
            Self::UnrecognizedExercise => write!(f, "Unrecognized exercise: nothing to count"),
            Self::NoFrames => write!(f, "No frames received in the last second"),
            Self::Stopped { count, seconds } => write!(
                f,
                "Stopped: {} in {}",
                count,
                crate::clock::format_clock(*seconds)
            ),
        }
    }
}
