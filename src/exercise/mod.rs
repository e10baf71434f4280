use crate::{config::EngineConfig, gate::GatedFrame, status::Status};
use std::fmt;

mod hysteresis;
mod idle;
mod plank;

pub(crate) use hysteresis::AngleRepCounter;
pub(crate) use idle::Idle;
pub(crate) use plank::PlankDetector;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RepState {
    Unknown,
    Up,
    Down,
    Plank,
}

impl fmt::Display for RepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Up => "up",
            Self::Down => "down",
            Self::Plank => "plank",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum ExerciseEvent {
    /// The bottom of a rep was reached; nothing is counted yet.
    BottomReached { angle: f32 },
    RepCompleted,
    HoldStarted,
    HoldLost,
}

/// What a rep state machine decided about one frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Outcome {
    pub(crate) state: RepState,
    pub(crate) smoothed_angle: Option<f32>,
    pub(crate) event: Option<ExerciseEvent>,
    pub(crate) status: Status,
}

pub(crate) trait RepStateMachine {
    /// Consume one gated frame. Frames without enough confident joints are
    /// skipped: no transition, and the returned status says why.
    fn update(&mut self, gated: &GatedFrame) -> Outcome;

    fn state(&self) -> RepState;

    /// Forget smoothing history but keep the rep state.
    fn clear_smoothing(&mut self);

    /// Return to a fresh `Unknown` state with empty history.
    fn reset(&mut self);
}

/// The closed set of exercises the engine understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ExerciseKind {
    Squat,
    PushUp,
    Plank,
    /// Anything else; tracked with a profile that never counts.
    Unrecognized(String),
}

impl ExerciseKind {
    pub(crate) fn from_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "squat" | "squats" => Self::Squat,
            "pushup" | "pushups" | "push-up" | "push-ups" => Self::PushUp,
            "plank" | "planks" => Self::Plank,
            _ => Self::Unrecognized(id.to_owned()),
        }
    }

    pub(crate) fn id(&self) -> &str {
        match self {
            Self::Squat => "squats",
            Self::PushUp => "pushups",
            Self::Plank => "planks",
            Self::Unrecognized(id) => id,
        }
    }

    /// Capitalised label for summaries.
    pub(crate) fn display_name(&self) -> String {
        let id = self.id();
        let mut chars = id.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Exercise {
    Squat(AngleRepCounter),
    PushUp(AngleRepCounter),
    Plank(PlankDetector),
    Idle(Idle),
}

impl Exercise {
    pub(crate) fn new(kind: &ExerciseKind, config: &EngineConfig) -> Self {
        match kind {
            ExerciseKind::Squat => Self::Squat(AngleRepCounter::squat(config)),
            ExerciseKind::PushUp => Self::PushUp(AngleRepCounter::pushup(config)),
            ExerciseKind::Plank => Self::Plank(PlankDetector::new(config.plank_max_offset())),
            ExerciseKind::Unrecognized(_) => Self::Idle(Idle),
        }
    }
}

impl RepStateMachine for Exercise {
    fn update(&mut self, gated: &GatedFrame) -> Outcome {
        match self {
            Self::Squat(m) | Self::PushUp(m) => m.update(gated),
            Self::Plank(m) => m.update(gated),
            Self::Idle(m) => m.update(gated),
        }
    }

    fn state(&self) -> RepState {
        match self {
            Self::Squat(m) | Self::PushUp(m) => m.state(),
            Self::Plank(m) => m.state(),
            Self::Idle(m) => m.state(),
        }
    }

    fn clear_smoothing(&mut self) {
        match self {
            Self::Squat(m) | Self::PushUp(m) => m.clear_smoothing(),
            Self::Plank(m) => m.clear_smoothing(),
            Self::Idle(m) => m.clear_smoothing(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Squat(m) | Self::PushUp(m) => m.reset(),
            Self::Plank(m) => m.reset(),
            Self::Idle(m) => m.reset(),
        }
    }
}
