use super::{Outcome, RepState, RepStateMachine};
use crate::{gate::GatedFrame, status::Status};

/// Profile for exercise ids the engine does not recognise. It observes
/// frames and never counts.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Idle;

impl RepStateMachine for Idle {
    fn update(&mut self, _gated: &GatedFrame) -> Outcome {
        Outcome {
            state: RepState::Unknown,
            smoothed_angle: None,
            event: None,
            status: Status::UnrecognizedExercise,
        }
    }

    fn state(&self) -> RepState {
        RepState::Unknown
    }

    fn clear_smoothing(&mut self) {}

    fn reset(&mut self) {}
}
