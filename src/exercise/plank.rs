use super::{ExerciseEvent, Outcome, RepState, RepStateMachine};
use crate::{
    gate::GatedFrame,
    limb::most_confident,
    pose::KeypointKind,
    status::{Region, Status},
};
use tracing::trace;

/// Hold detector: the body counts as a plank while the most confident
/// shoulder and hip sit within `max_offset` pixels of each other vertically.
#[derive(Debug, Clone)]
pub(crate) struct PlankDetector {
    max_offset: f32,
    state: RepState,
}

impl PlankDetector {
    pub(crate) fn new(max_offset: f32) -> Self {
        Self {
            max_offset,
            state: RepState::Unknown,
        }
    }
}

impl RepStateMachine for PlankDetector {
    fn update(&mut self, gated: &GatedFrame) -> Outcome {
        let shoulder = most_confident(gated, KeypointKind::LeftShoulder, KeypointKind::RightShoulder);
        let hip = most_confident(gated, KeypointKind::LeftHip, KeypointKind::RightHip);

        let (shoulder, hip) = match (shoulder, hip) {
            (Some(shoulder), Some(hip)) => (shoulder, hip),
            _ => {
                return Outcome {
                    state: self.state,
                    smoothed_angle: None,
                    event: None,
                    status: Status::InsufficientConfidence(Region::Torso),
                }
            }
        };

        let offset = (hip.point.y() - shoulder.point.y()).abs();
        let holding = offset < self.max_offset;
        trace!(shoulder = ?shoulder.kind, hip = ?hip.kind, offset, holding);

        let event = match (holding, self.state) {
            (true, RepState::Plank) | (false, RepState::Unknown) => None,
            (true, _) => {
                self.state = RepState::Plank;
                Some(ExerciseEvent::HoldStarted)
            }
            (false, _) => {
                self.state = RepState::Unknown;
                Some(ExerciseEvent::HoldLost)
            }
        };

        let status = match event {
            Some(ExerciseEvent::HoldStarted) => Status::HoldStarted,
            Some(ExerciseEvent::HoldLost) => Status::HoldLost,
            _ => Status::PlankOffset { offset, holding },
        };

        Outcome {
            state: self.state,
            smoothed_angle: None,
            event,
            status,
        }
    }

    fn state(&self) -> RepState {
        self.state
    }

    fn clear_smoothing(&mut self) {}

    fn reset(&mut self) {
        self.state = RepState::Unknown;
    }
}
