use super::{ExerciseEvent, Outcome, RepState, RepStateMachine};
use crate::{
    angle::{joint_angle, AngleSmoother},
    config::{EngineConfig, Thresholds},
    gate::GatedFrame,
    limb::{select_side, Limb, Side},
    status::{Region, Status},
};
use tracing::trace;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    None,
    /// First classification out of `Unknown` at the top of the range.
    Resolved,
    Bottom,
    Rep,
}

/// Two-threshold rep detector over smoothed angles.
///
/// A rep is the path below `down` followed by a rise above `up`; values
/// between the thresholds never change state, so noise inside one band
/// cannot count twice.
#[derive(Debug, Clone)]
pub(crate) struct Hysteresis {
    thresholds: Thresholds,
    state: RepState,
    rep_in_progress: bool,
}

impl Hysteresis {
    pub(crate) fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: RepState::Unknown,
            rep_in_progress: false,
        }
    }

    pub(crate) fn observe(&mut self, smoothed: f32) -> Transition {
        let Thresholds { down, up } = self.thresholds;

        if smoothed < down && !self.rep_in_progress {
            self.rep_in_progress = true;
            self.state = RepState::Down;
            Transition::Bottom
        } else if smoothed > up && self.rep_in_progress {
            self.rep_in_progress = false;
            self.state = RepState::Up;
            Transition::Rep
        } else if smoothed > up && self.state == RepState::Unknown {
            self.state = RepState::Up;
            Transition::Resolved
        } else {
            Transition::None
        }
    }

    pub(crate) fn state(&self) -> RepState {
        self.state
    }

    pub(crate) fn rep_in_progress(&self) -> bool {
        self.rep_in_progress
    }

    pub(crate) fn reset(&mut self) {
        self.state = RepState::Unknown;
        self.rep_in_progress = false;
    }
}

/// Rep counter for exercises measured by the angle at one joint.
#[derive(Debug, Clone)]
pub(crate) struct AngleRepCounter {
    exercise: &'static str,
    limb: Limb,
    hysteresis: Hysteresis,
    smoother: AngleSmoother,
    active_side: Option<Side>,
}

impl AngleRepCounter {
    pub(crate) fn new(
        exercise: &'static str,
        limb: Limb,
        thresholds: Thresholds,
        window: usize,
    ) -> Self {
        Self {
            exercise,
            limb,
            hysteresis: Hysteresis::new(thresholds),
            smoother: AngleSmoother::new(window),
            active_side: None,
        }
    }

    pub(crate) fn squat(config: &EngineConfig) -> Self {
        Self::new(
            "squat",
            Limb::Leg,
            config.squat_thresholds(),
            config.angle_window,
        )
    }

    pub(crate) fn pushup(config: &EngineConfig) -> Self {
        Self::new(
            "push-up",
            Limb::Arm,
            config.pushup_thresholds(),
            config.angle_window,
        )
    }
}

impl RepStateMachine for AngleRepCounter {
    fn update(&mut self, gated: &GatedFrame) -> Outcome {
        let reading = match select_side(gated, self.limb, self.active_side) {
            Some(reading) => reading,
            None => {
                return Outcome {
                    state: self.hysteresis.state(),
                    smoothed_angle: self.smoother.mean(),
                    event: None,
                    status: Status::InsufficientConfidence(Region::Limb(self.limb)),
                }
            }
        };

        if self.active_side != Some(reading.side) {
            // the window describes one limb only
            self.smoother.clear();
            self.active_side = Some(reading.side);
        }

        let [proximal, vertex, distal] = reading.joints;
        let angle = joint_angle(proximal.point, vertex.point, distal.point);
        let smoothed = self.smoother.push(angle);
        let transition = self.hysteresis.observe(smoothed);

        trace!(
            exercise = self.exercise,
            side = %reading.side,
            angle,
            smoothed,
            in_progress = self.hysteresis.rep_in_progress(),
            ?transition
        );

        let event = match transition {
            Transition::Bottom => Some(ExerciseEvent::BottomReached { angle: smoothed }),
            Transition::Rep => Some(ExerciseEvent::RepCompleted),
            Transition::Resolved | Transition::None => None,
        };

        let status = match transition {
            Transition::Bottom => Status::RepStarted {
                exercise: self.exercise,
                angle: smoothed,
            },
            _ => Status::LimbAngle {
                exercise: self.exercise,
                side: reading.side,
                limb: self.limb,
                angle,
                state: self.hysteresis.state(),
            },
        };

        Outcome {
            state: self.hysteresis.state(),
            smoothed_angle: Some(smoothed),
            event,
            status,
        }
    }

    fn state(&self) -> RepState {
        self.hysteresis.state()
    }

    fn clear_smoothing(&mut self) {
        self.smoother.clear();
    }

    fn reset(&mut self) {
        self.hysteresis.reset();
        self.smoother.clear();
        self.active_side = None;
    }
}
