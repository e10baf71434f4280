//! Left/right side selection for the joints an exercise measures.

use crate::{
    gate::GatedFrame,
    pose::{Keypoint, KeypointKind},
};
use ordered_float::OrderedFloat;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// A three-joint chain whose angle at the middle joint drives a rep counter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Limb {
    /// hip, knee, ankle
    Leg,
    /// shoulder, elbow, wrist
    Arm,
}

impl Limb {
    /// The (proximal, vertex, distal) joints of this limb on `side`.
    pub(crate) fn joints(self, side: Side) -> [KeypointKind; 3] {
        use KeypointKind::*;

        match (self, side) {
            (Self::Leg, Side::Left) => [LeftHip, LeftKnee, LeftAnkle],
            (Self::Leg, Side::Right) => [RightHip, RightKnee, RightAnkle],
            (Self::Arm, Side::Left) => [LeftShoulder, LeftElbow, LeftWrist],
            (Self::Arm, Side::Right) => [RightShoulder, RightElbow, RightWrist],
        }
    }
}

impl fmt::Display for Limb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Leg => "leg",
            Self::Arm => "arm",
        })
    }
}

/// All three joints of one side of a limb, each above the confidence threshold.
#[derive(Debug, Copy, Clone)]
pub(crate) struct LimbReading {
    pub(crate) side: Side,
    pub(crate) joints: [Keypoint; 3],
}

impl LimbReading {
    fn read(gated: &GatedFrame, limb: Limb, side: Side) -> Option<Self> {
        let [proximal, vertex, distal] = limb.joints(side);
        Some(Self {
            side,
            joints: [
                *gated.get(proximal)?,
                *gated.get(vertex)?,
                *gated.get(distal)?,
            ],
        })
    }

    fn total_score(&self) -> OrderedFloat<f32> {
        OrderedFloat(self.joints.iter().map(|keypoint| keypoint.score).sum())
    }
}

/// Pick one side of `limb` for this frame. Sides are never mixed.
///
/// A side qualifies when all three joints are visible. When both qualify the
/// `preferred` side (the one used on the previous frame) wins, otherwise the
/// side with the higher summed confidence, ties going left.
pub(crate) fn select_side(
    gated: &GatedFrame,
    limb: Limb,
    preferred: Option<Side>,
) -> Option<LimbReading> {
    match (
        LimbReading::read(gated, limb, Side::Left),
        LimbReading::read(gated, limb, Side::Right),
    ) {
        (Some(left), Some(right)) => Some(match preferred {
            Some(Side::Left) => left,
            Some(Side::Right) => right,
            None if right.total_score() > left.total_score() => right,
            None => left,
        }),
        (left, right) => left.or(right),
    }
}

/// The most confident visible keypoint of a left/right pair.
pub(crate) fn most_confident(
    gated: &GatedFrame,
    left: KeypointKind,
    right: KeypointKind,
) -> Option<Keypoint> {
    match (gated.get(left), gated.get(right)) {
        (Some(l), Some(r)) if OrderedFloat(r.score) > OrderedFloat(l.score) => Some(*r),
        (Some(l), _) => Some(*l),
        (None, r) => r.copied(),
    }
}
