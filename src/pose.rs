use crate::error::Error;
use num_traits::FromPrimitive;
use ordered_float::NotNan;
use std::ops::{Add, Sub};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, num_derive::FromPrimitive)]
pub(crate) enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointKind {
    pub(crate) fn from_idx(index: usize) -> Result<Self, Error> {
        Self::from_usize(index).ok_or(Error::ConvertUSizeToKeypointKind(index))
    }
}

pub(crate) const NUM_KEYPOINTS: usize = 17;

/// A 2-D position in source video pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub(crate) struct Point {
    x: f32,
    y: f32,
}

impl Point {
    pub(crate) fn new(x: f32, y: f32) -> Result<Self, Error> {
        Ok(Self {
            x: NotNan::new(x)
                .map_err(|e| Error::ConstructNotNan(e, x))?
                .into_inner(),
            y: NotNan::new(y)
                .map_err(|e| Error::ConstructNotNan(e, y))?
                .into_inner(),
        })
    }

    #[inline]
    pub(crate) fn x(self) -> f32 {
        self.x
    }

    #[inline]
    pub(crate) fn y(self) -> f32 {
        self.y
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::Output {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Keypoint {
    pub(crate) kind: KeypointKind,
    pub(crate) point: Point,
    pub(crate) score: f32,
}

pub(crate) type Keypoints = [Keypoint; NUM_KEYPOINTS];

/// One instant of the pose model's output: exactly one keypoint per joint,
/// stored in `KeypointKind` order.
#[derive(Debug, Copy, Clone)]
pub(crate) struct PoseFrame {
    keypoints: Keypoints,
}

impl PoseFrame {
    /// Build a frame from `(x, y, score)` triples given in `KeypointKind` order.
    pub(crate) fn from_triples(triples: &[(f32, f32, f32)]) -> Result<Self, Error> {
        if triples.len() != NUM_KEYPOINTS {
            return Err(Error::KeypointCount(triples.len()));
        }

        let mut keypoints = [Keypoint {
            kind: KeypointKind::Nose,
            point: Point::default(),
            score: 0.0,
        }; NUM_KEYPOINTS];

        for (i, &(x, y, score)) in triples.iter().enumerate() {
            let score = NotNan::new(score)
                .map_err(|e| Error::ConstructNotNan(e, score))?
                .into_inner();
            keypoints[i] = Keypoint {
                kind: KeypointKind::from_idx(i)?,
                point: Point::new(x, y)?,
                score: score.clamp(0.0, 1.0),
            };
        }

        Ok(Self { keypoints })
    }

    pub(crate) fn keypoints(&self) -> &Keypoints {
        &self.keypoints
    }
}
