use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("failed to convert usize value to keypoint kind: {0}")]
    ConvertUSizeToKeypointKind(usize),

    #[error("failed to construct NotNan from f32: {1}")]
    ConstructNotNan(#[source] ordered_float::FloatIsNan, f32),

    #[error("expected 17 keypoints per frame, got {0}")]
    KeypointCount(usize),

    #[error("{name} confidence threshold must lie within [0, 1], got {value}")]
    ConfidenceOutOfRange { name: &'static str, value: f32 },

    #[error("{0} must be greater than zero")]
    ZeroSetting(&'static str),

    #[error("partial quality minimum {partial} must be below good quality minimum {good}")]
    QualityThresholdOrder { partial: usize, good: usize },

    #[error("{exercise} down threshold {down}° must be below up threshold {up}°")]
    HysteresisOrder {
        exercise: &'static str,
        down: f32,
        up: f32,
    },

    #[error("failed to open input file: {1:?}")]
    OpenInput(#[source] std::io::Error, PathBuf),

    #[error("failed to read input line {1}")]
    ReadInput(#[source] std::io::Error, usize),

    #[error("failed to parse input line {1}")]
    ParseEvent(#[source] serde_json::Error, usize),

    #[error("invalid frame on input line {1}")]
    InvalidFrame(#[source] Box<Error>, usize),
}
