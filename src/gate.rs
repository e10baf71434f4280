//! Confidence gating of raw pose frames.
//!
//! Consumers must treat a missing joint as a normal, frequent case: the model
//! warms up with empty frames and occlusion hides joints constantly.

use crate::pose::{Keypoint, KeypointKind, PoseFrame, NUM_KEYPOINTS};

/// The keypoints of one frame whose confidence clears a threshold.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GatedFrame {
    visible: [Option<Keypoint>; NUM_KEYPOINTS],
    count: usize,
}

impl GatedFrame {
    /// Gate `frame` at `threshold`. A `None` frame gates to nothing visible.
    pub(crate) fn new(frame: Option<&PoseFrame>, threshold: f32) -> Self {
        let mut visible = [None; NUM_KEYPOINTS];
        let mut count = 0;

        if let Some(frame) = frame {
            for (slot, keypoint) in visible.iter_mut().zip(frame.keypoints().iter()) {
                if keypoint.score > threshold {
                    *slot = Some(*keypoint);
                    count += 1;
                }
            }
        }

        Self { visible, count }
    }

    pub(crate) fn visible_count(&self) -> usize {
        self.count
    }

    pub(crate) fn get(&self, kind: KeypointKind) -> Option<&Keypoint> {
        self.visible.get(kind as usize).and_then(Option::as_ref)
    }
}
