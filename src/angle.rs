use crate::pose::Point;
use std::collections::VecDeque;

/// Angle in degrees at `vertex` between the rays to `proximal` and `distal`,
/// reflected into `[0, 180]`.
pub(crate) fn joint_angle(proximal: Point, vertex: Point, distal: Point) -> f32 {
    let to_distal = distal - vertex;
    let to_proximal = proximal - vertex;
    let radians = to_distal.y().atan2(to_distal.x()) - to_proximal.y().atan2(to_proximal.x());
    reflect(radians.to_degrees().abs())
}

/// Fold any non-negative angle into `[0, 180]`.
fn reflect(degrees: f32) -> f32 {
    let degrees = degrees.abs() % 360.0;
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

/// Moving average over the most recent joint angles of the active limb.
///
/// Lag grows with `capacity`; five frames is about 150 ms at 30 fps.
#[derive(Debug, Clone)]
pub(crate) struct AngleSmoother {
    history: VecDeque<f32>,
    capacity: usize,
}

impl AngleSmoother {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add an angle, evicting the oldest when full, and return the new mean.
    pub(crate) fn push(&mut self, degrees: f32) -> f32 {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(reflect(degrees));
        self.mean().unwrap_or_default()
    }

    pub(crate) fn mean(&self) -> Option<f32> {
        if self.history.is_empty() {
            None
        } else {
            Some(self.history.iter().sum::<f32>() / self.history.len() as f32)
        }
    }

    pub(crate) fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{joint_angle, AngleSmoother};
    use crate::pose::Point;
    use assert_approx_eq::assert_approx_eq;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y).unwrap()
    }

    #[test]
    fn colinear_points_are_straight() {
        assert_approx_eq!(joint_angle(p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)), 180.0, 1e-3);
        assert_approx_eq!(joint_angle(p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)), 180.0, 1e-3);
    }

    #[test]
    fn coincident_rays_are_closed() {
        assert_approx_eq!(joint_angle(p(2.0, 0.0), p(0.0, 0.0), p(4.0, 0.0)), 0.0, 1e-3);
    }

    #[test]
    fn right_angle() {
        assert_approx_eq!(joint_angle(p(0.0, 0.0), p(0.5, 0.0), p(0.5, 0.5)), 90.0, 1e-3);
    }

    #[test]
    fn reflex_angles_are_reflected() {
        // raw difference of atan2 values is 270 degrees here
        let angle = joint_angle(p(0.0, -1.0), p(0.0, 0.0), p(-1.0, 0.0));
        assert_approx_eq!(angle, 90.0, 1e-3);
        let angle = joint_angle(p(1.0, -0.1), p(0.0, 0.0), p(1.0, 0.1));
        assert!(angle >= 0.0 && angle <= 180.0);
    }

    #[test]
    fn invariant_under_translation() {
        let (a, b, c) = (p(3.0, 7.0), p(5.0, 2.0), p(9.0, 4.0));
        let offset = p(-120.0, 48.5);
        assert_approx_eq!(
            joint_angle(a, b, c),
            joint_angle(a + offset, b + offset, c + offset),
            1e-3
        );
    }

    #[test]
    fn smoother_is_bounded_by_capacity() {
        let mut smoother = AngleSmoother::new(5);
        for angle in 0..20 {
            smoother.push(angle as f32);
        }
        assert_eq!(smoother.history.len(), 5);
        assert_approx_eq!(smoother.mean().unwrap(), 17.0, 1e-4);
    }

    #[test]
    fn outlier_is_reflected_before_averaging() {
        let mut smoother = AngleSmoother::new(5);
        let mut smoothed = 0.0;
        for &angle in &[100.0, 102.0, 98.0, 300.0, 101.0] {
            smoothed = smoother.push(angle);
        }
        assert_approx_eq!(smoothed, (100.0 + 102.0 + 98.0 + 60.0 + 101.0) / 5.0, 1e-3);
        assert!(smoothed >= 0.0 && smoothed <= 180.0);
    }

    #[test]
    fn empty_smoother_has_no_mean() {
        let mut smoother = AngleSmoother::new(5);
        assert!(smoother.mean().is_none());
        smoother.push(90.0);
        smoother.clear();
        assert!(smoother.mean().is_none());
    }
}
