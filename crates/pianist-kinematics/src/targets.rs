//! Effector targets derived from the source hands.

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use pianist_ir::Side;

/// Desired pose of one effector.
///
/// Only the position is tracked; the orientation defaults to identity and is
/// weighted lightly by the QP strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPose {
    /// Target position in world coordinates.
    pub position: Point3<f64>,
    /// Target orientation.
    pub orientation: UnitQuaternion<f64>,
}

impl TargetPose {
    /// Position target with identity orientation.
    pub fn at(position: Point3<f64>) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::identity(),
        }
    }

    /// As an isometry.
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(self.position.coords.into(), self.orientation)
    }
}

/// One target position per arm for the current step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandTargets {
    /// Left arm target.
    pub left: Point3<f64>,
    /// Right arm target.
    pub right: Point3<f64>,
}

impl HandTargets {
    /// Target of one arm.
    pub fn get(&self, side: Side) -> Point3<f64> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Target of one arm as a pose.
    pub fn pose(&self, side: Side) -> TargetPose {
        TargetPose::at(self.get(side))
    }
}

/// Maps source hand poses to effector targets.
///
/// A fixed additive offset per hand compensates for the source frame origin
/// not coinciding with the point the effector should reach. Targets are
/// recomputed every step and never cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetTracker {
    left_offset: Vector3<f64>,
    right_offset: Vector3<f64>,
}

impl Default for TargetTracker {
    fn default() -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros())
    }
}

impl TargetTracker {
    /// Create a tracker with per-hand world-frame offsets.
    pub fn new(left_offset: Vector3<f64>, right_offset: Vector3<f64>) -> Self {
        Self {
            left_offset,
            right_offset,
        }
    }

    /// Targets for this step.
    pub fn get_targets(&self, left: &Isometry3<f64>, right: &Isometry3<f64>) -> HandTargets {
        HandTargets {
            left: Point3::from(left.translation.vector + self.left_offset),
            right: Point3::from(right.translation.vector + self.right_offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Translation3;

    #[test]
    fn applies_fixed_offsets() {
        let tracker = TargetTracker::new(Vector3::new(0.1, 0.0, 0.0), Vector3::new(0.0, 0.0, -0.05));
        let left = Isometry3::from_parts(Translation3::new(0.4, -0.15, 0.89), UnitQuaternion::identity());
        let right = Isometry3::from_parts(
            Translation3::new(0.4, 0.15, 0.89),
            UnitQuaternion::from_euler_angles(0.3, 0.0, 1.0),
        );

        let targets = tracker.get_targets(&left, &right);
        assert_eq!(targets.left, Point3::new(0.5, -0.15, 0.89));
        assert!((targets.get(Side::Right) - Point3::new(0.4, 0.15, 0.84)).norm() < 1e-12);
        assert_eq!(targets.pose(Side::Left).orientation, UnitQuaternion::identity());
    }

    #[test]
    fn default_is_zero_offset() {
        let pose = Isometry3::translation(1.0, 2.0, 3.0);
        let targets = TargetTracker::default().get_targets(&pose, &pose);
        assert_eq!(targets.left, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(targets.right, targets.left);
    }
}
