//! The physics collaborator as seen by the retargeter.

use nalgebra::{DVector, Isometry3, Point3, Vector3};

use crate::joints::JointType;

/// Index of a joint in the configuration vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointId(pub usize);

/// Index of a body or frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

/// Read/write access to the articulated system's kinematic state.
///
/// Implemented by whatever owns the physics snapshot. Name resolution returns
/// `None` instead of failing so callers can degrade when a model was attached
/// with a different naming prefix.
pub trait Kinematics {
    /// Length of the configuration vector (one entry per scalar joint).
    fn num_joints(&self) -> usize;

    /// Resolve a joint name.
    fn resolve_joint(&self, name: &str) -> Option<JointId>;

    /// Resolve a body/frame name.
    fn resolve_frame(&self, name: &str) -> Option<FrameId>;

    /// Joint kind (hinge or slide).
    fn joint_type(&self, joint: JointId) -> JointType;

    /// Joint position (radians or meters).
    fn joint_position(&self, joint: JointId) -> f64;

    /// Joint velocity (rad/s or m/s).
    fn joint_velocity(&self, joint: JointId) -> f64;

    /// Joint limits, if the joint is limited.
    fn joint_range(&self, joint: JointId) -> Option<(f64, f64)>;

    /// Joint axis in world coordinates (unit length).
    fn joint_axis(&self, joint: JointId) -> Vector3<f64>;

    /// Joint anchor in world coordinates.
    fn joint_anchor(&self, joint: JointId) -> Point3<f64>;

    /// World pose of a body/frame.
    fn frame_pose(&self, frame: FrameId) -> Isometry3<f64>;

    /// Overwrite a joint's position and velocity.
    ///
    /// This is a kinematic override: it bypasses actuation entirely.
    fn set_joint_state(&mut self, joint: JointId, position: f64, velocity: f64);

    /// Recompute derived quantities (frame poses, axes, anchors) after writes.
    fn forward(&mut self);
}

/// Read-synchronized copy of the configuration vector.
///
/// Built from the physics state right before a solve and dropped after it;
/// only the velocity command outlives a step.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    q: DVector<f64>,
}

impl Configuration {
    /// Read the full configuration from the physics state.
    pub fn from_physics<K: Kinematics + ?Sized>(physics: &K) -> Self {
        let q = DVector::from_iterator(
            physics.num_joints(),
            (0..physics.num_joints()).map(|i| physics.joint_position(JointId(i))),
        );
        Self { q }
    }

    /// Configuration vector.
    pub fn q(&self) -> &DVector<f64> {
        &self.q
    }

    /// Position of one joint.
    pub fn get(&self, joint: JointId) -> f64 {
        self.q[joint.0]
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.q.len()
    }

    /// True if the configuration has no joints.
    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Explicit Euler step: `q += velocity * dt`.
    pub fn integrate_inplace(&mut self, velocity: &DVector<f64>, dt: f64) {
        debug_assert_eq!(velocity.len(), self.q.len());
        self.q.axpy(dt, velocity, 1.0);
    }
}

impl From<DVector<f64>> for Configuration {
    fn from(q: DVector<f64>) -> Self {
        Self { q }
    }
}
