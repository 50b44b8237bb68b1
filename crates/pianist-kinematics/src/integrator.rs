//! Kinematic joint override.
//!
//! Positions and velocities are written straight into the physics state.
//! Nothing here goes through actuators: this is teleport-style control, not
//! force or torque control.

use nalgebra::DVector;

use crate::physics::{Configuration, JointId, Kinematics};

/// Writes velocity commands into the physics joint state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointWriter {
    correction_gain: f64,
}

impl Default for JointWriter {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl JointWriter {
    /// Create a writer with the given drift-correction gain.
    pub fn new(correction_gain: f64) -> Self {
        Self { correction_gain }
    }

    /// Drift-correction gain.
    pub fn correction_gain(&self) -> f64 {
        self.correction_gain
    }

    /// Integrate `velocity` over `dt` and write the result for `joints`.
    ///
    /// The written velocity is the command plus a correction proportional to
    /// how far the physics position sits from the integrated one at write
    /// time. Returns the full velocity vector as written, which is what later
    /// hold steps replay.
    pub fn apply<K: Kinematics + ?Sized>(
        &self,
        physics: &mut K,
        configuration: &mut Configuration,
        joints: &[JointId],
        velocity: &DVector<f64>,
        dt: f64,
    ) -> DVector<f64> {
        configuration.integrate_inplace(velocity, dt);

        let mut written = velocity.clone();
        for &joint in joints {
            let old = physics.joint_position(joint);
            let new = configuration.get(joint);
            let correction = if dt > 0.0 {
                (new - old) / dt * self.correction_gain
            } else {
                0.0
            };
            written[joint.0] = velocity[joint.0] + correction;
            physics.set_joint_state(joint, new, written[joint.0]);
        }
        physics.forward();
        written
    }

    /// Re-apply a cached command without touching positions.
    pub fn hold<K: Kinematics + ?Sized>(
        &self,
        physics: &mut K,
        joints: &[JointId],
        velocity: &DVector<f64>,
    ) {
        for &joint in joints {
            let position = physics.joint_position(joint);
            physics.set_joint_state(joint, position, velocity[joint.0]);
        }
        physics.forward();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KinematicModel;
    use approx::assert_relative_eq;
    use pianist_ir::{presets, Side, Vec3};

    fn g1() -> KinematicModel {
        KinematicModel::from_articulation(&presets::g1_arms(Vec3::new(0.8, 0.0, 0.85))).unwrap()
    }

    #[test]
    fn apply_writes_integrated_positions() {
        let mut model = g1();
        let joints: Vec<JointId> = presets::g1_arm_joints(Side::Left)
            .iter()
            .map(|name| model.resolve_joint(name).unwrap())
            .collect();
        let mut velocity = DVector::zeros(model.num_joints());
        for joint in &joints {
            velocity[joint.0] = 0.5;
        }

        let mut config = Configuration::from_physics(&model);
        let written = JointWriter::default().apply(&mut model, &mut config, &joints, &velocity, 0.1);

        for joint in &joints {
            assert_relative_eq!(model.joint_position(*joint), 0.05, epsilon = 1e-12);
            // Position moved by v*dt relative to the read-back, so the
            // correction adds 0.8 * v.
            assert_relative_eq!(written[joint.0], 0.9, epsilon = 1e-12);
            assert_relative_eq!(model.joint_velocity(*joint), 0.9, epsilon = 1e-12);
        }
        let right = model.resolve_joint("right_elbow_joint").unwrap();
        assert_eq!(model.joint_position(right), 0.0);
    }

    #[test]
    fn hold_leaves_positions_alone() {
        let mut model = g1();
        let elbow = model.resolve_joint("left_elbow_joint").unwrap();
        model.set_joint_state(elbow, 0.3, 0.0);

        let mut velocity = DVector::zeros(model.num_joints());
        velocity[elbow.0] = -1.5;
        JointWriter::default().hold(&mut model, &[elbow], &velocity);

        assert_eq!(model.joint_position(elbow), 0.3);
        assert_eq!(model.joint_velocity(elbow), -1.5);
    }
}
