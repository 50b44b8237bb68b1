//! The physics collaborator as seen by the task.

use nalgebra::{Isometry3, Vector3};
use pianist_ir::Side;
use pianist_kinematics::Kinematics;
use pianist_reward::SceneReadout;

use crate::spec::BoundedArraySpec;

/// A simulated stage: humanoid arms, two source hands, a keyboard and a
/// sustain pedal.
///
/// Kinematic access to the humanoid comes from [`Kinematics`]; what rewards
/// read comes from [`SceneReadout`].
pub trait Scene: Kinematics + SceneReadout {
    /// Action layout of one hand.
    fn hand_action_spec(&self, side: Side) -> BoundedArraySpec;

    /// Set one hand's actuator targets; `action` matches its spec.
    fn apply_hand_action(&mut self, side: Side, action: &[f64]);

    /// Set the sustain pedal command in `[0, 1]`.
    fn set_sustain(&mut self, command: f64);

    /// Sustain pedal position in `[0, 1]`.
    fn sustain_state(&self) -> f64;

    /// World pose of a hand's root body.
    fn hand_root_pose(&self, side: Side) -> Isometry3<f64>;

    /// Displace both hands from their placement by `offset`; replaces any
    /// earlier offset.
    fn set_hand_offset(&mut self, offset: Vector3<f64>);

    /// Return hands, keys, pedal and arms to rest.
    fn reset(&mut self);

    /// Advance the simulation by `dt` seconds.
    fn step_physics(&mut self, dt: f64);
}
