//! A deterministic kinematic stage for demos and end-to-end tests.
//!
//! Not a physics simulator. Hands are point-mass sliders with five scripted
//! fingertips each, keys go down when a fingertip sinks below their top face,
//! and the humanoid's arms are kinematic: their positions change only when
//! written through [`Kinematics::set_joint_state`].

use nalgebra::{Isometry3, Point3, Vector3};
use pianist_ir::{presets, Side, FINGERS_PER_HAND};
use pianist_kinematics::{
    boxes_in_contact, CollisionBox, FrameId, JointId, JointType, KinematicModel, Kinematics,
};
use pianist_reward::{KeyGeom, SceneReadout};

use crate::config::Placement;
use crate::error::TaskError;
use crate::scene::Scene;
use crate::spec::BoundedArraySpec;

/// Keys on the keyboard.
pub const NUM_KEYS: usize = 88;

const KEY_PITCH: f64 = 0.0139;
const KEY_HALF_EXTENTS: [f64; 3] = [0.075, 0.0065, 0.011];
const KEY_CENTER_X: f64 = 0.475;
const KEY_CENTER_Z: f64 = 0.04;
const KEY_TRAVEL: f64 = 0.01;
const KEY_ACTIVATION: f64 = 0.5;

const FINGERTIP_FORWARD: f64 = 0.1;
const FINGERTIP_DROP: f64 = 0.07;
const FINGER_SPREAD: f64 = 0.02;
const FINGER_FLEX: f64 = 0.03;

const ACTUATOR_TIME_CONSTANT: f64 = 0.02;
const ACTUATOR_GAIN: f64 = 10.0;

const FOREARM_OFFSET: f64 = -0.12;
const FOREARM: CollisionBox = CollisionBox {
    half_extents: [0.12, 0.035, 0.035],
};

// Lateral slide, vertical slide, then one flex per finger.
const HAND_DOF: usize = 2 + FINGERS_PER_HAND;
const LATERAL_RANGE: (f64, f64) = (-0.5, 0.5);
const VERTICAL_RANGE: (f64, f64) = (-0.05, 0.05);

#[derive(Debug, Clone)]
struct Hand {
    side: Side,
    home: Point3<f64>,
    shift: Vector3<f64>,
    state: [f64; HAND_DOF],
    target: [f64; HAND_DOF],
    power: f64,
}

impl Hand {
    fn new(side: Side, home: Point3<f64>) -> Self {
        Self {
            side,
            home,
            shift: Vector3::zeros(),
            state: [0.0; HAND_DOF],
            target: [0.0; HAND_DOF],
            power: 0.0,
        }
    }

    fn root(&self) -> Point3<f64> {
        self.home + self.shift + Vector3::new(0.0, self.state[0], self.state[1])
    }

    fn fingertips(&self) -> [Point3<f64>; FINGERS_PER_HAND] {
        let root = self.root();
        // Thumbs point toward the middle of the keyboard.
        let inward = match self.side {
            Side::Right => -1.0,
            Side::Left => 1.0,
        };
        std::array::from_fn(|finger| {
            let lateral = inward * (2.0 - finger as f64) * FINGER_SPREAD;
            let drop = FINGERTIP_DROP + FINGER_FLEX * self.state[2 + finger];
            root + Vector3::new(FINGERTIP_FORWARD, lateral, -drop)
        })
    }

    fn step(&mut self, dt: f64) {
        let alpha = (dt / ACTUATOR_TIME_CONSTANT).min(1.0);
        self.power = 0.0;
        for (state, target) in self.state.iter_mut().zip(&self.target) {
            let delta = (target - *state) * alpha;
            let velocity = delta / dt;
            self.power += (ACTUATOR_GAIN * (target - *state) * velocity).abs();
            *state += delta;
        }
    }
}

/// Humanoid arms, two scripted hands, an 88-key keyboard and a pedal.
#[derive(Debug, Clone)]
pub struct ReferenceScene {
    arms: KinematicModel,
    hands: [Hand; 2],
    keys: Vec<KeyGeom>,
    key_state: Vec<f64>,
    key_activation: Vec<bool>,
    sustain: f64,
}

impl ReferenceScene {
    /// Build the stage; fails if the humanoid description is invalid.
    pub fn new(placement: &Placement) -> Result<Self, TaskError> {
        let arms = KinematicModel::from_articulation(&presets::g1_arms(placement.humanoid()))?;
        let home = |side| {
            let p = placement.hand(side);
            Point3::new(p.x, p.y, p.z)
        };
        let keys = (0..NUM_KEYS)
            .map(|key| KeyGeom {
                center: Point3::new(
                    KEY_CENTER_X,
                    (key as f64 - (NUM_KEYS as f64 - 1.0) / 2.0) * KEY_PITCH,
                    KEY_CENTER_Z + placement.height_offset,
                ),
                half_extents: Vector3::from(KEY_HALF_EXTENTS),
            })
            .collect();

        let mut scene = Self {
            arms,
            hands: [
                Hand::new(Side::Right, home(Side::Right)),
                Hand::new(Side::Left, home(Side::Left)),
            ],
            keys,
            key_state: vec![0.0; NUM_KEYS],
            key_activation: vec![false; NUM_KEYS],
            sustain: 0.0,
        };
        scene.update_keys();
        Ok(scene)
    }

    /// The humanoid's arms.
    pub fn arms(&self) -> &KinematicModel {
        &self.arms
    }

    fn hand(&self, side: Side) -> &Hand {
        &self.hands[side.index()]
    }

    fn update_keys(&mut self) {
        let tips: Vec<Point3<f64>> = self.hands.iter().flat_map(Hand::fingertips).collect();
        for (key, geom) in self.keys.iter().enumerate() {
            let top = geom.center.z + geom.half_extents.z;
            let depth = tips
                .iter()
                .filter(|tip| {
                    (tip.x - geom.center.x).abs() <= geom.half_extents.x
                        && (tip.y - geom.center.y).abs() <= geom.half_extents.y
                })
                .map(|tip| top - tip.z)
                .fold(0.0, f64::max);
            let state = (depth / KEY_TRAVEL).clamp(0.0, 1.0);
            self.key_state[key] = state;
            self.key_activation[key] = state >= KEY_ACTIVATION;
        }
    }
}

impl Kinematics for ReferenceScene {
    fn num_joints(&self) -> usize {
        self.arms.num_joints()
    }

    fn resolve_joint(&self, name: &str) -> Option<JointId> {
        self.arms.resolve_joint(name)
    }

    fn resolve_frame(&self, name: &str) -> Option<FrameId> {
        self.arms.resolve_frame(name)
    }

    fn joint_type(&self, joint: JointId) -> JointType {
        self.arms.joint_type(joint)
    }

    fn joint_position(&self, joint: JointId) -> f64 {
        self.arms.joint_position(joint)
    }

    fn joint_velocity(&self, joint: JointId) -> f64 {
        self.arms.joint_velocity(joint)
    }

    fn joint_range(&self, joint: JointId) -> Option<(f64, f64)> {
        self.arms.joint_range(joint)
    }

    fn joint_axis(&self, joint: JointId) -> Vector3<f64> {
        self.arms.joint_axis(joint)
    }

    fn joint_anchor(&self, joint: JointId) -> Point3<f64> {
        self.arms.joint_anchor(joint)
    }

    fn frame_pose(&self, frame: FrameId) -> Isometry3<f64> {
        self.arms.frame_pose(frame)
    }

    fn set_joint_state(&mut self, joint: JointId, position: f64, velocity: f64) {
        self.arms.set_joint_state(joint, position, velocity);
    }

    fn forward(&mut self) {
        self.arms.forward();
    }
}

impl SceneReadout for ReferenceScene {
    fn num_keys(&self) -> usize {
        NUM_KEYS
    }

    fn key_state(&self) -> &[f64] {
        &self.key_state
    }

    fn key_activation(&self) -> &[bool] {
        &self.key_activation
    }

    fn key_geom(&self, key: usize) -> KeyGeom {
        self.keys[key]
    }

    fn sustain_activation(&self) -> f64 {
        if self.sustain >= 0.5 {
            1.0
        } else {
            0.0
        }
    }

    fn fingertip_positions(&self, side: Side) -> [Point3<f64>; FINGERS_PER_HAND] {
        self.hand(side).fingertips()
    }

    fn actuator_power(&self, side: Side) -> f64 {
        self.hand(side).power
    }

    fn forearms_in_contact(&self) -> bool {
        let pose = |side| {
            let root = self.hand(side).root();
            Isometry3::translation(root.x + FOREARM_OFFSET, root.y, root.z)
        };
        boxes_in_contact(&FOREARM, &pose(Side::Left), &FOREARM, &pose(Side::Right))
    }
}

impl Scene for ReferenceScene {
    fn hand_action_spec(&self, side: Side) -> BoundedArraySpec {
        let mut minimum = vec![LATERAL_RANGE.0, VERTICAL_RANGE.0];
        let mut maximum = vec![LATERAL_RANGE.1, VERTICAL_RANGE.1];
        minimum.extend([0.0; FINGERS_PER_HAND]);
        maximum.extend([1.0; FINGERS_PER_HAND]);
        BoundedArraySpec::new(format!("{side}_hand"), minimum, maximum)
    }

    fn apply_hand_action(&mut self, side: Side, action: &[f64]) {
        let clipped = self.hand_action_spec(side).clip(action);
        let hand = &mut self.hands[side.index()];
        for (target, value) in hand.target.iter_mut().zip(clipped) {
            *target = value;
        }
    }

    fn set_sustain(&mut self, command: f64) {
        self.sustain = command.clamp(0.0, 1.0);
    }

    fn sustain_state(&self) -> f64 {
        self.sustain
    }

    fn hand_root_pose(&self, side: Side) -> Isometry3<f64> {
        let root = self.hand(side).root();
        Isometry3::translation(root.x, root.y, root.z)
    }

    fn set_hand_offset(&mut self, offset: Vector3<f64>) {
        for hand in &mut self.hands {
            hand.shift = offset;
        }
        self.update_keys();
    }

    fn reset(&mut self) {
        for hand in &mut self.hands {
            hand.state = [0.0; HAND_DOF];
            hand.target = [0.0; HAND_DOF];
            hand.power = 0.0;
        }
        self.sustain = 0.0;
        let rest = vec![0.0; self.arms.num_joints()];
        self.arms.set_configuration(&rest);
        self.update_keys();
    }

    fn step_physics(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        for hand in &mut self.hands {
            hand.step(dt);
        }
        self.update_keys();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> ReferenceScene {
        ReferenceScene::new(&Placement::default()).unwrap()
    }

    fn press_action(finger: usize) -> Vec<f64> {
        let mut action = vec![0.0; HAND_DOF];
        action[2 + finger] = 1.0;
        action
    }

    #[test]
    fn hands_start_at_placement() {
        let scene = scene();
        let right = scene.hand_root_pose(Side::Right).translation.vector;
        assert!((right - Vector3::new(0.4, 0.15, 0.89)).norm() < 1e-12);
        assert!(scene.key_activation().iter().all(|a| !a));
        assert!(!scene.forearms_in_contact());
    }

    #[test]
    fn thumbs_point_inward() {
        let scene = scene();
        let right = scene.fingertip_positions(Side::Right);
        let left = scene.fingertip_positions(Side::Left);
        assert!(right[0].y < right[4].y);
        assert!(left[0].y > left[4].y);
    }

    #[test]
    fn flexed_finger_presses_key_under_it() {
        let mut scene = scene();
        let tip = scene.fingertip_positions(Side::Right)[2];
        let key = (0..NUM_KEYS)
            .find(|&k| (scene.key_geom(k).center.y - tip.y).abs() <= KEY_HALF_EXTENTS[1])
            .unwrap();

        scene.apply_hand_action(Side::Right, &press_action(2));
        for _ in 0..20 {
            scene.step_physics(0.005);
        }
        assert!(scene.key_activation()[key]);
        assert_eq!(scene.key_state()[key], 1.0);
        assert_eq!(scene.key_activation().iter().filter(|a| **a).count(), 1);
        assert_eq!(scene.actuator_power(Side::Left), 0.0);
    }

    #[test]
    fn motion_costs_power() {
        let mut scene = scene();
        scene.apply_hand_action(Side::Left, &press_action(0));
        scene.step_physics(0.005);
        assert!(scene.actuator_power(Side::Left) > 0.0);
    }

    #[test]
    fn hands_collide_when_crossed() {
        let mut scene = scene();
        let mut action = vec![0.0; HAND_DOF];
        action[0] = -0.15;
        scene.apply_hand_action(Side::Right, &action);
        action[0] = 0.15;
        scene.apply_hand_action(Side::Left, &action);
        for _ in 0..50 {
            scene.step_physics(0.005);
        }
        assert!(scene.forearms_in_contact());
    }

    #[test]
    fn reset_returns_to_rest() {
        let mut scene = scene();
        scene.apply_hand_action(Side::Right, &press_action(2));
        scene.set_sustain(1.0);
        scene.set_hand_offset(Vector3::new(0.0, 0.03, 0.0));
        for _ in 0..20 {
            scene.step_physics(0.005);
        }
        let joint = scene.resolve_joint("right_elbow_joint").unwrap();
        scene.set_joint_state(joint, 0.4, 1.0);

        scene.reset();
        assert!(scene.key_activation().iter().all(|a| !a));
        assert_eq!(scene.sustain_state(), 0.0);
        assert_eq!(scene.joint_position(joint), 0.0);
        // The offset survives a reset.
        let right = scene.hand_root_pose(Side::Right).translation.vector;
        assert!((right.y - 0.18).abs() < 1e-12);
    }

    #[test]
    fn hand_offset_is_absolute() {
        let mut scene = scene();
        scene.set_hand_offset(Vector3::new(0.0, 0.02, 0.0));
        scene.set_hand_offset(Vector3::new(0.0, 0.02, 0.0));
        let left = scene.hand_root_pose(Side::Left).translation.vector;
        assert!((left.y + 0.13).abs() < 1e-12);
    }

    #[test]
    fn sustain_is_thresholded() {
        let mut scene = scene();
        scene.set_sustain(0.7);
        assert_eq!(scene.sustain_activation(), 1.0);
        assert_eq!(scene.sustain_state(), 0.7);
        scene.set_sustain(-1.0);
        assert_eq!(scene.sustain_activation(), 0.0);
    }
}
