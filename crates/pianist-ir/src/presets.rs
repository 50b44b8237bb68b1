//! Unitree G1 arm preset.
//!
//! Joint names carry no prefix; body names carry [`G1_BODY_PREFIX`]. This is
//! how the humanoid shows up once attached to the piano stage.

use crate::{Articulation, BodyDef, JointDef, JointKind, LimbSpec, Side, Vec3};

/// Prefix applied to humanoid body names after attachment.
pub const G1_BODY_PREFIX: &str = "g1_29dof_rev_1_0/";

/// Root body of the humanoid.
pub const G1_ROOT_BODY: &str = "torso_link";

/// Arm segment names, shoulder to wrist. Joint = `{side}_{segment}_joint`,
/// body = `{side}_{segment}_link`.
pub const G1_ARM_SEGMENTS: [&str; 7] = [
    "shoulder_pitch",
    "shoulder_roll",
    "shoulder_yaw",
    "elbow",
    "wrist_roll",
    "wrist_pitch",
    "wrist_yaw",
];

struct Segment {
    offset: [f64; 3],
    axis: [f64; 3],
    range: (f64, f64),
}

// Offsets are relative to the previous link, with +x pointing forward and +y
// to the right; the first is relative to the torso.
const SEGMENTS: [Segment; 7] = [
    Segment { offset: [0.0, 0.15, 0.25], axis: [0.0, 1.0, 0.0], range: (-3.0892, 2.6704) },
    Segment { offset: [0.0, 0.0, 0.0], axis: [1.0, 0.0, 0.0], range: (-1.5882, 2.2515) },
    Segment { offset: [0.0, 0.0, -0.05], axis: [0.0, 0.0, 1.0], range: (-2.618, 2.618) },
    Segment { offset: [0.0, 0.0, -0.2], axis: [0.0, 1.0, 0.0], range: (-1.0472, 2.0944) },
    Segment { offset: [0.15, 0.0, 0.0], axis: [1.0, 0.0, 0.0], range: (-1.9722, 1.9722) },
    Segment { offset: [0.05, 0.0, 0.0], axis: [0.0, 1.0, 0.0], range: (-1.6144, 1.6144) },
    Segment { offset: [0.05, 0.0, 0.0], axis: [0.0, 0.0, 1.0], range: (-1.6144, 1.6144) },
];

/// Joint names of one G1 arm.
pub fn g1_arm_joints(side: Side) -> Vec<String> {
    G1_ARM_SEGMENTS
        .iter()
        .map(|s| format!("{side}_{s}_joint"))
        .collect()
}

/// Body names of one G1 arm, with the attachment prefix.
pub fn g1_arm_bodies(side: Side) -> Vec<String> {
    G1_ARM_SEGMENTS
        .iter()
        .map(|s| format!("{G1_BODY_PREFIX}{side}_{s}_link"))
        .collect()
}

/// Limb description of one G1 arm; the effector is the wrist yaw link.
pub fn g1_limb(side: Side) -> LimbSpec {
    let bodies = g1_arm_bodies(side);
    let effector = bodies[bodies.len() - 1].clone();
    LimbSpec {
        side,
        joints: g1_arm_joints(side),
        bodies,
        effector,
    }
}

/// Both G1 arms hanging off a fixed torso at `base`.
///
/// The humanoid faces -x, toward the keyboard, so its left arm sits at -y.
pub fn g1_arms(base: Vec3) -> Articulation {
    let root = format!("{G1_BODY_PREFIX}{G1_ROOT_BODY}");
    let mut art = Articulation::new();
    art.bodies.push(BodyDef {
        name: root.clone(),
        parent: None,
        position: base,
    });

    for side in Side::BOTH {
        let lateral = match side {
            Side::Left => -1.0,
            Side::Right => 1.0,
        };
        let mut parent = root.clone();
        for (segment, (joint, body)) in SEGMENTS
            .iter()
            .zip(g1_arm_joints(side).into_iter().zip(g1_arm_bodies(side)))
        {
            let [x, y, z] = segment.offset;
            // Roll limits are mirrored between arms.
            let range = if segment.axis == [1.0, 0.0, 0.0] && side == Side::Right {
                (-segment.range.1, -segment.range.0)
            } else {
                segment.range
            };
            art.bodies.push(BodyDef {
                name: body.clone(),
                parent: Some(parent),
                position: Vec3::new(-x, y * lateral, z),
            });
            art.joints.push(JointDef {
                name: joint,
                body: body.clone(),
                kind: JointKind::Hinge {
                    axis: Vec3::from(segment.axis),
                    range: Some(range),
                },
            });
            parent = body;
        }
    }
    art
}
