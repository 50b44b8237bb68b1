//! Reference kinematic tree.

use std::collections::HashMap;

use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use pianist_ir::Articulation;

use crate::error::KinematicsError;
use crate::joints::{check_range, joint_motion, unit_axis, JointType};
use crate::physics::{FrameId, JointId, Kinematics};

#[derive(Debug, Clone)]
struct Body {
    parent: Option<usize>,
    offset: Translation3<f64>,
    joint: Option<usize>,
    world: Isometry3<f64>,
}

#[derive(Debug, Clone)]
struct Joint {
    kind: JointType,
    axis: Unit<Vector3<f64>>,
    range: Option<(f64, f64)>,
    position: f64,
    velocity: f64,
    world_axis: Vector3<f64>,
    world_anchor: Point3<f64>,
}

/// A kinematic tree built from an [`Articulation`].
///
/// Bodies are posed by chaining each parent's world pose, the body's fixed
/// offset and its joint's motion. There are no masses or forces; joint state
/// only changes through [`Kinematics::set_joint_state`] and [`integrate`].
///
/// [`integrate`]: KinematicModel::integrate
#[derive(Debug, Clone)]
pub struct KinematicModel {
    bodies: Vec<Body>,
    joints: Vec<Joint>,
    body_index: HashMap<String, usize>,
    joint_index: HashMap<String, usize>,
    joint_names: Vec<String>,
}

impl KinematicModel {
    /// Build a model from an articulation description.
    ///
    /// All joints start at zero.
    pub fn from_articulation(art: &Articulation) -> Result<Self, KinematicsError> {
        art.validate()?;

        let mut model = Self {
            bodies: Vec::with_capacity(art.bodies.len()),
            joints: Vec::with_capacity(art.joints.len()),
            body_index: HashMap::new(),
            joint_index: HashMap::new(),
            joint_names: Vec::with_capacity(art.joints.len()),
        };

        for def in &art.bodies {
            let parent = match &def.parent {
                Some(name) => Some(
                    *model
                        .body_index
                        .get(name)
                        .ok_or_else(|| KinematicsError::MissingBody(name.clone()))?,
                ),
                None => None,
            };
            model.body_index.insert(def.name.clone(), model.bodies.len());
            model.bodies.push(Body {
                parent,
                offset: Translation3::new(def.position.x, def.position.y, def.position.z),
                joint: None,
                world: Isometry3::identity(),
            });
        }

        for def in &art.joints {
            let body = *model
                .body_index
                .get(&def.body)
                .ok_or_else(|| KinematicsError::MissingBody(def.body.clone()))?;
            let axis = unit_axis(&def.name, def.kind.axis())?;
            check_range(&def.name, def.kind.range())?;

            let index = model.joints.len();
            model.bodies[body].joint = Some(index);
            model.joint_index.insert(def.name.clone(), index);
            model.joint_names.push(def.name.clone());
            model.joints.push(Joint {
                kind: JointType::from(&def.kind),
                axis,
                range: def.kind.range(),
                position: 0.0,
                velocity: 0.0,
                world_axis: axis.into_inner(),
                world_anchor: Point3::origin(),
            });
        }

        model.forward();
        Ok(model)
    }

    /// Joint names in configuration order.
    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    /// Body names (unordered).
    pub fn body_names(&self) -> Vec<String> {
        self.body_index.keys().cloned().collect()
    }

    /// Advance every joint by its velocity for `dt` seconds, then re-pose.
    ///
    /// Stands in for the physics layer's own integration between reads and
    /// writes.
    pub fn integrate(&mut self, dt: f64) {
        for joint in &mut self.joints {
            joint.position += joint.velocity * dt;
        }
        self.forward();
    }

    /// Set every joint position at once (velocities are zeroed).
    pub fn set_configuration(&mut self, q: &[f64]) {
        for (joint, &value) in self.joints.iter_mut().zip(q) {
            joint.position = value;
            joint.velocity = 0.0;
        }
        self.forward();
    }
}

impl Kinematics for KinematicModel {
    fn num_joints(&self) -> usize {
        self.joints.len()
    }

    fn resolve_joint(&self, name: &str) -> Option<JointId> {
        self.joint_index.get(name).copied().map(JointId)
    }

    fn resolve_frame(&self, name: &str) -> Option<FrameId> {
        self.body_index.get(name).copied().map(FrameId)
    }

    fn joint_type(&self, joint: JointId) -> JointType {
        self.joints[joint.0].kind
    }

    fn joint_position(&self, joint: JointId) -> f64 {
        self.joints[joint.0].position
    }

    fn joint_velocity(&self, joint: JointId) -> f64 {
        self.joints[joint.0].velocity
    }

    fn joint_range(&self, joint: JointId) -> Option<(f64, f64)> {
        self.joints[joint.0].range
    }

    fn joint_axis(&self, joint: JointId) -> Vector3<f64> {
        self.joints[joint.0].world_axis
    }

    fn joint_anchor(&self, joint: JointId) -> Point3<f64> {
        self.joints[joint.0].world_anchor
    }

    fn frame_pose(&self, frame: FrameId) -> Isometry3<f64> {
        self.bodies[frame.0].world
    }

    fn set_joint_state(&mut self, joint: JointId, position: f64, velocity: f64) {
        let joint = &mut self.joints[joint.0];
        joint.position = position;
        joint.velocity = velocity;
    }

    fn forward(&mut self) {
        // Bodies are stored parent-first, so one pass suffices.
        for i in 0..self.bodies.len() {
            let parent_world = match self.bodies[i].parent {
                Some(p) => self.bodies[p].world,
                None => Isometry3::identity(),
            };
            let offset = Isometry3::from_parts(self.bodies[i].offset, UnitQuaternion::identity());
            let frame = parent_world * offset;

            let world = match self.bodies[i].joint {
                Some(j) => {
                    let joint = &mut self.joints[j];
                    joint.world_axis = frame.rotation * joint.axis.into_inner();
                    joint.world_anchor = frame * Point3::origin();
                    frame * joint_motion(joint.kind, &joint.axis, joint.position)
                }
                None => frame,
            };
            self.bodies[i].world = world;
        }
    }
}
