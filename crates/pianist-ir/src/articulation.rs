//! Kinematic tree descriptions: bodies, joints and limbs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::{Side, Vec3};

/// Kind of joint connecting a body to its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JointKind {
    /// Rotation about an axis through the body origin.
    Hinge {
        /// Rotation axis in the parent body frame.
        axis: Vec3,
        /// Optional (lower, upper) limits in radians.
        range: Option<(f64, f64)>,
    },
    /// Translation along an axis.
    Slide {
        /// Translation axis in the parent body frame.
        axis: Vec3,
        /// Optional (lower, upper) limits in meters.
        range: Option<(f64, f64)>,
    },
}

impl JointKind {
    /// Joint axis in the parent frame.
    pub fn axis(&self) -> Vec3 {
        match self {
            JointKind::Hinge { axis, .. } | JointKind::Slide { axis, .. } => *axis,
        }
    }

    /// Joint limits, if any.
    pub fn range(&self) -> Option<(f64, f64)> {
        match self {
            JointKind::Hinge { range, .. } | JointKind::Slide { range, .. } => *range,
        }
    }
}

/// A rigid body in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDef {
    /// Unique body name.
    pub name: String,
    /// Parent body name (`None` for a body fixed to the world).
    pub parent: Option<String>,
    /// Body origin relative to the parent origin (or world) at zero configuration.
    pub position: Vec3,
}

/// A joint moving one body relative to its parent.
///
/// The joint sits at the origin of `body`, the body it moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDef {
    /// Unique joint name.
    pub name: String,
    /// Body moved by this joint.
    pub body: String,
    /// Joint kind, axis and limits.
    pub kind: JointKind,
}

/// A kinematic tree: bodies listed parent-before-child, plus their joints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Articulation {
    /// Bodies in topological order.
    pub bodies: Vec<BodyDef>,
    /// Joints; at most one per body.
    pub joints: Vec<JointDef>,
}

impl Articulation {
    /// Create an empty articulation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check names are unique and every reference points backwards.
    pub fn validate(&self) -> Result<(), IrError> {
        let mut bodies = HashSet::new();
        for body in &self.bodies {
            if let Some(parent) = &body.parent {
                if !bodies.contains(parent.as_str()) {
                    return Err(IrError::UnknownParent(parent.clone()));
                }
            }
            if !bodies.insert(body.name.as_str()) {
                return Err(IrError::DuplicateName(body.name.clone()));
            }
        }

        let mut joints = HashSet::new();
        let mut moved = HashSet::new();
        for joint in &self.joints {
            if !bodies.contains(joint.body.as_str()) {
                return Err(IrError::UnknownParent(joint.body.clone()));
            }
            if !joints.insert(joint.name.as_str()) {
                return Err(IrError::DuplicateName(joint.name.clone()));
            }
            if !moved.insert(joint.body.as_str()) {
                return Err(IrError::DuplicateName(format!(
                    "second joint on body {}",
                    joint.body
                )));
            }
        }
        Ok(())
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, IrError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, IrError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One controlled limb of the humanoid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimbSpec {
    /// Which arm.
    pub side: Side,
    /// Joint names, shoulder to wrist.
    pub joints: Vec<String>,
    /// Body names, shoulder to wrist.
    pub bodies: Vec<String>,
    /// Effector frame driven toward the target.
    pub effector: String,
}
