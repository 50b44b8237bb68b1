//! Joint motion conversion from IR joint kinds.

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use pianist_ir::{JointKind, Vec3};

use crate::error::KinematicsError;

/// Scalar joint type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointType {
    /// Rotation about the axis (radians).
    Hinge,
    /// Translation along the axis (meters).
    Slide,
}

impl From<&JointKind> for JointType {
    fn from(kind: &JointKind) -> Self {
        match kind {
            JointKind::Hinge { .. } => JointType::Hinge,
            JointKind::Slide { .. } => JointType::Slide,
        }
    }
}

/// Normalize an IR axis, rejecting zero-length axes.
pub fn unit_axis(name: &str, axis: Vec3) -> Result<Unit<Vector3<f64>>, KinematicsError> {
    let v = Vector3::new(axis.x, axis.y, axis.z);
    Unit::try_new(v, 1e-9)
        .ok_or_else(|| KinematicsError::InvalidJoint(format!("{name}: zero-length axis")))
}

/// Check a joint range is ordered.
pub fn check_range(name: &str, range: Option<(f64, f64)>) -> Result<(), KinematicsError> {
    match range {
        Some((lower, upper)) if lower > upper => Err(KinematicsError::InvalidJoint(format!(
            "{name}: lower limit {lower} above upper limit {upper}"
        ))),
        _ => Ok(()),
    }
}

/// Local motion of a joint at position `q`, expressed in the moved body's
/// parent-aligned frame.
pub fn joint_motion(kind: JointType, axis: &Unit<Vector3<f64>>, q: f64) -> Isometry3<f64> {
    match kind {
        JointType::Hinge => Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(axis, q),
        ),
        JointType::Slide => Isometry3::from_parts(
            Translation3::from(axis.into_inner() * q),
            UnitQuaternion::identity(),
        ),
    }
}
