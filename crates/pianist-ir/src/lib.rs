//! Intermediate representation for the pianist retargeting ecosystem.
//!
//! This crate defines the declarative data shared by the kinematics, reward
//! and task crates:
//!
//! - [`NoteSchedule`]: per-control-step note sets and sustain flags.
//! - [`LimbSpec`]: the named joints, bodies and effector of one arm.
//! - [`Articulation`]: a kinematic tree of bodies and joints.
//!
//! The IR is purely descriptive. Forward kinematics, solving and scoring are
//! handled by the downstream crates.

use serde::{Deserialize, Serialize};

mod articulation;
mod error;
pub mod presets;
mod schedule;

pub use articulation::{Articulation, BodyDef, JointDef, JointKind, LimbSpec};
pub use error::IrError;
pub use schedule::{Note, NoteSchedule, FINGERS_PER_HAND, NUM_FINGERS};

/// 3D vector with f64 components (meters).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Create a new Vec3.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const fn zeros() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Components as an array.
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Which hand (or arm) something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Left hand / left arm.
    Left,
    /// Right hand / right arm.
    Right,
}

impl Side {
    /// Both sides, right first. This is the order hands appear in action
    /// vectors and fingering matrices.
    pub const BOTH: [Side; 2] = [Side::Right, Side::Left];

    /// Lowercase name, as used in joint and body names.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// Row of this hand in the fingering matrix (right = 0, left = 1).
    pub fn index(self) -> usize {
        match self {
            Side::Right => 0,
            Side::Left => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_order_and_names() {
        assert_eq!(Side::BOTH, [Side::Right, Side::Left]);
        assert_eq!(Side::Right.index(), 0);
        assert_eq!(Side::Left.index(), 1);
        assert_eq!(Side::Left.to_string(), "left");
    }

    #[test]
    fn serde_side_lowercase() {
        let json = serde_json::to_string(&Side::Right).unwrap();
        assert_eq!(json, r#""right""#);
        let restored: Side = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, Side::Right);
    }

    #[test]
    fn vec3_from_array() {
        let v = Vec3::from([1.0, 2.0, 3.0]);
        assert_eq!(v.to_array(), [1.0, 2.0, 3.0]);
        assert_eq!(Vec3::zeros(), Vec3::default());
    }
}
