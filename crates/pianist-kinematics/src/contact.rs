//! Box collision geometry for the forearms.

use nalgebra::{Isometry3, Vector3};
use parry3d::query;
use parry3d::shape::Cuboid;
use serde::{Deserialize, Serialize};

/// Axis-aligned (in its body frame) collision box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionBox {
    /// Half extents along the body's x, y and z axes, in meters.
    pub half_extents: [f64; 3],
}

impl CollisionBox {
    /// Create a box from its half extents.
    pub fn new(hx: f64, hy: f64, hz: f64) -> Self {
        Self {
            half_extents: [hx, hy, hz],
        }
    }

    fn to_shape(self) -> Cuboid {
        let [x, y, z] = self.half_extents;
        Cuboid::new(Vector3::new(x as f32, y as f32, z as f32))
    }
}

/// True if the two boxes overlap or touch at the given world poses.
pub fn boxes_in_contact(
    a: &CollisionBox,
    pose_a: &Isometry3<f64>,
    b: &CollisionBox,
    pose_b: &Isometry3<f64>,
) -> bool {
    let pose_a: Isometry3<f32> = pose_a.cast();
    let pose_b: Isometry3<f32> = pose_b.cast();
    // Cuboid pairs are always supported.
    query::intersection_test(&pose_a, &a.to_shape(), &pose_b, &b.to_shape()).unwrap_or(false)
}
