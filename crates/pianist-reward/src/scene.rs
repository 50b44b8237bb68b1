//! What the reward terms read from the physical scene.

use nalgebra::{Point3, Vector3};
use pianist_ir::{Side, FINGERS_PER_HAND};

/// Geometry of one key's collision box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyGeom {
    /// Box center in world coordinates.
    pub center: Point3<f64>,
    /// Half extents along world x (length), y (width) and z (height).
    pub half_extents: Vector3<f64>,
}

impl KeyGeom {
    /// Point a fingertip should reach to press the key: on the top face,
    /// shifted toward the front edge.
    pub fn press_point(&self) -> Point3<f64> {
        self.center + Vector3::new(0.35 * self.half_extents.x, 0.0, 0.5 * self.half_extents.z)
    }
}

/// Read-only view of the piano, the hands and their contacts.
pub trait SceneReadout {
    /// Number of piano keys.
    fn num_keys(&self) -> usize;

    /// Key depression normalized to `[0, 1]` (1 = fully pressed).
    fn key_state(&self) -> &[f64];

    /// Whether each key counts as pressed.
    fn key_activation(&self) -> &[bool];

    /// Collision box of one key.
    fn key_geom(&self, key: usize) -> KeyGeom;

    /// Sustain pedal activation in `[0, 1]`.
    fn sustain_activation(&self) -> f64;

    /// Fingertip positions of one hand, thumb first.
    fn fingertip_positions(&self, side: Side) -> [Point3<f64>; FINGERS_PER_HAND];

    /// Summed actuator power of one hand.
    fn actuator_power(&self, side: Side) -> f64;

    /// Whether the two forearms currently touch.
    fn forearms_in_contact(&self) -> bool;
}
