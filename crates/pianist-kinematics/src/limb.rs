//! Controlled limbs and name resolution.

use pianist_ir::{LimbSpec, Side};
use tracing::warn;

use crate::physics::{FrameId, JointId, Kinematics};

/// A controlled limb. Immutable after setup.
#[derive(Debug, Clone, PartialEq)]
pub struct Limb {
    spec: LimbSpec,
}

/// A limb whose joints and effector were all found in the current model.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLimb {
    /// Which arm.
    pub side: Side,
    /// Joint ids, shoulder to wrist.
    pub joints: Vec<JointId>,
    /// Effector frame id.
    pub effector: FrameId,
}

impl Limb {
    /// Wrap a limb description.
    pub fn new(spec: LimbSpec) -> Self {
        Self { spec }
    }

    /// Which arm.
    pub fn side(&self) -> Side {
        self.spec.side
    }

    /// The underlying description.
    pub fn spec(&self) -> &LimbSpec {
        &self.spec
    }

    /// Resolve every joint and the effector, trying each prefix in order.
    ///
    /// Returns `None` (and logs) if anything is missing; a limb is either
    /// fully controllable this step or skipped.
    pub fn resolve<K: Kinematics + ?Sized>(
        &self,
        physics: &K,
        prefixes: &[String],
    ) -> Option<ResolvedLimb> {
        let mut joints = Vec::with_capacity(self.spec.joints.len());
        for name in &self.spec.joints {
            match with_prefixes(name, prefixes, |n| physics.resolve_joint(n)) {
                Some(id) => joints.push(id),
                None => {
                    warn!(limb = %self.spec.side, joint = %name, "joint not found, skipping limb");
                    return None;
                }
            }
        }

        let Some(effector) = with_prefixes(&self.spec.effector, prefixes, |n| physics.resolve_frame(n))
        else {
            warn!(limb = %self.spec.side, frame = %self.spec.effector, "effector not found, skipping limb");
            return None;
        };

        Some(ResolvedLimb {
            side: self.spec.side,
            joints,
            effector,
        })
    }
}

fn with_prefixes<T>(
    name: &str,
    prefixes: &[String],
    lookup: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    if prefixes.is_empty() {
        return lookup(name);
    }
    prefixes
        .iter()
        .find_map(|prefix| lookup(&format!("{prefix}{name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KinematicModel;
    use pianist_ir::{presets, Vec3};

    fn g1() -> KinematicModel {
        KinematicModel::from_articulation(&presets::g1_arms(Vec3::new(0.8, 0.0, 0.85))).unwrap()
    }

    #[test]
    fn resolves_preset_limb() {
        let model = g1();
        let limb = Limb::new(presets::g1_limb(Side::Left));
        let resolved = limb.resolve(&model, &[String::new()]).unwrap();
        assert_eq!(resolved.side, Side::Left);
        assert_eq!(resolved.joints.len(), 7);
    }

    #[test]
    fn prefix_fallback() {
        let model = g1();
        let mut spec = presets::g1_limb(Side::Right);
        // Effector given without the attachment prefix.
        spec.effector = "right_wrist_yaw_link".to_string();
        let limb = Limb::new(spec);

        assert!(limb.resolve(&model, &[String::new()]).is_none());
        let prefixes = vec![String::new(), presets::G1_BODY_PREFIX.to_string()];
        assert!(limb.resolve(&model, &prefixes).is_some());
    }

    #[test]
    fn missing_joint_skips_limb() {
        let model = g1();
        let mut spec = presets::g1_limb(Side::Right);
        spec.joints[3] = "right_knee_joint".to_string();
        assert!(Limb::new(spec).resolve(&model, &[]).is_none());
    }
}
