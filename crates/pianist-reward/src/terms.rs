//! Individual reward terms.

use nalgebra::{DMatrix, Point3};
use pianist_ir::Side;
use serde::{Deserialize, Serialize};

use crate::assignment::min_cost_assignment;
use crate::error::RewardError;
use crate::goal::GoalTracker;
use crate::scene::SceneReadout;
use crate::tolerance::Tolerance;

/// Thresholds and coefficients shared by the terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardParams {
    /// Fingertip-to-key distance that counts as on the key, in meters.
    pub finger_close_enough_to_key: f64,
    /// Normalized key (and pedal) error that counts as pressed.
    pub key_close_enough_to_pressed: f64,
    /// Scale of the energy penalty.
    pub energy_penalty_coef: f64,
    /// One wrongly pressed key forfeits the whole "off" half of the key
    /// press reward. When false, the half shrinks with the share of off keys
    /// that are wrongly pressed.
    pub strict_off_keys: bool,
}

impl Default for RewardParams {
    fn default() -> Self {
        Self {
            finger_close_enough_to_key: 0.01,
            key_close_enough_to_pressed: 0.05,
            energy_penalty_coef: 5e-3,
            strict_off_keys: true,
        }
    }
}

/// Tolerances built once from [`RewardParams`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shaping {
    /// Applied to key and sustain errors.
    pub key: Tolerance,
    /// Applied to fingertip distances.
    pub finger: Tolerance,
    /// Energy penalty coefficient.
    pub energy_penalty_coef: f64,
    /// See [`RewardParams::strict_off_keys`].
    pub strict_off_keys: bool,
}

impl Shaping {
    /// Gaussian tolerances whose margin is ten times the bound.
    pub fn new(params: &RewardParams) -> Result<Self, RewardError> {
        let key = params.key_close_enough_to_pressed;
        let finger = params.finger_close_enough_to_key;
        Ok(Self {
            key: Tolerance::gaussian((0.0, key), key * 10.0)?,
            finger: Tolerance::gaussian((0.0, finger), finger * 10.0)?,
            energy_penalty_coef: params.energy_penalty_coef,
            strict_off_keys: params.strict_off_keys,
        })
    }
}

/// How fingers are scored against keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingeringPolicy {
    /// Use the annotated finger for each key.
    #[default]
    Direct,
    /// Annotations unavailable: match fingertips to keys by minimum total distance.
    OptimalTransport,
}

/// A built-in reward term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardTerm {
    /// Press the keys the goal wants, and no others.
    KeyPress,
    /// Match the sustain pedal to the goal.
    Sustain,
    /// Penalize actuator power.
    Energy,
    /// Annotated fingers close to their keys.
    Fingering,
    /// Best-matched fingers close to the required keys.
    OtFingering,
    /// Keep the forearms apart.
    Forearm,
}

impl RewardTerm {
    /// Name the term is registered under by default.
    pub fn default_name(self) -> &'static str {
        match self {
            RewardTerm::KeyPress => "key_press_reward",
            RewardTerm::Sustain => "sustain_reward",
            RewardTerm::Energy => "energy_reward",
            RewardTerm::Fingering => "fingering_reward",
            RewardTerm::OtFingering => "ot_fingering_reward",
            RewardTerm::Forearm => "forearm_reward",
        }
    }

    /// Evaluate the term.
    pub fn compute<S: SceneReadout + ?Sized>(
        self,
        scene: &S,
        goal: &GoalTracker,
        shaping: &Shaping,
    ) -> f64 {
        match self {
            RewardTerm::KeyPress => {
                key_press_reward(scene, goal, &shaping.key, shaping.strict_off_keys)
            }
            RewardTerm::Sustain => sustain_reward(scene, goal, &shaping.key),
            RewardTerm::Energy => energy_reward(scene, shaping.energy_penalty_coef),
            RewardTerm::Fingering => fingering_reward(scene, goal, &shaping.finger),
            RewardTerm::OtFingering => {
                let fingertips: Vec<Point3<f64>> = Side::BOTH
                    .iter()
                    .flat_map(|&side| scene.fingertip_positions(side))
                    .collect();
                let keys: Vec<Point3<f64>> = goal
                    .keys_on()
                    .map(|key| scene.key_geom(key).press_point())
                    .collect();
                ot_fingering_reward(&fingertips, &keys, &shaping.finger)
            }
            RewardTerm::Forearm => forearm_reward(scene),
        }
    }
}

/// Half for pressing the required keys well, half for touching nothing else.
///
/// With `strict_off_keys`, any wrongly active key forfeits the whole second
/// half; otherwise it is scaled by the share of off keys left alone.
pub fn key_press_reward<S: SceneReadout + ?Sized>(
    scene: &S,
    goal: &GoalTracker,
    tolerance: &Tolerance,
    strict_off_keys: bool,
) -> f64 {
    let state = scene.key_state();
    let target = goal.goal_current();
    let on = tolerance.mean(
        goal.keys_on()
            .map(|key| target[key] - state.get(key).copied().unwrap_or(0.0)),
    );
    let mut reward = on.map_or(0.0, |mean| 0.5 * mean);

    let activation = scene.key_activation();
    let is_active = |key: usize| activation.get(key).copied().unwrap_or(false);
    if strict_off_keys {
        if !goal.keys_off().any(is_active) {
            reward += 0.5;
        }
    } else {
        let (off, wrong) = goal
            .keys_off()
            .fold((0usize, 0usize), |(off, wrong), key| {
                (off + 1, wrong + usize::from(is_active(key)))
            });
        if off > 0 {
            reward += 0.5 * (off - wrong) as f64 / off as f64;
        }
    }
    reward
}

/// Tolerance score of the sustain error.
pub fn sustain_reward<S: SceneReadout + ?Sized>(
    scene: &S,
    goal: &GoalTracker,
    tolerance: &Tolerance,
) -> f64 {
    tolerance.eval(goal.sustain_goal() - scene.sustain_activation())
}

/// Negative summed actuator power of both hands.
pub fn energy_reward<S: SceneReadout + ?Sized>(scene: &S, coef: f64) -> f64 {
    -coef * Side::BOTH.iter().map(|&side| scene.actuator_power(side)).sum::<f64>()
}

/// Mean tolerance score of each assigned fingertip's distance to its key;
/// 0 when no finger is assigned.
pub fn fingering_reward<S: SceneReadout + ?Sized>(
    scene: &S,
    goal: &GoalTracker,
    tolerance: &Tolerance,
) -> f64 {
    let mut distances = Vec::new();
    for side in Side::BOTH {
        let fingertips = scene.fingertip_positions(side);
        for assignment in goal.keys_current(side) {
            let key = scene.key_geom(assignment.key).press_point();
            distances.push((key - fingertips[assignment.finger]).norm());
        }
    }
    tolerance.mean(distances).unwrap_or(0.0)
}

/// Mean tolerance score over a minimum-cost fingertip-to-key matching;
/// 1 when no key is required.
pub fn ot_fingering_reward(
    fingertips: &[Point3<f64>],
    keys: &[Point3<f64>],
    tolerance: &Tolerance,
) -> f64 {
    if keys.is_empty() {
        return 1.0;
    }
    let cost = DMatrix::from_fn(fingertips.len(), keys.len(), |i, j| {
        (keys[j] - fingertips[i]).norm()
    });
    let matched = min_cost_assignment(&cost)
        .into_iter()
        .map(|(i, j)| cost[(i, j)]);
    tolerance.mean(matched).unwrap_or(0.0)
}

/// 0.5 unless the forearms touch.
pub fn forearm_reward<S: SceneReadout + ?Sized>(scene: &S) -> f64 {
    if scene.forearms_in_contact() {
        0.0
    } else {
        0.5
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use pianist_ir::{Note, NoteSchedule, FINGERS_PER_HAND};

    use crate::scene::KeyGeom;

    pub(crate) const KEYS: usize = 88;

    /// Keyboard along y, keys 2.3 cm apart.
    pub(crate) struct MockScene {
        pub state: Vec<f64>,
        pub activation: Vec<bool>,
        pub sustain: f64,
        pub fingertips: [[Point3<f64>; FINGERS_PER_HAND]; 2],
        pub power: [f64; 2],
        pub contact: bool,
    }

    impl MockScene {
        pub(crate) fn new() -> Self {
            let far = Point3::new(1.0, 0.0, 2.0);
            Self {
                state: vec![0.0; KEYS],
                activation: vec![false; KEYS],
                sustain: 0.0,
                fingertips: [[far; FINGERS_PER_HAND]; 2],
                power: [0.0; 2],
                contact: false,
            }
        }

        pub(crate) fn key_geom_press_point(&self, key: usize) -> Point3<f64> {
            self.key_geom(key).press_point()
        }

        pub(crate) fn press(&mut self, key: usize) {
            self.state[key] = 1.0;
            self.activation[key] = true;
        }
    }

    impl SceneReadout for MockScene {
        fn num_keys(&self) -> usize {
            KEYS
        }
        fn key_state(&self) -> &[f64] {
            &self.state
        }
        fn key_activation(&self) -> &[bool] {
            &self.activation
        }
        fn key_geom(&self, key: usize) -> KeyGeom {
            KeyGeom {
                center: Point3::new(0.6, -1.0 + 0.023 * key as f64, 0.8),
                half_extents: Vector3::new(0.075, 0.011, 0.011),
            }
        }
        fn sustain_activation(&self) -> f64 {
            self.sustain
        }
        fn fingertip_positions(&self, side: Side) -> [Point3<f64>; FINGERS_PER_HAND] {
            self.fingertips[side.index()]
        }
        fn actuator_power(&self, side: Side) -> f64 {
            self.power[side.index()]
        }
        fn forearms_in_contact(&self) -> bool {
            self.contact
        }
    }

    /// A tracker whose current goal is `notes`, latched.
    pub(crate) fn goal_with(notes: Vec<Note>, sustain: bool) -> GoalTracker {
        let schedule = NoteSchedule::new(vec![notes], vec![sustain]).unwrap();
        let mut goal = GoalTracker::new(schedule, KEYS, 1).unwrap();
        goal.advance(&[false; KEYS]);
        goal
    }

    fn shaping() -> Shaping {
        Shaping::new(&RewardParams::default()).unwrap()
    }

    #[test]
    fn one_false_positive_forfeits_off_half() {
        let notes: Vec<Note> = (40..48).map(|key| Note::new(key, 0)).collect();
        let goal = goal_with(notes, false);
        assert_eq!(goal.keys_off().count(), 80);

        let mut scene = MockScene::new();
        for key in 40..48 {
            scene.press(key);
        }
        assert_relative_eq!(key_press_reward(&scene, &goal, &shaping().key, true), 1.0);

        scene.press(3);
        assert_relative_eq!(key_press_reward(&scene, &goal, &shaping().key, true), 0.5);
    }

    #[test]
    fn lenient_off_keys_scale_with_mistakes() {
        let goal = goal_with(vec![], false);
        let mut scene = MockScene::new();
        for key in 0..22 {
            scene.press(key);
        }
        let reward = key_press_reward(&scene, &goal, &shaping().key, false);
        assert_relative_eq!(reward, 0.5 * 66.0 / 88.0, epsilon = 1e-12);
        assert_eq!(key_press_reward(&scene, &goal, &shaping().key, true), 0.0);
    }

    #[test]
    fn nothing_required_scores_only_off_half() {
        let goal = goal_with(vec![], false);
        let mut scene = MockScene::new();
        assert_relative_eq!(key_press_reward(&scene, &goal, &shaping().key, true), 0.5);
        scene.press(0);
        assert_relative_eq!(key_press_reward(&scene, &goal, &shaping().key, true), 0.0);
    }

    #[test]
    fn partially_pressed_key_is_shaped() {
        let goal = goal_with(vec![Note::new(40, 0)], false);
        let mut scene = MockScene::new();
        scene.state[40] = 0.5;
        let reward = key_press_reward(&scene, &goal, &shaping().key, true);
        assert!(reward > 0.5 && reward < 1.0, "{reward}");
    }

    #[test]
    fn sustain_tracks_pedal() {
        let goal = goal_with(vec![], true);
        let mut scene = MockScene::new();
        assert!(sustain_reward(&scene, &goal, &shaping().key) < 0.01);
        scene.sustain = 1.0;
        assert_relative_eq!(sustain_reward(&scene, &goal, &shaping().key), 1.0);
    }

    #[test]
    fn energy_is_negative_power() {
        let mut scene = MockScene::new();
        scene.power = [2.0, 3.0];
        assert_relative_eq!(energy_reward(&scene, 5e-3), -0.025);
    }

    #[test]
    fn direct_fingering_scores_assigned_fingers() {
        let mut scene = MockScene::new();
        let empty = goal_with(vec![], false);
        assert_eq!(fingering_reward(&scene, &empty, &shaping().finger), 0.0);

        // Key 40 with right index finger, key 20 with left thumb.
        let goal = goal_with(vec![Note::new(40, 1), Note::new(20, 5)], false);
        scene.fingertips[0][1] = scene.key_geom(40).press_point();
        let reward = fingering_reward(&scene, &goal, &shaping().finger);
        assert!((reward - 0.5).abs() < 1e-6, "{reward}");

        scene.fingertips[1][0] = scene.key_geom(20).press_point();
        assert_relative_eq!(fingering_reward(&scene, &goal, &shaping().finger), 1.0);
    }

    #[test]
    fn ot_defaults_to_one_without_keys() {
        let fingertips = [Point3::origin(); 10];
        assert_eq!(ot_fingering_reward(&fingertips, &[], &shaping().finger), 1.0);
    }

    #[test]
    fn ot_matches_closest_fingers() {
        let keys = [Point3::new(0.6, 0.0, 0.8), Point3::new(0.6, 0.05, 0.8)];
        let mut fingertips = [Point3::new(0.0, 0.0, 2.0); 10];
        // Finger 7 is close to both keys but can only take one.
        fingertips[7] = keys[0];
        fingertips[2] = keys[1] + Vector3::new(0.0, 0.0, 0.005);
        assert_relative_eq!(ot_fingering_reward(&fingertips, &keys, &shaping().finger), 1.0);

        fingertips[2] = Point3::new(0.0, 0.0, 2.0);
        let reward = ot_fingering_reward(&fingertips, &keys, &shaping().finger);
        assert!(reward < 0.6 && reward >= 0.5, "{reward}");
    }

    #[test]
    fn forearm_is_binary() {
        let mut scene = MockScene::new();
        assert_eq!(forearm_reward(&scene), 0.5);
        scene.contact = true;
        assert_eq!(forearm_reward(&scene), 0.0);
    }

    #[test]
    fn term_dispatch_uses_latched_goal() {
        let goal = goal_with(vec![Note::new(40, 0)], false);
        let mut scene = MockScene::new();
        scene.press(40);
        scene.fingertips[0][0] = scene.key_geom(40).press_point();
        let shaping = shaping();
        assert_relative_eq!(RewardTerm::KeyPress.compute(&scene, &goal, &shaping), 1.0);
        assert_relative_eq!(RewardTerm::Fingering.compute(&scene, &goal, &shaping), 1.0);
        assert_relative_eq!(RewardTerm::OtFingering.compute(&scene, &goal, &shaping), 1.0);
        assert_eq!(RewardTerm::Forearm.default_name(), "forearm_reward");
    }
}
