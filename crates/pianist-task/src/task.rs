//! The piano-playing task: episode lifecycle, rewards and observations.

use nalgebra::{Isometry3, Vector3};
use pianist_ir::{presets, NoteSchedule, Side};
use pianist_kinematics::{ArmRetargeter, RetargetStep};
use pianist_reward::{GoalTracker, RewardComposer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::TaskConfig;
use crate::error::TaskError;
use crate::scene::Scene;
use crate::spec::BoundedArraySpec;

/// What the agent sees after each step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Goal window, `(lookahead + 1) * (num_keys + 1)` values, row-major.
    pub goal: Vec<f64>,
    /// Fingering matrix flattened, right hand first; absent when the direct
    /// fingering reward is disabled.
    pub fingering: Option<Vec<f64>>,
    /// Normalised key positions.
    pub piano_state: Vec<f64>,
    /// Sustain pedal position.
    pub sustain_state: f64,
    /// Humanoid arm joint positions, right arm first.
    pub arm_joint_positions: Vec<f64>,
}

/// Result of one control step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeStep {
    /// Observation after the step.
    pub observation: Observation,
    /// Summed reward for the step.
    pub reward: f64,
    /// 0 after a failure termination, 1 otherwise.
    pub discount: f64,
    /// Whether the episode ended with this step.
    pub last: bool,
}

/// A humanoid mirroring two dexterous hands on a keyboard.
///
/// The agent drives the source hands and the sustain pedal; the humanoid's
/// arms follow the hands through [`ArmRetargeter`] on every physics step.
pub struct PianoTask<S: Scene> {
    config: TaskConfig,
    scene: S,
    goal: GoalTracker,
    rewards: RewardComposer,
    retargeter: ArmRetargeter,
    rng: StdRng,
    discount: f64,
}

impl<S: Scene> PianoTask<S> {
    /// Build a task over `scene` playing `schedule`.
    pub fn new(config: TaskConfig, scene: S, schedule: NoteSchedule) -> Result<Self, TaskError> {
        config.validate()?;
        let buffer = NoteSchedule::buffer_steps(config.initial_buffer_time, config.control_timestep);
        let goal = GoalTracker::new(
            schedule.with_initial_buffer(buffer),
            scene.num_keys(),
            config.n_steps_lookahead,
        )?
        .with_fingering(!config.disable_fingering_reward);
        let rewards = RewardComposer::piano(
            &config.reward,
            config.fingering_policy(),
            !config.disable_forearm_reward,
        )?;
        let retargeter = ArmRetargeter::new(
            vec![presets::g1_limb(Side::Right), presets::g1_limb(Side::Left)],
            &config.retarget,
        )?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            scene,
            goal,
            rewards,
            retargeter,
            rng,
            discount: 1.0,
        })
    }

    /// Task configuration.
    pub fn config(&self) -> &TaskConfig {
        &self.config
    }

    /// The simulated stage.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the simulated stage.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Goal and fingering state.
    pub fn goal(&self) -> &GoalTracker {
        &self.goal
    }

    /// Reward terms and their last breakdown.
    pub fn rewards(&self) -> &RewardComposer {
        &self.rewards
    }

    /// Start a new episode and return the first observation.
    pub fn initialize_episode(&mut self) -> Observation {
        self.scene.reset();
        self.goal.reset();
        self.discount = 1.0;

        let dy = if self.config.randomize_hand_positions {
            let offset = self.config.hand_position_offset;
            self.rng.gen_range(-offset..=offset)
        } else {
            0.0
        };
        self.scene.set_hand_offset(Vector3::new(0.0, dy, 0.0));
        debug!(dy, "source hand offset");

        self.retargeter.reset();
        let (left, right) = self.hand_poses();
        self.retargeter.align(&mut self.scene, &left, &right);

        info!(
            steps = self.goal.schedule().len(),
            keys = self.goal.num_keys(),
            "episode start"
        );
        self.observation()
    }

    /// Apply one control action: right hand, left hand, then sustain.
    pub fn before_step(&mut self, action: &[f64]) -> Result<(), TaskError> {
        let right = self.scene.hand_action_spec(Side::Right).len();
        let left = self.scene.hand_action_spec(Side::Left).len();
        let expected = right + left + 1;
        if action.len() != expected {
            return Err(TaskError::ActionLength {
                expected,
                got: action.len(),
            });
        }
        self.scene.apply_hand_action(Side::Right, &action[..right]);
        self.scene.apply_hand_action(Side::Left, &action[right..right + left]);
        self.scene.set_sustain(action[expected - 1]);
        Ok(())
    }

    /// Retarget the humanoid's arms ahead of one physics step.
    pub fn before_substep(&mut self) -> RetargetStep {
        let (left, right) = self.hand_poses();
        self.retargeter.step(&mut self.scene, &left, &right)
    }

    /// Advance the schedule and latch what the step is scored against.
    pub fn after_step(&mut self) {
        self.goal.advance(self.scene.key_activation());
    }

    /// Reward for the step just taken.
    pub fn get_reward(&mut self) -> f64 {
        self.rewards.compute(&self.scene, &self.goal)
    }

    /// Current discount.
    pub fn get_discount(&self) -> f64 {
        self.discount
    }

    /// Whether the episode is over.
    ///
    /// Wrong presses end the episode with zero discount when
    /// `wrong_press_termination` is set.
    pub fn should_terminate_episode(&mut self) -> bool {
        if self.goal.should_terminate() {
            info!(t = self.goal.t_idx(), "schedule finished");
            return true;
        }
        if self.config.wrong_press_termination && self.goal.failure_termination() {
            info!(t = self.goal.t_idx(), "wrong key pressed");
            self.discount = 0.0;
            return true;
        }
        false
    }

    /// Refresh the goal window and read every observable.
    pub fn observation(&mut self) -> Observation {
        self.goal.refresh();
        let fingering = (!self.config.disable_fingering_reward)
            .then(|| self.goal.fingering_state_flat());
        let arm_joint_positions = self
            .retargeter
            .limbs()
            .iter()
            .filter_map(|limb| limb.resolve(&self.scene, &self.config.retarget.prefixes))
            .flat_map(|limb| limb.joints)
            .map(|joint| self.scene.joint_position(joint))
            .collect();
        Observation {
            goal: self.goal.goal_state_flat(),
            fingering,
            piano_state: self.scene.key_state().to_vec(),
            sustain_state: self.scene.sustain_state(),
            arm_joint_positions,
        }
    }

    /// Right hand, left hand, then a scalar sustain command in `[0, 1]`.
    pub fn action_spec(&self) -> BoundedArraySpec {
        let right = self.scene.hand_action_spec(Side::Right);
        let left = self.scene.hand_action_spec(Side::Left);
        let sustain = BoundedArraySpec::scalar("sustain", 0.0, 1.0);
        BoundedArraySpec::merge([&right, &left, &sustain])
    }

    /// Run one full control step.
    pub fn step(&mut self, action: &[f64]) -> Result<TimeStep, TaskError> {
        self.before_step(action)?;
        let dt = self.config.physics_timestep;
        for _ in 0..self.config.substeps() {
            self.before_substep();
            self.scene.step_physics(dt);
        }
        self.after_step();
        let reward = self.get_reward();
        let last = self.should_terminate_episode();
        Ok(TimeStep {
            observation: self.observation(),
            reward,
            discount: self.discount,
            last,
        })
    }

    fn hand_poses(&self) -> (Isometry3<f64>, Isometry3<f64>) {
        (
            self.scene.hand_root_pose(Side::Left),
            self.scene.hand_root_pose(Side::Right),
        )
    }
}
