//! Task configuration.

use std::path::Path;

use pianist_ir::{Side, Vec3};
use pianist_kinematics::RetargetConfig;
use pianist_reward::{FingeringPolicy, RewardParams};
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Where the hands, the keyboard and the humanoid sit.
///
/// Every position is given before `height_offset` is added to its z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    /// Lift applied to the whole stage, in meters.
    pub height_offset: f64,
    /// Left hand root.
    pub left_hand: Vec3,
    /// Right hand root.
    pub right_hand: Vec3,
    /// Humanoid torso.
    pub humanoid_base: Vec3,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            height_offset: 0.76,
            left_hand: Vec3::new(0.4, -0.15, 0.13),
            right_hand: Vec3::new(0.4, 0.15, 0.13),
            humanoid_base: Vec3::new(0.8, 0.0, 0.09),
        }
    }
}

impl Placement {
    fn raised(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.x, v.y, v.z + self.height_offset)
    }

    /// Hand root position after raising.
    pub fn hand(&self, side: Side) -> Vec3 {
        match side {
            Side::Left => self.raised(self.left_hand),
            Side::Right => self.raised(self.right_hand),
        }
    }

    /// Humanoid torso position after raising.
    pub fn humanoid(&self) -> Vec3 {
        self.raised(self.humanoid_base)
    }
}

/// Everything needed to build a [`PianoTask`](crate::PianoTask).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Seconds per control step.
    pub control_timestep: f64,
    /// Seconds per physics step.
    pub physics_timestep: f64,
    /// Goal window rows past the current step.
    pub n_steps_lookahead: usize,
    /// Silence prepended to the schedule, in seconds.
    pub initial_buffer_time: f64,
    /// Score fingers by minimum-cost matching instead of annotations.
    pub disable_fingering_reward: bool,
    /// Drop the forearm collision term.
    pub disable_forearm_reward: bool,
    /// End the episode (discount 0) when a wrong key is pressed.
    pub wrong_press_termination: bool,
    /// Reward thresholds and coefficients.
    pub reward: RewardParams,
    /// Shift both hands sideways by a random amount at episode start.
    pub randomize_hand_positions: bool,
    /// Bound of that shift, in meters.
    pub hand_position_offset: f64,
    /// Seed of the episode random number generator.
    pub seed: u64,
    /// Stage layout.
    pub placement: Placement,
    /// Arm retargeting.
    pub retarget: RetargetConfig,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            control_timestep: 0.05,
            physics_timestep: 0.005,
            n_steps_lookahead: 1,
            initial_buffer_time: 0.0,
            disable_fingering_reward: false,
            disable_forearm_reward: false,
            wrong_press_termination: false,
            reward: RewardParams::default(),
            randomize_hand_positions: false,
            hand_position_offset: 0.05,
            seed: 0,
            placement: Placement::default(),
            retarget: RetargetConfig::default(),
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), TaskError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TaskError::InvalidConfig {
            name,
            reason: format!("must be positive, got {value}"),
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), TaskError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TaskError::InvalidConfig {
            name,
            reason: format!("must be non-negative, got {value}"),
        })
    }
}

impl TaskConfig {
    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, TaskError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TaskError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    /// Reject values the task cannot run with.
    pub fn validate(&self) -> Result<(), TaskError> {
        positive("control_timestep", self.control_timestep)?;
        positive("physics_timestep", self.physics_timestep)?;
        if self.physics_timestep > self.control_timestep {
            return Err(TaskError::InvalidConfig {
                name: "physics_timestep",
                reason: format!(
                    "{} exceeds control_timestep {}",
                    self.physics_timestep, self.control_timestep
                ),
            });
        }
        non_negative("initial_buffer_time", self.initial_buffer_time)?;
        non_negative("hand_position_offset", self.hand_position_offset)?;
        positive(
            "reward.finger_close_enough_to_key",
            self.reward.finger_close_enough_to_key,
        )?;
        positive(
            "reward.key_close_enough_to_pressed",
            self.reward.key_close_enough_to_pressed,
        )?;
        non_negative("reward.energy_penalty_coef", self.reward.energy_penalty_coef)?;
        self.retarget.validate()?;
        Ok(())
    }

    /// Physics steps per control step.
    pub fn substeps(&self) -> usize {
        ((self.control_timestep / self.physics_timestep).round() as usize).max(1)
    }

    /// Fingering policy implied by `disable_fingering_reward`.
    pub fn fingering_policy(&self) -> FingeringPolicy {
        if self.disable_fingering_reward {
            FingeringPolicy::OptimalTransport
        } else {
            FingeringPolicy::Direct
        }
    }
}
