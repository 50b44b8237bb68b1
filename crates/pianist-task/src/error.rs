//! Error types for task setup.

use pianist_ir::IrError;
use pianist_kinematics::KinematicsError;
use pianist_reward::RewardError;
use thiserror::Error;

/// Errors that can occur while building or driving a task.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Configuration file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML for [`TaskConfig`](crate::TaskConfig).
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("Invalid config value {name}: {reason}")]
    InvalidConfig {
        /// Field name.
        name: &'static str,
        /// Reason for rejection.
        reason: String,
    },

    /// Action has the wrong number of components.
    #[error("Action has {got} components, expected {expected}")]
    ActionLength {
        /// Expected length.
        expected: usize,
        /// Provided length.
        got: usize,
    },

    /// Note schedule is invalid.
    #[error("Invalid schedule: {0}")]
    Schedule(#[from] IrError),

    /// Kinematic setup failed.
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),

    /// Reward setup failed.
    #[error(transparent)]
    Reward(#[from] RewardError),
}
