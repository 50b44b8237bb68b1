//! Error types for kinematic setup.

use pianist_ir::IrError;
use thiserror::Error;

/// Errors that can occur while setting up kinematics or the retargeter.
///
/// Per-step failures are never reported through this type; they degrade in
/// place and are logged.
#[derive(Error, Debug)]
pub enum KinematicsError {
    /// Articulation description is invalid.
    #[error("Invalid articulation: {0}")]
    Articulation(#[from] IrError),

    /// Missing body.
    #[error("Body not found: {0}")]
    MissingBody(String),

    /// Invalid joint configuration.
    #[error("Invalid joint configuration: {0}")]
    InvalidJoint(String),

    /// Invalid solver, limiter or retargeter parameter.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Reason for rejection.
        reason: String,
    },
}

impl KinematicsError {
    pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), Self> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(KinematicsError::InvalidParameter {
                name,
                reason: format!("must be positive, got {value}"),
            })
        }
    }
}
