//! Error types for reward setup.

use pianist_ir::IrError;
use thiserror::Error;

/// Errors raised while configuring rewards or the goal tracker.
#[derive(Error, Debug)]
pub enum RewardError {
    /// Lower tolerance bound exceeds the upper bound.
    #[error("Lower bound {lower} must not exceed upper bound {upper}")]
    InvalidBounds {
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },

    /// Tolerance margin is negative or not finite.
    #[error("Margin must be non-negative, got {0}")]
    InvalidMargin(f64),

    /// Value at margin outside the range the sigmoid accepts.
    #[error("Value at margin {value} is invalid for the {sigmoid} sigmoid")]
    InvalidValueAtMargin {
        /// Sigmoid name.
        sigmoid: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A term with this name is already registered.
    #[error("Reward term already exists: {0}")]
    DuplicateTerm(String),

    /// No term with this name is registered.
    #[error("Reward term not found: {0}")]
    UnknownTerm(String),

    /// The schedule does not fit the keyboard.
    #[error("Invalid schedule: {0}")]
    Schedule(#[from] IrError),
}
