//! Velocity and acceleration limiting of IK output.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;

/// Limits applied to every velocity command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionLimits {
    /// Multiplier applied to the raw solve output.
    pub velocity_scale: f64,
    /// Per-component velocity bound.
    pub velocity_limit: f64,
    /// Per-component bound on the change in velocity per unit time.
    pub acceleration_limit: f64,
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            velocity_scale: 2.0,
            velocity_limit: 2.0,
            acceleration_limit: 20.0,
        }
    }
}

impl MotionLimits {
    /// Check every limit is positive and finite.
    pub fn validate(&self) -> Result<(), KinematicsError> {
        KinematicsError::require_positive("velocity_scale", self.velocity_scale)?;
        KinematicsError::require_positive("velocity_limit", self.velocity_limit)?;
        KinematicsError::require_positive("acceleration_limit", self.acceleration_limit)
    }
}

/// Scales, clips and rate-limits velocity commands.
///
/// Owns the previous command; one limiter per environment instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionLimiter {
    limits: MotionLimits,
    previous: Option<DVector<f64>>,
}

impl MotionLimiter {
    /// Create a limiter with no previous command.
    pub fn new(limits: MotionLimits) -> Result<Self, KinematicsError> {
        limits.validate()?;
        Ok(Self {
            limits,
            previous: None,
        })
    }

    /// Configured limits.
    pub fn limits(&self) -> &MotionLimits {
        &self.limits
    }

    /// Last limited command, if any.
    pub fn previous(&self) -> Option<&DVector<f64>> {
        self.previous.as_ref()
    }

    /// Forget the previous command; the next call skips acceleration limiting.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Scale, clip to the velocity bound, then clip the acceleration relative
    /// to the previous command. The result becomes the new previous command.
    pub fn limit(&mut self, raw: &DVector<f64>, dt: f64) -> DVector<f64> {
        let v_max = self.limits.velocity_limit;
        let mut velocity = raw.map(|v| (v * self.limits.velocity_scale).clamp(-v_max, v_max));

        if let Some(previous) = &self.previous {
            if previous.len() == velocity.len() && dt > 0.0 {
                let a_max = self.limits.acceleration_limit;
                velocity.zip_apply(previous, |v, prev| {
                    let accel = ((*v - prev) / dt).clamp(-a_max, a_max);
                    *v = prev + accel * dt;
                });
            }
        }

        // Non-finite input collapses to zero rather than poisoning the cache.
        velocity.apply(|v| {
            if !v.is_finite() {
                *v = 0.0;
            }
        });

        self.previous = Some(velocity.clone());
        velocity
    }
}
