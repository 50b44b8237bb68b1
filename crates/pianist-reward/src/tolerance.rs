//! Bounded shaping of a scalar error.
//!
//! A tolerance score is 1 inside `bounds` and decays outside them; at a
//! distance of `margin` from the nearest bound it equals `value_at_margin`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::RewardError;

/// Falloff shape outside the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sigmoid {
    /// `exp(-0.5 (x s)^2)`; the shape every piano term uses.
    #[default]
    Gaussian,
    /// `1 / cosh(x s)`.
    Hyperbolic,
    /// `1 / ((x s)^2 + 1)`.
    LongTail,
    /// `1 / (|x| s + 1)`.
    Reciprocal,
    /// Raised cosine, zero beyond its support.
    Cosine,
    /// `1 - x s`, zero beyond its support.
    Linear,
    /// `1 - (x s)^2`, zero beyond its support.
    Quadratic,
    /// `1 - tanh(x s)^2`.
    TanhSquared,
}

impl Sigmoid {
    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Sigmoid::Gaussian => "gaussian",
            Sigmoid::Hyperbolic => "hyperbolic",
            Sigmoid::LongTail => "long_tail",
            Sigmoid::Reciprocal => "reciprocal",
            Sigmoid::Cosine => "cosine",
            Sigmoid::Linear => "linear",
            Sigmoid::Quadratic => "quadratic",
            Sigmoid::TanhSquared => "tanh_squared",
        }
    }

    /// Shapes with finite support accept a value of 0 at the margin.
    fn allows_zero(self) -> bool {
        matches!(self, Sigmoid::Cosine | Sigmoid::Linear | Sigmoid::Quadratic)
    }

    /// Scale such that `eval(1.0) == value_at_1`.
    fn scale(self, value_at_1: f64) -> f64 {
        match self {
            Sigmoid::Gaussian => (-2.0 * value_at_1.ln()).sqrt(),
            Sigmoid::Hyperbolic => (1.0 / value_at_1).acosh(),
            Sigmoid::LongTail => (1.0 / value_at_1 - 1.0).sqrt(),
            Sigmoid::Reciprocal => 1.0 / value_at_1 - 1.0,
            Sigmoid::Cosine => (2.0 * value_at_1 - 1.0).acos() / PI,
            Sigmoid::Linear => 1.0 - value_at_1,
            Sigmoid::Quadratic => (1.0 - value_at_1).sqrt(),
            Sigmoid::TanhSquared => (1.0 - value_at_1).sqrt().atanh(),
        }
    }

    fn eval(self, x: f64, scale: f64) -> f64 {
        let sx = x * scale;
        match self {
            Sigmoid::Gaussian => (-0.5 * sx * sx).exp(),
            Sigmoid::Hyperbolic => 1.0 / sx.cosh(),
            Sigmoid::LongTail => 1.0 / (sx * sx + 1.0),
            Sigmoid::Reciprocal => 1.0 / (sx.abs() + 1.0),
            Sigmoid::Cosine => {
                if sx.abs() < 1.0 {
                    (1.0 + (PI * sx).cos()) / 2.0
                } else {
                    0.0
                }
            }
            Sigmoid::Linear => {
                if sx.abs() < 1.0 {
                    1.0 - sx
                } else {
                    0.0
                }
            }
            Sigmoid::Quadratic => {
                if sx.abs() < 1.0 {
                    1.0 - sx * sx
                } else {
                    0.0
                }
            }
            Sigmoid::TanhSquared => 1.0 - sx.tanh().powi(2),
        }
    }
}

/// A validated tolerance function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    lower: f64,
    upper: f64,
    margin: f64,
    sigmoid: Sigmoid,
    scale: f64,
}

impl Tolerance {
    /// Default value at the margin.
    pub const VALUE_AT_MARGIN: f64 = 0.1;

    /// Create a tolerance function.
    pub fn new(
        bounds: (f64, f64),
        margin: f64,
        sigmoid: Sigmoid,
        value_at_margin: f64,
    ) -> Result<Self, RewardError> {
        let (lower, upper) = bounds;
        if !(lower <= upper) {
            return Err(RewardError::InvalidBounds { lower, upper });
        }
        if !(margin >= 0.0 && margin.is_finite()) {
            return Err(RewardError::InvalidMargin(margin));
        }
        let lowest = if sigmoid.allows_zero() { 0.0 } else { f64::MIN_POSITIVE };
        if margin > 0.0 && !(value_at_margin >= lowest && value_at_margin < 1.0) {
            return Err(RewardError::InvalidValueAtMargin {
                sigmoid: sigmoid.name(),
                value: value_at_margin,
            });
        }
        Ok(Self {
            lower,
            upper,
            margin,
            sigmoid,
            scale: sigmoid.scale(value_at_margin),
        })
    }

    /// Gaussian falloff reaching 0.1 at `margin`.
    pub fn gaussian(bounds: (f64, f64), margin: f64) -> Result<Self, RewardError> {
        Self::new(bounds, margin, Sigmoid::Gaussian, Self::VALUE_AT_MARGIN)
    }

    /// Score of one error value, in `[0, 1]`.
    pub fn eval(&self, x: f64) -> f64 {
        let in_bounds = self.lower <= x && x <= self.upper;
        if in_bounds {
            return 1.0;
        }
        if self.margin == 0.0 {
            return 0.0;
        }
        let d = if x < self.lower {
            self.lower - x
        } else {
            x - self.upper
        };
        self.sigmoid.eval(d / self.margin, self.scale)
    }

    /// Mean score over `xs`, or `None` if empty.
    pub fn mean<I: IntoIterator<Item = f64>>(&self, xs: I) -> Option<f64> {
        let (sum, n) = xs
            .into_iter()
            .fold((0.0, 0usize), |(sum, n), x| (sum + self.eval(x), n + 1));
        (n > 0).then(|| sum / n as f64)
    }
}
