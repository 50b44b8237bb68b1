//! Bounded action specifications.

use serde::{Deserialize, Serialize};

/// A one-dimensional action with per-component bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundedArraySpec {
    /// Name, for diagnostics.
    pub name: String,
    /// Lower bound of each component.
    pub minimum: Vec<f64>,
    /// Upper bound of each component.
    pub maximum: Vec<f64>,
}

impl BoundedArraySpec {
    /// Create a spec from parallel bound vectors.
    pub fn new(name: impl Into<String>, minimum: Vec<f64>, maximum: Vec<f64>) -> Self {
        debug_assert_eq!(minimum.len(), maximum.len());
        Self {
            name: name.into(),
            minimum,
            maximum,
        }
    }

    /// A single bounded scalar.
    pub fn scalar(name: impl Into<String>, minimum: f64, maximum: f64) -> Self {
        Self::new(name, vec![minimum], vec![maximum])
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.minimum.len()
    }

    /// True if the spec has no components.
    pub fn is_empty(&self) -> bool {
        self.minimum.is_empty()
    }

    /// Concatenate specs in order.
    pub fn merge<'a>(specs: impl IntoIterator<Item = &'a BoundedArraySpec>) -> Self {
        let mut names = Vec::new();
        let mut minimum = Vec::new();
        let mut maximum = Vec::new();
        for spec in specs {
            names.push(spec.name.as_str());
            minimum.extend_from_slice(&spec.minimum);
            maximum.extend_from_slice(&spec.maximum);
        }
        Self::new(names.join("\t"), minimum, maximum)
    }

    /// Clamp each component of `action` into bounds.
    pub fn clip(&self, action: &[f64]) -> Vec<f64> {
        action
            .iter()
            .zip(self.minimum.iter().zip(&self.maximum))
            .map(|(a, (lo, hi))| a.clamp(*lo, *hi))
            .collect()
    }

    /// True if `action` has the right length and lies inside the bounds.
    pub fn contains(&self, action: &[f64]) -> bool {
        action.len() == self.len()
            && action
                .iter()
                .zip(self.minimum.iter().zip(&self.maximum))
                .all(|(a, (lo, hi))| lo <= a && a <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_concatenates() {
        let hand = BoundedArraySpec::new("hand", vec![-1.0, 0.0], vec![1.0, 1.0]);
        let sustain = BoundedArraySpec::scalar("sustain", 0.0, 1.0);
        let merged = BoundedArraySpec::merge([&hand, &hand, &sustain]);
        assert_eq!(merged.len(), 5);
        assert_eq!(merged.minimum, vec![-1.0, 0.0, -1.0, 0.0, 0.0]);
        assert_eq!(merged.maximum[4], 1.0);
        assert_eq!(merged.name, "hand\thand\tsustain");
    }

    #[test]
    fn clip_and_contains() {
        let spec = BoundedArraySpec::new("a", vec![0.0, -1.0], vec![1.0, 1.0]);
        assert_eq!(spec.clip(&[2.0, -3.0]), vec![1.0, -1.0]);
        assert!(spec.contains(&[0.5, 0.0]));
        assert!(!spec.contains(&[0.5]));
        assert!(!spec.contains(&[1.5, 0.0]));
    }
}
