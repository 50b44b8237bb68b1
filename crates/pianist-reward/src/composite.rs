//! Sum of named reward terms.

use tracing::debug;

use crate::error::RewardError;
use crate::goal::GoalTracker;
use crate::scene::SceneReadout;
use crate::terms::{FingeringPolicy, RewardParams, RewardTerm, Shaping};

/// Named reward terms summed without weights.
///
/// Each term embeds its own weight, so the total has no fixed range; sum the
/// per-term bounds if one is needed.
#[derive(Debug, Clone)]
pub struct RewardComposer {
    shaping: Shaping,
    terms: Vec<(String, RewardTerm)>,
    breakdown: Vec<(String, f64)>,
}

impl RewardComposer {
    /// An empty composer.
    pub fn new(params: &RewardParams) -> Result<Self, RewardError> {
        Ok(Self {
            shaping: Shaping::new(params)?,
            terms: Vec::new(),
            breakdown: Vec::new(),
        })
    }

    /// Key press, sustain and energy, then one fingering term, then the
    /// forearm term unless disabled.
    pub fn piano(
        params: &RewardParams,
        fingering: FingeringPolicy,
        forearm: bool,
    ) -> Result<Self, RewardError> {
        let mut composer = Self::new(params)?;
        composer.add_default(RewardTerm::KeyPress)?;
        composer.add_default(RewardTerm::Sustain)?;
        composer.add_default(RewardTerm::Energy)?;
        match fingering {
            FingeringPolicy::Direct => composer.add_default(RewardTerm::Fingering)?,
            FingeringPolicy::OptimalTransport => composer.add_default(RewardTerm::OtFingering)?,
        }
        if forearm {
            composer.add_default(RewardTerm::Forearm)?;
        }
        Ok(composer)
    }

    /// Register a term under `name`.
    pub fn add(&mut self, name: impl Into<String>, term: RewardTerm) -> Result<(), RewardError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(RewardError::DuplicateTerm(name));
        }
        self.terms.push((name, term));
        Ok(())
    }

    /// Register a term under its default name.
    pub fn add_default(&mut self, term: RewardTerm) -> Result<(), RewardError> {
        self.add(term.default_name(), term)
    }

    /// Unregister a term.
    pub fn remove(&mut self, name: &str) -> Result<RewardTerm, RewardError> {
        let index = self
            .terms
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| RewardError::UnknownTerm(name.to_string()))?;
        Ok(self.terms.remove(index).1)
    }

    /// True if a term is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.terms.iter().any(|(n, _)| n == name)
    }

    /// Registered term names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(n, _)| n.as_str())
    }

    /// Evaluate every term and return the sum.
    pub fn compute<S: SceneReadout + ?Sized>(&mut self, scene: &S, goal: &GoalTracker) -> f64 {
        self.breakdown.clear();
        for (name, term) in &self.terms {
            let value = term.compute(scene, goal, &self.shaping);
            self.breakdown.push((name.clone(), value));
        }
        let total: f64 = self.breakdown.iter().map(|(_, v)| v).sum();
        debug!(total, breakdown = ?self.breakdown, "reward");
        total
    }

    /// Per-term values from the last [`compute`](Self::compute).
    pub fn breakdown(&self) -> &[(String, f64)] {
        &self.breakdown
    }
}
