//! Rate-decoupled arm retargeting: track, solve, limit, write.

use nalgebra::{DVector, Isometry3, Vector3};
use pianist_ir::{presets, LimbSpec};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::KinematicsError;
use crate::ik::{IkSolver, IkStrategy};
use crate::integrator::JointWriter;
use crate::limb::Limb;
use crate::limiter::{MotionLimiter, MotionLimits};
use crate::physics::{Configuration, JointId, Kinematics};
use crate::targets::{HandTargets, TargetTracker};

/// Retargeter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetargetConfig {
    /// IK backend and its parameters.
    pub ik: IkStrategy,
    /// Interval used to turn a velocity into a position delta, in seconds.
    pub solve_dt: f64,
    /// Solve once every this many physics steps; hold the command between.
    pub solve_every: u32,
    /// Velocity and acceleration limits.
    pub limits: MotionLimits,
    /// Gain on the drift-correction velocity added at write time.
    pub correction_gain: f64,
    /// World-frame offset added to the left hand position.
    pub left_offset: [f64; 3],
    /// World-frame offset added to the right hand position.
    pub right_offset: [f64; 3],
    /// Name prefixes tried, in order, when resolving joints and frames.
    pub prefixes: Vec<String>,
}

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
            ik: IkStrategy::default(),
            solve_dt: 0.1,
            solve_every: 5,
            limits: MotionLimits::default(),
            correction_gain: 0.8,
            left_offset: [0.0; 3],
            right_offset: [0.0; 3],
            prefixes: vec![String::new(), presets::G1_BODY_PREFIX.to_string()],
        }
    }
}

impl RetargetConfig {
    /// Reject settings that would make the controller ill-defined.
    pub fn validate(&self) -> Result<(), KinematicsError> {
        KinematicsError::require_positive("solve_dt", self.solve_dt)?;
        if self.solve_every == 0 {
            return Err(KinematicsError::InvalidParameter {
                name: "solve_every",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.correction_gain.is_finite() && self.correction_gain >= 0.0) {
            return Err(KinematicsError::InvalidParameter {
                name: "correction_gain",
                reason: format!("must be non-negative, got {}", self.correction_gain),
            });
        }
        self.limits.validate()?;
        IkSolver::new(self.ik, self.prefixes.clone()).map(|_| ())
    }
}

/// What a call to [`ArmRetargeter::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetargetStep {
    /// Ran a solve and wrote positions and velocities for this many limbs.
    Solved {
        /// Limbs written.
        limbs: usize,
    },
    /// Re-applied the cached velocity command.
    Held,
    /// Nothing to write yet.
    Idle,
}

/// Drives the humanoid's arms toward the source hands.
///
/// Holds every piece of per-instance controller state: the solve counter,
/// the limiter's previous command and the written velocities replayed on
/// hold steps. Parallel environments need one retargeter each.
#[derive(Debug, Clone)]
pub struct ArmRetargeter {
    limbs: Vec<Limb>,
    tracker: TargetTracker,
    solver: IkSolver,
    limiter: MotionLimiter,
    writer: JointWriter,
    solve_dt: f64,
    solve_every: u32,
    counter: u32,
    held: Option<(Vec<JointId>, DVector<f64>)>,
}

impl ArmRetargeter {
    /// Build a retargeter for the given limbs.
    pub fn new(limbs: Vec<LimbSpec>, config: &RetargetConfig) -> Result<Self, KinematicsError> {
        config.validate()?;
        Ok(Self {
            limbs: limbs.into_iter().map(Limb::new).collect(),
            tracker: TargetTracker::new(
                Vector3::from(config.left_offset),
                Vector3::from(config.right_offset),
            ),
            solver: IkSolver::new(config.ik, config.prefixes.clone())?,
            limiter: MotionLimiter::new(config.limits)?,
            writer: JointWriter::new(config.correction_gain),
            solve_dt: config.solve_dt,
            solve_every: config.solve_every,
            counter: 0,
            held: None,
        })
    }

    /// Controlled limbs.
    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    /// Velocity command replayed on hold steps, if any.
    pub fn held_velocity(&self) -> Option<&DVector<f64>> {
        self.held.as_ref().map(|(_, v)| v)
    }

    /// Forget all cached state, as at episode start.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.held = None;
        self.limiter.reset();
    }

    /// One physics step: solve on every `solve_every`-th call, hold otherwise.
    pub fn step<K: Kinematics + ?Sized>(
        &mut self,
        physics: &mut K,
        left: &Isometry3<f64>,
        right: &Isometry3<f64>,
    ) -> RetargetStep {
        let result = if self.counter % self.solve_every == 0 {
            self.counter = 0;
            self.solve(physics, left, right)
        } else {
            self.hold(physics)
        };
        self.counter += 1;
        result
    }

    /// Solve immediately, regardless of the counter.
    ///
    /// Used to pull the arms toward the hands when an episode starts.
    pub fn align<K: Kinematics + ?Sized>(
        &mut self,
        physics: &mut K,
        left: &Isometry3<f64>,
        right: &Isometry3<f64>,
    ) -> RetargetStep {
        self.solve(physics, left, right)
    }

    fn solve<K: Kinematics + ?Sized>(
        &mut self,
        physics: &mut K,
        left: &Isometry3<f64>,
        right: &Isometry3<f64>,
    ) -> RetargetStep {
        let targets: HandTargets = self.tracker.get_targets(left, right);
        let previous = self
            .limiter
            .previous()
            .filter(|p| p.len() == physics.num_joints())
            .cloned()
            .unwrap_or_else(|| DVector::zeros(physics.num_joints()));

        let solution = self
            .solver
            .solve(&*physics, &self.limbs, &targets, &previous, self.solve_dt);
        if solution.solved.is_empty() {
            return self.hold(physics);
        }

        let velocity = self.limiter.limit(&solution.velocity, self.solve_dt);
        let joints: Vec<JointId> = solution
            .solved
            .iter()
            .flat_map(|limb| limb.joints.iter().copied())
            .collect();

        let mut configuration = Configuration::from_physics(&*physics);
        let written = self
            .writer
            .apply(physics, &mut configuration, &joints, &velocity, self.solve_dt);
        debug!(
            limbs = solution.solved.len(),
            velocity_norm = velocity.norm(),
            "arm command written"
        );

        let limbs = solution.solved.len();
        self.held = Some((joints, written));
        RetargetStep::Solved { limbs }
    }

    fn hold<K: Kinematics + ?Sized>(&self, physics: &mut K) -> RetargetStep {
        match &self.held {
            Some((joints, velocity)) => {
                self.writer.hold(physics, joints, velocity);
                RetargetStep::Held
            }
            None => RetargetStep::Idle,
        }
    }
}
