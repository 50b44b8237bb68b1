#![warn(missing_docs)]

//! Kinematic retargeting of two source hands onto a humanoid's arms.
//!
//! This crate drives two redundant 7-DOF arms so their wrists follow two
//! independently moving hands, one control step at a time.
//!
//! # Features
//!
//! - [`Kinematics`] trait: the narrow read/write surface of the physics layer
//! - [`KinematicModel`]: a reference kinematic tree implementing that trait
//! - Target tracking with fixed per-hand offsets
//! - IK with two interchangeable strategies: a damped task-space QP and a
//!   per-joint axis projection
//! - Velocity and acceleration limiting
//! - Kinematic joint override (positions and velocities are written
//!   directly, not through actuators)
//! - Rate decoupling: solve every Nth physics step, hold the command between
//!
//! # Example
//!
//! ```ignore
//! use pianist_ir::{presets, Side, Vec3};
//! use pianist_kinematics::{ArmRetargeter, KinematicModel, RetargetConfig};
//!
//! let mut model = KinematicModel::from_articulation(&presets::g1_arms(Vec3::new(0.8, 0.0, 0.85)))?;
//! let limbs = vec![presets::g1_limb(Side::Left), presets::g1_limb(Side::Right)];
//! let mut retargeter = ArmRetargeter::new(limbs, &RetargetConfig::default())?;
//!
//! // Once per physics step:
//! retargeter.step(&mut model, &left_hand_pose, &right_hand_pose);
//! ```

mod contact;
mod error;
mod ik;
mod integrator;
mod joints;
mod limb;
mod limiter;
mod model;
mod physics;
mod qp;
mod retarget;
mod targets;

pub use contact::{boxes_in_contact, CollisionBox};
pub use error::KinematicsError;
pub use ik::{IkSolution, IkSolver, IkStrategy, ProjectionParams, QpParams};
pub use integrator::JointWriter;
pub use joints::JointType;
pub use limb::{Limb, ResolvedLimb};
pub use limiter::{MotionLimiter, MotionLimits};
pub use model::KinematicModel;
pub use physics::{Configuration, FrameId, JointId, Kinematics};
pub use retarget::{ArmRetargeter, RetargetConfig, RetargetStep};
pub use targets::{HandTargets, TargetPose, TargetTracker};
