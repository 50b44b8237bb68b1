#![warn(missing_docs)]

//! Reward shaping for a humanoid playing the piano.
//!
//! Rewards are computed once per control step from the physical scene (keys,
//! pedal, fingertips, actuator power, forearm contact) and the goal derived
//! from a [`NoteSchedule`](pianist_ir::NoteSchedule).
//!
//! # Terms
//!
//! | name | range |
//! |---|---|
//! | `key_press_reward` | `[0, 1]` |
//! | `sustain_reward` | `[0, 1]` |
//! | `energy_reward` | `(-inf, 0]` |
//! | `fingering_reward` / `ot_fingering_reward` | `[0, 1]` |
//! | `forearm_reward` | `{0, 0.5}` |

mod assignment;
mod composite;
mod error;
mod goal;
mod scene;
mod terms;
mod tolerance;

pub use assignment::min_cost_assignment;
pub use composite::RewardComposer;
pub use error::RewardError;
pub use goal::{FingerAssignment, GoalTracker};
pub use scene::{KeyGeom, SceneReadout};
pub use terms::{
    energy_reward, fingering_reward, forearm_reward, key_press_reward, ot_fingering_reward,
    sustain_reward, FingeringPolicy, RewardParams, RewardTerm, Shaping,
};
pub use tolerance::{Sigmoid, Tolerance};
