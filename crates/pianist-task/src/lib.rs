#![warn(missing_docs)]

//! A humanoid playing piano by mirroring two dexterous source hands.
//!
//! [`PianoTask`] owns the episode: it applies hand and pedal actions to a
//! [`Scene`], retargets the humanoid's arms onto the hands every physics
//! step, advances the note schedule and scores the step with the piano
//! reward terms.
//!
//! ```no_run
//! use pianist_ir::NoteSchedule;
//! use pianist_task::{PianoTask, ReferenceScene, TaskConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TaskConfig::default();
//! let scene = ReferenceScene::new(&config.placement)?;
//! let schedule = NoteSchedule::new(vec![Vec::new(); 10], vec![false; 10])?;
//! let mut task = PianoTask::new(config, scene, schedule)?;
//! task.initialize_episode();
//! let action = vec![0.0; task.action_spec().len()];
//! while !task.step(&action)?.last {}
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod reference;
mod scene;
mod spec;
mod task;

pub use config::{Placement, TaskConfig};
pub use error::TaskError;
pub use reference::{ReferenceScene, NUM_KEYS};
pub use scene::Scene;
pub use spec::BoundedArraySpec;
pub use task::{Observation, PianoTask, TimeStep};
