//! Error types for IR validation.

use thiserror::Error;

/// Errors raised while validating or loading IR data.
#[derive(Error, Debug)]
pub enum IrError {
    /// Note and sustain sequences differ in length.
    #[error("Schedule has {notes} note steps but {sustains} sustain steps")]
    LengthMismatch {
        /// Number of note steps.
        notes: usize,
        /// Number of sustain steps.
        sustains: usize,
    },

    /// A note references a finger outside 0..=9.
    #[error("Invalid finger index {finger} at step {step}")]
    InvalidFinger {
        /// Control step of the note.
        step: usize,
        /// Offending finger index.
        finger: usize,
    },

    /// A note references a key outside the keyboard.
    #[error("Key {key} at step {step} is outside a {num_keys}-key keyboard")]
    InvalidKey {
        /// Control step of the note.
        step: usize,
        /// Offending key index.
        key: usize,
        /// Keyboard size.
        num_keys: usize,
    },

    /// Two bodies or joints share a name.
    #[error("Duplicate name in articulation: {0}")]
    DuplicateName(String),

    /// A body or joint references a parent that is not defined before it.
    #[error("Unknown parent body: {0}")]
    UnknownParent(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
