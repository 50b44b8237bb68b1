//! Note schedule: what must be played at every control step.

use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::Side;

/// Fingers per hand.
pub const FINGERS_PER_HAND: usize = 5;

/// Fingers across both hands. Finger indices 0..5 are the right hand,
/// 5..10 the left hand, thumb first.
pub const NUM_FINGERS: usize = 2 * FINGERS_PER_HAND;

/// A single note active at one control step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Piano key index (0-based).
    pub key: usize,
    /// Finger index in 0..10 (0..5 right hand, 5..10 left hand).
    pub fingering: usize,
}

impl Note {
    /// Create a note.
    pub const fn new(key: usize, fingering: usize) -> Self {
        Self { key, fingering }
    }

    /// Hand that plays this note.
    pub fn hand(&self) -> Side {
        if self.fingering < FINGERS_PER_HAND {
            Side::Right
        } else {
            Side::Left
        }
    }

    /// Finger within the hand (0 = thumb .. 4 = little finger).
    pub fn finger(&self) -> usize {
        self.fingering % FINGERS_PER_HAND
    }
}

/// Per-step notes and sustain flags, resampled to the control timestep.
///
/// Both sequences always have the same length; index `t` describes control
/// step `t` of an episode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteSchedule {
    notes: Vec<Vec<Note>>,
    sustains: Vec<bool>,
}

impl NoteSchedule {
    /// Create a schedule from parallel note and sustain sequences.
    pub fn new(notes: Vec<Vec<Note>>, sustains: Vec<bool>) -> Result<Self, IrError> {
        if notes.len() != sustains.len() {
            return Err(IrError::LengthMismatch {
                notes: notes.len(),
                sustains: sustains.len(),
            });
        }
        for (step, set) in notes.iter().enumerate() {
            if let Some(note) = set.iter().find(|n| n.fingering >= NUM_FINGERS) {
                return Err(IrError::InvalidFinger {
                    step,
                    finger: note.fingering,
                });
            }
        }
        Ok(Self { notes, sustains })
    }

    /// Number of control steps.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// True if the schedule has no steps.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Notes active at step `t`, or `None` past the end.
    pub fn notes_at(&self, t: usize) -> Option<&[Note]> {
        self.notes.get(t).map(Vec::as_slice)
    }

    /// Sustain flag at step `t`, or `None` past the end.
    pub fn sustain_at(&self, t: usize) -> Option<bool> {
        self.sustains.get(t).copied()
    }

    /// All note sets.
    pub fn notes(&self) -> &[Vec<Note>] {
        &self.notes
    }

    /// All sustain flags.
    pub fn sustains(&self) -> &[bool] {
        &self.sustains
    }

    /// Prepend `steps` silent steps (no notes, pedal up).
    pub fn with_initial_buffer(mut self, steps: usize) -> Self {
        if steps > 0 {
            let mut notes = vec![Vec::new(); steps];
            notes.append(&mut self.notes);
            let mut sustains = vec![false; steps];
            sustains.append(&mut self.sustains);
            self.notes = notes;
            self.sustains = sustains;
        }
        self
    }

    /// Number of control steps covering `buffer_time` seconds, rounded up.
    pub fn buffer_steps(buffer_time: f64, control_timestep: f64) -> usize {
        if buffer_time <= 0.0 || control_timestep <= 0.0 {
            return 0;
        }
        (buffer_time / control_timestep).ceil() as usize
    }

    /// Check every key lies on a keyboard of `num_keys` keys.
    pub fn validate_keys(&self, num_keys: usize) -> Result<(), IrError> {
        for (step, set) in self.notes.iter().enumerate() {
            if let Some(note) = set.iter().find(|n| n.key >= num_keys) {
                return Err(IrError::InvalidKey {
                    step,
                    key: note.key,
                    num_keys,
                });
            }
        }
        Ok(())
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, IrError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON string, validating finger indices.
    pub fn from_json(json: &str) -> Result<Self, IrError> {
        let raw: NoteSchedule = serde_json::from_str(json)?;
        Self::new(raw.notes, raw.sustains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_schedule() -> NoteSchedule {
        NoteSchedule::new(
            vec![vec![Note::new(40, 2)], vec![Note::new(41, 7), Note::new(45, 0)]],
            vec![false, true],
        )
        .unwrap()
    }

    #[test]
    fn note_hand_split() {
        assert_eq!(Note::new(40, 2).hand(), Side::Right);
        assert_eq!(Note::new(40, 2).finger(), 2);
        assert_eq!(Note::new(40, 7).hand(), Side::Left);
        assert_eq!(Note::new(40, 7).finger(), 2);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        let err = NoteSchedule::new(vec![vec![]], vec![]).unwrap_err();
        assert!(matches!(err, IrError::LengthMismatch { notes: 1, sustains: 0 }));
    }

    #[test]
    fn rejects_bad_finger() {
        let err = NoteSchedule::new(vec![vec![Note::new(3, 10)]], vec![false]).unwrap_err();
        assert!(matches!(err, IrError::InvalidFinger { step: 0, finger: 10 }));
    }

    #[test]
    fn validates_keys() {
        let schedule = two_step_schedule();
        assert!(schedule.validate_keys(88).is_ok());
        assert!(matches!(
            schedule.validate_keys(45),
            Err(IrError::InvalidKey { step: 1, key: 45, .. })
        ));
    }

    #[test]
    fn initial_buffer_prepends_silence() {
        let schedule = two_step_schedule().with_initial_buffer(3);
        assert_eq!(schedule.len(), 5);
        assert!(schedule.notes_at(0).unwrap().is_empty());
        assert_eq!(schedule.sustain_at(2), Some(false));
        assert_eq!(schedule.notes_at(3).unwrap()[0].key, 40);
        assert_eq!(schedule.sustain_at(4), Some(true));
        assert_eq!(schedule.notes_at(5), None);
    }

    #[test]
    fn buffer_steps_rounds_up() {
        assert_eq!(NoteSchedule::buffer_steps(0.0, 0.05), 0);
        assert_eq!(NoteSchedule::buffer_steps(0.5, 0.05), 10);
        assert_eq!(NoteSchedule::buffer_steps(0.51, 0.05), 11);
    }

    #[test]
    fn json_roundtrip() {
        let schedule = two_step_schedule();
        let json = schedule.to_json().unwrap();
        let restored = NoteSchedule::from_json(&json).unwrap();
        assert_eq!(schedule, restored);
    }
}
