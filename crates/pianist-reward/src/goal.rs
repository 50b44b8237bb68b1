//! Goal and fingering state derived from the note schedule.

use nalgebra::DMatrix;
use pianist_ir::{NoteSchedule, Side, FINGERS_PER_HAND};

use crate::error::RewardError;

/// A key to press with a specific finger of one hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerAssignment {
    /// Piano key index.
    pub key: usize,
    /// Finger within the hand (0 = thumb).
    pub finger: usize,
}

/// Tracks the episode timestep and what the schedule asks for at it.
///
/// Owns the only timestep index of an episode. `refresh` rebuilds the goal
/// window and fingering for the current index; `advance` moves the index
/// forward and latches what was last refreshed as the "current" goal that
/// rewards are scored against.
#[derive(Debug, Clone)]
pub struct GoalTracker {
    schedule: NoteSchedule,
    num_keys: usize,
    lookahead: usize,
    t_idx: usize,
    goal_state: DMatrix<f64>,
    goal_current: Vec<f64>,
    keys: [Vec<FingerAssignment>; 2],
    keys_current: [Vec<FingerAssignment>; 2],
    fingering_state: [[f64; FINGERS_PER_HAND]; 2],
    latch_fingering: bool,
    should_terminate: bool,
    failure_termination: bool,
}

impl GoalTracker {
    /// Create a tracker for `schedule` on a `num_keys` keyboard, looking
    /// `lookahead` steps past the current one.
    pub fn new(
        schedule: NoteSchedule,
        num_keys: usize,
        lookahead: usize,
    ) -> Result<Self, RewardError> {
        schedule.validate_keys(num_keys)?;
        let mut tracker = Self {
            schedule,
            num_keys,
            lookahead,
            t_idx: 0,
            goal_state: DMatrix::zeros(lookahead + 1, num_keys + 1),
            goal_current: vec![0.0; num_keys + 1],
            keys: [Vec::new(), Vec::new()],
            keys_current: [Vec::new(), Vec::new()],
            fingering_state: [[0.0; FINGERS_PER_HAND]; 2],
            latch_fingering: true,
            should_terminate: false,
            failure_termination: false,
        };
        tracker.reset();
        Ok(tracker)
    }

    /// Whether `advance` latches fingering (off when fingering is not used).
    pub fn with_fingering(mut self, latch: bool) -> Self {
        self.latch_fingering = latch;
        self
    }

    /// Back to step 0 with every flag cleared, then refresh.
    pub fn reset(&mut self) {
        self.t_idx = 0;
        self.should_terminate = false;
        self.failure_termination = false;
        self.goal_state.fill(0.0);
        self.goal_current.iter_mut().for_each(|g| *g = 0.0);
        self.keys = [Vec::new(), Vec::new()];
        self.keys_current = [Vec::new(), Vec::new()];
        self.fingering_state = [[0.0; FINGERS_PER_HAND]; 2];
        self.refresh();
    }

    /// Schedule being tracked.
    pub fn schedule(&self) -> &NoteSchedule {
        &self.schedule
    }

    /// Keyboard size.
    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    /// Steps of lookahead in the goal window.
    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// Current timestep index.
    pub fn t_idx(&self) -> usize {
        self.t_idx
    }

    /// True once the index has run off the end of the schedule.
    pub fn is_exhausted(&self) -> bool {
        self.t_idx >= self.schedule.len()
    }

    /// Rebuild goal window and fingering for the current index.
    ///
    /// A no-op once the schedule is exhausted: the last window stays.
    pub fn refresh(&mut self) {
        self.update_goal_state();
        self.update_fingering_state();
    }

    fn update_goal_state(&mut self) {
        if self.is_exhausted() {
            return;
        }
        self.goal_state.fill(0.0);
        let end = (self.t_idx + self.lookahead + 1).min(self.schedule.len());
        for (row, t) in (self.t_idx..end).enumerate() {
            for note in self.schedule.notes_at(t).unwrap_or_default() {
                self.goal_state[(row, note.key)] = 1.0;
            }
            let sustain = self.schedule.sustain_at(t).unwrap_or(false);
            self.goal_state[(row, self.num_keys)] = if sustain { 1.0 } else { 0.0 };
        }
    }

    fn update_fingering_state(&mut self) {
        if self.is_exhausted() {
            return;
        }
        self.keys = [Vec::new(), Vec::new()];
        self.fingering_state = [[0.0; FINGERS_PER_HAND]; 2];
        for note in self.schedule.notes_at(self.t_idx).unwrap_or_default() {
            let hand = note.hand().index();
            self.keys[hand].push(FingerAssignment {
                key: note.key,
                finger: note.finger(),
            });
            self.fingering_state[hand][note.finger()] = 1.0;
        }
    }

    /// Move to the next step.
    ///
    /// `activation` is the keyboard state after the physics step; a pressed
    /// key that the latched goal wants released raises the failure flag.
    pub fn advance(&mut self, activation: &[bool]) {
        self.t_idx += 1;
        self.should_terminate = self.t_idx == self.schedule.len();
        self.goal_current = self.goal_state.row(0).iter().copied().collect();
        if self.latch_fingering {
            self.keys_current = self.keys.clone();
        }
        let failure = self
            .keys_off()
            .any(|key| activation.get(key).copied().unwrap_or(false));
        self.failure_termination = failure;
    }

    /// Goal row scored this step: one entry per key, then sustain.
    pub fn goal_current(&self) -> &[f64] {
        &self.goal_current
    }

    /// Keys the current goal wants pressed.
    pub fn keys_on(&self) -> impl Iterator<Item = usize> + '_ {
        self.goal_current[..self.num_keys]
            .iter()
            .enumerate()
            .filter(|(_, g)| **g != 0.0)
            .map(|(key, _)| key)
    }

    /// Keys the current goal wants released.
    pub fn keys_off(&self) -> impl Iterator<Item = usize> + '_ {
        self.goal_current[..self.num_keys]
            .iter()
            .enumerate()
            .filter(|(_, g)| **g == 0.0)
            .map(|(key, _)| key)
    }

    /// Target sustain for the current goal.
    pub fn sustain_goal(&self) -> f64 {
        self.goal_current[self.num_keys]
    }

    /// Goal window flattened row by row, `(lookahead + 1) * (num_keys + 1)` long.
    pub fn goal_state_flat(&self) -> Vec<f64> {
        // DMatrix is column-major; emit row-major.
        self.goal_state.transpose().as_slice().to_vec()
    }

    /// Fingering matrix flattened, right hand row first.
    pub fn fingering_state_flat(&self) -> Vec<f64> {
        self.fingering_state.iter().flatten().copied().collect()
    }

    /// Latched key/finger pairs of one hand.
    pub fn keys_current(&self, side: Side) -> &[FingerAssignment] {
        &self.keys_current[side.index()]
    }

    /// Set when the last schedule step has been played.
    pub fn should_terminate(&self) -> bool {
        self.should_terminate
    }

    /// Set when a key was pressed that should have been released.
    pub fn failure_termination(&self) -> bool {
        self.failure_termination
    }
}
