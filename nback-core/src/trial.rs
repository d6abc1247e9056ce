use serde::{Deserialize, Serialize};

use crate::stimulus::{Modality, Position, Symbol};

/// Milliseconds since the UNIX epoch
pub type Timestamp = u64;

/// A single stimulus slot: where the cell lights up and which letter is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    pub position: Position,
    pub symbol: Symbol,
    pub created_at: Timestamp,
}

impl Trial {
    pub fn matches(&self, other: &Trial, modality: Modality) -> bool {
        match modality {
            Modality::Visual => self.position == other.position,
            Modality::Audio => self.symbol == other.symbol,
        }
    }
}

/// The full run of trials for one session, warm-up slots included
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrialSequence {
    n_level: usize,
    trials: Vec<Trial>,
}

impl TrialSequence {
    pub fn new(n_level: usize, trials: Vec<Trial>) -> Self {
        Self { n_level, trials }
    }

    pub fn n_level(&self) -> usize {
        self.n_level
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Trial> {
        self.trials.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trial> {
        self.trials.iter()
    }

    /// Warm-up slots have no predecessor to compare against.
    pub fn is_warm_up(&self, index: usize) -> bool {
        index < self.n_level
    }

    /// Number of slots that take part in scoring.
    pub fn scored_len(&self) -> usize {
        self.trials.len().saturating_sub(self.n_level)
    }

    /// The trial presented `n_level` steps before `index`.
    pub fn back_reference(&self, index: usize) -> Option<&Trial> {
        if self.is_warm_up(index) {
            return None;
        }
        self.trials.get(index - self.n_level)
    }

    /// Ground truth for one modality at `index`, `None` during warm-up
    /// or past the end of the sequence.
    pub fn is_match(&self, index: usize, modality: Modality) -> Option<bool> {
        let current = self.trials.get(index)?;
        let previous = self.back_reference(index)?;
        Some(current.matches(previous, modality))
    }
}

/// Outcome of one finished session, handed to history storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub visual_correct: u32,
    pub visual_incorrect: u32,
    pub audio_correct: u32,
    pub audio_incorrect: u32,
    pub accuracy_percent: f64,
    pub n_level: usize,
    pub completed_at: Timestamp,
}

impl SessionResult {
    pub fn total_answers(&self) -> u32 {
        self.visual_correct + self.visual_incorrect + self.audio_correct + self.audio_incorrect
    }
}
