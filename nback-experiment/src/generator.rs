use nback_core::{Position, Symbol, Timestamp, Trial, TrialSequence};
use rand::Rng;

use crate::config::SessionConfig;

pub const DEFAULT_MATCH_PROBABILITY: f64 = 0.3;

/// Builds trial sequences with a fixed, independent chance of an N-back
/// repeat in each modality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimulusGenerator {
    visual_match_probability: f64,
    audio_match_probability: f64,
}

impl Default for StimulusGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_PROBABILITY, DEFAULT_MATCH_PROBABILITY)
    }
}

impl StimulusGenerator {
    pub fn new(visual_match_probability: f64, audio_match_probability: f64) -> Self {
        Self {
            visual_match_probability: visual_match_probability.clamp(0.0, 1.0),
            audio_match_probability: audio_match_probability.clamp(0.0, 1.0),
        }
    }

    pub fn visual_match_probability(&self) -> f64 {
        self.visual_match_probability
    }

    pub fn audio_match_probability(&self) -> f64 {
        self.audio_match_probability
    }

    /// Produces `total_trials + n_level` trials. The leading `n_level`
    /// trials are unconstrained warm-up; every later trial copies its
    /// position and/or symbol from `n_level` steps back with the
    /// configured probabilities, and otherwise draws fresh. A fresh draw
    /// may still coincide with the back-reference.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        config: &SessionConfig,
        rng: &mut R,
        created_at: Timestamp,
    ) -> TrialSequence {
        let config = config.sanitized();
        let n = config.n_level;
        let len = config.sequence_len();
        let mut trials: Vec<Trial> = Vec::with_capacity(len);

        for i in 0..len {
            let trial = if i < n {
                Trial {
                    position: random_position(rng, config.grid_size),
                    symbol: random_symbol(rng),
                    created_at,
                }
            } else {
                let repeat_position = rng.random_bool(self.visual_match_probability);
                let repeat_symbol = rng.random_bool(self.audio_match_probability);
                let back = trials[i - n];

                Trial {
                    position: if repeat_position {
                        back.position
                    } else {
                        random_position(rng, config.grid_size)
                    },
                    symbol: if repeat_symbol {
                        back.symbol
                    } else {
                        random_symbol(rng)
                    },
                    created_at,
                }
            };
            trials.push(trial);
        }

        TrialSequence::new(n, trials)
    }
}

fn random_position<R: Rng + ?Sized>(rng: &mut R, grid_size: usize) -> Position {
    let size = grid_size as u8;
    Position::new(rng.random_range(0..size), rng.random_range(0..size))
}

fn random_symbol<R: Rng + ?Sized>(rng: &mut R) -> Symbol {
    Symbol::ALL[rng.random_range(0..Symbol::ALL.len())]
}
