use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

pub const N_LEVEL_RANGE: RangeInclusive<usize> = 1..=5;
pub const TRIAL_DURATION_RANGE_MS: RangeInclusive<u64> = 1000..=5000;
pub const TOTAL_TRIALS_RANGE: RangeInclusive<usize> = 10..=50;
pub const GRID_SIZES: [usize; 3] = [3, 4, 5];
pub const DEFAULT_GRID_SIZE: usize = 3;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("n-level {0} is outside 1..=5")]
    NLevelOutOfRange(usize),
    #[error("trial duration {0} ms is outside 1000..=5000")]
    TrialDurationOutOfRange(u64),
    #[error("total trials {0} is outside 10..=50")]
    TotalTrialsOutOfRange(usize),
    #[error("grid size {0} is not one of 3, 4, 5")]
    UnsupportedGridSize(usize),
}

/// Parameters of one session; fixed for as long as the session runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub n_level: usize,
    pub trial_duration_ms: u64,
    pub total_trials: usize,
    pub grid_size: usize,
    pub auto_adjust_n_level: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            n_level: 2,
            trial_duration_ms: 2500,
            total_trials: 20,
            grid_size: DEFAULT_GRID_SIZE,
            auto_adjust_n_level: false,
        }
    }
}

impl SessionConfig {
    /// Caller-side check against the documented ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !N_LEVEL_RANGE.contains(&self.n_level) {
            return Err(ConfigError::NLevelOutOfRange(self.n_level));
        }
        if !TRIAL_DURATION_RANGE_MS.contains(&self.trial_duration_ms) {
            return Err(ConfigError::TrialDurationOutOfRange(self.trial_duration_ms));
        }
        if !TOTAL_TRIALS_RANGE.contains(&self.total_trials) {
            return Err(ConfigError::TotalTrialsOutOfRange(self.total_trials));
        }
        if !GRID_SIZES.contains(&self.grid_size) {
            return Err(ConfigError::UnsupportedGridSize(self.grid_size));
        }
        Ok(())
    }

    /// Copy with the level and grid size forced into their domains, so
    /// generation can never index outside the grid or the sequence.
    /// Trial count and duration are left alone.
    pub fn sanitized(&self) -> Self {
        let grid_size = if GRID_SIZES.contains(&self.grid_size) {
            self.grid_size
        } else {
            DEFAULT_GRID_SIZE
        };
        Self {
            n_level: self
                .n_level
                .clamp(*N_LEVEL_RANGE.start(), *N_LEVEL_RANGE.end()),
            grid_size,
            ..self.clone()
        }
    }

    /// Warm-up slots plus scored slots.
    pub fn sequence_len(&self) -> usize {
        self.total_trials + self.n_level
    }

    pub fn trial_duration(&self) -> Duration {
        Duration::from_millis(self.trial_duration_ms)
    }
}
