//! Between-session difficulty adjustment.

use nback_core::SessionResult;

use crate::config::{N_LEVEL_RANGE, SessionConfig};

/// Accuracy at or above which the next session goes one level deeper.
pub const RAISE_THRESHOLD_PERCENT: f64 = 80.0;
/// Accuracy below which the next session drops a level.
pub const LOWER_THRESHOLD_PERCENT: f64 = 50.0;

pub fn recommended_level(current: usize, accuracy_percent: f64) -> usize {
    let (min, max) = (*N_LEVEL_RANGE.start(), *N_LEVEL_RANGE.end());
    let next = if accuracy_percent >= RAISE_THRESHOLD_PERCENT {
        current + 1
    } else if accuracy_percent < LOWER_THRESHOLD_PERCENT {
        current.saturating_sub(1)
    } else {
        current
    };
    next.clamp(min, max)
}

/// Configuration for the session after `result`. Unchanged unless
/// auto-adjustment is switched on.
pub fn next_config(config: &SessionConfig, result: &SessionResult) -> SessionConfig {
    if !config.auto_adjust_n_level {
        return config.clone();
    }
    SessionConfig {
        n_level: recommended_level(result.n_level, result.accuracy_percent),
        ..config.clone()
    }
}
