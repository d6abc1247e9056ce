use nback_core::SessionResult;

pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// Summary figures over a stored history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    pub total_sessions: usize,
    pub best_accuracy: f64,
    /// Newest first.
    pub recent: Vec<SessionResult>,
    pub recent_average_accuracy: f64,
}

impl HistoryStats {
    pub fn from_results(results: &[SessionResult], window: usize) -> Self {
        let best_accuracy = results
            .iter()
            .map(|r| r.accuracy_percent)
            .fold(0.0, f64::max);

        let mut recent = results.to_vec();
        recent.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        recent.truncate(window);

        let recent_average_accuracy = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(|r| r.accuracy_percent).sum::<f64>() / recent.len() as f64
        };

        Self {
            total_sessions: results.len(),
            best_accuracy,
            recent,
            recent_average_accuracy,
        }
    }
}
