/// Where a session currently is, as seen by the presentation layer
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Running, but the current trial has no N-back predecessor yet.
    WarmUp,
    Presenting,
    Feedback,
}

impl SessionPhase {
    pub fn allows_input(&self) -> bool {
        matches!(self, Self::Presenting | Self::Feedback)
    }

    pub fn is_running(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn is_warm_up(&self) -> bool {
        matches!(self, Self::WarmUp)
    }
}

/// Transient correctness indication for a single submitted input
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Correct,
    Incorrect,
}

impl Feedback {
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            Feedback::Correct
        } else {
            Feedback::Incorrect
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Feedback::Correct)
    }
}
