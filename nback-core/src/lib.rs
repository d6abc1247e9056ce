pub mod phase;
pub mod stimulus;
pub mod trial;

pub use phase::{Feedback, SessionPhase};
pub use stimulus::{Modality, Position, Symbol};
pub use trial::{SessionResult, Timestamp, Trial, TrialSequence};
