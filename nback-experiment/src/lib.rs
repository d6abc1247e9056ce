pub mod config;
pub mod generator;
pub mod level;
pub mod scoring;
pub mod state;

pub use config::{ConfigError, SessionConfig};
pub use generator::StimulusGenerator;
pub use level::next_config;
pub use scoring::score;
pub use state::{Responses, SessionEvent, SessionState, SessionStateMachine, SessionView};
