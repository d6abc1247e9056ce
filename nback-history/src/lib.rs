pub mod stats;
pub mod store;

pub use stats::{DEFAULT_RECENT_WINDOW, HistoryStats};
pub use store::{HistoryError, HistoryStore, JsonFileHistory, MemoryHistory};
