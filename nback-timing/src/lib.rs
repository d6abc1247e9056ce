pub mod scheduler;
pub mod timer;

pub use scheduler::{ChannelScheduler, ManualTimer, Scheduler, TimerHandle, TimerToken};
pub use timer::{precise_sleep, Clock, SystemClock};
