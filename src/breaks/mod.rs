pub mod phase;
pub mod scheduler;

pub use phase::{BreakSettings, Phase, StatusReading};
pub use scheduler::{BreakScheduler, StatusSnapshot};
