pub mod context;
pub mod signals;
pub mod status_file;
pub mod token;

pub use context::AppContext;
pub use signals::{ShutdownReason, ShutdownSignals};
pub use status_file::StatusFile;
pub use token::InstanceToken;
