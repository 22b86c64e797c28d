use std::path::PathBuf;
use thiserror::Error;

/// Fatal startup failures. Everything raised after startup is logged and
/// swallowed by the event loop instead.
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error(
        "An instance of this application is already running (token {token}). \
         If no instance is running, remove /dev/shm{token} and retry."
    )]
    StartupConflict { token: String },

    #[error("Unable to create instance token {token}: {source}")]
    ResourceUnavailable {
        token: String,
        #[source]
        source: nix::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReminderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReminderError::Io {
            path: path.into(),
            source,
        }
    }
}
