//! Process-lifetime resources and their guaranteed release.
//!
//! `AppContext` owns everything another process or a status bar can observe:
//! the instance token and the status file. `cleanup` runs on the normal exit
//! path, and `Drop` covers early returns and panics unwinding out of the
//! event loop.

use super::status_file::StatusFile;
use super::token::InstanceToken;
use crate::breaks::StatusReading;

#[derive(Debug)]
pub struct AppContext {
    token: InstanceToken,
    status: StatusFile,
    cleaned_up: bool,
}

impl AppContext {
    pub fn new(token: InstanceToken, status: StatusFile) -> Self {
        Self {
            token,
            status,
            cleaned_up: false,
        }
    }

    pub fn status_file(&self) -> &StatusFile {
        &self.status
    }

    #[cfg(test)]
    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up
    }

    /// Rewrite the status file. Failures are logged and left for the next tick.
    /// Does nothing once cleanup has run.
    pub fn publish_status(&self, reading: StatusReading) {
        if self.cleaned_up {
            return;
        }
        if let Err(e) = self.status.write(reading) {
            tracing::warn!(path = %self.status.path().display(), "Failed to write status file: {}", e);
        }
    }

    /// Delete the status file, then release the token. Only the first call
    /// does anything: once the token is free the path may belong to a
    /// successor instance.
    pub fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        if let Err(e) = self.status.remove() {
            tracing::warn!(path = %self.status.path().display(), "Failed to remove status file: {}", e);
        }
        self.token.release();

        tracing::info!("Cleanup: resources released.");
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.cleanup();
    }
}
