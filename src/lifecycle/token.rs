//! Single-instance token backed by a named POSIX shared memory object.
//!
//! The object's contents are never read; `O_CREAT | O_EXCL` makes its
//! existence the mutual-exclusion flag.

use crate::error::ReminderError;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use std::os::fd::OwnedFd;

pub const DEFAULT_TOKEN_NAME: &str = "/eyesight-reminder.instance";

/// Shared memory names must start with a single slash.
fn normalize(name: &str) -> String {
    format!("/{}", name.trim_start_matches('/'))
}

#[derive(Debug)]
pub struct InstanceToken {
    name: String,
    fd: Option<OwnedFd>,
}

impl InstanceToken {
    /// Claim the token, failing with `StartupConflict` if another process
    /// holds it. A conflicting attempt creates and removes nothing.
    pub fn acquire(name: &str) -> Result<Self, ReminderError> {
        let name = normalize(name);
        let flags = OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR;
        let mode = Mode::S_IRUSR | Mode::S_IWUSR;

        let fd = match shm_open(name.as_str(), flags, mode) {
            Ok(fd) => fd,
            Err(Errno::EEXIST) => return Err(ReminderError::StartupConflict { token: name }),
            Err(source) => return Err(ReminderError::ResourceUnavailable { token: name, source }),
        };

        if let Err(source) = ftruncate(&fd, 1) {
            let _ = shm_unlink(name.as_str());
            return Err(ReminderError::ResourceUnavailable { token: name, source });
        }

        tracing::debug!(token = %name, "Instance token acquired");
        Ok(Self { name, fd: Some(fd) })
    }

    #[cfg(test)]
    pub fn is_held(&self) -> bool {
        self.fd.is_some()
    }

    /// Unlink the token. Returns false if it was already released.
    pub fn release(&mut self) -> bool {
        let Some(fd) = self.fd.take() else {
            return false;
        };
        drop(fd);

        if let Err(e) = shm_unlink(self.name.as_str()) {
            tracing::warn!(token = %self.name, "Failed to unlink instance token: {}", e);
        }
        true
    }
}

impl Drop for InstanceToken {
    fn drop(&mut self) {
        self.release();
    }
}
