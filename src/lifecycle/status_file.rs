use crate::breaks::StatusReading;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const STATUS_FILE_NAME: &str = "eyesight_status";

/// Plain-text countdown for status bars. Written, never read back.
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        std::env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
            .join(STATUS_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, reading: StatusReading) -> io::Result<()> {
        fs::write(&self.path, reading.to_string())
    }

    /// Delete the file. A missing file is not an error.
    pub fn remove(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
