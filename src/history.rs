use chrono::{DateTime, Local};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only, human readable log of breaks and pauses.
#[derive(Debug)]
pub struct BreakLog {
    path: PathBuf,
    session_start: DateTime<Local>,
    breaks_taken: u32,
}

impl BreakLog {
    pub fn open(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let now = Local::now();
        let _ = Self::log_to_file(
            &path,
            &format!("=== Session started at {} ===", now.format("%Y-%m-%d %H:%M:%S")),
        );
        Self {
            path,
            session_start: now,
            breaks_taken: 0,
        }
    }

    fn log_to_file(path: &Path, message: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", message)?;
        Ok(())
    }

    pub fn log(&self, message: &str) {
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        if let Err(e) = Self::log_to_file(&self.path, &line) {
            tracing::debug!(path = %self.path.display(), "Failed to append break log: {}", e);
        }
    }

    pub fn break_started(&mut self, duration: u64) {
        self.breaks_taken += 1;
        self.log(&format!("Break #{} started ({}s)", self.breaks_taken, duration));
    }

    pub fn break_ended(&self, next_in: u64) {
        self.log(&format!("Break ended, next in {}s", next_in));
    }

    pub fn session_ended(&self, reason: &str) {
        let minutes = (Local::now() - self.session_start).num_minutes();
        self.log(&format!(
            "Session ended ({}) after {} minutes, {} breaks taken",
            reason, minutes, self.breaks_taken
        ));
    }
}
