use serde::Serialize;
use std::fmt;

pub const TICK_INTERVAL_MS: u64 = 1000; // One scheduler tick per second
pub const DEFAULT_INTERVAL_SECS: i64 = 1200; // 20 minutes between breaks
pub const DEFAULT_DURATION_SECS: i64 = 20; // 20 second breaks

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    OnBreak,
}

impl Phase {
    pub(crate) fn as_str(&self) -> &str {
        match self {
            Phase::Waiting => "WAITING",
            Phase::OnBreak => "ON BREAK",
        }
    }
}

/// What the status file should say after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReading {
    Remaining(u64),
    Paused,
}

impl fmt::Display for StatusReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusReading::Remaining(secs) => write!(f, "{}", secs),
            StatusReading::Paused => f.write_str("-1"),
        }
    }
}

/// Break interval and duration in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakSettings {
    pub interval: u64,
    pub duration: u64,
}

impl BreakSettings {
    /// Negative values are treated as zero: the transition fires on the first tick.
    pub fn from_secs(interval: i64, duration: i64) -> Self {
        Self {
            interval: interval.max(0) as u64,
            duration: duration.max(0) as u64,
        }
    }
}

impl Default for BreakSettings {
    fn default() -> Self {
        Self::from_secs(DEFAULT_INTERVAL_SECS, DEFAULT_DURATION_SECS)
    }
}
