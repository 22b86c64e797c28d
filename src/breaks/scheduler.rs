//! Break cycle state machine.
//!
//! The scheduler never looks at a clock itself: the event loop hands it the
//! tick instant and later calls `end_break` once the absolute deadline it
//! reported has passed. The per-second countdown inside a break only drives
//! the overlay text; the deadline is what ends the break.

use super::phase::{BreakSettings, Phase, StatusReading};
use crate::overlay::{Screens, Surface};
use serde::Serialize;
use tokio::time::{Duration, Instant};

pub fn overlay_text(seconds_left: u64) -> String {
    format!("Take a short pause!\nTime left: {} seconds", seconds_left)
}

/// Serializable view of the scheduler, published to the control surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub paused: bool,
    pub countdown: u64,
    pub label: Option<String>,
}

pub struct BreakScheduler<S: Screens> {
    settings: BreakSettings,
    screens: S,
    phase: Phase,
    countdown: u64,
    paused: bool,
    overlays: Vec<S::Surface>,
    break_deadline: Option<Instant>,
}

impl<S: Screens> BreakScheduler<S> {
    pub fn new(settings: BreakSettings, screens: S) -> Self {
        Self {
            settings,
            screens,
            phase: Phase::Waiting,
            countdown: settings.interval,
            paused: false,
            overlays: Vec::new(),
            break_deadline: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn countdown(&self) -> u64 {
        self.countdown
    }

    #[cfg(test)]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[cfg(test)]
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Absolute instant at which the current break must end, if on break.
    pub fn break_deadline(&self) -> Option<Instant> {
        self.break_deadline
    }

    /// Advance one second. Returns what the status file should now contain.
    pub fn tick(&mut self, now: Instant) -> StatusReading {
        if self.paused {
            return StatusReading::Paused;
        }

        match self.phase {
            Phase::Waiting => {
                if self.countdown > 0 {
                    self.countdown -= 1;
                }
                let reading = StatusReading::Remaining(self.countdown);
                if self.countdown == 0 {
                    self.start_break(now);
                }
                reading
            }
            Phase::OnBreak => {
                if self.countdown > 0 {
                    self.countdown -= 1;
                    let text = overlay_text(self.countdown);
                    for overlay in &mut self.overlays {
                        overlay.set_text(&text);
                    }
                }
                StatusReading::Remaining(self.countdown)
            }
        }
    }

    fn start_break(&mut self, now: Instant) {
        self.phase = Phase::OnBreak;
        self.countdown = self.settings.duration;
        self.break_deadline = Some(now + Duration::from_secs(self.settings.duration));

        let text = overlay_text(self.countdown);
        for display in self.screens.displays() {
            match self.screens.open(&display, &text) {
                Ok(surface) => self.overlays.push(surface),
                Err(e) => tracing::warn!("{}", e),
            }
        }

        tracing::info!(
            overlays = self.overlays.len(),
            duration = self.settings.duration,
            "Break started"
        );
    }

    /// Tear the break down. Returns false if there was no break to end.
    pub fn end_break(&mut self) -> bool {
        if self.phase != Phase::OnBreak {
            return false;
        }

        self.close_overlays();
        self.break_deadline = None;
        self.countdown = self.settings.interval;
        self.phase = Phase::Waiting;

        tracing::info!(next_in = self.countdown, "Break ended");
        true
    }

    /// Flip the paused flag and return the new value.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn close_overlays(&mut self) {
        for overlay in self.overlays.drain(..) {
            overlay.close();
        }
    }

    /// Current status file reading without advancing the clock.
    pub fn status(&self) -> StatusReading {
        if self.paused {
            StatusReading::Paused
        } else {
            StatusReading::Remaining(self.countdown)
        }
    }

    pub fn label(&self) -> Option<String> {
        if self.paused {
            return Some("Paused".to_string());
        }
        match self.phase {
            Phase::Waiting => Some(format!("Time until next break: {} seconds", self.countdown)),
            Phase::OnBreak => None,
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: self.phase,
            paused: self.paused,
            countdown: self.countdown,
            label: self.label(),
        }
    }
}

impl<S: Screens> Drop for BreakScheduler<S> {
    fn drop(&mut self) {
        self.close_overlays();
    }
}
