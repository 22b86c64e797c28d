//! Signal handling for graceful shutdown.
//!
//! tokio's signal driver installs a handler that only writes to a wake pipe.
//! The event loop awaits `ShutdownSignals::recv` like any other branch, so
//! cleanup always runs on the loop's own thread, never in signal context.

use std::io;
use tokio::signal::unix::{Signal, SignalKind, signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    ExitRequested,
    BreakFinished,
}

impl ShutdownReason {
    pub fn as_str(&self) -> &str {
        match self {
            ShutdownReason::Interrupt => "SIGINT",
            ShutdownReason::Terminate => "SIGTERM",
            ShutdownReason::ExitRequested => "exit requested",
            ShutdownReason::BreakFinished => "break finished",
        }
    }
}

pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    /// Register SIGINT/SIGTERM listeners. Must be called inside the runtime.
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    pub async fn recv(&mut self) -> ShutdownReason {
        tokio::select! {
            _ = self.interrupt.recv() => ShutdownReason::Interrupt,
            _ = self.terminate.recv() => ShutdownReason::Terminate,
        }
    }
}

/// Serializes tests that raise process-wide signals.
#[cfg(test)]
pub static SIGNAL_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
