pub mod hypr;
pub mod xrandr;

use std::future::Future;
use tokio::sync::watch;
use tokio::time::{Duration, sleep, timeout};

/// Longest a single `hyprctl`/`xrandr` call may take before it is killed.
pub const DISPLAY_QUERY_TIMEOUT: Duration = Duration::from_secs(2);
pub const DISPLAY_REFRESH: Duration = Duration::from_secs(10);

pub type QueryError = Box<dyn std::error::Error + Send + Sync>;

/// Geometry of one connected output, in desktop pixel coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Display {
    pub fn center(&self) -> (i32, i32) {
        (
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }
}

async fn bounded<F>(tool: &str, query: F) -> Option<Vec<Display>>
where
    F: Future<Output = Result<Vec<Display>, QueryError>>,
{
    match timeout(DISPLAY_QUERY_TIMEOUT, query).await {
        Ok(Ok(displays)) => Some(displays),
        Ok(Err(e)) => {
            tracing::debug!("{} unavailable: {}", tool, e);
            None
        }
        Err(_) => {
            tracing::warn!("{} did not answer within {:?}", tool, DISPLAY_QUERY_TIMEOUT);
            None
        }
    }
}

/// Enumerate connected displays, asking Hyprland first and X11 second.
/// An empty list means no display could be enumerated.
pub async fn connected_displays() -> Vec<Display> {
    match bounded("hyprctl", hypr::get_monitors()).await {
        Some(displays) if !displays.is_empty() => return displays,
        Some(_) => tracing::debug!("hyprctl reported no monitors"),
        None => {}
    }

    bounded("xrandr", xrandr::get_monitors())
        .await
        .unwrap_or_else(|| {
            tracing::warn!("Could not enumerate displays");
            Vec::new()
        })
}

/// Re-enumerate every `DISPLAY_REFRESH` until all receivers are gone.
pub async fn watch_displays(tx: watch::Sender<Vec<Display>>) {
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            _ = sleep(DISPLAY_REFRESH) => {}
        }

        let displays = connected_displays().await;
        tx.send_if_modified(|current| {
            if *current == displays {
                return false;
            }
            tracing::info!(count = displays.len(), "Displays changed");
            *current = displays;
            true
        });
    }
}
