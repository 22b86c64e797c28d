use super::{Display, QueryError};
use serde::Deserialize;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct HyprlandMonitor {
    name: String,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

impl From<HyprlandMonitor> for Display {
    fn from(monitor: HyprlandMonitor) -> Self {
        Display {
            name: monitor.name,
            x: monitor.x,
            y: monitor.y,
            width: monitor.width,
            height: monitor.height,
        }
    }
}

pub async fn get_monitors() -> Result<Vec<Display>, QueryError> {
    let output = Command::new("hyprctl")
        .args(["monitors", "-j"])
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(format!("hyprctl exited with {}", output.status).into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_monitors(&stdout)?)
}

pub(crate) fn parse_monitors(json: &str) -> serde_json::Result<Vec<Display>> {
    let monitors: Vec<HyprlandMonitor> = serde_json::from_str(json)?;
    Ok(monitors.into_iter().map(Display::from).collect())
}
