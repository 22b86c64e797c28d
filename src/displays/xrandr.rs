use super::{Display, QueryError};
use regex::Regex;
use tokio::process::Command;

// " 0: +*DP-1 2560/597x1440/336+0+0  DP-1"
const MONITOR_LINE: &str = r"^\s*\d+:\s+\S+\s+(\d+)/\d+x(\d+)/\d+\+(-?\d+)\+(-?\d+)\s+(\S+)\s*$";

pub async fn get_monitors() -> Result<Vec<Display>, QueryError> {
    let output = Command::new("xrandr")
        .arg("--listmonitors")
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(format!("xrandr exited with {}", output.status).into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_monitors(&stdout)
}

pub(crate) fn parse_monitors(listing: &str) -> Result<Vec<Display>, QueryError> {
    let pattern = Regex::new(MONITOR_LINE)?;
    let mut displays = Vec::new();

    for line in listing.lines() {
        if let Some(captures) = pattern.captures(line) {
            displays.push(Display {
                width: captures[1].parse()?,
                height: captures[2].parse()?,
                x: captures[3].parse()?,
                y: captures[4].parse()?,
                name: captures[5].to_string(),
            });
        }
    }

    Ok(displays)
}
