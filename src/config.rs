//! Configuration: CLI flags (with env fallbacks) layered over an optional
//! JSON config file, layered over built-in defaults.

use crate::breaks::BreakSettings;
use crate::breaks::phase::{DEFAULT_DURATION_SECS, DEFAULT_INTERVAL_SECS};
use crate::error::ReminderError;
use crate::lifecycle::StatusFile;
use crate::lifecycle::token::DEFAULT_TOKEN_NAME;
use crate::ws::websocket_server::DEFAULT_CONTROL_PORT;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "eyesight-reminder";
const CONFIG_FILE: &str = "config.json";

/// Display a full-screen pause reminder on all monitors.
#[derive(Parser, Debug, Default)]
#[command(name = "eyesight-reminder", version, about)]
pub struct Cli {
    /// Time between breaks in seconds (default: 1200, 20 minutes as per the 20-20-20 rule)
    #[arg(short, long, env = "EYESIGHT_INTERVAL", allow_negative_numbers = true)]
    pub interval: Option<i64>,

    /// Duration of the break in seconds (default: 20, as per the 20-20-20 rule)
    #[arg(short, long, env = "EYESIGHT_DURATION", allow_negative_numbers = true)]
    pub duration: Option<i64>,

    /// File receiving the countdown every second (-1 while paused)
    #[arg(long, env = "EYESIGHT_STATUS_FILE")]
    pub status_file: Option<PathBuf>,

    /// JSON config file (default: $XDG_CONFIG_HOME/eyesight-reminder/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address of the WebSocket control endpoint
    #[arg(long)]
    pub control_addr: Option<SocketAddr>,

    /// Do not start the WebSocket control endpoint
    #[arg(long)]
    pub no_control: bool,

    /// Append break history to this file
    #[arg(short, long)]
    pub log: Option<PathBuf>,

    /// Name of the single-instance token
    #[arg(long)]
    pub token: Option<String>,

    /// Show one break right away and exit when it ends
    #[arg(long)]
    pub once: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub interval: Option<i64>,
    pub duration: Option<i64>,
    pub status_file: Option<PathBuf>,
    pub control: Option<bool>,
    pub control_addr: Option<SocketAddr>,
    pub log_file: Option<PathBuf>,
    pub token: Option<String>,
}

impl FileConfig {
    /// Read a config file. A missing file yields defaults unless `required`.
    pub fn load(path: &Path, required: bool) -> Result<Self, ReminderError> {
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).map_err(|e| ReminderError::io(path, e))?;
        serde_json::from_str(&data).map_err(|source| ReminderError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub breaks: BreakSettings,
    pub status_file: PathBuf,
    pub control_addr: Option<SocketAddr>,
    pub log_file: Option<PathBuf>,
    pub token: String,
    pub once: bool,
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self, ReminderError> {
        let file = match (&cli.config, default_config_path()) {
            (Some(path), _) => FileConfig::load(path, true)?,
            (None, Some(path)) => FileConfig::load(&path, false)?,
            (None, None) => FileConfig::default(),
        };
        Ok(Self::resolve(cli, file))
    }

    pub fn resolve(cli: &Cli, file: FileConfig) -> Self {
        let interval = cli.interval.or(file.interval).unwrap_or(DEFAULT_INTERVAL_SECS);
        let duration = cli.duration.or(file.duration).unwrap_or(DEFAULT_DURATION_SECS);
        let mut breaks = BreakSettings::from_secs(interval, duration);
        if cli.once {
            breaks.interval = 0;
        }

        let control_enabled = !cli.no_control && file.control.unwrap_or(true);
        let control_addr = control_enabled.then(|| {
            cli.control_addr
                .or(file.control_addr)
                .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_CONTROL_PORT)))
        });

        Self {
            breaks,
            status_file: cli
                .status_file
                .clone()
                .or(file.status_file)
                .unwrap_or_else(StatusFile::default_path),
            control_addr,
            log_file: cli.log.clone().or(file.log_file),
            token: cli
                .token
                .clone()
                .or(file.token)
                .unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string()),
            once: cli.once,
        }
    }
}
