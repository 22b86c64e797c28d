use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod app;
mod breaks;
mod config;
mod displays;
mod error;
mod history;
mod lifecycle;
mod overlay;
mod ws;

use app::App;
use config::{Cli, Settings};
use error::ReminderError;
use history::BreakLog;
use lifecycle::{AppContext, InstanceToken, ShutdownSignals, StatusFile};
use overlay::notification::{NOTIFICATION_FLUSH_TIMEOUT, NotificationScreens, alert};
use ws::websocket_server::{create_command_channel, start_control_server};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Report an error that ends the process: log, stderr and a desktop alert.
async fn report_fatal(err: &dyn std::fmt::Display) -> ExitCode {
    let message = err.to_string();
    tracing::error!("{}", message);
    eprintln!("Error: {}", message);
    alert(message, NOTIFICATION_FLUSH_TIMEOUT).await;
    ExitCode::FAILURE
}

/// Signal listeners are registered first: the token is never held while
/// SIGINT/SIGTERM would still kill the process outright.
fn claim_instance(token: &str) -> Result<(ShutdownSignals, InstanceToken), ReminderError> {
    let signals =
        ShutdownSignals::install().map_err(|e| ReminderError::io("signal handler", e))?;
    let token = InstanceToken::acquire(token)?;
    Ok((signals, token))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match Settings::load(&cli) {
        Ok(settings) => settings,
        Err(e) => return report_fatal(&e).await,
    };

    let (signals, token) = match claim_instance(&settings.token) {
        Ok(claimed) => claimed,
        Err(e) => return report_fatal(&e).await,
    };

    match run(settings, signals, token).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_fatal(&e).await,
    }
}

async fn run(
    settings: Settings,
    mut signals: ShutdownSignals,
    token: InstanceToken,
) -> Result<(), ReminderError> {
    let context = AppContext::new(token, StatusFile::new(&settings.status_file));
    let (screens, notifications) = NotificationScreens::start().await?;

    tracing::info!(
        interval = settings.breaks.interval,
        duration = settings.breaks.duration,
        status_file = %context.status_file().path().display(),
        "Eyesight reminder started"
    );

    let mut app = App::new(settings.breaks, screens, context).once(settings.once);
    if let Some(path) = settings.log_file.clone() {
        tracing::info!("Logging breaks to: {}", path.display());
        app = app.with_history(BreakLog::open(path));
    }

    let (command_tx, mut command_rx) = create_command_channel();
    if let Some(addr) = settings.control_addr {
        let status_rx = app.subscribe();
        tokio::spawn(async move {
            if let Err(e) = start_control_server(addr, command_tx, status_rx).await {
                tracing::warn!("Control server unavailable on {}: {}", addr, e);
            }
        });
    }

    let reason = app.run(&mut command_rx, signals.recv()).await;
    app.shutdown(reason);
    drop(app);

    notifications.finish(NOTIFICATION_FLUSH_TIMEOUT).await;
    Ok(())
}
