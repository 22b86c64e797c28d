//! Overlays drawn by the desktop notification daemon.
//!
//! notify-rust talks to D-Bus synchronously, so every call runs on a
//! dedicated thread fed by a request queue. Surfaces only enqueue.

use super::{OverlayError, Screens, Surface};
use crate::displays::{self, Display};
use crate::error::ReminderError;
use notify_rust::{Hint, Notification, NotificationHandle, Timeout, Urgency};
use std::collections::HashMap;
use std::thread;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Duration, timeout};

const APP_NAME: &str = "eyesight-reminder";

/// Bound on waiting for the notification daemon at exit.
pub const NOTIFICATION_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Splits overlay text into a notification summary (first line) and body.
fn split_text(text: &str) -> (&str, &str) {
    text.split_once('\n').unwrap_or((text, ""))
}

#[derive(Debug)]
enum OverlayRequest {
    Open { id: u64, display: Display, text: String },
    SetText { id: u64, text: String },
    Close { id: u64 },
}

fn show(display: &Display, text: &str) -> Result<NotificationHandle, OverlayError> {
    let (summary, body) = split_text(text);
    let (x, y) = display.center();

    Notification::new()
        .appname(APP_NAME)
        .summary(summary)
        .body(body)
        .urgency(Urgency::Critical)
        .hint(Hint::X(x))
        .hint(Hint::Y(y))
        .timeout(Timeout::Never)
        .show()
        .map_err(|e| OverlayError {
            display: display.name.clone(),
            reason: e.to_string(),
        })
}

/// Runs until every sender is gone, then closes whatever is still shown.
fn drive_notifications(mut queue: mpsc::UnboundedReceiver<OverlayRequest>, done: oneshot::Sender<()>) {
    let mut handles: HashMap<u64, NotificationHandle> = HashMap::new();

    while let Some(request) = queue.blocking_recv() {
        match request {
            OverlayRequest::Open { id, display, text } => match show(&display, &text) {
                Ok(handle) => {
                    handles.insert(id, handle);
                }
                Err(e) => tracing::warn!("{}", e),
            },
            OverlayRequest::SetText { id, text } => {
                if let Some(handle) = handles.get_mut(&id) {
                    let (summary, body) = split_text(&text);
                    handle.summary(summary).body(body);
                    handle.update();
                }
            }
            OverlayRequest::Close { id } => {
                if let Some(handle) = handles.remove(&id) {
                    handle.close();
                }
            }
        }
    }

    for (_, handle) in handles.drain() {
        handle.close();
    }
    let _ = done.send(());
}

/// Overlay pinned near the display center until the break ends.
pub struct NotificationSurface {
    id: u64,
    requests: mpsc::UnboundedSender<OverlayRequest>,
}

impl NotificationSurface {
    fn request(&self, request: OverlayRequest) {
        if self.requests.send(request).is_err() {
            tracing::debug!(overlay = self.id, "Notification thread is gone");
        }
    }
}

impl Surface for NotificationSurface {
    fn set_text(&mut self, text: &str) {
        self.request(OverlayRequest::SetText {
            id: self.id,
            text: text.to_string(),
        });
    }

    fn close(self) {
        self.request(OverlayRequest::Close { id: self.id });
    }
}

pub struct NotificationScreens {
    displays: watch::Receiver<Vec<Display>>,
    requests: mpsc::UnboundedSender<OverlayRequest>,
    next_id: u64,
}

/// Completion handle of the notification thread.
pub struct NotificationWorker {
    done: oneshot::Receiver<()>,
}

impl NotificationWorker {
    /// Wait up to `limit` for queued requests to reach the daemon. The
    /// thread only finishes once every `NotificationScreens` and surface
    /// has been dropped.
    pub async fn finish(self, limit: Duration) {
        if timeout(limit, self.done).await.is_err() {
            tracing::warn!("Notification daemon did not answer within {:?}", limit);
        }
    }
}

impl NotificationScreens {
    /// Enumerate displays, then start the display watcher and the
    /// notification thread. Must be called inside the runtime.
    pub async fn start() -> Result<(Self, NotificationWorker), ReminderError> {
        let (requests, queue) = mpsc::unbounded_channel();
        let (done_tx, done) = oneshot::channel();
        thread::Builder::new()
            .name("notifications".to_string())
            .spawn(move || drive_notifications(queue, done_tx))
            .map_err(|e| ReminderError::io("notification thread", e))?;

        let initial = displays::connected_displays().await;
        tracing::debug!(count = initial.len(), "Displays enumerated");
        let (display_tx, display_rx) = watch::channel(initial);
        tokio::spawn(displays::watch_displays(display_tx));

        let screens = Self {
            displays: display_rx,
            requests,
            next_id: 0,
        };
        Ok((screens, NotificationWorker { done }))
    }
}

impl Screens for NotificationScreens {
    type Surface = NotificationSurface;

    fn displays(&mut self) -> Vec<Display> {
        self.displays.borrow().clone()
    }

    fn open(&mut self, display: &Display, text: &str) -> Result<NotificationSurface, OverlayError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = OverlayRequest::Open {
            id,
            display: display.clone(),
            text: text.to_string(),
        };
        self.requests.send(request).map_err(|_| OverlayError {
            display: display.name.clone(),
            reason: "notification thread stopped".to_string(),
        })?;

        Ok(NotificationSurface {
            id,
            requests: self.requests.clone(),
        })
    }
}

fn send_alert(message: &str) -> Result<(), notify_rust::error::Error> {
    Notification::new()
        .appname(APP_NAME)
        .summary("Eyesight Reminder - Error")
        .body(message)
        .urgency(Urgency::Critical)
        .timeout(Timeout::Never)
        .show()?;
    Ok(())
}

/// Show a one-off critical message, used for errors that end the process.
/// Gives up after `limit` if the daemon does not answer.
pub async fn alert(message: String, limit: Duration) {
    let (sent_tx, sent) = oneshot::channel();
    let spawned = thread::Builder::new()
        .name("alert".to_string())
        .spawn(move || {
            let _ = sent_tx.send(send_alert(&message).map_err(|e| e.to_string()));
        });
    if let Err(e) = spawned {
        tracing::debug!("Failed to start alert thread: {}", e);
        return;
    }

    match timeout(limit, sent).await {
        Ok(Ok(Err(e))) => tracing::debug!("Failed to send alert notification: {}", e),
        Err(_) => tracing::debug!("Alert notification timed out"),
        _ => {}
    }
}
