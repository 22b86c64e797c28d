//! The single-threaded event loop tying the scheduler to its clock, the
//! control channel and the shutdown signals.

use crate::breaks::phase::TICK_INTERVAL_MS;
use crate::breaks::{BreakScheduler, BreakSettings, StatusSnapshot};
use crate::history::BreakLog;
use crate::lifecycle::{AppContext, ShutdownReason};
use crate::overlay::Screens;
use crate::ws::websocket_server::{CommandReceiver, ControlCommand};
use std::future::Future;
use tokio::sync::watch;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at, sleep_until};

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

pub struct App<S: Screens> {
    scheduler: BreakScheduler<S>,
    context: AppContext,
    snapshot_tx: watch::Sender<StatusSnapshot>,
    history: Option<BreakLog>,
    once: bool,
}

impl<S: Screens> App<S> {
    pub fn new(settings: BreakSettings, screens: S, context: AppContext) -> Self {
        let scheduler = BreakScheduler::new(settings, screens);
        let (snapshot_tx, _) = watch::channel(scheduler.snapshot());
        Self {
            scheduler,
            context,
            snapshot_tx,
            history: None,
            once: false,
        }
    }

    pub fn with_history(mut self, history: BreakLog) -> Self {
        self.history = Some(history);
        self
    }

    /// Exit after the first break ends.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &BreakScheduler<S> {
        &self.scheduler
    }

    #[cfg(test)]
    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Drive the scheduler until a shutdown trigger fires. Ordering within a
    /// turn: shutdown, control commands, tick, break deadline.
    pub async fn run<F>(&mut self, commands: &mut CommandReceiver, shutdown: F) -> ShutdownReason
    where
        F: Future<Output = ShutdownReason>,
    {
        tokio::pin!(shutdown);

        let period = Duration::from_millis(TICK_INTERVAL_MS);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.publish();

        loop {
            let deadline = self.scheduler.break_deadline();

            tokio::select! {
                biased;

                reason = &mut shutdown => return reason,

                Some(command) = commands.recv() => match command {
                    ControlCommand::TogglePause => self.toggle_pause(),
                    ControlCommand::Exit => return ShutdownReason::ExitRequested,
                },

                now = ticker.tick() => {
                    if self.on_tick(now) && self.once {
                        return ShutdownReason::BreakFinished;
                    }
                }

                _ = sleep_until_deadline(deadline) => {
                    if self.on_break_deadline() && self.once {
                        return ShutdownReason::BreakFinished;
                    }
                }
            }
        }
    }

    /// Returns true if the break ended during this tick.
    fn on_tick(&mut self, now: Instant) -> bool {
        let was_on_break = self.scheduler.break_deadline().is_some();
        let reading = self.scheduler.tick(now);
        self.context.publish_status(reading);

        if !was_on_break && self.scheduler.break_deadline().is_some() {
            if let Some(history) = self.history.as_mut() {
                history.break_started(self.scheduler.countdown());
            }
        }

        tracing::trace!(
            phase = self.scheduler.phase().as_str(),
            status = %reading,
            "tick"
        );
        self.publish_snapshot();

        // Ticks win every tie with the deadline branch, so a tick that ran
        // past the deadline has to end the break itself.
        match self.scheduler.break_deadline() {
            Some(deadline) if Instant::now() >= deadline => self.on_break_deadline(),
            _ => false,
        }
    }

    fn on_break_deadline(&mut self) -> bool {
        if !self.scheduler.end_break() {
            return false;
        }
        self.context.publish_status(self.scheduler.status());
        if let Some(history) = &self.history {
            history.break_ended(self.scheduler.countdown());
        }
        self.publish_snapshot();
        true
    }

    fn toggle_pause(&mut self) {
        let paused = self.scheduler.toggle_pause();
        let message = if paused { "Paused" } else { "Resumed" };
        tracing::info!(countdown = self.scheduler.countdown(), "{}", message);
        if let Some(history) = &self.history {
            history.log(message);
        }
        self.publish();
    }

    fn publish(&mut self) {
        self.context.publish_status(self.scheduler.status());
        self.publish_snapshot();
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.scheduler.snapshot());
    }

    /// Close overlays, release the token and remove the status file.
    pub fn shutdown(&mut self, reason: ShutdownReason) {
        tracing::info!("Shutting down ({})", reason.as_str());
        self.scheduler.close_overlays();
        if let Some(history) = &self.history {
            history.session_ended(reason.as_str());
        }
        self.context.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaks::{Phase, StatusReading};
    use crate::displays::Display;
    use crate::lifecycle::{InstanceToken, StatusFile};
    use crate::overlay::testing::{EventLog, OverlayEvent, RecordingScreens};
    use crate::overlay::{OverlayError, Surface};
    use crate::ws::websocket_server::create_command_channel;
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::sleep;

    struct Harness {
        app: App<RecordingScreens>,
        events: EventLog,
        dir: TempDir,
    }

    fn context(tag: &str, dir: &TempDir) -> AppContext {
        let token =
            InstanceToken::acquire(&format!("/eyesight-app-{}-{}", std::process::id(), tag))
                .unwrap();
        AppContext::new(token, StatusFile::new(dir.path().join("status")))
    }

    fn harness(tag: &str, interval: i64, duration: i64) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let context = context(tag, &dir);
        let screens = RecordingScreens::with_displays(&["DP-1", "HDMI-1"]);
        let events = screens.events();
        let app = App::new(BreakSettings::from_secs(interval, duration), screens, context);
        Harness { app, events, dir }
    }

    fn status_contents(h: &Harness) -> String {
        fs::read_to_string(h.dir.path().join("status")).unwrap()
    }

    async fn after(ms: u64, reason: ShutdownReason) -> ShutdownReason {
        sleep(Duration::from_millis(ms)).await;
        reason
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_status_sequence() {
        let mut h = harness("waiting", 5, 2);
        let (_tx, mut rx) = create_command_channel();

        // Each run restarts the ticker one second out; stop just after it fires.
        for (ms, expected) in [(1500, "4"), (1100, "3"), (1100, "2"), (1100, "1")] {
            h.app.run(&mut rx, after(ms, ShutdownReason::Interrupt)).await;
            assert_eq!(status_contents(&h), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_cycle_ends_on_deadline() {
        let mut h = harness("cycle", 5, 2);
        let (_tx, mut rx) = create_command_channel();

        // Tick 5 at t=5s starts the break; its deadline coincides with tick 7.
        let reason = h.app.run(&mut rx, after(7500, ShutdownReason::Terminate)).await;
        assert_eq!(reason, ShutdownReason::Terminate);
        assert_eq!(h.app.scheduler().phase(), Phase::Waiting);
        assert_eq!(h.app.scheduler().countdown(), 5);
        assert_eq!(h.app.scheduler().overlay_count(), 0);
        assert_eq!(status_contents(&h), "5");

        let events = h.events.borrow();
        let opened = events
            .iter()
            .filter(|e| matches!(e, OverlayEvent::Opened { .. }))
            .count();
        assert_eq!(opened, 2);
        let texts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                OverlayEvent::Text { display, text } if display == "DP-1" => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "Take a short pause!\nTime left: 1 seconds",
                "Take a short pause!\nTime left: 0 seconds"
            ]
        );
        let closed = events
            .iter()
            .filter(|e| matches!(e, OverlayEvent::Closed { .. }))
            .count();
        assert_eq!(closed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_status_file() {
        let mut h = harness("pause", 15, 2);
        let (tx, mut rx) = create_command_channel();

        h.app.run(&mut rx, after(5500, ShutdownReason::Interrupt)).await;
        assert_eq!(status_contents(&h), "10");

        tx.send(ControlCommand::TogglePause).unwrap();
        h.app.run(&mut rx, after(30_000, ShutdownReason::Interrupt)).await;
        assert_eq!(status_contents(&h), "-1");
        assert_eq!(h.app.scheduler().countdown(), 10);
        assert_eq!(h.app.subscribe().borrow().label.as_deref(), Some("Paused"));

        tx.send(ControlCommand::TogglePause).unwrap();
        h.app.run(&mut rx, after(1500, ShutdownReason::Interrupt)).await;
        assert_eq!(status_contents(&h), "9");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_reports_positive_wait() {
        let mut h = harness("zero", 0, 3);
        let (_tx, mut rx) = create_command_channel();

        h.app.run(&mut rx, after(1500, ShutdownReason::Interrupt)).await;
        assert_eq!(h.app.scheduler().phase(), Phase::OnBreak);
        assert_eq!(
            h.events.borrow().first(),
            Some(&OverlayEvent::Opened {
                display: "DP-1".to_string(),
                text: "Take a short pause!\nTime left: 3 seconds".to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_while_paused() {
        let mut h = harness("paused-break", 1, 3);
        let (tx, mut rx) = create_command_channel();

        h.app.run(&mut rx, after(1500, ShutdownReason::Interrupt)).await;
        assert_eq!(h.app.scheduler().phase(), Phase::OnBreak);

        tx.send(ControlCommand::TogglePause).unwrap();
        h.app.run(&mut rx, after(3000, ShutdownReason::Interrupt)).await;
        assert_eq!(h.app.scheduler().phase(), Phase::Waiting);
        assert!(h.app.scheduler().is_paused());
        assert_eq!(status_contents(&h), "-1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_command_stops_loop() {
        let mut h = harness("exit", 100, 2);
        let (tx, mut rx) = create_command_channel();
        tx.send(ControlCommand::Exit).unwrap();

        let reason = h.app.run(&mut rx, std::future::pending()).await;
        assert_eq!(reason, ShutdownReason::ExitRequested);

        h.app.shutdown(reason);
        assert!(h.app.context().is_cleaned_up());
        assert!(!h.dir.path().join("status").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_mode_exits_after_break() {
        let h = harness("once", 0, 2);
        let mut app = h.app.once(true);
        let (_tx, mut rx) = create_command_channel();

        let reason = app.run(&mut rx, std::future::pending()).await;
        assert_eq!(reason, ShutdownReason::BreakFinished);
        assert_eq!(app.scheduler().phase(), Phase::Waiting);
        assert_eq!(app.scheduler().status(), StatusReading::Remaining(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_mid_break_closes_overlays() {
        let mut h = harness("midbreak", 1, 60);
        let (_tx, mut rx) = create_command_channel();

        h.app.run(&mut rx, after(2500, ShutdownReason::Terminate)).await;
        assert_eq!(h.app.scheduler().overlay_count(), 2);

        h.app.shutdown(ShutdownReason::Terminate);
        assert_eq!(h.app.scheduler().overlay_count(), 0);
        assert!(!h.dir.path().join("status").exists());
    }

    /// One display whose text updates take 1.5s of wall time each.
    struct SlowScreens;

    struct SlowSurface;

    impl Surface for SlowSurface {
        fn set_text(&mut self, _text: &str) {
            std::thread::sleep(Duration::from_millis(1500));
        }

        fn close(self) {}
    }

    impl Screens for SlowScreens {
        type Surface = SlowSurface;

        fn displays(&mut self) -> Vec<Display> {
            vec![Display {
                name: "DP-1".to_string(),
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
            }]
        }

        fn open(&mut self, _display: &Display, _text: &str) -> Result<SlowSurface, OverlayError> {
            Ok(SlowSurface)
        }
    }

    #[tokio::test]
    async fn test_slow_overlay_updates_do_not_extend_break() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new(BreakSettings::from_secs(1, 2), SlowScreens, context("slow", &dir))
            .once(true);
        let (_tx, mut rx) = create_command_channel();

        let started = Instant::now();
        let reason = app.run(&mut rx, std::future::pending()).await;

        // Break opens at 1s with its deadline at 3s; the update started at 2s
        // overruns it by 0.5s and the break must end right there.
        assert_eq!(reason, ShutdownReason::BreakFinished);
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_millis(4000), "break ended after {:?}", elapsed);
        assert_eq!(app.scheduler().phase(), Phase::Waiting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_break_ends_on_its_tick() {
        let mut h = harness("zero-duration", 2, 0);
        let (_tx, mut rx) = create_command_channel();

        h.app.run(&mut rx, after(2500, ShutdownReason::Interrupt)).await;
        assert_eq!(h.app.scheduler().phase(), Phase::Waiting);
        assert_eq!(h.app.scheduler().overlay_count(), 0);
        assert_eq!(status_contents(&h), "2");
    }
}
