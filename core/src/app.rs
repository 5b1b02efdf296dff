use crate::chart::ChartView;
use crate::input::{KeyEvent, ScanInputDecoder};
use crate::model::{LeaderboardEntry, Presence, ScannedCode};
use crate::notify::{Toast, ToastBoard};
use crate::prelude::{KioskResult, KioskSettings, StreckService};
use crate::session::{ScanOutcome, ScanSessionController, SessionView};
use crate::sync::{EventBus, LiveDataSync, PresenceTracker};
use crate::telemetry::{MetricsRecorder, MetricsSnapshot};
use log::info;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// Application state for one running kiosk.
///
/// `start` wires the components together and opens both subscriptions;
/// `shutdown` cancels the session countdown and releases them again.
pub struct KioskApp {
    bus: EventBus,
    toasts: Arc<ToastBoard>,
    metrics: Arc<MetricsRecorder>,
    decoder: Mutex<ScanInputDecoder>,
    controller: ScanSessionController,
    live: LiveDataSync,
    presence: PresenceTracker,
}

impl KioskApp {
    /// Must be called from within a tokio runtime.
    pub fn start(service: Arc<dyn StreckService>, bus: EventBus, settings: KioskSettings) -> Self {
        let toasts = Arc::new(ToastBoard::new(Duration::from_secs(settings.toast_ttl_secs)));
        let metrics = Arc::new(MetricsRecorder::new());
        let controller = ScanSessionController::new(
            Arc::clone(&service),
            toasts.clone(),
            Arc::clone(&metrics),
            settings,
        );
        let live = LiveDataSync::mount(service, &bus, Arc::clone(&metrics));
        let presence = PresenceTracker::mount(&bus);
        info!("kiosk started");
        Self {
            bus,
            toasts,
            metrics,
            decoder: Mutex::new(ScanInputDecoder::new()),
            controller,
            live,
            presence,
        }
    }

    /// Feeds one key press; when it completes a code, the code is handled.
    pub async fn press(&self, key: KeyEvent) -> Option<KioskResult<ScanOutcome>> {
        let code = self
            .decoder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(key)?;
        Some(self.controller.handle_scan(code).await)
    }

    pub async fn handle_scan(&self, code: ScannedCode) -> KioskResult<ScanOutcome> {
        self.controller.handle_scan(code).await
    }

    pub fn dismiss_user(&self) {
        self.controller.dismiss_user();
    }

    pub fn session(&self) -> SessionView {
        self.controller.view()
    }

    pub fn chart(&self) -> ChartView {
        self.live.chart()
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.live.leaderboard()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.active()
    }

    pub fn dismiss_toast(&self, id: u64) -> bool {
        self.toasts.dismiss(id)
    }

    pub fn presence(&self) -> Option<Presence> {
        self.presence.current()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Seconds left on the open session, updated once per tick.
    pub fn subscribe_countdown(&self) -> watch::Receiver<u32> {
        self.controller.subscribe_countdown()
    }

    /// Refetches the transaction log and leaderboard without waiting for a
    /// `data-changed` notification.
    pub async fn refetch(&self) -> KioskResult<()> {
        self.live.refetch().await
    }

    /// Idempotent; in-flight checkouts are left to complete.
    pub async fn shutdown(&self) {
        self.controller.shutdown();
        self.live.unmount().await;
        self.presence.unmount().await;
        info!("kiosk stopped");
    }
}
