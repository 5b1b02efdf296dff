use crate::model::{ProductSnapshot, ScanResult, ScannedCode, UserSnapshot};
use crate::prelude::{
    KioskError, KioskResult, KioskSettings, Notice, NotificationSink, SecondUserPolicy,
    StreckService,
};
use crate::session::countdown::SessionCountdown;
use crate::telemetry::MetricsRecorder;
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Units bought per checkout.
pub const CHECKOUT_QUANTITY: u32 = 1;

/// The user/product selection shown on the kiosk.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Session {
    pub selected_user: Option<UserSnapshot>,
    pub selected_product: Option<ProductSnapshot>,
    /// Wall-clock estimate for display. Expiry itself is driven by the
    /// countdown and never compares against this value.
    pub expiry_deadline: Option<DateTime<Utc>>,
}

/// Everything a renderer needs about the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub session: Session,
    pub error: Option<String>,
    pub seconds_left: u32,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Applied,
    /// The user slot changed while the call was in flight.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    UserSelected,
    ProductSelected,
    CheckedOut(CheckoutOutcome),
}

#[derive(Default)]
struct SessionState {
    session: Session,
    /// Bumped whenever the user slot is filled, replaced or cleared.
    generation: u64,
    error: Option<String>,
    /// Last sequence number handed to a checkout call.
    checkout_seq: u64,
    /// Sequence of the newest checkout reply merged into the session.
    applied_checkout_seq: u64,
}

impl SessionState {
    fn clear_user(&mut self) -> Option<UserSnapshot> {
        let previous = self.session.selected_user.take();
        if previous.is_some() {
            self.generation += 1;
        }
        self.session.expiry_deadline = None;
        previous
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

struct PendingCheckout {
    seq: u64,
    generation: u64,
    user_id: String,
    user_name: String,
    product_id: i64,
    product_name: String,
}

/// Interprets scanned codes and drives checkout against the external service.
///
/// The session lock is never held across an await or while calling into the
/// countdown, so the countdown's expiry callback can always take it.
pub struct ScanSessionController {
    service: Arc<dyn StreckService>,
    notifier: Arc<dyn NotificationSink>,
    metrics: Arc<MetricsRecorder>,
    state: Arc<Mutex<SessionState>>,
    countdown: SessionCountdown,
    settings: KioskSettings,
}

impl ScanSessionController {
    pub fn new(
        service: Arc<dyn StreckService>,
        notifier: Arc<dyn NotificationSink>,
        metrics: Arc<MetricsRecorder>,
        settings: KioskSettings,
    ) -> Self {
        let state = Arc::new(Mutex::new(SessionState::default()));
        let expiring = Arc::clone(&state);
        let countdown = SessionCountdown::new(Arc::new(move || {
            if let Some(user) = lock(&expiring).clear_user() {
                info!("session for {} expired", user.user.name);
            }
        }));
        Self {
            service,
            notifier,
            metrics,
            state,
            countdown,
            settings,
        }
    }

    pub async fn handle_scan(&self, code: ScannedCode) -> KioskResult<ScanOutcome> {
        self.metrics.record_scan();
        if code.is_empty() {
            return Err(self.scan_failed(&code, "empty code"));
        }

        let resolved = match self.service.resolve_scan(&code).await {
            Ok(Some(result)) => result,
            Ok(None) => return Err(self.scan_failed(&code, "not found")),
            Err(err) => return Err(self.scan_failed(&code, &err.to_string())),
        };

        match resolved {
            ScanResult::User(user) => self.select_user(user).map(|()| ScanOutcome::UserSelected),
            ScanResult::Product(product) => {
                let has_user = {
                    let mut state = lock(&self.state);
                    state.error = None;
                    info!("product {} scanned", product.product.name);
                    state.session.selected_product = Some(product);
                    state.session.selected_user.is_some()
                };
                if has_user {
                    self.checkout().await.map(ScanOutcome::CheckedOut)
                } else {
                    Ok(ScanOutcome::ProductSelected)
                }
            }
        }
    }

    /// Buys one unit of the selected product for the selected user.
    ///
    /// The reply is applied only if the user slot has not changed since the
    /// call was issued and no later checkout has been applied in the
    /// meantime. On success the user snapshot is replaced wholesale
    /// and only the product's stock is patched.
    pub async fn checkout(&self) -> KioskResult<CheckoutOutcome> {
        let pending = {
            let mut state = lock(&self.state);
            let pending = match (&state.session.selected_user, &state.session.selected_product) {
                (Some(user), Some(product)) => PendingCheckout {
                    seq: state.checkout_seq + 1,
                    generation: state.generation,
                    user_id: user.user.id.clone(),
                    user_name: user.user.name.clone(),
                    product_id: product.product.id,
                    product_name: product.product.name.clone(),
                },
                _ => return Ok(CheckoutOutcome::Discarded),
            };
            state.checkout_seq = pending.seq;
            pending
        };

        let response = match self
            .service
            .checkout(pending.product_id, &pending.user_id, CHECKOUT_QUANTITY)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!(
                    "checkout of {} for {} failed: {}",
                    pending.product_name, pending.user_name, err
                );
                return Err(self.checkout_failed(KioskError::CheckoutTransportFailure(err)));
            }
        };

        if let Some(reason) = response.error {
            warn!("checkout rejected: {}", reason);
            return Err(self.checkout_failed(KioskError::CheckoutRejected(reason)));
        }
        let (user, product, balance) = match (response.user, response.product, response.balance) {
            (Some(user), Some(product), Some(balance)) => (user, product, balance),
            _ => {
                return Err(self.checkout_failed(KioskError::CheckoutRejected(
                    "incomplete checkout response".into(),
                )))
            }
        };

        {
            let mut state = lock(&self.state);
            let current_user = state.session.selected_user.as_ref().map(|u| u.user.id.as_str());
            if state.generation != pending.generation || current_user != Some(pending.user_id.as_str())
            {
                warn!(
                    "discarding checkout reply for {}: session changed while in flight",
                    pending.user_name
                );
                self.metrics.record_checkout_discarded();
                return Ok(CheckoutOutcome::Discarded);
            }
            if pending.seq < state.applied_checkout_seq {
                warn!(
                    "discarding checkout reply #{} for {}: #{} already applied",
                    pending.seq, pending.user_name, state.applied_checkout_seq
                );
                self.metrics.record_checkout_discarded();
                return Ok(CheckoutOutcome::Discarded);
            }
            state.applied_checkout_seq = pending.seq;
            state.session.selected_user = Some(UserSnapshot { user, balance });
            if let Some(selected) = state.session.selected_product.as_mut() {
                if selected.product.id == product.id {
                    selected.product.total_stock = product.total_stock;
                }
            }
            state.error = None;
        }

        info!("streck {} for {}", pending.product_name, pending.user_name);
        self.metrics.record_checkout_applied();
        self.notifier.notify(Notice::success(format!(
            "Streckade {} för {}",
            pending.product_name, pending.user_name
        )));
        Ok(CheckoutOutcome::Applied)
    }

    /// Clears the user slot and stops its countdown. Idempotent.
    pub fn dismiss_user(&self) {
        if let Some(user) = lock(&self.state).clear_user() {
            info!("session for {} dismissed", user.user.name);
        }
        self.countdown.cancel();
    }

    pub fn session(&self) -> Session {
        lock(&self.state).session.clone()
    }

    pub fn view(&self) -> SessionView {
        let state = lock(&self.state);
        SessionView {
            session: state.session.clone(),
            error: state.error.clone(),
            seconds_left: if state.session.selected_user.is_some() {
                self.countdown.remaining()
            } else {
                0
            },
            generation: state.generation,
        }
    }

    /// Follows the seconds left on the session countdown.
    pub fn subscribe_countdown(&self) -> watch::Receiver<u32> {
        self.countdown.subscribe()
    }

    /// Cancels the countdown; in-flight checkouts are left to complete.
    pub fn shutdown(&self) {
        self.countdown.cancel();
    }

    fn select_user(&self, user: UserSnapshot) -> KioskResult<()> {
        let seconds = self.settings.countdown_seconds;
        if self.settings.second_user_policy == SecondUserPolicy::Reject {
            let mut state = lock(&self.state);
            let occupant = state
                .session
                .selected_user
                .as_ref()
                .filter(|current| current.user.id != user.user.id)
                .map(|current| current.user.name.clone());
            if let Some(current) = occupant {
                let err = KioskError::SessionOccupied { current };
                state.error = Some(err.to_string());
                drop(state);
                self.notifier.notify(Notice::error(err.to_string()));
                return Err(err);
            }
        }

        // The old timer must be gone before the slot changes, or its expiry
        // could clear the user written below.
        self.countdown.cancel();
        {
            let mut state = lock(&self.state);
            let same_user = state
                .session
                .selected_user
                .as_ref()
                .is_some_and(|current| current.user.id == user.user.id);
            if !same_user {
                state.generation += 1;
            }
            info!("session opened for {}", user.user.name);
            state.session.selected_user = Some(user);
            state.session.expiry_deadline =
                Some(Utc::now() + Duration::seconds(i64::from(seconds)));
            state.error = None;
        }
        self.countdown.start(seconds);
        Ok(())
    }

    fn scan_failed(&self, code: &ScannedCode, reason: &str) -> KioskError {
        warn!("scan of '{}' failed: {}", code, reason);
        self.metrics.record_scan_failure();
        let err = KioskError::ScanResolutionFailed {
            code: code.to_string(),
            reason: reason.to_string(),
        };
        lock(&self.state).error = Some("Scan failed".into());
        err
    }

    fn checkout_failed(&self, err: KioskError) -> KioskError {
        self.metrics.record_checkout_failure();
        lock(&self.state).error = Some(err.to_string());
        self.notifier.notify(Notice::error(err.to_string()));
        err
    }
}
