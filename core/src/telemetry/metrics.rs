use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Running counters for kiosk activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub scans: usize,
    pub scan_failures: usize,
    pub checkouts_applied: usize,
    pub checkouts_discarded: usize,
    pub checkout_failures: usize,
    pub refetches: usize,
    pub refetch_failures: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_scan(&self) {
        self.bump(|m| m.scans += 1);
    }

    pub fn record_scan_failure(&self) {
        self.bump(|m| m.scan_failures += 1);
    }

    pub fn record_checkout_applied(&self) {
        self.bump(|m| m.checkouts_applied += 1);
    }

    pub fn record_checkout_discarded(&self) {
        self.bump(|m| m.checkouts_discarded += 1);
    }

    pub fn record_checkout_failure(&self) {
        self.bump(|m| m.checkout_failures += 1);
    }

    pub fn record_refetch(&self) {
        self.bump(|m| m.refetches += 1);
    }

    pub fn record_refetch_failure(&self) {
        self.bump(|m| m.refetch_failures += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.lock()
    }

    fn bump(&self, update: impl FnOnce(&mut MetricsSnapshot)) {
        update(&mut self.lock());
    }

    fn lock(&self) -> MutexGuard<'_, MetricsSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
