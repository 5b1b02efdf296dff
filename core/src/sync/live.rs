use crate::chart::{aggregate, ChartView};
use crate::model::{LeaderboardEntry, TransactionRecord};
use crate::prelude::{KioskError, KioskResult, ServiceError, StreckService};
use crate::sync::bus::EventBus;
use crate::telemetry::MetricsRecorder;
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Latest transaction log and leaderboard, with the chart derived from them.
#[derive(Debug, Clone, Serialize)]
pub struct LiveSnapshot {
    pub transactions: Vec<TransactionRecord>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub chart: ChartView,
}

impl LiveSnapshot {
    fn empty() -> Self {
        Self {
            transactions: Vec::new(),
            leaderboard: Vec::new(),
            chart: aggregate(&[], Utc::now()),
        }
    }
}

struct SyncShared {
    service: Arc<dyn StreckService>,
    metrics: Arc<MetricsRecorder>,
    snapshot: watch::Sender<LiveSnapshot>,
    next_ticket: AtomicU64,
    applied_ticket: Mutex<u64>,
}

/// Keeps the transaction and leaderboard snapshots current.
///
/// Mounting fetches once and then refetches everything on each
/// `data-changed` notification. Every refresh replaces the snapshot
/// wholesale; when two refreshes overlap, the one issued last wins.
pub struct LiveDataSync {
    shared: Arc<SyncShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveDataSync {
    /// Subscribes to `data-changed` and starts the refresh loop. Must be
    /// called from within a tokio runtime.
    pub fn mount(
        service: Arc<dyn StreckService>,
        bus: &EventBus,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let (snapshot, _) = watch::channel(LiveSnapshot::empty());
        let shared = Arc::new(SyncShared {
            service,
            metrics,
            snapshot,
            next_ticket: AtomicU64::new(0),
            applied_ticket: Mutex::new(0),
        });
        let updates = bus.subscribe_data_changed();
        let task = tokio::spawn(Arc::clone(&shared).listen(updates));
        info!("live data sync mounted");
        Self {
            shared,
            task: Mutex::new(Some(task)),
        }
    }

    /// Fetches both snapshots now, outside the notification loop.
    pub async fn refetch(&self) -> KioskResult<()> {
        self.shared.refetch().await
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn chart(&self) -> ChartView {
        self.shared.snapshot.borrow().chart.clone()
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.shared.snapshot.borrow().leaderboard.clone()
    }

    /// Stops the refresh loop and releases the subscription.
    pub async fn unmount(&self) {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
        info!("live data sync unmounted");
    }
}

impl Drop for LiveDataSync {
    fn drop(&mut self) {
        let slot = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

impl SyncShared {
    async fn listen(self: Arc<Self>, mut updates: broadcast::Receiver<()>) {
        let _ = self.refetch().await;
        loop {
            match updates.recv().await {
                Ok(()) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!("coalesced {} data-changed notifications", skipped);
                }
                Err(RecvError::Closed) => break,
            }
            let _ = self.refetch().await;
        }
    }

    async fn refetch(&self) -> KioskResult<()> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.metrics.record_refetch();

        let fetched = async {
            let transactions = self.service.fetch_latest_transactions().await?;
            let leaderboard = self.service.fetch_leaderboard().await?;
            Ok::<_, ServiceError>((transactions, leaderboard))
        }
        .await;

        let (transactions, leaderboard) = match fetched {
            Ok(pair) => pair,
            Err(err) => {
                self.metrics.record_refetch_failure();
                warn!("refetch failed, keeping previous snapshot: {}", err);
                return Err(KioskError::RefetchFailure(err));
            }
        };

        let mut applied = self
            .applied_ticket
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if ticket < *applied {
            debug!("dropping refetch #{} superseded by #{}", ticket, *applied);
            return Ok(());
        }
        *applied = ticket;
        let chart = aggregate(&transactions, Utc::now());
        self.snapshot.send_replace(LiveSnapshot {
            transactions,
            leaderboard,
            chart,
        });
        Ok(())
    }
}
