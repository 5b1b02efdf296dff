use crate::model::{
    Balance, CheckoutResponse, LeaderboardEntry, Product, ProductPrice, ProductSnapshot,
    RankChange, ScanResult, ScannedCode, TransactionRecord, UserIdentity, UserSnapshot,
};
use crate::prelude::{ServiceError, ServiceResult, StreckService};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub fn user_snapshot(id: &str, name: &str, credits: f64) -> UserSnapshot {
    UserSnapshot {
        user: UserIdentity {
            id: id.into(),
            name: name.into(),
        },
        balance: Balance {
            total_credits_earned: 100.0,
            remaining_credits: credits,
            ..Default::default()
        },
    }
}

pub fn product_snapshot(id: i64, name: &str, stock: i64) -> ProductSnapshot {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    ProductSnapshot {
        product: Product {
            id,
            name: name.into(),
            total_stock: stock,
        },
        price: ProductPrice {
            id: id * 10,
            product_id: id,
            purchase_price: 8.5,
            internal_price: 10.0,
            external_price: 15.0,
            start_date: start,
            end_date: start + Duration::days(365),
        },
    }
}

pub fn transaction(name: &str, minutes: i64, count: i64) -> TransactionRecord {
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();
    TransactionRecord::new(
        format!("id-{name}"),
        name,
        base + Duration::minutes(minutes),
        count,
    )
}

pub fn leaderboard_entry(name: &str, rank: i64) -> LeaderboardEntry {
    LeaderboardEntry {
        user_id: format!("id-{name}"),
        user_name: name.into(),
        rank,
        rank_change: RankChange::Same,
        score: 10 - rank,
    }
}

/// In-memory stand-in for the external service with scripted replies.
#[derive(Default)]
pub struct ScriptedService {
    directory: Mutex<HashMap<String, ScanResult>>,
    checkouts: Mutex<VecDeque<ServiceResult<CheckoutResponse>>>,
    checkout_calls: Mutex<Vec<(i64, String, u32)>>,
    checkout_gate: Mutex<Option<Arc<Notify>>>,
    next_gates: Mutex<VecDeque<Arc<Notify>>>,
    transactions: Mutex<Vec<TransactionRecord>>,
    leaderboard: Mutex<Vec<LeaderboardEntry>>,
    fail_fetches: AtomicBool,
    resolve_calls: AtomicUsize,
    transaction_fetches: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, code: &str, result: ScanResult) {
        self.directory.lock().unwrap().insert(code.into(), result);
    }

    pub fn push_checkout(&self, reply: ServiceResult<CheckoutResponse>) {
        self.checkouts.lock().unwrap().push_back(reply);
    }

    /// Makes every later checkout wait until the returned gate is notified.
    pub fn hold_checkouts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.checkout_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Holds only the next checkout call until the returned gate is notified.
    pub fn hold_next_checkout(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.next_gates.lock().unwrap().push_back(Arc::clone(&gate));
        gate
    }

    pub fn checkout_calls(&self) -> Vec<(i64, String, u32)> {
        self.checkout_calls.lock().unwrap().clone()
    }

    pub fn set_transactions(&self, records: Vec<TransactionRecord>) {
        *self.transactions.lock().unwrap() = records;
    }

    pub fn set_leaderboard(&self, entries: Vec<LeaderboardEntry>) {
        *self.leaderboard.lock().unwrap() = entries;
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn transaction_fetches(&self) -> usize {
        self.transaction_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreckService for ScriptedService {
    async fn resolve_scan(&self, code: &ScannedCode) -> ServiceResult<Option<ScanResult>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.directory.lock().unwrap().get(code.as_str()).cloned())
    }

    async fn checkout(
        &self,
        product_id: i64,
        user_id: &str,
        quantity: u32,
    ) -> ServiceResult<CheckoutResponse> {
        self.checkout_calls
            .lock()
            .unwrap()
            .push((product_id, user_id.to_string(), quantity));
        // Replies are handed out in call order, whatever order the calls finish in.
        let reply = self
            .checkouts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Transport("no scripted reply".into())));
        let next = self.next_gates.lock().unwrap().pop_front();
        let gate = next.or_else(|| self.checkout_gate.lock().unwrap().clone());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        reply
    }

    async fn fetch_latest_transactions(&self) -> ServiceResult<Vec<TransactionRecord>> {
        self.transaction_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(ServiceError::Transport("backend unavailable".into()));
        }
        Ok(self.transactions.lock().unwrap().clone())
    }

    async fn fetch_leaderboard(&self) -> ServiceResult<Vec<LeaderboardEntry>> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(ServiceError::Transport("backend unavailable".into()));
        }
        Ok(self.leaderboard.lock().unwrap().clone())
    }
}
