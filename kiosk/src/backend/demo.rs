use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use streckcore::model::{
    Balance, CheckoutResponse, LeaderboardEntry, Product, ProductPrice, ProductSnapshot,
    RankChange, ScanResult, ScannedCode, TransactionRecord, UserIdentity, UserSnapshot,
};
use streckcore::prelude::{ServiceResult, StreckService};
use streckcore::sync::EventBus;

const USER_NAMES: [&str; 8] = [
    "Alva", "Bengt", "Cilla", "Dante", "Elsa", "Frej", "Greta", "Hugo",
];
const PRODUCT_NAMES: [&str; 6] = ["Cola", "Kaffe", "Zingo", "Loka", "Red Bull", "Trocadero"];
const PRODUCT_CODE_BASE: usize = 1001;
const USER_CODE_BASE: usize = 2001;

/// Parameters for the seeded in-memory directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    pub seed: u64,
    pub users: usize,
    pub products: usize,
    /// Number of past transactions spread over the last twelve hours.
    pub history: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            users: 4,
            products: 3,
            history: 24,
        }
    }
}

impl DemoConfig {
    fn normalized_users(&self) -> usize {
        self.users.max(1)
    }

    fn normalized_products(&self) -> usize {
        self.products.max(1)
    }
}

#[derive(Debug, Clone, Copy)]
enum Referable {
    User(usize),
    Product(usize),
}

struct DemoStore {
    users: Vec<UserSnapshot>,
    products: Vec<ProductSnapshot>,
    codes: HashMap<String, Referable>,
    log: Vec<TransactionRecord>,
    previous_ranks: HashMap<String, i64>,
}

/// Stand-in for the balance/stock service, backed by memory.
///
/// Products answer to codes 1001, 1002, ... and users to 2001, 2002, ...
/// Every successful streck appends to the log and publishes `data-changed`.
pub struct DemoBackend {
    bus: EventBus,
    store: Mutex<DemoStore>,
}

fn name_for(names: &[&str], index: usize) -> String {
    let base = names[index % names.len()];
    match index / names.len() {
        0 => base.to_string(),
        round => format!("{} {}", base, round + 1),
    }
}

fn build_store(config: &DemoConfig, now: DateTime<Utc>) -> DemoStore {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut codes = HashMap::new();

    let users: Vec<UserSnapshot> = (0..config.normalized_users())
        .map(|index| {
            codes.insert((USER_CODE_BASE + index).to_string(), Referable::User(index));
            let earned = f64::from(rng.gen_range(5..=20_u32)) * 10.0;
            UserSnapshot {
                user: UserIdentity {
                    id: format!("user-{}", index + 1),
                    name: name_for(&USER_NAMES, index),
                },
                balance: Balance {
                    total_credits_earned: earned,
                    remaining_credits: earned,
                    ..Default::default()
                },
            }
        })
        .collect();

    let products: Vec<ProductSnapshot> = (0..config.normalized_products())
        .map(|index| {
            codes.insert(
                (PRODUCT_CODE_BASE + index).to_string(),
                Referable::Product(index),
            );
            let id = index as i64 + 1;
            let internal = f64::from(rng.gen_range(5..=15_u32));
            ProductSnapshot {
                product: Product {
                    id,
                    name: name_for(&PRODUCT_NAMES, index),
                    total_stock: rng.gen_range(10..=40),
                },
                price: ProductPrice {
                    id,
                    product_id: id,
                    purchase_price: internal * 0.8,
                    internal_price: internal,
                    external_price: internal * 1.5,
                    start_date: now - Duration::days(30),
                    end_date: now + Duration::days(335),
                },
            }
        })
        .collect();

    let window = 12 * 60 * 60;
    let mut events: Vec<(DateTime<Utc>, usize)> = (0..config.history)
        .map(|_| {
            let ago = rng.gen_range(0..window);
            (now - Duration::seconds(ago), rng.gen_range(0..users.len()))
        })
        .collect();
    events.sort_by_key(|(timestamp, _)| *timestamp);

    let mut counts = vec![0_i64; users.len()];
    let log = events
        .into_iter()
        .map(|(timestamp, user)| {
            counts[user] += 1;
            TransactionRecord::new(
                users[user].user.id.clone(),
                users[user].user.name.clone(),
                timestamp,
                counts[user],
            )
        })
        .collect();

    let mut store = DemoStore {
        users,
        products,
        codes,
        log,
        previous_ranks: HashMap::new(),
    };
    store.previous_ranks = store.ranks();
    store
}

impl DemoStore {
    fn counts(&self) -> Vec<(String, String, i64)> {
        let mut totals: HashMap<&str, i64> = HashMap::new();
        for record in &self.log {
            *totals.entry(record.user_id.as_str()).or_default() += 1;
        }
        let mut rows: Vec<(String, String, i64)> = self
            .users
            .iter()
            .filter_map(|u| {
                totals
                    .get(u.user.id.as_str())
                    .map(|&count| (u.user.id.clone(), u.user.name.clone(), count))
            })
            .collect();
        rows.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));
        rows
    }

    fn ranks(&self) -> HashMap<String, i64> {
        self.counts()
            .into_iter()
            .enumerate()
            .map(|(position, (id, _, _))| (id, position as i64 + 1))
            .collect()
    }

    fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.counts()
            .into_iter()
            .enumerate()
            .map(|(position, (user_id, user_name, score))| {
                let rank = position as i64 + 1;
                let rank_change = match self.previous_ranks.get(&user_id) {
                    None => RankChange::New,
                    Some(&before) if before > rank => RankChange::Up,
                    Some(&before) if before < rank => RankChange::Down,
                    Some(_) => RankChange::Same,
                };
                LeaderboardEntry {
                    user_id,
                    user_name,
                    rank,
                    rank_change,
                    score,
                }
            })
            .collect()
    }

    fn streck(&mut self, product_id: i64, user_id: &str, quantity: u32) -> CheckoutResponse {
        let Some(user_index) = self.users.iter().position(|u| u.user.id == user_id) else {
            return CheckoutResponse::rejected(format!("unknown user {}", user_id));
        };
        let Some(product_index) = self.products.iter().position(|p| p.product.id == product_id)
        else {
            return CheckoutResponse::rejected(format!("unknown product {}", product_id));
        };
        let quantity = i64::from(quantity);
        if self.products[product_index].product.total_stock < quantity {
            return CheckoutResponse::rejected(format!(
                "{} is out of stock",
                self.products[product_index].product.name
            ));
        }

        let cost = self.products[product_index].price.internal_price * quantity as f64;
        let product = &mut self.products[product_index].product;
        product.total_stock -= quantity;
        let product = product.clone();

        let balance = &mut self.users[user_index].balance;
        if balance.remaining_credits >= cost {
            balance.remaining_credits -= cost;
        } else {
            let shortfall = cost - balance.remaining_credits;
            balance.remaining_credits = 0.0;
            balance.debt_incurred += shortfall;
            balance.total_debt_incurred += shortfall;
        }
        let balance = *balance;
        let user = self.users[user_index].user.clone();

        self.previous_ranks = self.ranks();
        let count = self
            .log
            .iter()
            .filter(|record| record.user_id == user.id)
            .count() as i64;
        self.log.push(TransactionRecord::new(
            user.id.clone(),
            user.name.clone(),
            Utc::now(),
            count + 1,
        ));

        CheckoutResponse::accepted(user, product, balance)
    }
}

impl DemoBackend {
    pub fn new(config: &DemoConfig, bus: EventBus) -> Self {
        let store = build_store(config, Utc::now());
        info!(
            "demo backend with {} users, {} products, {} past transactions",
            store.users.len(),
            store.products.len(),
            store.log.len()
        );
        Self {
            bus,
            store: Mutex::new(store),
        }
    }

    /// Scan codes in directory order: products first, then users.
    pub fn codes(&self) -> Vec<(String, String)> {
        let store = self.lock();
        let mut codes: Vec<(String, String)> = store
            .codes
            .iter()
            .map(|(code, referable)| {
                let label = match *referable {
                    Referable::User(index) => store.users[index].user.name.clone(),
                    Referable::Product(index) => store.products[index].product.name.clone(),
                };
                (code.clone(), label)
            })
            .collect();
        codes.sort();
        codes
    }

    fn lock(&self) -> MutexGuard<'_, DemoStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StreckService for DemoBackend {
    async fn resolve_scan(&self, code: &ScannedCode) -> ServiceResult<Option<ScanResult>> {
        let store = self.lock();
        Ok(store.codes.get(code.as_str()).map(|referable| match *referable {
            Referable::User(index) => ScanResult::User(store.users[index].clone()),
            Referable::Product(index) => ScanResult::Product(store.products[index].clone()),
        }))
    }

    async fn checkout(
        &self,
        product_id: i64,
        user_id: &str,
        quantity: u32,
    ) -> ServiceResult<CheckoutResponse> {
        let response = self.lock().streck(product_id, user_id, quantity);
        if response.error.is_none() {
            self.bus.publish_data_changed();
        }
        Ok(response)
    }

    async fn fetch_latest_transactions(&self) -> ServiceResult<Vec<TransactionRecord>> {
        Ok(self.lock().log.clone())
    }

    async fn fetch_leaderboard(&self) -> ServiceResult<Vec<LeaderboardEntry>> {
        Ok(self.lock().leaderboard())
    }
}
