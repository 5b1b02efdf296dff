use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Digit string emitted by the scan decoder. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScannedCode(String);

impl ScannedCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ScannedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
}

/// Balance figures as computed by the external service, in kronor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub total_credits_earned: f64,
    pub total_payments_made: f64,
    pub total_debt_incurred: f64,
    pub remaining_credits: f64,
    pub debt_incurred: f64,
}

/// A scanned-in user. Always replaced wholesale, never patched field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub user: UserIdentity,
    pub balance: Balance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub total_stock: i64,
}

/// Price record active for a product at scan time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPrice {
    pub id: i64,
    pub product_id: i64,
    pub purchase_price: f64,
    pub internal_price: f64,
    pub external_price: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product: Product,
    pub price: ProductPrice,
}

/// Outcome of resolving a scanned code against the external directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScanResult {
    User(UserSnapshot),
    Product(ProductSnapshot),
}

/// Reply to a checkout call. `error` may be set even when the call itself succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutResponse {
    #[serde(default)]
    pub user: Option<UserIdentity>,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub balance: Option<Balance>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CheckoutResponse {
    pub fn accepted(user: UserIdentity, product: Product, balance: Balance) -> Self {
        Self {
            user: Some(user),
            product: Some(product),
            balance: Some(balance),
            error: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }
}
