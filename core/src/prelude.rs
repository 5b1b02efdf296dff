use crate::model::{
    CheckoutResponse, LeaderboardEntry, ScanResult, ScannedCode, TransactionRecord,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What to do when a user is scanned while another user's session is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondUserPolicy {
    /// Last scan wins: the new user replaces the open session.
    #[default]
    Replace,
    /// The scan is refused until the open session is dismissed or expires.
    Reject,
}

/// Shared runtime settings for the kiosk core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskSettings {
    pub countdown_seconds: u32,
    pub toast_ttl_secs: u64,
    pub second_user_policy: SecondUserPolicy,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            countdown_seconds: 8,
            toast_ttl_secs: 5,
            second_user_policy: SecondUserPolicy::Replace,
        }
    }
}

/// Failure talking to the external service.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Common error type for kiosk operations. None of these are fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum KioskError {
    #[error("scan of '{code}' failed: {reason}")]
    ScanResolutionFailed { code: String, reason: String },
    #[error("{current} is still scanned in")]
    SessionOccupied { current: String },
    #[error("checkout rejected: {0}")]
    CheckoutRejected(String),
    #[error("checkout failed: {0}")]
    CheckoutTransportFailure(ServiceError),
    #[error("refetch failed: {0}")]
    RefetchFailure(ServiceError),
}

pub type KioskResult<T> = Result<T, KioskError>;

/// Operations provided by the external balance/stock service.
#[async_trait]
pub trait StreckService: Send + Sync {
    /// Returns `Ok(None)` when the code is unknown.
    async fn resolve_scan(&self, code: &ScannedCode) -> ServiceResult<Option<ScanResult>>;
    async fn checkout(
        &self,
        product_id: i64,
        user_id: &str,
        quantity: u32,
    ) -> ServiceResult<CheckoutResponse>;
    async fn fetch_latest_transactions(&self) -> ServiceResult<Vec<TransactionRecord>>;
    async fn fetch_leaderboard(&self) -> ServiceResult<Vec<LeaderboardEntry>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Human-readable outcome message for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Receives outcome notices. Implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}
