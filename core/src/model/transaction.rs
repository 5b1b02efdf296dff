use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the external transaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub user_id: String,
    pub user_name: String,
    #[serde(rename = "transaction_date")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "cumulative_transaction_count")]
    pub cumulative_count: i64,
}

impl TransactionRecord {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        cumulative_count: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            timestamp,
            cumulative_count,
        }
    }
}

/// Leaderboard movement since the previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankChange {
    #[serde(rename = "↑")]
    Up,
    #[serde(rename = "↓")]
    Down,
    #[serde(rename = "=")]
    Same,
    #[serde(rename = "New")]
    New,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub user_name: String,
    #[serde(rename = "current_rank")]
    pub rank: i64,
    #[serde(rename = "rank_change_indicator")]
    pub rank_change: RankChange,
    #[serde(rename = "total_transaction_count")]
    pub score: i64,
}

/// Identity of the connected companion bot, as pushed on the presence topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub icon_url: String,
    pub name: String,
}
