pub mod scan;
pub mod transaction;

pub use scan::{
    Balance, CheckoutResponse, Product, ProductPrice, ProductSnapshot, ScanResult, ScannedCode,
    UserIdentity, UserSnapshot,
};
pub use transaction::{LeaderboardEntry, Presence, RankChange, TransactionRecord};
