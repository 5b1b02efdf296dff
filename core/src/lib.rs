//! Scan-session and checkout core for the Strecka self-service kiosk.
//!
//! Scanned codes open a user session or buy a product against the external
//! balance/stock service; the transaction log is turned into live chart
//! series. Rendering and the service itself live outside this crate.

pub mod app;
pub mod chart;
pub mod input;
pub mod model;
pub mod notify;
pub mod prelude;
pub mod session;
pub mod sync;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::KioskApp;
pub use prelude::{KioskError, KioskResult, KioskSettings, StreckService};
