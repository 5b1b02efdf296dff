pub mod controller;
pub mod countdown;

pub use controller::{
    CheckoutOutcome, ScanOutcome, ScanSessionController, Session, SessionView, CHECKOUT_QUANTITY,
};
pub use countdown::{ExpiryCallback, SessionCountdown};
