pub mod bus;
pub mod live;
pub mod presence;

pub use bus::EventBus;
pub use live::{LiveDataSync, LiveSnapshot};
pub use presence::PresenceTracker;
