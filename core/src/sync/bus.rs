use crate::model::Presence;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

const TOPIC_CAPACITY: usize = 16;

/// In-process pub/sub for the two push topics the kiosk listens to.
///
/// `data-changed` carries no payload and triggers a full refetch;
/// `presence-changed` carries the companion bot identity, or `None` when it
/// is offline. The last presence is retained so a late subscriber can ask
/// for it instead of waiting for the next push. Dropping a receiver
/// unsubscribes it.
#[derive(Clone)]
pub struct EventBus {
    data_changed: broadcast::Sender<()>,
    presence_changed: broadcast::Sender<Option<Presence>>,
    last_presence: Arc<Mutex<Option<Presence>>>,
}

impl EventBus {
    pub fn new() -> Self {
        let (data_changed, _) = broadcast::channel(TOPIC_CAPACITY);
        let (presence_changed, _) = broadcast::channel(TOPIC_CAPACITY);
        Self {
            data_changed,
            presence_changed,
            last_presence: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns how many subscribers received the notification.
    pub fn publish_data_changed(&self) -> usize {
        self.data_changed.send(()).unwrap_or(0)
    }

    pub fn publish_presence(&self, presence: Option<Presence>) -> usize {
        let mut last = self
            .last_presence
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *last = presence.clone();
        self.presence_changed.send(presence).unwrap_or(0)
    }

    /// Answers a presence check with the last published value.
    pub fn current_presence(&self) -> Option<Presence> {
        self.last_presence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribe_data_changed(&self) -> broadcast::Receiver<()> {
        self.data_changed.subscribe()
    }

    pub fn subscribe_presence(&self) -> broadcast::Receiver<Option<Presence>> {
        self.presence_changed.subscribe()
    }

    pub fn data_changed_subscribers(&self) -> usize {
        self.data_changed.receiver_count()
    }

    pub fn presence_subscribers(&self) -> usize {
        self.presence_changed.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        assert_eq!(bus.publish_data_changed(), 0);
        assert_eq!(bus.publish_presence(None), 0);
    }

    #[tokio::test]
    async fn receivers_count_as_subscriptions_until_dropped() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_data_changed();
        assert_eq!(bus.data_changed_subscribers(), 1);
        assert_eq!(bus.publish_data_changed(), 1);
        rx.recv().await.unwrap();
        drop(rx);
        assert_eq!(bus.data_changed_subscribers(), 0);
    }

    #[test]
    fn presence_check_returns_the_last_push() {
        let bus = EventBus::new();
        assert_eq!(bus.current_presence(), None);
        bus.publish_presence(Some(Presence {
            icon_url: "https://cdn.example/bot.png".into(),
            name: "JämK botten".into(),
        }));
        assert_eq!(bus.clone().current_presence().map(|p| p.name), Some("JämK botten".into()));
        bus.publish_presence(None);
        assert_eq!(bus.current_presence(), None);
    }
}
