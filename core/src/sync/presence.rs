use crate::model::Presence;
use crate::sync::bus::EventBus;
use log::info;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Tracks whether the companion bot is online.
pub struct PresenceTracker {
    current: watch::Receiver<Option<Presence>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceTracker {
    pub fn mount(bus: &EventBus) -> Self {
        // Subscribe before the check so a push in between is not lost.
        let mut updates = bus.subscribe_presence();
        let (tx, current) = watch::channel(bus.current_presence());
        let task = tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(presence) => {
                        match &presence {
                            Some(bot) => info!("companion {} online", bot.name),
                            None => info!("companion offline"),
                        }
                        tx.send_replace(presence);
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Self {
            current,
            task: Mutex::new(Some(task)),
        }
    }

    /// `None` while the companion is offline or has never reported in.
    pub fn current(&self) -> Option<Presence> {
        self.current.borrow().clone()
    }

    pub async fn unmount(&self) {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for PresenceTracker {
    fn drop(&mut self) {
        let slot = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    #[tokio::test(start_paused = true)]
    async fn follows_presence_updates() {
        let bus = EventBus::new();
        let tracker = PresenceTracker::mount(&bus);
        assert_eq!(tracker.current(), None);

        bus.publish_presence(Some(Presence {
            icon_url: "https://cdn.example/bot.png".into(),
            name: "JämK botten".into(),
        }));
        sleep(Duration::from_millis(5)).await;
        assert_eq!(tracker.current().map(|p| p.name), Some("JämK botten".into()));

        bus.publish_presence(None);
        sleep(Duration::from_millis(5)).await;
        assert_eq!(tracker.current(), None);

        tracker.unmount().await;
        assert_eq!(bus.presence_subscribers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mount_starts_from_the_last_known_presence() {
        let bus = EventBus::new();
        bus.publish_presence(Some(Presence {
            icon_url: "https://cdn.example/bot.png".into(),
            name: "JämK botten".into(),
        }));

        let tracker = PresenceTracker::mount(&bus);
        assert_eq!(tracker.current().map(|p| p.name), Some("JämK botten".into()));
        tracker.unmount().await;
    }
}
