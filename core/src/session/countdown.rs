use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

const TICK: Duration = Duration::from_secs(1);

/// Called once when a countdown reaches zero.
pub type ExpiryCallback = Arc<dyn Fn() + Send + Sync>;

/// Restartable one-second countdown with a single expiry callback.
///
/// At most one ticking task exists at a time. Every `start` and `cancel`
/// bumps an epoch; a task only touches the remaining value or fires the
/// callback while its epoch is current, so a superseded timer can never
/// fire even if it was mid-tick when it was replaced.
///
/// The callback runs with the timer slot locked and must not call back into
/// the same countdown.
pub struct SessionCountdown {
    inner: Arc<CountdownInner>,
}

struct CountdownInner {
    slot: Mutex<TimerSlot>,
    remaining: watch::Sender<u32>,
    on_expire: ExpiryCallback,
}

#[derive(Default)]
struct TimerSlot {
    epoch: u64,
    task: Option<JoinHandle<()>>,
}

impl SessionCountdown {
    pub fn new(on_expire: ExpiryCallback) -> Self {
        let (remaining, _) = watch::channel(0);
        Self {
            inner: Arc::new(CountdownInner {
                slot: Mutex::new(TimerSlot::default()),
                remaining,
                on_expire,
            }),
        }
    }

    /// Cancels any running countdown and starts a fresh one. Must be called
    /// from within a tokio runtime.
    pub fn start(&self, seconds: u32) {
        let mut slot = self.inner.lock_slot();
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        slot.epoch = slot.epoch.wrapping_add(1);
        let epoch = slot.epoch;
        self.inner.remaining.send_replace(seconds);

        let inner = Arc::clone(&self.inner);
        slot.task = Some(tokio::spawn(inner.run(epoch, seconds)));
    }

    /// Stops the countdown. Safe to call when nothing is running.
    pub fn cancel(&self) {
        let mut slot = self.inner.lock_slot();
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        slot.epoch = slot.epoch.wrapping_add(1);
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_slot().task.is_some()
    }

    /// Seconds left on the current (or last) countdown.
    pub fn remaining(&self) -> u32 {
        *self.inner.remaining.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.inner.remaining.subscribe()
    }
}

impl Drop for SessionCountdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl CountdownInner {
    fn lock_slot(&self) -> MutexGuard<'_, TimerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(self: Arc<Self>, epoch: u64, seconds: u32) {
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        let mut left = seconds;
        while self.advance(epoch, left) {
            ticker.tick().await;
            left = left.saturating_sub(1);
        }
    }

    /// Publishes `left` for the current epoch and fires on zero. Returns
    /// whether the task should keep ticking.
    fn advance(&self, epoch: u64, left: u32) -> bool {
        let mut slot = self.lock_slot();
        if slot.epoch != epoch {
            return false;
        }
        self.remaining.send_replace(left);
        if left > 0 {
            return true;
        }
        slot.task = None;
        (self.on_expire)();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counting(fired: &Arc<AtomicUsize>) -> ExpiryCallback {
        let fired = Arc::clone(fired);
        Arc::new(move || {
            fired.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn expires_exactly_once_at_deadline() {
        let fired = Arc::new(AtomicUsize::new(0));
        let countdown = SessionCountdown::new(counting(&fired));
        countdown.start(8);
        assert_eq!(countdown.remaining(), 8);

        sleep(Duration::from_millis(7_500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(countdown.remaining(), 1);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(countdown.remaining(), 0);
        assert!(!countdown.is_running());

        sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_supersedes_previous_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let countdown = SessionCountdown::new(counting(&fired));
        countdown.start(8);
        sleep(Duration::from_secs(5)).await;
        countdown.start(8);

        sleep(Duration::from_millis(7_500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_prevents_expiry() {
        let fired = Arc::new(AtomicUsize::new(0));
        let countdown = SessionCountdown::new(counting(&fired));
        countdown.cancel();
        countdown.start(3);
        sleep(Duration::from_millis(1_500)).await;
        countdown.cancel();
        countdown.cancel();
        assert!(!countdown.is_running());

        sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(countdown.remaining(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_seconds_fires_without_ticking() {
        let fired = Arc::new(AtomicUsize::new(0));
        let countdown = SessionCountdown::new(counting(&fired));
        countdown.start(0);
        sleep(Duration::from_millis(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_countdown_stops_the_timer() {
        let fired = Arc::new(AtomicUsize::new(0));
        let countdown = SessionCountdown::new(counting(&fired));
        countdown.start(2);
        drop(countdown);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
