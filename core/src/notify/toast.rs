use crate::prelude::{Notice, NoticeKind, NotificationSink};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// A notice as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

struct Entry {
    toast: Toast,
    expires_at: Instant,
}

#[derive(Default)]
struct Board {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Transient notification list. Every toast expires a fixed time after it
/// was posted; expired toasts are pruned whenever the board is read or
/// written, so an unwatched board stays bounded.
pub struct ToastBoard {
    ttl: Duration,
    board: Mutex<Board>,
}

impl ToastBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            board: Mutex::new(Board::default()),
        }
    }

    pub fn post(&self, notice: Notice) -> u64 {
        let now = Instant::now();
        let mut board = self.lock();
        board.prune(now);
        board.next_id += 1;
        let id = board.next_id;
        board.entries.push(Entry {
            toast: Toast {
                id,
                kind: notice.kind,
                message: notice.message,
            },
            expires_at: now + self.ttl,
        });
        id
    }

    /// Removes a toast before it expires. Returns whether it was present.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut board = self.lock();
        let before = board.entries.len();
        board.entries.retain(|entry| entry.toast.id != id);
        board.entries.len() != before
    }

    /// Live toasts, oldest first.
    pub fn active(&self) -> Vec<Toast> {
        let mut board = self.lock();
        board.prune(Instant::now());
        board
            .entries
            .iter()
            .map(|entry| entry.toast.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Board> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Board {
    fn prune(&mut self, now: Instant) {
        self.entries.retain(|entry| entry.expires_at > now);
    }
}

impl NotificationSink for ToastBoard {
    fn notify(&self, notice: Notice) {
        self.post(notice);
    }
}
