//! services/timer/src/adapters/notifier.rs
//!
//! Logs every notice and fans it out to any connected listener.

use tokio::sync::broadcast;
use tracing::{error, info};
use worktimer_core::ports::Notifier;
use worktimer_core::{Notice, NoticeLevel};

const NOTICE_BUFFER: usize = 64;

pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notice>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(NOTICE_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("Notice: {}", notice.message),
            NoticeLevel::Error => error!("Notice: {}", notice.message),
        }
        // Nobody listening is fine; the log line above is enough.
        let _ = self.tx.send(notice);
    }
}
