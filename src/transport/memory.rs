//! In-process transport that records every reply.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{BotError, BotResult};

use super::message::Reply;
use super::traits::ChatTransport;

/// Transport that keeps sent replies in memory.
///
/// Used by embedders that render replies themselves and by tests.
#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<(String, Reply)>>,
    notify: Notify,
    fail_sends: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every reply sent so far, in send order.
    pub fn sent(&self) -> Vec<(String, Reply)> {
        self.sent.lock().clone()
    }

    /// Make subsequent sends fail, simulating a broken connection.
    pub fn set_failing(&self, failing: bool) {
        self.fail_sends.store(failing, Ordering::SeqCst);
    }

    /// Wait until at least `count` replies were sent, or the timeout passes.
    ///
    /// Returns whatever was sent by then.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<(String, Reply)> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if self.sent.lock().len() >= count {
                break;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                break;
            }
        }
        self.sent()
    }
}

#[async_trait]
impl ChatTransport for MemoryTransport {
    async fn send(&self, channel: &str, reply: Reply) -> BotResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BotError::Transport {
                message: "send refused".to_string(),
            });
        }
        self.sent.lock().push((channel.to_string(), reply));
        self.notify.notify_waiters();
        Ok(())
    }
}
