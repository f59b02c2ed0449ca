//! Counted completion barrier for dispatched rules.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::RuleId;

/// Tracks which dispatched rules have settled and wakes the waiter once
/// every one of them has.
pub struct CompletionBarrier {
    dispatched: usize,
    settled: AtomicUsize,
    pending: Mutex<BTreeSet<RuleId>>,
    notify: Notify,
}

impl CompletionBarrier {
    pub fn new(rules: impl IntoIterator<Item = RuleId>) -> Self {
        let pending: BTreeSet<RuleId> = rules.into_iter().collect();
        CompletionBarrier {
            dispatched: pending.len(),
            settled: AtomicUsize::new(0),
            pending: Mutex::new(pending),
            notify: Notify::new(),
        }
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn settled(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }

    /// Mark `rule` settled. Returns `false` if it was unknown or already settled.
    pub fn settle(&self, rule: &RuleId) -> bool {
        let removed = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(rule);
        if !removed {
            return false;
        }

        let settled = self.settled.fetch_add(1, Ordering::SeqCst) + 1;
        if settled == self.dispatched {
            self.notify.notify_waiters();
        }
        true
    }

    pub fn is_complete(&self) -> bool {
        self.settled() == self.dispatched
    }

    /// Wait until every dispatched rule has settled.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_complete() {
                return;
            }
            notified.await;
        }
    }

    /// Rules that have not settled yet, in identifier order
    pub fn unsettled(&self) -> Vec<RuleId> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}
