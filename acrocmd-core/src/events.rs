//! Event bus between the checker and its observers
//!
//! Each subscriber owns an unbounded channel. Emitting never blocks, so the
//! crawler and check tasks can publish from any thread while the UI drains
//! its [`Subscription`] on its own schedule.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::check::CheckItemId;

/// Everything the checker tells its observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerEvent {
    /// A crawl began while no other crawl was running
    CrawlingStarted,
    /// The last running crawl finished
    CrawlingDone,
    /// A crawl aborted; already-found files stay queued
    CrawlFailed { root: PathBuf, error: String },
    /// A discovered file was queued
    AddedCheckItem(CheckItemId),
    /// A queued file was removed
    RemovedCheckItem(CheckItemId),
    /// A batch run started
    CheckingStarted { batch_id: String },
    /// One item finished checking (successfully or not)
    CheckResult { item_id: CheckItemId },
    /// The batch run finished or was stopped
    Done { batch_id: String },
}

/// Handle identifying a subscription for `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of one subscription
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: UnboundedReceiver<CheckerEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next pending event without waiting; `None` when drained or closed
    pub fn try_next(&mut self) -> Option<CheckerEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Wait for the next event; `None` once unsubscribed
    pub async fn next(&mut self) -> Option<CheckerEvent> {
        self.receiver.recv().await
    }

    /// Take every event currently queued
    pub fn drain(&mut self) -> Vec<CheckerEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

/// Fan-out of [`CheckerEvent`]s to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, UnboundedSender<CheckerEvent>)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock().push((id, sender));
        Subscription { id, receiver }
    }

    /// Stop delivering to a subscriber; returns false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() != before
    }

    pub fn emit(&self, event: CheckerEvent) {
        tracing::trace!(?event, "emit");
        // Subscribers whose receiver was dropped are pruned here
        self.lock()
            .retain(|(_, sender)| sender.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, UnboundedSender<CheckerEvent>)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
