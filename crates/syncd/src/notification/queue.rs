//! Bounded notification queue and consumer wakeup signal.
//!
//! One lock guards push/pop/size; hold time is a struct move. The
//! signal is deliberately separate from the queue: producers enqueue,
//! then signal, and the consumer drains fully after each wakeup, so
//! coalesced signals cannot strand queued events.

use std::collections::VecDeque;
use std::time::Duration;

use log::error;
use parking_lot::{Condvar, Mutex};

/// Log every Nth drop, not every drop; a full queue floods fast.
const DROP_LOG_INTERVAL: u64 = 128;

struct QueueInner<T> {
    items: VecDeque<T>,
    dropped: u64,
}

/// Bounded multi-producer single-consumer queue.
///
/// `enqueue` never blocks: at capacity the event is dropped and
/// reported, because stalling the driver's callback thread is worse
/// than losing a transient notification.
pub struct NotificationQueue<T> {
    inner: Mutex<QueueInner<T>>,
    capacity: usize,
}

impl<T> NotificationQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity),
                dropped: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns false and drops the item if the queue is full.
    pub fn enqueue(&self, item: T) -> bool {
        let mut inner = self.inner.lock();
        if inner.items.len() >= self.capacity {
            inner.dropped += 1;
            if inner.dropped % DROP_LOG_INTERVAL == 1 {
                error!(
                    "notification queue full (capacity {}), {} dropped so far",
                    self.capacity, inner.dropped
                );
            }
            return false;
        }
        inner.items.push_back(item);
        true
    }

    pub fn dequeue(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    /// Exact pending count.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total events dropped since construction.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }
}

/// Cross-thread wakeup, distinct from the queue itself.
#[derive(Default)]
pub struct NotificationSignal {
    raised: Mutex<bool>,
    condvar: Condvar,
}

impl NotificationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let mut raised = self.raised.lock();
        *raised = true;
        self.condvar.notify_one();
    }

    /// Blocks until notified. Consumes the signal.
    pub fn wait(&self) {
        let mut raised = self.raised.lock();
        while !*raised {
            self.condvar.wait(&mut raised);
        }
        *raised = false;
    }

    /// Blocks until notified or `timeout` elapses; true if notified.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let mut raised = self.raised.lock();
        if !*raised {
            self.condvar.wait_for(&mut raised, timeout);
        }
        std::mem::replace(&mut *raised, false)
    }
}
