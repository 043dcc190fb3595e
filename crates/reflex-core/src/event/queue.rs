use super::{Event, EventBus, EventPublisher};
use crate::error::Result;
use crate::time::GameTime;
use crate::ScopeTree;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::{trace, warn};

/// Events waiting for their deadline
///
/// Producers on any thread may enqueue; one consumer drains with
/// [`update`](Self::update). The queue owns each publisher until it is
/// delivered or cleared.
#[derive(Default)]
pub struct EventQueue {
    pending: Mutex<Vec<Box<dyn EventPublisher>>>,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp `publisher` with `now` and `delay` and queue it
    pub fn enqueue(&self, mut publisher: Box<dyn EventPublisher>, now: &GameTime, delay: Duration) {
        publisher.stamp(now, delay);
        trace!(deadline = ?publisher.timing().deadline(), "event enqueued");
        self.pending.lock().push(publisher);
    }

    /// Wrap `message` in an [`Event`] and queue it
    pub fn enqueue_event<T: Send + 'static>(&self, message: T, now: &GameTime, delay: Duration) {
        self.enqueue(Box::new(Event::new(message)), now, delay);
    }

    /// Deliver `publisher` right away without queueing it
    pub fn send(&self, publisher: &dyn EventPublisher, bus: &EventBus, tree: &mut ScopeTree) -> Result<usize> {
        publisher.notify_all(bus, tree)
    }

    /// Remove every event whose deadline is at or before `now`
    ///
    /// Expired events come out in insertion order. The caller delivers them,
    /// so subscribers may enqueue more events while it does.
    pub fn take_expired(&self, now: &GameTime) -> Vec<Box<dyn EventPublisher>> {
        let mut pending = self.pending.lock();
        let (expired, waiting) = std::mem::take(&mut *pending)
            .into_iter()
            .partition(|publisher| publisher.is_expired(now));
        *pending = waiting;
        expired
    }

    /// Deliver every event whose deadline is at or before `now`
    ///
    /// Returns the number of events delivered; the first delivery failure is
    /// returned after every expired event has been tried.
    pub fn update(&self, now: &GameTime, bus: &EventBus, tree: &mut ScopeTree) -> Result<usize> {
        let expired = self.take_expired(now);
        let delivered = expired.len();
        let mut first_error = None;
        for publisher in expired {
            if let Err(error) = publisher.notify_all(bus, tree) {
                warn!(%error, "queued event delivery failed");
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(delivered),
        }
    }

    /// Drop every pending event without delivering it
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.lock();
        let dropped = pending.len();
        pending.clear();
        dropped
    }

    /// Get the number of pending events
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Check if no events are pending
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.len())
            .finish()
    }
}
