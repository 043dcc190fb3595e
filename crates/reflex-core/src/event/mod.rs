//! Publish/subscribe messaging
//!
//! - `Event<T>` - a payload plus its delivery timing
//! - `EventBus` - subscribers per payload type
//! - `EventQueue` - thread-safe store of events waiting for their deadline
//! - `Reaction` - an action that is notified of events
//!
//! Subscribers are scope ids. Delivery resolves each id in the target tree,
//! checks the reaction out, notifies it and checks it back in.

mod bus;
mod queue;
mod reaction;

pub use bus::EventBus;
pub use queue::EventQueue;
pub use reaction::{EventMessageAttributed, Reaction, ReactionAttributed, ReactionContext};

use crate::error::Result;
use crate::time::GameTime;
use crate::ScopeTree;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::time::Duration;
use tracing::{trace, warn};

/// When an event was enqueued and how long it waits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// Game time at enqueue
    pub enqueued_at: Duration,
    /// Wait before delivery
    pub delay: Duration,
}

impl Timing {
    /// Timing for an event enqueued at `enqueued_at` waiting `delay`
    pub fn new(enqueued_at: Duration, delay: Duration) -> Self {
        Self { enqueued_at, delay }
    }

    /// Earliest time the event may be delivered
    pub fn deadline(&self) -> Duration {
        self.enqueued_at.saturating_add(self.delay)
    }

    /// Check if the deadline has been reached at `now`
    pub fn is_expired(&self, now: Duration) -> bool {
        self.deadline() <= now
    }
}

/// Something that can be queued and delivered to subscribers
pub trait EventPublisher: Any + Send {
    /// Get the delivery timing
    fn timing(&self) -> Timing;

    /// Record the enqueue time and delay
    fn stamp(&mut self, now: &GameTime, delay: Duration);

    /// Check if the event is due at `now`
    fn is_expired(&self, now: &GameTime) -> bool {
        self.timing().is_expired(now.total)
    }

    /// Deliver to every subscriber on `bus` that lives in `tree`
    ///
    /// Returns how many reactions were notified. Every subscriber is tried
    /// even after a failure; the first failure is returned.
    fn notify_all(&self, bus: &EventBus, tree: &mut ScopeTree) -> Result<usize>;

    /// Upcast for payload downcasts
    fn as_any(&self) -> &dyn Any;
}

impl dyn EventPublisher {
    /// Borrow as a concrete publisher type
    pub fn downcast_ref<P: EventPublisher>(&self) -> Option<&P> {
        self.as_any().downcast_ref::<P>()
    }

    /// Borrow the payload if this is an `Event<T>`
    pub fn message<T: Send + 'static>(&self) -> Option<&T> {
        self.downcast_ref::<Event<T>>().map(Event::message)
    }
}

/// A payload of type `T` delivered to subscribers of `T`
#[derive(Clone, Default)]
pub struct Event<T> {
    message: T,
    timing: Timing,
}

impl<T: Send + 'static> Event<T> {
    /// Wrap `message` with zero timing; queueing stamps the real timing
    pub fn new(message: T) -> Self {
        Self {
            message,
            timing: Timing::default(),
        }
    }

    /// Borrow the payload
    pub fn message(&self) -> &T {
        &self.message
    }

    /// Borrow the payload mutably
    pub fn message_mut(&mut self) -> &mut T {
        &mut self.message
    }

    /// Unwrap the payload
    pub fn into_message(self) -> T {
        self.message
    }
}

impl<T: Send + 'static> EventPublisher for Event<T> {
    fn timing(&self) -> Timing {
        self.timing
    }

    fn stamp(&mut self, now: &GameTime, delay: Duration) {
        self.timing = Timing::new(now.total, delay);
    }

    fn notify_all(&self, bus: &EventBus, tree: &mut ScopeTree) -> Result<usize> {
        let mut notified = 0;
        let mut first_error = None;
        for id in bus.subscribers::<T>() {
            if !tree.contains(id) {
                trace!(%id, "subscriber not in this tree");
                continue;
            }
            match reaction::deliver(tree, bus, id, self) {
                Ok(true) => notified += 1,
                Ok(false) => {}
                Err(error) => {
                    warn!(%id, %error, "event delivery failed");
                    first_error.get_or_insert(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(notified),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: fmt::Debug> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("message", &self.message)
            .field("timing", &self.timing)
            .finish()
    }
}
