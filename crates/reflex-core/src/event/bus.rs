use crate::error::Error;
use crate::tree::Lifecycle;
use crate::{ScopeId, ScopeTree};
use indexmap::IndexSet;
use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Ordered subscriber sets, one per payload type
///
/// Owned by the application and used from one thread.
#[derive(Clone, Default)]
pub struct EventBus {
    channels: HashMap<TypeId, Channel>,
}

#[derive(Clone)]
struct Channel {
    payload: &'static str,
    subscribers: IndexSet<ScopeId>,
}

impl EventBus {
    /// Create a bus with no subscriptions
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `id` to payloads of type `T`
    ///
    /// Returns false if it was already subscribed.
    pub fn subscribe<T: 'static>(&mut self, id: ScopeId) -> bool {
        self.channels
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Channel {
                payload: type_name::<T>(),
                subscribers: IndexSet::new(),
            })
            .subscribers
            .insert(id)
    }

    /// Unsubscribe `id` from `T`; unknown subscribers are ignored
    pub fn unsubscribe<T: 'static>(&mut self, id: ScopeId) -> bool {
        self.channels
            .get_mut(&TypeId::of::<T>())
            .is_some_and(|channel| channel.subscribers.shift_remove(&id))
    }

    /// Unsubscribe `id` from every payload type
    ///
    /// Returns the number of subscriptions removed.
    pub fn forget(&mut self, id: ScopeId) -> usize {
        self.channels
            .values_mut()
            .map(|channel| channel.subscribers.shift_remove(&id))
            .filter(|removed| *removed)
            .count()
    }

    /// Bring subscriptions in line with scopes added to or removed from `tree`
    ///
    /// Added scopes attach their objects, removed ones are forgotten, in the
    /// order the changes happened. An added scope whose object is checked
    /// out stays pending until a later sync.
    pub fn sync(&mut self, tree: &mut ScopeTree) {
        let mut pending = Vec::new();
        for change in tree.drain_lifecycle() {
            match change {
                Lifecycle::Attached(id) => match tree.object(id) {
                    Ok(object) => object.attach(id, self),
                    Err(Error::ScopeNotFound(_)) => trace!(%id, "scope gone before attach"),
                    Err(_) => pending.push(change),
                },
                Lifecycle::Detached(id) => {
                    self.forget(id);
                }
            }
        }
        tree.requeue_lifecycle(pending);
    }

    /// Get the subscribers of `T` in subscription order
    pub fn subscribers<T: 'static>(&self) -> Vec<ScopeId> {
        self.channels
            .get(&TypeId::of::<T>())
            .map(|channel| channel.subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check if `id` is subscribed to `T`
    pub fn is_subscribed<T: 'static>(&self, id: ScopeId) -> bool {
        self.channels
            .get(&TypeId::of::<T>())
            .is_some_and(|channel| channel.subscribers.contains(&id))
    }

    /// Remove every subscription
    pub fn clear(&mut self) {
        self.channels.clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.channels
                    .values()
                    .map(|channel| (channel.payload, &channel.subscribers)),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::testing::{Ping, Recorder};

    struct Damage;
    struct Heal;

    #[test]
    fn test_subscribe_is_ordered_and_idempotent() {
        let mut bus = EventBus::new();
        assert!(bus.subscribe::<Damage>(ScopeId(2)));
        assert!(bus.subscribe::<Damage>(ScopeId(1)));
        assert!(!bus.subscribe::<Damage>(ScopeId(2)));

        assert_eq!(bus.subscribers::<Damage>(), vec![ScopeId(2), ScopeId(1)]);
        assert!(bus.subscribers::<Heal>().is_empty());
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let mut bus = EventBus::new();
        assert!(!bus.unsubscribe::<Damage>(ScopeId(7)));
        bus.subscribe::<Damage>(ScopeId(7));
        assert!(bus.unsubscribe::<Damage>(ScopeId(7)));
        assert!(!bus.unsubscribe::<Damage>(ScopeId(7)));
        assert!(!bus.is_subscribed::<Damage>(ScopeId(7)));
    }

    #[test]
    fn test_forget_removes_every_channel() {
        let mut bus = EventBus::new();
        bus.subscribe::<Damage>(ScopeId(3));
        bus.subscribe::<Heal>(ScopeId(3));
        bus.subscribe::<Heal>(ScopeId(4));

        assert_eq!(bus.forget(ScopeId(3)), 2);
        assert_eq!(bus.subscribers::<Heal>(), vec![ScopeId(4)]);
        assert_eq!(bus.forget(ScopeId(3)), 0);
    }

    #[test]
    fn test_sync_follows_tree_changes() {
        let mut tree = ScopeTree::new();
        let mut bus = EventBus::new();
        let root = tree.root();
        let id = tree.append_object(root, "Reactions", Box::new(Recorder::default())).unwrap();
        assert!(!bus.is_subscribed::<Ping>(id));

        bus.sync(&mut tree);
        assert_eq!(bus.subscribers::<Ping>(), vec![id]);

        let copy = tree.clone_subtree(id).unwrap();
        let copy_id = tree.insert_tree(root, "Copies", copy).unwrap();
        bus.sync(&mut tree);
        assert_eq!(bus.subscribers::<Ping>(), vec![id, copy_id]);

        tree.destroy(id).unwrap();
        bus.sync(&mut tree);
        assert_eq!(bus.subscribers::<Ping>(), vec![copy_id]);
    }

    #[test]
    fn test_sync_waits_for_checked_out_objects() {
        let mut tree = ScopeTree::new();
        let mut bus = EventBus::new();
        let root = tree.root();
        let id = tree.append_object(root, "Reactions", Box::new(Recorder::default())).unwrap();

        let object = tree.check_out(id).unwrap();
        bus.sync(&mut tree);
        assert!(!bus.is_subscribed::<Ping>(id));

        tree.check_in(id, object);
        bus.sync(&mut tree);
        assert!(bus.is_subscribed::<Ping>(id));
    }

    #[test]
    fn test_sync_skips_scopes_destroyed_before_sync() {
        let mut tree = ScopeTree::new();
        let mut bus = EventBus::new();
        let root = tree.root();
        let id = tree.append_object(root, "Reactions", Box::new(Recorder::default())).unwrap();
        tree.destroy(id).unwrap();

        bus.sync(&mut tree);
        assert!(bus.subscribers::<Ping>().is_empty());
        assert!(tree.drain_lifecycle().is_empty());
    }
}
