//! Engine - frame driver owning the world tree and its messaging
//!
//! Each [`Engine::frame`] advances the clock by the configured step and then
//! runs the two phases in the configured [`FrameOrder`]: delivering due
//! events from the queue, and one pass of the root action list. A failure in
//! either phase is recorded as a fault and the other phase still runs.

use crate::config::{EngineConfig, FrameOrder};
use crate::error::Result;
use reflex_core::{
    action, factory, ActionList, ApplyReport, Event, EventBus, EventQueue, Factory, GameTime,
    Object, ScopeId, ScopeTree, WorldState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the root list's action table
pub const ACTIONS: &str = "Actions";

/// What happened during one frame
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Clock after advancing
    pub time: GameTime,
    /// Number of queued events delivered
    pub delivered: usize,
    /// Structural changes applied by the root list
    pub actions: ApplyReport,
    /// Failures that were logged and skipped
    pub faults: Vec<reflex_core::Error>,
}

/// Owns a world tree, its subscriptions and its event queue
///
/// # Example
///
/// ```
/// use reflex_runtime::Engine;
/// use reflex_core::ActionIncrement;
///
/// let mut engine = Engine::new().unwrap();
/// let counter = engine.create_action("ActionIncrement", "Counter").unwrap();
/// engine.frame();
/// engine.frame();
///
/// let count = engine.tree().downcast_ref::<ActionIncrement>(counter).unwrap().count();
/// assert_eq!(count, 2);
/// assert_eq!(engine.time().frame, 2);
/// ```
pub struct Engine {
    tree: ScopeTree,
    bus: EventBus,
    queue: Arc<EventQueue>,
    factory: Factory,
    config: EngineConfig,
    clock: GameTime,
    world_state: WorldState,
}

impl Engine {
    /// Create an engine with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with an empty root action list
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        let factory = config.factory()?;
        let tree = ScopeTree::with_root(Box::new(ActionList::new("Root")))?;
        Ok(Self {
            tree,
            bus: EventBus::new(),
            queue: Arc::new(EventQueue::new()),
            factory,
            config,
            clock: GameTime::new(),
            world_state: WorldState::new(),
        })
    }

    /// Get the id of the root action list
    pub fn root(&self) -> ScopeId {
        self.tree.root()
    }

    /// Get the world tree
    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    /// Get the world tree mutably
    ///
    /// Scopes added or removed through it are attached to or forgotten by
    /// the bus at the start of the next frame phase.
    pub fn tree_mut(&mut self) -> &mut ScopeTree {
        &mut self.tree
    }

    /// Get the subscriptions of the world's reactions
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Get the constructors this engine may instantiate
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    /// Get the configuration the engine was built with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the current game time
    pub fn time(&self) -> GameTime {
        self.clock
    }

    /// Get a handle producers on other threads can enqueue through
    pub fn queue(&self) -> Arc<EventQueue> {
        Arc::clone(&self.queue)
    }

    /// Create `prototype` under `parent`'s table `table` and attach it
    pub fn spawn(
        &mut self,
        parent: ScopeId,
        table: &str,
        prototype: &str,
        instance_name: &str,
    ) -> Result<ScopeId> {
        let id = factory::instantiate(
            &mut self.tree,
            &self.factory,
            &mut self.bus,
            parent,
            table,
            prototype,
            instance_name,
        )?;
        debug!(%id, prototype, instance_name, "spawned");
        Ok(id)
    }

    /// Insert a caller-built object under `parent`'s table `table` and attach it
    pub fn spawn_object(
        &mut self,
        parent: ScopeId,
        table: &str,
        object: Box<dyn Object>,
    ) -> Result<ScopeId> {
        let id = self.tree.append_object(parent, table, object)?;
        self.bus.sync(&mut self.tree);
        Ok(id)
    }

    /// Create an action in the root list
    pub fn create_action(&mut self, prototype: &str, instance_name: &str) -> Result<ScopeId> {
        let root = self.root();
        self.spawn(root, ACTIONS, prototype, instance_name)
    }

    /// Destroy `id` and its descendants and drop their subscriptions
    pub fn despawn(&mut self, id: ScopeId) -> Result<Vec<ScopeId>> {
        let removed = self.tree.destroy(id)?;
        self.bus.sync(&mut self.tree);
        debug!(%id, removed = removed.len(), "despawned");
        Ok(removed)
    }

    /// Queue `message` for delivery `delay` from now
    pub fn enqueue<T: Send + 'static>(&self, message: T, delay: Duration) {
        self.queue.enqueue_event(message, &self.clock, delay);
    }

    /// Deliver `message` to its subscribers right away
    pub fn send<T: Send + 'static>(&mut self, message: T) -> Result<usize> {
        self.bus.sync(&mut self.tree);
        let event = Event::new(message);
        let delivered = self.queue.send(&event, &self.bus, &mut self.tree);
        self.bus.sync(&mut self.tree);
        Ok(delivered?)
    }

    /// Advance one fixed step and run both phases
    ///
    /// Failures do not stop the frame; they come back in
    /// [`FrameReport::faults`].
    pub fn frame(&mut self) -> FrameReport {
        self.clock.advance(self.config.fixed_step());
        self.world_state.time = self.clock;
        debug!(frame = self.clock.frame, total_ms = self.clock.total.as_millis() as u64, "frame start");

        let (delivered, actions) = match self.config.frame_order() {
            FrameOrder::EventsFirst => {
                let delivered = self.deliver_events();
                (delivered, self.run_actions())
            }
            FrameOrder::ActionsFirst => {
                let actions = self.run_actions();
                (self.deliver_events(), actions)
            }
        };

        FrameReport {
            time: self.clock,
            delivered,
            actions,
            faults: self.world_state.take_faults(),
        }
    }

    /// Deliver every due event, recording failed deliveries as faults
    fn deliver_events(&mut self) -> usize {
        self.bus.sync(&mut self.tree);
        let expired = self.queue.take_expired(&self.clock);
        let delivered = expired.len();
        for publisher in expired {
            if let Err(error) = publisher.notify_all(&self.bus, &mut self.tree) {
                warn!(%error, "event delivery failed");
                self.world_state.record_fault(error);
            }
        }
        self.bus.sync(&mut self.tree);
        delivered
    }

    /// Run one pass of the root list, recording a failed pass as a fault
    fn run_actions(&mut self) -> ApplyReport {
        let root = self.tree.root();
        let mut report = ApplyReport::new();
        if let Err(error) = action::update_into(
            &mut self.tree,
            &self.factory,
            &mut self.bus,
            &mut self.world_state,
            root,
            &mut report,
        ) {
            warn!(%error, "action pass failed");
            self.world_state.record_fault(error);
        }
        report
    }
}
