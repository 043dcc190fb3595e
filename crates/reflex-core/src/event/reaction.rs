use super::{Event, EventBus, EventPublisher};
use crate::action::{Action, ActionContext};
use crate::attributed::{self, Attributed, Signature};
use crate::error::{Error, Result};
use crate::field::{ExternalStorage, Field};
use crate::object::Object;
use crate::{Datum, DatumMut, DatumType, Scope, ScopeId, ScopeMut, ScopeTree};
use tracing::{trace, warn};

/// An action that is also notified of events
pub trait Reaction: Action {
    /// Handle one delivered event
    fn notify(&mut self, ctx: &mut ReactionContext<'_>, event: &dyn EventPublisher) -> Result<()>;
}

/// What a reaction can reach while it is notified
pub struct ReactionContext<'a> {
    /// The tree the reaction lives in; its own object is checked out
    pub tree: &'a mut ScopeTree,
    /// The bus the event is being delivered through
    pub bus: &'a EventBus,
    id: ScopeId,
}

impl ReactionContext<'_> {
    /// Get the id of the notified reaction
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Get the reaction's attribute table
    pub fn scope(&self) -> Result<&Scope> {
        self.tree.scope(self.id)
    }

    /// Get the reaction's attribute table for attribute changes
    pub fn scope_mut(&mut self) -> Result<ScopeMut<'_>> {
        self.tree.scope_mut(self.id)
    }
}

/// Notify the reaction at `id`; false if the object there cannot react
pub(crate) fn deliver(
    tree: &mut ScopeTree,
    bus: &EventBus,
    id: ScopeId,
    event: &dyn EventPublisher,
) -> Result<bool> {
    let mut object = tree.check_out(id)?;
    let result = match object.as_reaction_mut() {
        Some(reaction) => {
            trace!(%id, "notifying reaction");
            let mut ctx = ReactionContext {
                tree: &mut *tree,
                bus,
                id,
            };
            reaction.notify(&mut ctx, event).map(|()| true)
        }
        None => {
            warn!(%id, type_name = object.type_name(), "subscriber cannot react");
            Ok(false)
        }
    };
    tree.check_in(id, object);
    result
}

/// Root object of a message tree
#[derive(Debug, Clone, Default)]
struct MessageHeader {
    subtype: Field<String>,
}

impl MessageHeader {
    const SIGNATURES: &'static [Signature] = &[Signature::field("Subtype", DatumType::String, 1)];
}

impl Object for MessageHeader {
    fn type_name(&self) -> &'static str {
        EventMessageAttributed::TYPE_NAME
    }

    fn lineage(&self) -> &'static [&'static str] {
        &["Attributed", "Scope"]
    }

    fn populate(&self, scope: ScopeMut<'_>) -> Result<()> {
        attributed::populate(self, scope)
    }
}

impl Attributed for MessageHeader {
    fn signatures(&self) -> &'static [Signature] {
        Self::SIGNATURES
    }

    fn field(&self, name: &str) -> Option<&ExternalStorage> {
        match name {
            "Subtype" => Some(self.subtype.storage()),
            _ => None,
        }
    }
}

/// A message carrying a subtype and any number of auxiliary arguments
///
/// The arguments live in the message's own scope tree; table arguments may
/// hold whole subtrees.
#[derive(Debug, Clone)]
pub struct EventMessageAttributed {
    tree: ScopeTree,
}

impl EventMessageAttributed {
    pub const TYPE_NAME: &'static str = "EventMessageAttributed";

    /// Create a message of `subtype` with no arguments
    pub fn new(subtype: &str) -> Result<Self> {
        let header = MessageHeader {
            subtype: Field::new(subtype.to_string()),
        };
        Ok(Self {
            tree: ScopeTree::with_root(Box::new(header))?,
        })
    }

    /// Get the subtype reactions match against
    pub fn subtype(&self) -> String {
        self.tree
            .downcast_ref::<MessageHeader>(self.tree.root())
            .map(|header| header.subtype.get())
            .unwrap_or_default()
    }

    /// Change the subtype
    pub fn set_subtype(&mut self, subtype: &str) {
        if let Some(header) = self.tree.downcast_ref::<MessageHeader>(self.tree.root()) {
            header.subtype.set(subtype.to_string());
        }
    }

    /// Find or create an argument
    pub fn append_auxiliary(&mut self, name: &str) -> Result<DatumMut<'_>> {
        let root = self.tree.root();
        self.tree.scope_mut(root)?.into_inner().append_auxiliary(name)
    }

    /// Add a child scope to the table argument `name`
    pub fn append_scope(&mut self, name: &str) -> Result<ScopeId> {
        let root = self.tree.root();
        if self.tree.scope(root)?.is_prescribed(name) {
            return Err(Error::AttributeCollision(name.to_string()));
        }
        self.tree.append_scope(root, name)
    }

    /// Iterate the arguments
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.header().into_iter().flat_map(Scope::auxiliary)
    }

    /// Get the tree holding the arguments
    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    /// Get the tree holding the arguments, to build nested table arguments
    pub fn tree_mut(&mut self) -> &mut ScopeTree {
        &mut self.tree
    }

    fn header(&self) -> Option<&Scope> {
        self.tree.scope(self.tree.root()).ok()
    }
}

/// Copies the arguments of matching messages into itself and runs `Actions`
///
/// Subscribes to [`EventMessageAttributed`] when attached to a bus.
#[derive(Debug, Clone, Default)]
pub struct ReactionAttributed {
    name: Field<String>,
    subtype: Field<String>,
}

impl ReactionAttributed {
    pub const TYPE_NAME: &'static str = "ReactionAttributed";

    const SIGNATURES: &'static [Signature] = &[
        Signature::field("Name", DatumType::String, 1),
        Signature::field("Subtype", DatumType::String, 1),
        Signature::table("Actions"),
    ];

    /// Create a reaction to messages of `subtype`
    pub fn new(name: &str, subtype: &str) -> Self {
        Self {
            name: Field::new(name.to_string()),
            subtype: Field::new(subtype.to_string()),
        }
    }

    /// Get the message subtype this reaction accepts
    pub fn subtype(&self) -> String {
        self.subtype.get()
    }

    /// Accept messages of `subtype` instead
    pub fn set_subtype(&self, subtype: &str) {
        self.subtype.set(subtype.to_string());
    }

    /// Copy every argument of `message` into the reaction's scope
    ///
    /// All arguments are checked before the first one is copied, so a
    /// rejected message leaves the scope untouched.
    fn copy_arguments(ctx: &mut ReactionContext<'_>, message: &EventMessageAttributed) -> Result<()> {
        let id = ctx.id();
        {
            let scope = ctx.scope()?;
            for (name, datum) in message.arguments() {
                check_argument(scope, name, datum)?;
            }
        }

        let source = message.tree();
        for (name, datum) in message.arguments() {
            match datum.scopes() {
                Ok(children) => {
                    ctx.tree.clear_table(id, name)?;
                    ctx.scope_mut()?.append_typed(name, DatumType::Table)?;
                    for child in children {
                        ctx.tree.graft(id, name, source, child)?;
                    }
                }
                Err(_) => {
                    let mut scope = ctx.scope_mut()?;
                    let mut target = scope.append_auxiliary(name)?;
                    if !datum.kind().is_unknown() {
                        target.set_type(datum.kind())?;
                        target.copy_from(datum)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Check that `datum` can be copied into `scope` as the attribute `name`
fn check_argument(scope: &Scope, name: &str, datum: &Datum) -> Result<()> {
    if scope.is_prescribed(name) {
        return Err(Error::AttributeCollision(name.to_string()));
    }
    let Some(existing) = scope.find(name) else {
        return Ok(());
    };
    let (have, want) = (existing.kind(), datum.kind());
    if !have.is_unknown() && !want.is_unknown() && have != want {
        return Err(Error::mismatch(have, want));
    }
    if existing.is_external() && datum.size() > existing.capacity() {
        return Err(Error::external("growing"));
    }
    Ok(())
}

impl Object for ReactionAttributed {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn lineage(&self) -> &'static [&'static str] {
        &["Reaction", "ActionList", "Action", "Attributed", "Scope"]
    }

    fn populate(&self, scope: ScopeMut<'_>) -> Result<()> {
        attributed::populate(self, scope)
    }

    fn attach(&self, id: ScopeId, bus: &mut EventBus) {
        bus.subscribe::<EventMessageAttributed>(id);
    }

    fn as_action_mut(&mut self) -> Option<&mut dyn Action> {
        Some(self)
    }

    fn as_reaction_mut(&mut self) -> Option<&mut dyn Reaction> {
        Some(self)
    }
}

impl Attributed for ReactionAttributed {
    fn signatures(&self) -> &'static [Signature] {
        Self::SIGNATURES
    }

    fn field(&self, name: &str) -> Option<&ExternalStorage> {
        match name {
            "Name" => Some(self.name.storage()),
            "Subtype" => Some(self.subtype.storage()),
            _ => None,
        }
    }
}

impl Action for ReactionAttributed {
    fn update(&mut self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.run_table("Actions")
    }

    fn name(&self) -> String {
        self.name.get()
    }
}

impl Reaction for ReactionAttributed {
    fn notify(&mut self, ctx: &mut ReactionContext<'_>, event: &dyn EventPublisher) -> Result<()> {
        let Some(event) = event.downcast_ref::<Event<EventMessageAttributed>>() else {
            return Ok(());
        };
        let message = event.message();
        if message.subtype() != self.subtype() {
            trace!(id = %ctx.id(), subtype = %message.subtype(), "subtype does not match");
            return Ok(());
        }
        Self::copy_arguments(ctx, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{update, ActionDestroyAction, ActionIncrement, ActionList};
    use crate::event::EventQueue;
    use crate::factory::{instantiate, Factory};
    use crate::time::GameTime;
    use crate::world_state::WorldState;
    use glam::Vec4;
    use std::time::Duration;

    fn reaction_tree(subtype: &str) -> (ScopeTree, EventBus, ScopeId) {
        let mut tree = ScopeTree::with_root(Box::new(ActionList::new("Root"))).unwrap();
        let mut bus = EventBus::new();
        let root = tree.root();
        let id = tree
            .append_object(root, "Actions", Box::new(ReactionAttributed::new("React", subtype)))
            .unwrap();
        bus.sync(&mut tree);
        (tree, bus, id)
    }

    fn message(subtype: &str) -> EventMessageAttributed {
        let mut message = EventMessageAttributed::new(subtype).unwrap();
        message.append_auxiliary("Damage").unwrap().assign(5).unwrap();
        message
            .append_auxiliary("Direction")
            .unwrap()
            .assign(Vec4::new(1.0, 0.0, 0.0, 0.0))
            .unwrap();
        let target = message.append_scope("Targets").unwrap();
        message.tree_mut().scope_mut(target).unwrap().append("Hp").assign(30).unwrap();
        message
    }

    #[test]
    fn test_message_subtype_is_prescribed() {
        let mut message = EventMessageAttributed::new("Foo").unwrap();
        assert_eq!(message.subtype(), "Foo");
        message.set_subtype("Bar");
        assert_eq!(message.subtype(), "Bar");
        let root = message.tree().root();
        let header = message.tree().scope(root).unwrap();
        assert!(header.is_prescribed("Subtype"));
        assert!(header.find("Subtype").unwrap().is_external());
        assert_eq!(header.find("Subtype").unwrap().get::<String>(0).unwrap(), "Bar");
        assert!(matches!(
            message.append_auxiliary("Subtype"),
            Err(Error::AttributeCollision(_))
        ));
        assert_eq!(message.arguments().count(), 0);
    }

    #[test]
    fn test_mismatched_subtype_is_ignored() {
        let (mut tree, bus, id) = reaction_tree("Foo");
        let before = tree.scope(id).unwrap().len();

        let event = Event::new(message("Bar"));
        assert_eq!(event.notify_all(&bus, &mut tree).unwrap(), 1);
        assert_eq!(tree.scope(id).unwrap().len(), before);
    }

    #[test]
    fn test_matching_subtype_copies_arguments() {
        let (mut tree, bus, id) = reaction_tree("Foo");
        let sent = message("Foo");

        Event::new(sent.clone()).notify_all(&bus, &mut tree).unwrap();

        let scope = tree.scope(id).unwrap();
        assert_eq!(scope.find("Damage").unwrap(), sent.arguments().next().unwrap().1);
        assert_eq!(scope.find("Damage").unwrap().kind(), DatumType::Integer);
        assert_eq!(
            scope.find("Direction").unwrap().get::<Vec4>(0).unwrap(),
            Vec4::new(1.0, 0.0, 0.0, 0.0)
        );
        assert!(scope.is_auxiliary("Targets"));

        let targets = tree.children(id, "Targets").unwrap();
        assert_eq!(targets.len(), 1);
        let source_target = sent.tree().children(sent.tree().root(), "Targets").unwrap()[0];
        assert!(tree.equals(targets[0], sent.tree(), source_target));
        assert_eq!(tree.parent(targets[0]), Some(id));
    }

    #[test]
    fn test_repeat_delivery_replaces_tables() {
        let (mut tree, bus, id) = reaction_tree("Foo");
        let event = Event::new(message("Foo"));
        event.notify_all(&bus, &mut tree).unwrap();
        event.notify_all(&bus, &mut tree).unwrap();
        assert_eq!(tree.children(id, "Targets").unwrap().len(), 1);
    }

    #[test]
    fn test_message_clone_owns_its_subtype() {
        let original = message("Foo");
        let mut copy = original.clone();
        copy.set_subtype("Bar");
        assert_eq!(original.subtype(), "Foo");
        assert_eq!(copy.subtype(), "Bar");
        assert_eq!(copy.arguments().count(), original.arguments().count());
    }

    #[test]
    fn test_argument_type_conflict_fails() {
        let (mut tree, bus, id) = reaction_tree("Foo");
        tree.scope_mut(id).unwrap().append("Damage").assign("high".to_string()).unwrap();

        let event = Event::new(message("Foo"));
        assert!(matches!(
            event.notify_all(&bus, &mut tree),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejected_message_changes_nothing() {
        let (mut tree, bus, id) = reaction_tree("Foo");
        tree.scope_mut(id).unwrap().append("Direction").assign("north".to_string()).unwrap();
        let before = tree.scope(id).unwrap().clone();
        let scopes = tree.len();

        let event = Event::new(message("Foo"));
        assert!(matches!(
            event.notify_all(&bus, &mut tree),
            Err(Error::TypeMismatch { .. })
        ));
        let after = tree.scope(id).unwrap();
        assert_eq!(after.names().collect::<Vec<_>>(), before.names().collect::<Vec<_>>());
        assert!(after.find("Damage").is_none());
        assert!(tree.children(id, "Targets").unwrap().is_empty());
        assert_eq!(tree.len(), scopes);
    }

    #[test]
    fn test_cloned_reaction_is_subscribed() {
        let (mut tree, mut bus, id) = reaction_tree("Foo");
        let root = tree.root();
        let copy = tree.clone_subtree(id).unwrap();
        let copy_id = tree.insert_tree(root, "Actions", copy).unwrap();
        bus.sync(&mut tree);
        assert_eq!(bus.subscribers::<EventMessageAttributed>(), vec![id, copy_id]);

        let event = Event::new(message("Foo"));
        assert_eq!(event.notify_all(&bus, &mut tree).unwrap(), 2);
        assert!(tree.scope(copy_id).unwrap().find("Damage").is_some());
    }

    #[test]
    fn test_reaction_root_is_subscribed() {
        let mut tree = ScopeTree::with_root(Box::new(ReactionAttributed::new("Root", "Foo"))).unwrap();
        let mut bus = EventBus::new();
        bus.sync(&mut tree);
        assert_eq!(bus.subscribers::<EventMessageAttributed>(), vec![tree.root()]);
    }

    #[test]
    fn test_queued_message_reaches_reaction() {
        let (mut tree, bus, id) = reaction_tree("Hit");
        let queue = EventQueue::new();
        queue.enqueue_event(message("Hit"), &GameTime::new(), Duration::from_millis(20));

        queue.update(&GameTime::from_millis(19), &bus, &mut tree).unwrap();
        assert!(tree.scope(id).unwrap().find("Damage").is_none());
        queue.update(&GameTime::from_millis(20), &bus, &mut tree).unwrap();
        assert_eq!(tree.scope(id).unwrap().find("Damage").unwrap().get::<i32>(0).unwrap(), 5);
    }

    #[test]
    fn test_reaction_runs_actions_and_unsubscribes_on_destroy() {
        let factory = Factory::with_builtins();
        let mut state = WorldState::new();
        let (mut tree, mut bus, id) = reaction_tree("Foo");
        let root = tree.root();
        tree.scope_mut(id).unwrap().find_mut("Name").unwrap().set("Listener".to_string(), 0).unwrap();
        let counter = instantiate(&mut tree, &factory, &mut bus, id, "Actions", "ActionIncrement", "Counter").unwrap();

        update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert_eq!(tree.downcast_ref::<ActionIncrement>(counter).unwrap().count(), 1);
        assert_eq!(bus.subscribers::<EventMessageAttributed>(), vec![id]);

        let destroy = instantiate(&mut tree, &factory, &mut bus, root, "Actions", "ActionDestroyAction", "Remover").unwrap();
        tree.downcast_ref::<ActionDestroyAction>(destroy).unwrap().set_target("Listener");
        update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();

        assert!(!tree.contains(id));
        assert!(bus.subscribers::<EventMessageAttributed>().is_empty());
    }
}
