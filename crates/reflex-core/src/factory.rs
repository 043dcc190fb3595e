//! Construction of objects by class name

use crate::action::{
    ActionCreateAction, ActionDestroyAction, ActionIncrement, ActionList, ActionListIf,
};
use crate::error::{Error, Result};
use crate::event::{EventBus, ReactionAttributed};
use crate::object::{Object, PlainScope};
use crate::{ScopeId, ScopeTree};
use indexmap::IndexMap;

/// Builds a fresh, default-configured object
pub type Constructor = fn() -> Box<dyn Object>;

fn construct<T: Object + Default>() -> Box<dyn Object> {
    Box::new(T::default())
}

/// Registry of constructors keyed by class name
#[derive(Debug, Clone, Default)]
pub struct Factory {
    constructors: IndexMap<String, Constructor>,
}

impl Factory {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in type
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register_type::<PlainScope>("Scope");
        factory.register_type::<ActionList>(ActionList::TYPE_NAME);
        factory.register_type::<ActionListIf>(ActionListIf::TYPE_NAME);
        factory.register_type::<ActionIncrement>(ActionIncrement::TYPE_NAME);
        factory.register_type::<ActionCreateAction>(ActionCreateAction::TYPE_NAME);
        factory.register_type::<ActionDestroyAction>(ActionDestroyAction::TYPE_NAME);
        factory.register_type::<ReactionAttributed>(ReactionAttributed::TYPE_NAME);
        factory
    }

    /// Register a constructor, returning the one it replaced
    pub fn register(&mut self, name: impl Into<String>, constructor: Constructor) -> Option<Constructor> {
        self.constructors.insert(name.into(), constructor)
    }

    /// Register `T::default` under `name`
    pub fn register_type<T: Object + Default>(&mut self, name: impl Into<String>) {
        self.register(name, construct::<T>);
    }

    /// Keep only the named classes
    pub fn retain(&mut self, names: &[String]) {
        self.constructors.retain(|name, _| names.contains(name));
    }

    /// Check if a class is registered
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Iterate registered class names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Get the number of registered classes
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Construct an instance of `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn Object>> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| Error::UnknownPrototype(name.to_string()))
    }
}

/// Create `prototype` immediately under `parent`'s table `table`
///
/// The new scope's `Name` is set to `instance_name` when it is not empty,
/// and `bus` is synced with the tree so the object is attached.
pub fn instantiate(
    tree: &mut ScopeTree,
    factory: &Factory,
    bus: &mut EventBus,
    parent: ScopeId,
    table: &str,
    prototype: &str,
    instance_name: &str,
) -> Result<ScopeId> {
    let object = factory.create(prototype)?;
    let id = tree.append_object(parent, table, object)?;
    if !instance_name.is_empty() {
        tree.scope_mut(id)?
            .append("Name")
            .assign(instance_name.to_string())?;
    }
    bus.sync(tree);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    #[test]
    fn test_builtins_registered() {
        let factory = Factory::with_builtins();
        assert_eq!(factory.len(), 7);
        assert!(factory.contains("ActionListIf"));
        assert_eq!(factory.create("ActionList").unwrap().type_name(), "ActionList");
        assert!(factory.create("Scope").unwrap().is("Scope"));
    }

    #[test]
    fn test_unknown_prototype() {
        let factory = Factory::new();
        assert!(matches!(
            factory.create("Dragon"),
            Err(Error::UnknownPrototype(name)) if name == "Dragon"
        ));
    }

    #[test]
    fn test_retain_allowlist() {
        let mut factory = Factory::with_builtins();
        factory.retain(&["ActionList".to_string(), "Scope".to_string()]);
        assert_eq!(factory.names().collect::<Vec<_>>(), vec!["Scope", "ActionList"]);
    }

    #[test]
    fn test_instantiate_names_instance() {
        let factory = Factory::with_builtins();
        let mut tree = ScopeTree::new();
        let mut bus = EventBus::new();
        let root = tree.root();

        let id = instantiate(&mut tree, &factory, &mut bus, root, "Actions", "ActionList", "DoThing")
            .unwrap();
        assert_eq!(tree.downcast_ref::<ActionList>(id).unwrap().name(), "DoThing");
        assert!(tree.is(id, "Action"));

        let reaction =
            instantiate(&mut tree, &factory, &mut bus, root, "Reactions", "ReactionAttributed", "")
                .unwrap();
        assert_eq!(
            bus.subscribers::<crate::event::EventMessageAttributed>(),
            vec![reaction]
        );
    }
}
