use super::{Action, ActionContext};
use crate::attributed::{self, Attributed, Signature};
use crate::error::Result;
use crate::field::{ExternalStorage, Field};
use crate::object::Object;
use crate::{DatumType, ScopeMut};

/// Asks the owning list to destroy the sibling named `Target`
#[derive(Debug, Clone, Default)]
pub struct ActionDestroyAction {
    name: Field<String>,
    target: Field<String>,
}

impl ActionDestroyAction {
    pub const TYPE_NAME: &'static str = "ActionDestroyAction";

    const SIGNATURES: &'static [Signature] = &[
        Signature::field("Name", DatumType::String, 1),
        Signature::field("Target", DatumType::String, 1),
    ];

    /// Create an action requesting removal of the sibling `target`
    pub fn new(name: &str, target: &str) -> Self {
        Self {
            name: Field::new(name.to_string()),
            target: Field::new(target.to_string()),
        }
    }

    /// Get the `Name` of the sibling to destroy
    pub fn target(&self) -> String {
        self.target.get()
    }

    /// Set the `Name` of the sibling to destroy
    pub fn set_target(&self, target: &str) {
        self.target.set(target.to_string());
    }
}

impl Object for ActionDestroyAction {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn lineage(&self) -> &'static [&'static str] {
        &["Action", "Attributed", "Scope"]
    }

    fn populate(&self, scope: ScopeMut<'_>) -> Result<()> {
        attributed::populate(self, scope)
    }

    fn as_action_mut(&mut self) -> Option<&mut dyn Action> {
        Some(self)
    }
}

impl Attributed for ActionDestroyAction {
    fn signatures(&self) -> &'static [Signature] {
        Self::SIGNATURES
    }

    fn field(&self, name: &str) -> Option<&ExternalStorage> {
        match name {
            "Name" => Some(self.name.storage()),
            "Target" => Some(self.target.storage()),
            _ => None,
        }
    }
}

impl Action for ActionDestroyAction {
    fn update(&mut self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.commands().destroy(self.target());
        Ok(())
    }

    fn name(&self) -> String {
        self.name.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{update, ActionList};
    use crate::event::EventBus;
    use crate::factory::{instantiate, Factory};
    use crate::world_state::WorldState;
    use crate::ScopeTree;

    #[test]
    fn test_destroys_named_sibling_subtree() {
        let factory = Factory::with_builtins();
        let mut bus = EventBus::new();
        let mut state = WorldState::new();
        let mut tree = ScopeTree::with_root(Box::new(ActionList::new("Root"))).unwrap();
        let root = tree.root();

        let doomed = instantiate(&mut tree, &factory, &mut bus, root, "Actions", "ActionList", "MyActionList").unwrap();
        let nested = instantiate(&mut tree, &factory, &mut bus, doomed, "Actions", "ActionIncrement", "Inner").unwrap();
        let destroy = instantiate(&mut tree, &factory, &mut bus, root, "Actions", "ActionDestroyAction", "Destroyer").unwrap();
        tree.downcast_ref::<ActionDestroyAction>(destroy).unwrap().set_target("MyActionList");

        let report = update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert_eq!(report.destroyed, vec![nested, doomed]);
        assert_eq!(tree.children(root, "Actions").unwrap(), vec![destroy]);

        let again = update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert!(again.destroyed.is_empty());
    }

    #[test]
    fn test_only_first_match_is_destroyed() {
        let factory = Factory::with_builtins();
        let mut bus = EventBus::new();
        let mut state = WorldState::new();
        let mut tree = ScopeTree::with_root(Box::new(ActionList::new("Root"))).unwrap();
        let root = tree.root();

        let first = instantiate(&mut tree, &factory, &mut bus, root, "Actions", "ActionIncrement", "Twin").unwrap();
        let second = instantiate(&mut tree, &factory, &mut bus, root, "Actions", "ActionIncrement", "Twin").unwrap();
        let destroy = instantiate(&mut tree, &factory, &mut bus, root, "Actions", "ActionDestroyAction", "Destroyer").unwrap();
        tree.downcast_ref::<ActionDestroyAction>(destroy).unwrap().set_target("Twin");

        update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert!(!tree.contains(first));
        assert!(tree.contains(second));
    }
}
