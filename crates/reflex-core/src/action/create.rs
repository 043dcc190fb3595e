use super::{Action, ActionContext};
use crate::attributed::{self, Attributed, Signature};
use crate::error::Result;
use crate::field::{ExternalStorage, Field};
use crate::object::Object;
use crate::{DatumType, ScopeMut};

/// Asks the owning list to create a `Prototype` named `InstanceName`
#[derive(Debug, Clone, Default)]
pub struct ActionCreateAction {
    name: Field<String>,
    prototype: Field<String>,
    instance_name: Field<String>,
}

impl ActionCreateAction {
    pub const TYPE_NAME: &'static str = "ActionCreateAction";

    const SIGNATURES: &'static [Signature] = &[
        Signature::field("Name", DatumType::String, 1),
        Signature::field("Prototype", DatumType::String, 1),
        Signature::field("InstanceName", DatumType::String, 1),
    ];

    /// Create an action requesting `prototype` named `instance_name`
    pub fn new(name: &str, prototype: &str, instance_name: &str) -> Self {
        Self {
            name: Field::new(name.to_string()),
            prototype: Field::new(prototype.to_string()),
            instance_name: Field::new(instance_name.to_string()),
        }
    }

    /// Get the factory name of the type to create
    pub fn prototype(&self) -> String {
        self.prototype.get()
    }

    /// Set the factory name of the type to create
    pub fn set_prototype(&self, prototype: &str) {
        self.prototype.set(prototype.to_string());
    }

    /// Get the `Name` given to the created scope
    pub fn instance_name(&self) -> String {
        self.instance_name.get()
    }

    /// Set the `Name` given to the created scope
    pub fn set_instance_name(&self, instance_name: &str) {
        self.instance_name.set(instance_name.to_string());
    }
}

impl Object for ActionCreateAction {
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

impl Attributed for ActionCreateAction {
    fn signatures(&self) -> &'static [Signature] {
        Self::SIGNATURES
    }

    fn field(&self, name: &str) -> Option<&ExternalStorage> {
        match name {
            "Name" => Some(self.name.storage()),
            "Prototype" => Some(self.prototype.storage()),
            "InstanceName" => Some(self.instance_name.storage()),
            _ => None,
        }
    }
}

impl Action for ActionCreateAction {
    fn update(&mut self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.commands().create(self.prototype(), self.instance_name());
        Ok(())
    }

    fn name(&self) -> String {
        self.name.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{update, ActionList, StructuralCommand};
    use crate::event::EventBus;
    use crate::factory::{instantiate, Factory};
    use crate::world_state::WorldState;
    use crate::ScopeTree;

    #[test]
    fn test_records_request_on_owning_list() {
        let factory = Factory::with_builtins();
        let mut bus = EventBus::new();
        let mut state = WorldState::new();
        let mut tree = ScopeTree::with_root(Box::new(ActionList::new("Root"))).unwrap();
        let root = tree.root();
        let id = instantiate(&mut tree, &factory, &mut bus, root, "Actions", "ActionCreateAction", "Spawner").unwrap();
        tree.scope_mut(id).unwrap().find_mut("Prototype").unwrap().set("ActionList".to_string(), 0).unwrap();
        tree.scope_mut(id).unwrap().find_mut("InstanceName").unwrap().set("MyActionList".to_string(), 0).unwrap();

        let report = update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        let created = report.created[0];
        assert_eq!(tree.children(root, "Actions").unwrap(), vec![id, created]);
        assert!(tree.is(created, ActionList::TYPE_NAME));
        assert_eq!(tree.find_named(root, "Actions", "MyActionList"), Some(created));
    }

    #[test]
    fn test_update_only_buffers() {
        let mut tree = ScopeTree::new();
        let factory = Factory::with_builtins();
        let mut bus = EventBus::new();
        let mut state = WorldState::new();
        let root = tree.root();
        let mut commands = crate::action::CommandBuffer::new();
        let mut report = crate::action::ApplyReport::new();

        let mut action = ActionCreateAction::new("Spawner", "ActionIncrement", "Counter");
        let mut ctx = ActionContext::new(&mut tree, &factory, &mut bus, &mut state, root, &mut commands, &mut report);
        action.update(&mut ctx).unwrap();

        assert_eq!(tree.len(), 1);
        assert!(report.is_empty());
        assert_eq!(
            commands.iter().collect::<Vec<_>>(),
            vec![&StructuralCommand::Create {
                prototype: "ActionIncrement".into(),
                instance_name: "Counter".into(),
            }]
        );
    }
}
