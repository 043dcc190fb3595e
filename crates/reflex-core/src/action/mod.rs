//! Behavior trees
//!
//! An [`Action`] is an attributed object whose `update` runs once per pass.
//! Lists run their children in order, each child checked out of the tree
//! while it runs so it can receive the tree mutably. Structural requests
//! made during a pass are buffered on the owning list and applied after the
//! pass, creations first, so the child sequence never changes under a
//! running iteration.

mod command;
mod create;
mod destroy;
mod increment;
mod list;
mod list_if;

pub use command::{ApplyReport, CommandBuffer, StructuralCommand};
pub use create::ActionCreateAction;
pub use destroy::ActionDestroyAction;
pub use increment::ActionIncrement;
pub use list::ActionList;
pub use list_if::ActionListIf;

use crate::error::Result;
use crate::event::EventBus;
use crate::factory::{self, Factory};
use crate::object::Object;
use crate::world_state::WorldState;
use crate::{Scope, ScopeId, ScopeMut, ScopeTree};
use tracing::{debug, warn};

/// Behavior run once per pass
pub trait Action: Object {
    /// Run one pass
    fn update(&mut self, ctx: &mut ActionContext<'_>) -> Result<()>;

    /// Get the instance name
    fn name(&self) -> String;
}

/// Everything an action can reach while it runs
pub struct ActionContext<'a> {
    /// The tree the action lives in; its own object is checked out
    pub tree: &'a mut ScopeTree,
    /// Constructors for create requests
    pub factory: &'a Factory,
    /// Subscriptions of every reaction in the tree
    pub bus: &'a mut EventBus,
    /// Current frame
    pub world_state: &'a mut WorldState,
    id: ScopeId,
    commands: &'a mut CommandBuffer,
    report: &'a mut ApplyReport,
}

impl<'a> ActionContext<'a> {
    /// Create a context for the action at `id`
    ///
    /// The action records requests into `commands`. Every buffer applied
    /// through this context or its children is merged into `report`.
    pub fn new(
        tree: &'a mut ScopeTree,
        factory: &'a Factory,
        bus: &'a mut EventBus,
        world_state: &'a mut WorldState,
        id: ScopeId,
        commands: &'a mut CommandBuffer,
        report: &'a mut ApplyReport,
    ) -> Self {
        Self {
            tree,
            factory,
            bus,
            world_state,
            id,
            commands,
            report,
        }
    }

    /// Get the id of the running action
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Get the running action's attribute table
    pub fn scope(&self) -> Result<&Scope> {
        self.tree.scope(self.id)
    }

    /// Get the running action's attribute table for attribute changes
    pub fn scope_mut(&mut self) -> Result<ScopeMut<'_>> {
        self.tree.scope_mut(self.id)
    }

    /// Get the owning list's command buffer
    pub fn commands(&mut self) -> &mut CommandBuffer {
        self.commands
    }

    /// Get everything applied so far during this pass
    pub fn report(&self) -> &ApplyReport {
        self.report
    }

    /// Run the child at `child`, recording its requests into `commands`
    ///
    /// Children without the action capability are skipped.
    pub fn run(&mut self, child: ScopeId, commands: &mut CommandBuffer) -> Result<()> {
        let mut object = self.tree.check_out(child)?;
        let result = match object.as_action_mut() {
            Some(action) => {
                let mut ctx = ActionContext {
                    tree: &mut *self.tree,
                    factory: self.factory,
                    bus: &mut *self.bus,
                    world_state: &mut *self.world_state,
                    id: child,
                    commands,
                    report: &mut *self.report,
                };
                action.update(&mut ctx)
            }
            None => Ok(()),
        };
        self.tree.check_in(child, object);
        result
    }

    /// Run every child in table `table` once, then apply their requests
    ///
    /// The children are fixed before the first one runs. A failing child
    /// stops the pass; requests recorded so far are still applied.
    pub fn run_table(&mut self, table: &str) -> Result<()> {
        let children = self.tree.children(self.id, table)?;
        let mut commands = CommandBuffer::new();
        let mut outcome = Ok(());
        for child in children {
            if let Err(error) = self.run(child, &mut commands) {
                outcome = Err(error);
                break;
            }
        }
        self.apply(commands, table);
        outcome
    }

    /// Apply buffered requests to the running action's table `table`
    ///
    /// A failed creation is logged, recorded on the world state and dropped.
    /// Destroying a name that matches nothing does nothing. The outcome is
    /// merged into the pass report and also returned.
    pub fn apply(&mut self, commands: CommandBuffer, table: &str) -> ApplyReport {
        let mut report = ApplyReport::new();
        for command in commands.into_ordered() {
            match command {
                StructuralCommand::Create {
                    prototype,
                    instance_name,
                } => match factory::instantiate(
                    self.tree,
                    self.factory,
                    self.bus,
                    self.id,
                    table,
                    &prototype,
                    &instance_name,
                ) {
                    Ok(id) => {
                        debug!(%id, %prototype, %instance_name, "created action");
                        report.created.push(id);
                    }
                    Err(error) => {
                        warn!(%error, %prototype, %instance_name, "dropping create request");
                        self.world_state.record_fault(error.clone());
                        report.rejected.push(error);
                    }
                },
                StructuralCommand::Destroy { instance_name } => {
                    let Some(target) = self.tree.find_named(self.id, table, &instance_name) else {
                        debug!(%instance_name, "no action to destroy");
                        continue;
                    };
                    match self.tree.destroy(target) {
                        Ok(removed) => {
                            debug!(id = %target, %instance_name, "destroyed action");
                            report.destroyed.extend(removed);
                        }
                        Err(error) => {
                            warn!(%error, %instance_name, "dropping destroy request");
                            self.world_state.record_fault(error.clone());
                            report.rejected.push(error);
                        }
                    }
                }
            }
        }
        self.bus.sync(self.tree);
        self.report.merge(report.clone());
        report
    }
}

/// Run one pass of the action at `id`
///
/// Requests it records go to the table that holds it. A parentless action
/// has no such table, so its requests are dropped. Returns every change
/// applied anywhere below `id` during the pass.
pub fn update(
    tree: &mut ScopeTree,
    factory: &Factory,
    bus: &mut EventBus,
    world_state: &mut WorldState,
    id: ScopeId,
) -> Result<ApplyReport> {
    let mut report = ApplyReport::new();
    update_into(tree, factory, bus, world_state, id, &mut report)?;
    Ok(report)
}

/// Run one pass of the action at `id`, merging applied changes into `report`
///
/// Changes applied before a failure stay in `report`.
pub fn update_into(
    tree: &mut ScopeTree,
    factory: &Factory,
    bus: &mut EventBus,
    world_state: &mut WorldState,
    id: ScopeId,
    report: &mut ApplyReport,
) -> Result<()> {
    bus.sync(tree);
    let slot = tree.containing(id);
    let owner = slot.as_ref().map_or(id, |(parent, _, _)| *parent);
    let mut scratch = CommandBuffer::new();
    let mut commands = CommandBuffer::new();
    let mut ctx = ActionContext::new(tree, factory, bus, world_state, owner, &mut scratch, report);

    let result = ctx.run(id, &mut commands);
    match slot {
        Some((_, table, _)) => {
            ctx.apply(commands, &table);
        }
        None if !commands.is_empty() => {
            warn!(%id, dropped = commands.len(), "root action has no list to apply requests to");
        }
        None => {}
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn setup() -> (ScopeTree, Factory, EventBus, WorldState) {
        let tree = ScopeTree::with_root(Box::new(ActionList::new("Root"))).unwrap();
        (tree, Factory::with_builtins(), EventBus::new(), WorldState::new())
    }

    fn add(tree: &mut ScopeTree, factory: &Factory, bus: &mut EventBus, parent: ScopeId, prototype: &str, name: &str) -> ScopeId {
        factory::instantiate(tree, factory, bus, parent, "Actions", prototype, name).unwrap()
    }

    fn count(tree: &ScopeTree, id: ScopeId) -> i32 {
        tree.downcast_ref::<ActionIncrement>(id).unwrap().count()
    }

    #[test]
    fn test_deferred_structural_mutation() {
        let (mut tree, factory, mut bus, mut state) = setup();
        let root = tree.root();
        let first = add(&mut tree, &factory, &mut bus, root, "ActionIncrement", "First");
        let destroy = add(&mut tree, &factory, &mut bus, root, "ActionDestroyAction", "Destroyer");
        let create = add(&mut tree, &factory, &mut bus, root, "ActionCreateAction", "Creator");
        tree.downcast_mut::<ActionDestroyAction>(destroy).unwrap().set_target("First");
        {
            let creator = tree.downcast_mut::<ActionCreateAction>(create).unwrap();
            creator.set_prototype(ActionIncrement::TYPE_NAME);
            creator.set_instance_name("Spawned");
        }

        let report = update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert_eq!(report.destroyed, vec![first]);
        assert_eq!(report.created.len(), 1);

        let spawned = report.created[0];
        assert_eq!(count(&tree, spawned), 0);
        assert!(!tree.contains(first));
        assert_eq!(tree.children(root, "Actions").unwrap(), vec![destroy, create, spawned]);

        update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert_eq!(count(&tree, spawned), 1);
        assert_eq!(tree.children(root, "Actions").unwrap().len(), 4);
    }

    #[test]
    fn test_destroyed_action_still_runs_its_pass() {
        let (mut tree, factory, mut bus, mut state) = setup();
        let root = tree.root();
        let destroy = add(&mut tree, &factory, &mut bus, root, "ActionDestroyAction", "Destroyer");
        let victim = add(&mut tree, &factory, &mut bus, root, "ActionIncrement", "Victim");
        tree.downcast_mut::<ActionDestroyAction>(destroy).unwrap().set_target("Victim");

        let mut observed = 0;
        let mut ctx_commands = CommandBuffer::new();
        let mut total = ApplyReport::new();
        let mut ctx = ActionContext::new(&mut tree, &factory, &mut bus, &mut state, root, &mut ctx_commands, &mut total);
        let mut pass = CommandBuffer::new();
        ctx.run(destroy, &mut pass).unwrap();
        ctx.run(victim, &mut pass).unwrap();
        if let Some(action) = ctx.tree.downcast_ref::<ActionIncrement>(victim) {
            observed = action.count();
        }
        let report = ctx.apply(pass, "Actions");
        assert_eq!(ctx.report(), &report);

        assert_eq!(observed, 1);
        assert_eq!(report.destroyed, vec![victim]);
        assert_eq!(total.destroyed, vec![victim]);
    }

    #[test]
    fn test_unknown_prototype_is_recorded() {
        let (mut tree, factory, mut bus, mut state) = setup();
        let root = tree.root();
        let create = add(&mut tree, &factory, &mut bus, root, "ActionCreateAction", "Creator");
        let increment = add(&mut tree, &factory, &mut bus, root, "ActionIncrement", "After");
        tree.downcast_mut::<ActionCreateAction>(create).unwrap().set_prototype("Dragon");

        let report = update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.rejected, vec![Error::UnknownPrototype("Dragon".into())]);
        assert_eq!(state.faults(), &[Error::UnknownPrototype("Dragon".into())]);
        assert_eq!(count(&tree, increment), 1);
    }

    #[test]
    fn test_nested_list_changes_reach_report() {
        let (mut tree, factory, mut bus, mut state) = setup();
        let root = tree.root();
        let inner = add(&mut tree, &factory, &mut bus, root, "ActionList", "Inner");
        let create = add(&mut tree, &factory, &mut bus, inner, "ActionCreateAction", "Creator");
        {
            let creator = tree.downcast_mut::<ActionCreateAction>(create).unwrap();
            creator.set_prototype(ActionIncrement::TYPE_NAME);
            creator.set_instance_name("Nested");
        }

        let report = update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(tree.parent(report.created[0]), Some(inner));
        assert_eq!(tree.find_named(inner, "Actions", "Nested"), Some(report.created[0]));
    }

    #[test]
    fn test_report_survives_failing_pass() {
        let (mut tree, factory, mut bus, mut state) = setup();
        let root = tree.root();
        let create = add(&mut tree, &factory, &mut bus, root, "ActionCreateAction", "Creator");
        {
            let creator = tree.downcast_mut::<ActionCreateAction>(create).unwrap();
            creator.set_prototype(ActionIncrement::TYPE_NAME);
            creator.set_instance_name("Made");
        }
        let broken = add(&mut tree, &factory, &mut bus, root, "ActionIncrement", "Broken");
        tree.downcast_mut::<ActionIncrement>(broken).unwrap().set_target("Nowhere");

        let mut report = ApplyReport::new();
        let result = update_into(&mut tree, &factory, &mut bus, &mut state, root, &mut report);
        assert!(result.is_err());
        assert_eq!(report.created.len(), 1);
    }

    #[test]
    fn test_destroy_missing_name_is_noop() {
        let (mut tree, factory, mut bus, mut state) = setup();
        let root = tree.root();
        let destroy = add(&mut tree, &factory, &mut bus, root, "ActionDestroyAction", "Destroyer");
        tree.downcast_mut::<ActionDestroyAction>(destroy).unwrap().set_target("Nobody");

        let report = update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert!(report.is_empty());
        assert!(state.faults().is_empty());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_plain_scopes_are_skipped() {
        let (mut tree, factory, mut bus, mut state) = setup();
        let root = tree.root();
        tree.append_scope(root, "Actions").unwrap();
        let increment = add(&mut tree, &factory, &mut bus, root, "ActionIncrement", "Counter");

        update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
        assert_eq!(count(&tree, increment), 1);
    }

    #[test]
    fn test_running_checked_out_action_fails() {
        let (mut tree, factory, mut bus, mut state) = setup();
        let root = tree.root();
        let mut scratch = CommandBuffer::new();
        let mut total = ApplyReport::new();
        let mut ctx = ActionContext::new(&mut tree, &factory, &mut bus, &mut state, root, &mut scratch, &mut total);
        let object = ctx.tree.check_out(root).unwrap();

        let mut commands = CommandBuffer::new();
        assert!(matches!(ctx.run(root, &mut commands), Err(Error::InvalidState(_))));
        ctx.tree.check_in(root, object);
        assert!(ctx.tree.object(root).is_ok());
    }
}
