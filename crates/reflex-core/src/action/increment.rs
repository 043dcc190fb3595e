use super::{Action, ActionContext};
use crate::attributed::{self, Attributed, Signature};
use crate::error::{Error, Result};
use crate::field::{ExternalStorage, Field};
use crate::object::Object;
use crate::{DatumType, ScopeMut};

/// Adds `Step` to the integer attribute named by `Target`
///
/// The target is searched from this action upward, so by default the action
/// counts its own updates in `Count`.
#[derive(Debug, Clone)]
pub struct ActionIncrement {
    name: Field<String>,
    target: Field<String>,
    step: Field<i32>,
    count: Field<i32>,
}

impl ActionIncrement {
    pub const TYPE_NAME: &'static str = "ActionIncrement";

    const SIGNATURES: &'static [Signature] = &[
        Signature::field("Name", DatumType::String, 1),
        Signature::field("Target", DatumType::String, 1),
        Signature::field("Step", DatumType::Integer, 1),
        Signature::field("Count", DatumType::Integer, 1),
    ];

    /// Create an action counting its own updates by one
    pub fn new(name: &str) -> Self {
        Self {
            name: Field::new(name.to_string()),
            target: Field::new("Count".to_string()),
            step: Field::new(1),
            count: Field::new(0),
        }
    }

    /// Get the value of the action's own `Count` attribute
    pub fn count(&self) -> i32 {
        self.count.get()
    }

    /// Get the name of the attribute being incremented
    pub fn target(&self) -> String {
        self.target.get()
    }

    /// Increment the attribute `target` instead, searched upward
    pub fn set_target(&self, target: &str) {
        self.target.set(target.to_string());
    }

    /// Set the amount added per update
    pub fn set_step(&self, step: i32) {
        self.step.set(step);
    }
}

impl Default for ActionIncrement {
    fn default() -> Self {
        Self::new("")
    }
}

impl Object for ActionIncrement {
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

impl Attributed for ActionIncrement {
    fn signatures(&self) -> &'static [Signature] {
        Self::SIGNATURES
    }

    fn field(&self, name: &str) -> Option<&ExternalStorage> {
        match name {
            "Name" => Some(self.name.storage()),
            "Target" => Some(self.target.storage()),
            "Step" => Some(self.step.storage()),
            "Count" => Some(self.count.storage()),
            _ => None,
        }
    }
}

impl Action for ActionIncrement {
    fn update(&mut self, ctx: &mut ActionContext<'_>) -> Result<()> {
        let target = self.target.get();
        let step = self.step.get();
        let id = ctx.id();
        let mut datum = ctx
            .tree
            .search_mut(id, &target)
            .ok_or_else(|| Error::AttributeNotFound(target.clone()))?;

        if datum.kind().is_unknown() {
            return datum.assign(step);
        }
        let value = datum.get::<i32>(0)?;
        datum.set(value.wrapping_add(step), 0)
    }

    fn name(&self) -> String {
        self.name.get()
    }
}
