use super::{Action, ActionContext};
use crate::attributed::{self, Attributed, Signature};
use crate::error::Result;
use crate::field::{ExternalStorage, Field};
use crate::object::Object;
use crate::{DatumType, ScopeMut};

/// Runs the actions in its `Actions` table in order
#[derive(Debug, Clone, Default)]
pub struct ActionList {
    name: Field<String>,
}

impl ActionList {
    pub const TYPE_NAME: &'static str = "ActionList";

    const SIGNATURES: &'static [Signature] = &[
        Signature::field("Name", DatumType::String, 1),
        Signature::table("Actions"),
    ];

    /// Create an empty list
    pub fn new(name: &str) -> Self {
        Self {
            name: Field::new(name.to_string()),
        }
    }

    /// Set the instance name
    pub fn set_name(&self, name: &str) {
        self.name.set(name.to_string());
    }
}

impl Object for ActionList {
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

impl Attributed for ActionList {
    fn signatures(&self) -> &'static [Signature] {
        Self::SIGNATURES
    }

    fn field(&self, name: &str) -> Option<&ExternalStorage> {
        match name {
            "Name" => Some(self.name.storage()),
            _ => None,
        }
    }
}

impl Action for ActionList {
    fn update(&mut self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.run_table("Actions")
    }

    fn name(&self) -> String {
        self.name.get()
    }
}
