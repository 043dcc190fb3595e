use super::{Action, ActionContext};
use crate::attributed::{self, Attributed, Signature};
use crate::error::Result;
use crate::field::{ExternalStorage, Field};
use crate::object::Object;
use crate::{DatumType, ScopeMut};

/// Runs its `Then` table when `Condition` is non-zero, its `Else` table otherwise
#[derive(Debug, Clone, Default)]
pub struct ActionListIf {
    name: Field<String>,
    condition: Field<i32>,
}

impl ActionListIf {
    pub const TYPE_NAME: &'static str = "ActionListIf";

    const SIGNATURES: &'static [Signature] = &[
        Signature::field("Name", DatumType::String, 1),
        Signature::field("Condition", DatumType::Integer, 1),
        Signature::table("Then"),
        Signature::table("Else"),
    ];

    /// Create a branch with empty `Then` and `Else` tables
    pub fn new(name: &str, condition: bool) -> Self {
        Self {
            name: Field::new(name.to_string()),
            condition: Field::new(condition as i32),
        }
    }

    /// Check if the `Then` branch is selected
    pub fn condition(&self) -> bool {
        self.condition.get() != 0
    }

    /// Select the `Then` branch when `condition` holds
    pub fn set_condition(&self, condition: bool) {
        self.condition.set(condition as i32);
    }

    /// Name of the table the current condition selects
    pub fn branch(&self) -> &'static str {
        if self.condition() {
            "Then"
        } else {
            "Else"
        }
    }
}

impl Object for ActionListIf {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn lineage(&self) -> &'static [&'static str] {
        &["ActionList", "Action", "Attributed", "Scope"]
    }

    fn populate(&self, scope: ScopeMut<'_>) -> Result<()> {
        attributed::populate(self, scope)
    }

    fn as_action_mut(&mut self) -> Option<&mut dyn Action> {
        Some(self)
    }
}

impl Attributed for ActionListIf {
    fn signatures(&self) -> &'static [Signature] {
        Self::SIGNATURES
    }

    fn field(&self, name: &str) -> Option<&ExternalStorage> {
        match name {
            "Name" => Some(self.name.storage()),
            "Condition" => Some(self.condition.storage()),
            _ => None,
        }
    }
}

impl Action for ActionListIf {
    fn update(&mut self, ctx: &mut ActionContext<'_>) -> Result<()> {
        ctx.run_table(self.branch())
    }

    fn name(&self) -> String {
        self.name.get()
    }
}
