//! Deferred structural commands
//!
//! Actions that create or destroy siblings never touch the list they run in.
//! They record a [`StructuralCommand`] on the owning list's [`CommandBuffer`],
//! which the list applies once its pass over the children has finished.

use crate::error::Error;
use crate::ScopeId;
use serde::{Deserialize, Serialize};

/// A structural change requested during an action pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuralCommand {
    /// Instantiate `prototype` and append it under `instance_name`
    Create {
        /// Factory class name
        prototype: String,
        /// Value for the new action's `Name`
        instance_name: String,
    },

    /// Destroy the first sibling whose `Name` is `instance_name`
    Destroy {
        /// Name of the sibling to remove
        instance_name: String,
    },
}

impl StructuralCommand {
    /// Check if this is a creation
    pub fn is_create(&self) -> bool {
        matches!(self, StructuralCommand::Create { .. })
    }
}

/// Commands collected during one pass over a list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandBuffer {
    commands: Vec<StructuralCommand>,
}

impl CommandBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command
    pub fn push(&mut self, command: StructuralCommand) {
        self.commands.push(command);
    }

    /// Record a creation request
    pub fn create(&mut self, prototype: impl Into<String>, instance_name: impl Into<String>) {
        self.push(StructuralCommand::Create {
            prototype: prototype.into(),
            instance_name: instance_name.into(),
        });
    }

    /// Record a destruction request
    pub fn destroy(&mut self, instance_name: impl Into<String>) {
        self.push(StructuralCommand::Destroy {
            instance_name: instance_name.into(),
        });
    }

    /// Get the number of recorded commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate commands in request order
    pub fn iter(&self) -> impl Iterator<Item = &StructuralCommand> {
        self.commands.iter()
    }

    /// Consume the buffer in application order: creations, then destructions
    ///
    /// Each group keeps request order.
    pub fn into_ordered(self) -> Vec<StructuralCommand> {
        let (mut ordered, destroys): (Vec<_>, Vec<_>) =
            self.commands.into_iter().partition(StructuralCommand::is_create);
        ordered.extend(destroys);
        ordered
    }
}

/// Outcome of applying a command buffer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Scopes created, in creation order
    pub created: Vec<ScopeId>,
    /// Scopes removed, children before parents
    pub destroyed: Vec<ScopeId>,
    /// Commands that were dropped
    pub rejected: Vec<Error>,
}

impl ApplyReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if nothing changed and nothing failed
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.destroyed.is_empty() && self.rejected.is_empty()
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: ApplyReport) {
        self.created.extend(other.created);
        self.destroyed.extend(other.destroyed);
        self.rejected.extend(other.rejected);
    }
}
