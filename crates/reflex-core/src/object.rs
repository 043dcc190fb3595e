//! Runtime type identity for scope-tree nodes
//!
//! Every node in a [`ScopeTree`](crate::ScopeTree) pairs its attribute table
//! with an [`Object`]: the concrete type behind the node. Objects expose the
//! capabilities the tree needs (cloning, attribute installation) and the
//! optional behavior capabilities of actions and reactions.

use crate::action::Action;
use crate::error::Result;
use crate::event::{EventBus, Reaction};
use crate::{ScopeId, ScopeMut};
use std::any::Any;

/// Upcast helper implemented for every `'static` type
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Boxed cloning, implemented for every `Object + Clone`
pub trait CloneObject {
    fn clone_object(&self) -> Box<dyn Object>;
}

impl<T: Object + Clone> CloneObject for T {
    fn clone_object(&self) -> Box<dyn Object> {
        Box::new(self.clone())
    }
}

/// The concrete type behind a scope-tree node
pub trait Object: AsAny + CloneObject + Send + Sync {
    /// The class name of this type
    fn type_name(&self) -> &'static str;

    /// Class names this type can be treated as, most derived first
    fn lineage(&self) -> &'static [&'static str] {
        &[]
    }

    /// Check if this object is, or derives from, `type_name`
    fn is(&self, type_name: &str) -> bool {
        self.type_name() == type_name || self.lineage().iter().any(|name| *name == type_name)
    }

    /// Install prescribed attributes into this object's scope
    ///
    /// Runs when the object enters a tree and again after every clone.
    fn populate(&self, _scope: ScopeMut<'_>) -> Result<()> {
        Ok(())
    }

    /// Register with the event bus after being placed at `id`
    fn attach(&self, _id: ScopeId, _bus: &mut EventBus) {}

    /// Get the action capability, if any
    fn as_action_mut(&mut self) -> Option<&mut dyn Action> {
        None
    }

    /// Get the reaction capability, if any
    fn as_reaction_mut(&mut self) -> Option<&mut dyn Reaction> {
        None
    }
}

impl dyn Object {
    /// Borrow as a concrete type
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow as a concrete type
    pub fn downcast_mut<T: Object>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// A node with no native fields or behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainScope;

impl Object for PlainScope {
    fn type_name(&self) -> &'static str {
        "Scope"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_scope_identity() {
        let object: Box<dyn Object> = Box::new(PlainScope);
        assert_eq!(object.type_name(), "Scope");
        assert!(object.is("Scope"));
        assert!(!object.is("Action"));
        assert!(object.downcast_ref::<PlainScope>().is_some());
        assert_eq!(object.clone_object().type_name(), "Scope");
    }
}
