//! Reflex Core - Reflective gameplay runtime
//!
//! This crate provides the data model and behavior layers of the engine:
//! - Typed value cells (`Datum`) and native field views (`Field`)
//! - Ordered attribute tables (`Scope`) arranged in arena trees (`ScopeTree`)
//! - Prescribed attributes bound to native fields (`Attributed`)
//! - Behavior trees (`Action`, `ActionList`, ...) with deferred structural changes
//! - Deferred publish/subscribe messaging (`Event`, `EventQueue`, `Reaction`)
//!
//! ## Example
//!
//! ```
//! use reflex_core::{factory, ActionIncrement, ActionList, EventBus, Factory, ScopeTree, WorldState};
//!
//! let factory = Factory::with_builtins();
//! let mut bus = EventBus::new();
//! let mut state = WorldState::new();
//! let mut tree = ScopeTree::with_root(Box::new(ActionList::new("Root"))).unwrap();
//! let root = tree.root();
//!
//! let counter = factory::instantiate(&mut tree, &factory, &mut bus, root, "Actions", "ActionIncrement", "Counter").unwrap();
//! reflex_core::action::update(&mut tree, &factory, &mut bus, &mut state, root).unwrap();
//!
//! assert_eq!(tree.downcast_ref::<ActionIncrement>(counter).unwrap().count(), 1);
//! ```

pub mod action;
pub mod attributed;
mod datum;
mod error;
pub mod event;
pub mod factory;
mod field;
mod handle;
mod object;
mod scope;
pub mod time;
mod tree;
mod world_state;

pub use action::{
    Action, ActionContext, ActionCreateAction, ActionDestroyAction, ActionIncrement, ActionList,
    ActionListIf, ApplyReport, CommandBuffer, StructuralCommand,
};
pub use attributed::{Attributed, Backing, Signature};
pub use datum::{Datum, DatumMut, DatumType, DatumValue, Values};
pub use error::{Error, Result};
pub use event::{
    Event, EventBus, EventMessageAttributed, EventPublisher, EventQueue, Reaction,
    ReactionAttributed, ReactionContext, Timing,
};
pub use factory::{Constructor, Factory};
pub use field::{ExternalStorage, Field};
pub use handle::Handle;
pub use object::{AsAny, CloneObject, Object, PlainScope};
pub use scope::{Scope, ScopeId, ScopeMut};
pub use time::GameTime;
pub use tree::ScopeTree;
pub use world_state::WorldState;
