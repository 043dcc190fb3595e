//! Prescribed attributes
//!
//! An [`Attributed`] type declares an ordered list of [`Signature`]s. When an
//! instance enters a tree (and again after every clone) [`populate`] installs
//! one attribute per signature at the front of the instance's scope:
//! field-backed signatures become external datums viewing the instance's own
//! [`Field`](crate::Field)s, the rest get internal storage. Everything after
//! the prescribed prefix is auxiliary.

use crate::error::{Error, Result};
use crate::field::ExternalStorage;
use crate::object::Object;
use crate::datum::DatumMut;
use crate::{Datum, DatumType, Scope, ScopeMut};

/// Where a prescribed attribute keeps its elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backing {
    /// A view onto a native field of the object
    Field,
    /// Storage owned by the datum itself
    Internal,
}

/// Declaration of one prescribed attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub name: &'static str,
    pub kind: DatumType,
    pub count: usize,
    pub backing: Backing,
}

impl Signature {
    /// An attribute viewing the native field `name`
    pub const fn field(name: &'static str, kind: DatumType, count: usize) -> Self {
        Self {
            name,
            kind,
            count,
            backing: Backing::Field,
        }
    }

    /// An attribute with `count` zeroed elements of its own
    pub const fn internal(name: &'static str, kind: DatumType, count: usize) -> Self {
        Self {
            name,
            kind,
            count,
            backing: Backing::Internal,
        }
    }

    /// A table attribute for child scopes
    pub const fn table(name: &'static str) -> Self {
        Self::internal(name, DatumType::Table, 0)
    }
}

/// A type whose scope starts with a fixed set of attributes
pub trait Attributed: Object {
    /// Prescribed attributes, in installation order
    fn signatures(&self) -> &'static [Signature];

    /// Storage of the native field backing `name`
    fn field(&self, _name: &str) -> Option<&ExternalStorage> {
        None
    }
}

/// Install `object`'s prescribed attributes into `scope`
///
/// Field-backed attributes are re-bound to `object`'s fields. Internal ones
/// keep an existing datum of the same type, so table children survive a
/// clone. Auxiliary attributes already present move behind the prefix.
pub fn populate<A: Attributed + ?Sized>(object: &A, scope: ScopeMut<'_>) -> Result<()> {
    let scope = scope.into_inner();
    let signatures = object.signatures();
    for (index, signature) in signatures.iter().enumerate() {
        let datum = match signature.backing {
            Backing::Field => bind_field(object, signature)?,
            Backing::Internal => match scope.find(signature.name) {
                Some(existing) if existing.kind() == signature.kind => existing.clone(),
                Some(existing) if !existing.kind().is_unknown() => {
                    return Err(Error::mismatch(signature.kind, existing.kind()));
                }
                _ => fresh(signature)?,
            },
        };
        scope.install(index, signature.name, datum)?;
    }
    scope.set_prescribed(signatures.len());
    Ok(())
}

fn bind_field<A: Attributed + ?Sized>(object: &A, signature: &Signature) -> Result<Datum> {
    let storage = object.field(signature.name).ok_or_else(|| {
        Error::InvalidState(format!(
            "{} has no field for {}",
            object.type_name(),
            signature.name
        ))
    })?;
    if storage.kind() != signature.kind {
        return Err(Error::mismatch(signature.kind, storage.kind()));
    }
    if storage.len() != signature.count {
        return Err(Error::InvalidState(format!(
            "field {} holds {} elements, expected {}",
            signature.name,
            storage.len(),
            signature.count
        )));
    }
    Ok(Datum::external(storage))
}

fn fresh(signature: &Signature) -> Result<Datum> {
    let mut datum = Datum::with_type(signature.kind);
    if signature.kind != DatumType::Table && signature.count > 0 {
        datum.set_size(signature.count)?;
    }
    Ok(datum)
}

impl Scope {
    /// Find or create an auxiliary attribute
    ///
    /// Fails with `AttributeCollision` if `name` is prescribed.
    pub fn append_auxiliary(&mut self, name: &str) -> Result<DatumMut<'_>> {
        if self.is_prescribed(name) {
            return Err(Error::AttributeCollision(name.to_string()));
        }
        Ok(self.append(name))
    }

    /// Check if `name` is one of the prescribed attributes
    pub fn is_prescribed(&self, name: &str) -> bool {
        self.index_of(name)
            .is_some_and(|index| index < self.prescribed_count())
    }

    /// Check if `name` is an auxiliary attribute
    pub fn is_auxiliary(&self, name: &str) -> bool {
        self.index_of(name)
            .is_some_and(|index| index >= self.prescribed_count())
    }

    /// Position of the first auxiliary attribute
    pub fn auxiliary_begin(&self) -> usize {
        self.prescribed_count()
    }

    /// Iterate the prescribed attributes
    pub fn prescribed(&self) -> impl Iterator<Item = (&str, &Datum)> {
        let count = self.prescribed_count();
        self.iter().take(count)
    }

    /// Iterate the auxiliary attributes
    pub fn auxiliary(&self) -> impl Iterator<Item = (&str, &Datum)> {
        let count = self.prescribed_count();
        self.iter().skip(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Field, ScopeTree};
    use glam::Vec4;

    #[derive(Debug, Clone)]
    struct Monster {
        name: Field<String>,
        health: Field<i32>,
        position: Field<Vec4>,
    }

    impl Monster {
        const SIGNATURES: &'static [Signature] = &[
            Signature::field("Name", DatumType::String, 1),
            Signature::field("Health", DatumType::Integer, 1),
            Signature::field("Position", DatumType::Vector4, 1),
            Signature::internal("Resistances", DatumType::Float, 3),
            Signature::table("Loot"),
        ];

        fn new(name: &str) -> Self {
            Self {
                name: Field::new(name.to_string()),
                health: Field::new(100),
                position: Field::new(Vec4::ZERO),
            }
        }
    }

    impl Object for Monster {
        fn type_name(&self) -> &'static str {
            "Monster"
        }

        fn populate(&self, scope: ScopeMut<'_>) -> Result<()> {
            populate(self, scope)
        }
    }

    impl Attributed for Monster {
        fn signatures(&self) -> &'static [Signature] {
            Self::SIGNATURES
        }

        fn field(&self, name: &str) -> Option<&ExternalStorage> {
            match name {
                "Name" => Some(self.name.storage()),
                "Health" => Some(self.health.storage()),
                "Position" => Some(self.position.storage()),
                _ => None,
            }
        }
    }

    fn names(scope: &Scope) -> Vec<&str> {
        scope.names().collect()
    }

    #[test]
    fn test_prescribed_prefix_in_order() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let a = tree.append_object(root, "Monsters", Box::new(Monster::new("a"))).unwrap();
        let b = tree.append_object(root, "Monsters", Box::new(Monster::new("b"))).unwrap();
        tree.scope_mut(b).unwrap().append_auxiliary("Mood").unwrap().assign(1).unwrap();

        let expected = vec!["Name", "Health", "Position", "Resistances", "Loot"];
        assert_eq!(names(tree.scope(a).unwrap()), expected);
        assert_eq!(names(tree.scope(b).unwrap())[..5], expected[..]);
        assert_eq!(tree.scope(b).unwrap().auxiliary_begin(), 5);
        assert_eq!(tree.scope(a).unwrap().find("Resistances").unwrap().size(), 3);
        assert!(tree.scope(b).unwrap().is_auxiliary("Mood"));
        assert_eq!(
            tree.scope(b).unwrap().auxiliary().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["Mood"]
        );
    }

    #[test]
    fn test_datum_writes_reach_field() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let id = tree.append_object(root, "Monsters", Box::new(Monster::new("orc"))).unwrap();

        let mut scope = tree.scope_mut(id).unwrap();
        let mut health = scope.find_mut("Health").unwrap();
        assert!(health.is_external());
        assert!(health.is_prescribed());
        health.set(40, 0).unwrap();
        assert!(matches!(health.push(1), Err(Error::UnsupportedOperation(_))));

        let monster = tree.downcast_ref::<Monster>(id).unwrap();
        assert_eq!(monster.health.get(), 40);
        monster.name.set("goblin".to_string());
        assert_eq!(
            tree.scope(id).unwrap().find("Name").unwrap().get::<String>(0).unwrap(),
            "goblin"
        );
    }

    #[test]
    fn test_auxiliary_collision() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let id = tree.append_object(root, "Monsters", Box::new(Monster::new("orc"))).unwrap();
        let mut scope = tree.scope_mut(id).unwrap();

        assert!(matches!(
            scope.append_auxiliary("Health"),
            Err(Error::AttributeCollision(name)) if name == "Health"
        ));
        assert!(scope.append_auxiliary("Bounty").is_ok());
        assert!(scope.is_prescribed("Loot"));
        assert!(!scope.is_prescribed("Bounty"));
    }

    #[test]
    fn test_clone_rebinds_fields() {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        let id = tree.append_object(root, "Monsters", Box::new(Monster::new("orc"))).unwrap();
        tree.append_scope(id, "Loot").unwrap();
        tree.scope_mut(id).unwrap().append_auxiliary("Mood").unwrap().assign(2).unwrap();

        let copy = tree.clone_subtree(id).unwrap();
        let copy_id = copy.root();
        assert!(copy.equals(copy_id, &tree, id));
        assert_eq!(names(copy.scope(copy_id).unwrap()), names(tree.scope(id).unwrap()));
        assert_eq!(copy.children(copy_id, "Loot").unwrap().len(), 1);

        let original = tree.downcast_ref::<Monster>(id).unwrap();
        let cloned = copy.downcast_ref::<Monster>(copy_id).unwrap();
        let view = copy.scope(copy_id).unwrap().find("Health").unwrap();
        assert!(view.external_storage().unwrap().ptr_eq(cloned.health.storage()));
        assert!(!view.external_storage().unwrap().ptr_eq(original.health.storage()));

        cloned.health.set(1);
        assert_eq!(original.health.get(), 100);
        assert!(!copy.equals(copy_id, &tree, id));
    }
}
