//! Ordered, named attribute tables

use crate::error::{Error, Result};
use crate::datum::DatumMut;
use crate::{Datum, DatumType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a scope in a [`ScopeTree`](crate::ScopeTree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u64);

impl ScopeId {
    /// Allocate a fresh identifier
    pub(crate) fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope:{}", self.0)
    }
}

/// An ordered table of named datums
///
/// Insertion order is the canonical iteration order. Table-typed datums list
/// child scopes, which are owned by the enclosing tree; the table itself only
/// records the parent back-reference and how many leading attributes are
/// prescribed.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    attributes: IndexMap<String, Datum>,
    parent: Option<ScopeId>,
    prescribed: usize,
}

impl Scope {
    /// Create an empty scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the attribute `name`
    ///
    /// New attributes start untyped.
    pub fn append(&mut self, name: &str) -> DatumMut<'_> {
        let prescribed = self.prescribed;
        let entry = self.attributes.entry(name.to_string());
        let index = entry.index();
        DatumMut::new(entry.or_default(), index < prescribed)
    }

    /// Find or create the attribute `name` with a given type
    ///
    /// An existing attribute must be untyped or already of that type.
    pub fn append_typed(&mut self, name: &str, kind: DatumType) -> Result<DatumMut<'_>> {
        let mut datum = self.append(name);
        datum.set_type(kind)?;
        Ok(datum)
    }

    /// Find an attribute in this table only
    pub fn find(&self, name: &str) -> Option<&Datum> {
        self.attributes.get(name)
    }

    /// Find an attribute in this table only, for element changes
    pub fn find_mut(&mut self, name: &str) -> Option<DatumMut<'_>> {
        let prescribed = self.prescribed;
        let (index, _, datum) = self.attributes.get_full_mut(name)?;
        Some(DatumMut::new(datum, index < prescribed))
    }

    /// Get an attribute by position
    pub fn get(&self, index: usize) -> Option<(&str, &Datum)> {
        self.attributes
            .get_index(index)
            .map(|(name, datum)| (name.as_str(), datum))
    }

    /// Get an attribute by position, for element changes
    pub fn get_mut(&mut self, index: usize) -> Option<(&str, DatumMut<'_>)> {
        let prescribed = index < self.prescribed;
        self.attributes
            .get_index_mut(index)
            .map(|(name, datum)| (name.as_str(), DatumMut::new(datum, prescribed)))
    }

    /// Get the position of an attribute
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.get_index_of(name)
    }

    /// Check if an attribute exists
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Get the number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the scope has no attributes
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate attributes in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.attributes
            .iter()
            .map(|(name, datum)| (name.as_str(), datum))
    }

    /// Iterate attribute names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Get the parent scope, if this is not a root
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// Find which table attribute holds `child`, and at which index
    pub fn find_child(&self, child: ScopeId) -> Option<(&str, usize)> {
        self.attributes.iter().find_map(|(name, datum)| {
            let ids = datum.scopes().ok()?;
            let index = ids.iter().position(|&id| id == child)?;
            Some((name.as_str(), index))
        })
    }

    /// Get the ids of every child scope, attribute by attribute
    pub fn child_ids(&self) -> Vec<ScopeId> {
        self.attributes
            .values()
            .filter_map(|datum| datum.scopes().ok())
            .flatten()
            .collect()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ScopeId>) {
        self.parent = parent;
    }

    pub(crate) fn set_prescribed(&mut self, count: usize) {
        self.prescribed = count;
    }

    pub(crate) fn prescribed_count(&self) -> usize {
        self.prescribed
    }

    pub(crate) fn attributes_mut(&mut self) -> impl Iterator<Item = &mut Datum> {
        self.attributes.values_mut()
    }

    /// Put `datum` at position `index` under `name`, moving or inserting it
    pub(crate) fn install(&mut self, index: usize, name: &str, datum: Datum) -> Result<()> {
        if index > self.attributes.len() {
            return Err(Error::IndexOutOfRange {
                index,
                size: self.attributes.len(),
            });
        }
        match self.attributes.get_index_of(name) {
            Some(existing) => {
                if existing != index {
                    self.attributes.move_index(existing, index);
                }
                self.attributes[index] = datum;
            }
            None => {
                self.attributes.shift_insert(index, name.to_string(), datum);
            }
        }
        Ok(())
    }
}

/// Mutable access to a scope owned by a tree
///
/// Attributes can be appended and their elements changed, but the scope
/// itself cannot be replaced, so its parent link and child tables stay under
/// the tree's control. Reads go through `Deref<Target = Scope>`.
pub struct ScopeMut<'a> {
    scope: &'a mut Scope,
}

impl<'a> ScopeMut<'a> {
    pub(crate) fn new(scope: &'a mut Scope) -> Self {
        Self { scope }
    }

    pub(crate) fn into_inner(self) -> &'a mut Scope {
        self.scope
    }

    /// Find or create the attribute `name`
    pub fn append(&mut self, name: &str) -> DatumMut<'_> {
        self.scope.append(name)
    }

    /// Find or create the attribute `name` with a given type
    pub fn append_typed(&mut self, name: &str, kind: DatumType) -> Result<DatumMut<'_>> {
        self.scope.append_typed(name, kind)
    }

    /// Find or create an auxiliary attribute
    ///
    /// Fails with `AttributeCollision` if `name` is prescribed.
    pub fn append_auxiliary(&mut self, name: &str) -> Result<DatumMut<'_>> {
        self.scope.append_auxiliary(name)
    }

    /// Find an attribute, for element changes
    pub fn find_mut(&mut self, name: &str) -> Option<DatumMut<'_>> {
        self.scope.find_mut(name)
    }

    /// Get an attribute by position, for element changes
    pub fn get_mut(&mut self, index: usize) -> Option<(&str, DatumMut<'_>)> {
        self.scope.get_mut(index)
    }
}

impl Deref for ScopeMut<'_> {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        self.scope
    }
}

impl fmt::Debug for ScopeMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.scope.fmt(f)
    }
}
