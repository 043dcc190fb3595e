//! Scope trees
//!
//! A [`ScopeTree`] owns every scope of one hierarchy, keyed by [`ScopeId`].
//! Each node pairs a [`Scope`] (its attribute table) with its [`Object`]
//! (its concrete type). Parents list children in table-typed attributes and
//! children point back at their parent; every structural operation here keeps
//! both sides in step, and none of them can make a scope its own ancestor.
//!
//! While an action or reaction runs, its object is checked out of the tree
//! so the behavior can receive `&mut ScopeTree`. The node's attribute table
//! stays in place, so upward searches still see it.
//!
//! Every path that adds or removes scopes records the change in a lifecycle
//! journal. [`EventBus::sync`](crate::EventBus::sync) drains it to subscribe
//! new reactions and forget removed ones.

use crate::error::{Error, Result};
use crate::object::{Object, PlainScope};
use crate::datum::DatumMut;
use crate::{Datum, DatumType, Scope, ScopeId, ScopeMut};
use indexmap::IndexMap;
use std::fmt;
use tracing::warn;

struct Node {
    scope: Scope,
    object: Option<Box<dyn Object>>,
}

/// A scope entering or leaving a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Attached(ScopeId),
    Detached(ScopeId),
}

/// An arena of scopes forming one tree
pub struct ScopeTree {
    nodes: IndexMap<ScopeId, Node>,
    root: ScopeId,
    journal: Vec<Lifecycle>,
}

impl ScopeTree {
    /// Create a tree with an empty plain root scope
    pub fn new() -> Self {
        Self::from_parts(Scope::new(), Box::new(PlainScope))
    }

    /// Create a tree whose root is an already-populated scope
    fn from_parts(scope: Scope, object: Box<dyn Object>) -> Self {
        let root = ScopeId::next();
        let mut nodes = IndexMap::new();
        nodes.insert(
            root,
            Node {
                scope,
                object: Some(object),
            },
        );
        Self::assemble(nodes, root)
    }

    /// Wrap detached nodes, journaling each of them as attached
    fn assemble(nodes: IndexMap<ScopeId, Node>, root: ScopeId) -> Self {
        let journal = nodes.keys().copied().map(Lifecycle::Attached).collect();
        Self {
            nodes,
            root,
            journal,
        }
    }

    /// Create a tree rooted at `object`
    pub fn with_root(object: Box<dyn Object>) -> Result<Self> {
        let mut scope = Scope::new();
        object.populate(ScopeMut::new(&mut scope))?;
        Ok(Self::from_parts(scope, object))
    }

    /// Get the root scope id
    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Get the number of scopes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree holds no scopes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check if a scope belongs to this tree
    pub fn contains(&self, id: ScopeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterate all scope ids
    pub fn ids(&self) -> impl Iterator<Item = ScopeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get a scope's attribute table
    pub fn scope(&self, id: ScopeId) -> Result<&Scope> {
        Ok(&self.node(id)?.scope)
    }

    /// Get a scope's attribute table for attribute changes
    ///
    /// The scope itself stays owned by the tree: its parent link and child
    /// tables change only through the structural operations here.
    pub fn scope_mut(&mut self, id: ScopeId) -> Result<ScopeMut<'_>> {
        Ok(ScopeMut::new(&mut self.node_mut(id)?.scope))
    }

    /// Get a scope's object
    pub fn object(&self, id: ScopeId) -> Result<&dyn Object> {
        self.node(id)?
            .object
            .as_deref()
            .ok_or_else(|| checked_out(id))
    }

    /// Get a scope's object mutably
    pub fn object_mut(&mut self, id: ScopeId) -> Result<&mut dyn Object> {
        match self.node_mut(id)?.object.as_deref_mut() {
            Some(object) => Ok(object),
            None => Err(checked_out(id)),
        }
    }

    /// Borrow a scope's object as a concrete type
    pub fn downcast_ref<T: Object>(&self, id: ScopeId) -> Option<&T> {
        self.object(id).ok()?.downcast_ref::<T>()
    }

    /// Mutably borrow a scope's object as a concrete type
    pub fn downcast_mut<T: Object>(&mut self, id: ScopeId) -> Option<&mut T> {
        self.object_mut(id).ok()?.downcast_mut::<T>()
    }

    /// Get the class name of a scope's object
    pub fn type_name(&self, id: ScopeId) -> Option<&'static str> {
        self.object(id).ok().map(|object| object.type_name())
    }

    /// Check if a scope's object is, or derives from, `type_name`
    pub fn is(&self, id: ScopeId, type_name: &str) -> bool {
        self.object(id).is_ok_and(|object| object.is(type_name))
    }

    /// Get the parent of a scope
    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.nodes.get(&id)?.scope.parent()
    }

    /// Append a new plain child scope under `parent`'s table attribute `name`
    pub fn append_scope(&mut self, parent: ScopeId, name: &str) -> Result<ScopeId> {
        self.append_object(parent, name, Box::new(PlainScope))
    }

    /// Append `object` as a new child under `parent`'s table attribute `name`
    ///
    /// The table attribute is created if missing. The object's prescribed
    /// attributes are installed before it is linked in.
    pub fn append_object(
        &mut self,
        parent: ScopeId,
        name: &str,
        object: Box<dyn Object>,
    ) -> Result<ScopeId> {
        self.table_mut(parent, name)?;

        let mut scope = Scope::new();
        scope.set_parent(Some(parent));
        object.populate(ScopeMut::new(&mut scope))?;

        let id = ScopeId::next();
        self.nodes.insert(
            id,
            Node {
                scope,
                object: Some(object),
            },
        );
        self.table_mut(parent, name)?.push_scope(id)?;
        self.journal.push(Lifecycle::Attached(id));
        Ok(id)
    }

    /// Get the children listed in `id`'s table attribute `name`
    ///
    /// A missing attribute has no children.
    pub fn children(&self, id: ScopeId, name: &str) -> Result<Vec<ScopeId>> {
        match self.scope(id)?.find(name) {
            Some(datum) => datum.scopes(),
            None => Ok(Vec::new()),
        }
    }

    /// Find the first child in table `name` whose `Name` attribute is `instance_name`
    pub fn find_named(&self, id: ScopeId, name: &str, instance_name: &str) -> Option<ScopeId> {
        self.children(id, name).ok()?.into_iter().find(|child| {
            self.nodes
                .get(child)
                .and_then(|node| node.scope.find("Name"))
                .and_then(|datum| datum.get::<String>(0).ok())
                .is_some_and(|value| value == instance_name)
        })
    }

    /// Search for `name` in `id` and then in each ancestor in turn
    ///
    /// Returns the scope that holds the attribute along with the attribute.
    pub fn search(&self, id: ScopeId, name: &str) -> Option<(ScopeId, &Datum)> {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let scope = &self.nodes.get(&scope_id)?.scope;
            if let Some(datum) = scope.find(name) {
                return Some((scope_id, datum));
            }
            current = scope.parent();
        }
        None
    }

    /// Search upward for `name`, for element changes
    pub fn search_mut(&mut self, id: ScopeId, name: &str) -> Option<DatumMut<'_>> {
        let (owner, _) = self.search(id, name)?;
        self.nodes.get_mut(&owner)?.scope.find_mut(name)
    }

    /// Find which parent attribute holds `id`: (parent, attribute, index)
    pub fn containing(&self, id: ScopeId) -> Option<(ScopeId, String, usize)> {
        let parent = self.parent(id)?;
        let (name, index) = self.nodes.get(&parent)?.scope.find_child(id)?;
        Some((parent, name.to_string(), index))
    }

    /// Check if `ancestor` is a proper ancestor of `id`
    pub fn is_ancestor(&self, ancestor: ScopeId, id: ScopeId) -> bool {
        let mut current = self.parent(id);
        while let Some(scope_id) = current {
            if scope_id == ancestor {
                return true;
            }
            current = self.parent(scope_id);
        }
        false
    }

    /// Get `id` and all its descendants, parents before children
    pub fn subtree(&self, id: ScopeId) -> Vec<ScopeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(&next) {
                out.push(next);
                stack.extend(node.scope.child_ids().into_iter().rev());
            }
        }
        out
    }

    /// Detach `id` from its parent without destroying it
    ///
    /// The returned tree owns the scope and all its descendants; `id` is its
    /// root and has no parent.
    pub fn orphan(&mut self, id: ScopeId) -> Result<ScopeTree> {
        if id == self.root {
            return Err(Error::InvalidState("cannot orphan the root scope".into()));
        }
        self.node(id)?;
        self.unlink(id);

        let mut nodes = IndexMap::new();
        for scope_id in self.subtree(id) {
            if let Some(node) = self.nodes.swap_remove(&scope_id) {
                self.journal.push(Lifecycle::Detached(scope_id));
                nodes.insert(scope_id, node);
            }
        }
        Ok(ScopeTree::assemble(nodes, id))
    }

    /// Move every scope of `tree` into this tree under `parent`'s table `name`
    pub fn insert_tree(&mut self, parent: ScopeId, name: &str, tree: ScopeTree) -> Result<ScopeId> {
        let ScopeTree { nodes, root, .. } = tree;
        if self.nodes.contains_key(&root) {
            return Err(Error::InvalidState(format!("{} is already in this tree", root)));
        }
        self.table_mut(parent, name)?;

        self.journal
            .extend(nodes.keys().copied().map(Lifecycle::Attached));
        self.nodes.extend(nodes);
        self.node_mut(root)?.scope.set_parent(Some(parent));
        self.table_mut(parent, name)?.push_scope(root)?;
        Ok(root)
    }

    /// Re-parent `id` under `new_parent`'s table attribute `name`
    pub fn adopt(&mut self, id: ScopeId, new_parent: ScopeId, name: &str) -> Result<()> {
        if id == self.root {
            return Err(Error::InvalidState("cannot re-parent the root scope".into()));
        }
        self.node(id)?;
        if id == new_parent || self.is_ancestor(id, new_parent) {
            return Err(Error::InvalidState(format!(
                "{} cannot adopt its own ancestor {}",
                new_parent, id
            )));
        }
        self.table_mut(new_parent, name)?;

        self.unlink(id);
        self.node_mut(id)?.scope.set_parent(Some(new_parent));
        self.table_mut(new_parent, name)?.push_scope(id)
    }

    /// Destroy `id` and all its descendants
    ///
    /// Returns the removed ids, children before their parents.
    pub fn destroy(&mut self, id: ScopeId) -> Result<Vec<ScopeId>> {
        if id == self.root {
            return Err(Error::InvalidState("cannot destroy the root scope".into()));
        }
        let mut detached = self.orphan(id)?;
        let mut removed = detached.subtree(id);
        removed.reverse();
        for scope_id in &removed {
            detached.nodes.swap_remove(scope_id);
        }
        Ok(removed)
    }

    /// Destroy every child listed in `id`'s table attribute `name`
    pub fn clear_table(&mut self, id: ScopeId, name: &str) -> Result<Vec<ScopeId>> {
        let mut removed = Vec::new();
        for child in self.children(id, name)? {
            removed.extend(self.destroy(child)?);
        }
        Ok(removed)
    }

    /// Deep-copy `id` and its descendants into a new tree
    ///
    /// The copy gets fresh ids, re-pointed parents, cloned objects and
    /// re-installed prescribed attributes, so it shares nothing with this tree.
    pub fn clone_subtree(&self, id: ScopeId) -> Result<ScopeTree> {
        let mut nodes = IndexMap::new();
        let root = self.copy_into(id, None, true, &mut nodes)?;
        Ok(ScopeTree::assemble(nodes, root))
    }

    /// Deep-copy the whole tree
    pub fn clone_tree(&self) -> Result<ScopeTree> {
        self.clone_subtree(self.root)
    }

    /// Deep-copy `source_id` from `source` under `parent`'s table `name`
    pub fn graft(
        &mut self,
        parent: ScopeId,
        name: &str,
        source: &ScopeTree,
        source_id: ScopeId,
    ) -> Result<ScopeId> {
        let copy = source.clone_subtree(source_id)?;
        self.insert_tree(parent, name, copy)
    }

    /// Compare the subtree at `id` with the subtree at `other_id` in `other`
    ///
    /// Scopes are equal when their types match and their attributes match
    /// by name, order and value, with tables compared child by child.
    pub fn equals(&self, id: ScopeId, other: &ScopeTree, other_id: ScopeId) -> bool {
        let (Some(a), Some(b)) = (self.nodes.get(&id), other.nodes.get(&other_id)) else {
            return false;
        };
        let type_of = |node: &Node| node.object.as_deref().map(|object| object.type_name());
        if type_of(a) != type_of(b) || a.scope.len() != b.scope.len() {
            return false;
        }

        a.scope.iter().zip(b.scope.iter()).all(|((name_a, da), (name_b, db))| {
            if name_a != name_b {
                return false;
            }
            match (da.scopes(), db.scopes()) {
                (Ok(left), Ok(right)) => {
                    left.len() == right.len()
                        && left
                            .iter()
                            .zip(&right)
                            .all(|(&l, &r)| self.equals(l, other, r))
                }
                _ => da == db,
            }
        })
    }

    /// Take the pending lifecycle changes, oldest first
    pub(crate) fn drain_lifecycle(&mut self) -> Vec<Lifecycle> {
        std::mem::take(&mut self.journal)
    }

    /// Put back changes that could not be handled yet
    pub(crate) fn requeue_lifecycle(&mut self, changes: Vec<Lifecycle>) {
        self.journal.splice(0..0, changes);
    }

    pub(crate) fn check_out(&mut self, id: ScopeId) -> Result<Box<dyn Object>> {
        self.node_mut(id)?
            .object
            .take()
            .ok_or_else(|| checked_out(id))
    }

    pub(crate) fn check_in(&mut self, id: ScopeId, object: Box<dyn Object>) {
        match self.nodes.get_mut(&id) {
            Some(node) => node.object = Some(object),
            None => warn!(%id, "scope removed while its object was checked out"),
        }
    }

    fn node(&self, id: ScopeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(Error::ScopeNotFound(id))
    }

    fn node_mut(&mut self, id: ScopeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(Error::ScopeNotFound(id))
    }

    /// Find or create `id`'s table attribute `name`
    fn table_mut(&mut self, id: ScopeId, name: &str) -> Result<&mut Datum> {
        let datum = self
            .node_mut(id)?
            .scope
            .append_typed(name, DatumType::Table)?;
        Ok(datum.into_inner())
    }

    /// Remove `id` from its parent's table and clear its back-reference
    fn unlink(&mut self, id: ScopeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let removed = self.nodes.get_mut(&parent).and_then(|node| {
            node.scope
                .attributes_mut()
                .find_map(|datum| datum.remove_scope(id))
        });
        if removed.is_none() {
            warn!(%id, %parent, "parent did not list its child");
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.scope.set_parent(None);
        }
    }

    fn copy_into(
        &self,
        id: ScopeId,
        parent: Option<ScopeId>,
        strict: bool,
        out: &mut IndexMap<ScopeId, Node>,
    ) -> Result<ScopeId> {
        let node = self.node(id)?;
        let object = match node.object.as_deref() {
            Some(object) => object.clone_object(),
            None if strict => return Err(checked_out(id)),
            None => {
                warn!(%id, "copying a scope in use as a plain scope");
                Box::new(PlainScope)
            }
        };

        let new_id = ScopeId::next();
        let mut scope = node.scope.clone();
        scope.set_parent(parent);
        for datum in scope.attributes_mut() {
            if let Ok(children) = datum.scopes() {
                let mut copies = Vec::with_capacity(children.len());
                for child in children {
                    copies.push(self.copy_into(child, Some(new_id), strict, out)?);
                }
                datum.replace_scopes(copies);
            }
        }
        object.populate(ScopeMut::new(&mut scope))?;

        out.insert(
            new_id,
            Node {
                scope,
                object: Some(object),
            },
        );
        Ok(new_id)
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ScopeTree {
    /// Deep-copies the whole tree; an object in use is copied as a plain scope
    fn clone(&self) -> Self {
        let mut nodes = IndexMap::new();
        match self.copy_into(self.root, None, false, &mut nodes) {
            Ok(root) => ScopeTree::assemble(nodes, root),
            Err(error) => {
                warn!(%error, "tree copy failed, starting from an empty tree");
                ScopeTree::new()
            }
        }
    }
}

impl PartialEq for ScopeTree {
    fn eq(&self, other: &Self) -> bool {
        self.equals(self.root, other, other.root)
    }
}

impl fmt::Debug for ScopeTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeTree")
            .field("root", &self.root)
            .field("scopes", &self.nodes.len())
            .field("pending", &self.journal.len())
            .finish()
    }
}

fn checked_out(id: ScopeId) -> Error {
    Error::InvalidState(format!("the object of {} is in use", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> (ScopeTree, ScopeId, ScopeId) {
        let mut tree = ScopeTree::new();
        let root = tree.root();
        tree.scope_mut(root).unwrap().append("Gravity").assign(9.8f32).unwrap();
        let sector = tree.append_scope(root, "Sectors").unwrap();
        tree.scope_mut(sector).unwrap().append("Name").assign("Dales Sector".to_string()).unwrap();
        let entity = tree.append_scope(sector, "Entities").unwrap();
        tree.scope_mut(entity).unwrap().append("Health").assign(100).unwrap();
        (tree, sector, entity)
    }

    #[test]
    fn test_append_scope_links_parent() {
        let (tree, sector, entity) = world();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.parent(sector), Some(tree.root()));
        assert_eq!(tree.parent(entity), Some(sector));
        assert_eq!(tree.children(tree.root(), "Sectors").unwrap(), vec![sector]);
        assert_eq!(
            tree.containing(entity),
            Some((sector, "Entities".to_string(), 0))
        );
        assert_eq!(tree.type_name(entity), Some("Scope"));
    }

    #[test]
    fn test_append_scope_type_mismatch() {
        let (mut tree, _, entity) = world();
        assert!(matches!(
            tree.append_scope(entity, "Health"),
            Err(Error::TypeMismatch { .. })
        ));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_search_walks_up() {
        let (tree, sector, entity) = world();
        let (owner, datum) = tree.search(entity, "Gravity").unwrap();
        assert_eq!(owner, tree.root());
        assert_eq!(datum.get::<f32>(0).unwrap(), 9.8);

        assert_eq!(tree.search(entity, "Name").map(|(owner, _)| owner), Some(sector));
        assert!(tree.search(entity, "Missing").is_none());
        assert!(tree.scope(entity).unwrap().find("Gravity").is_none());
        assert_eq!(tree.find_named(tree.root(), "Sectors", "Dales Sector"), Some(sector));
    }

    #[test]
    fn test_search_mut_writes_ancestor() {
        let (mut tree, _, entity) = world();
        tree.search_mut(entity, "Gravity").unwrap().set(1.6f32, 0).unwrap();
        let root = tree.root();
        assert_eq!(tree.scope(root).unwrap().find("Gravity").unwrap().get::<f32>(0).unwrap(), 1.6);
    }

    #[test]
    fn test_orphan_transfers_ownership() {
        let (mut tree, sector, entity) = world();
        let detached = tree.orphan(sector).unwrap();

        assert_eq!(tree.len(), 1);
        assert!(tree.children(tree.root(), "Sectors").unwrap().is_empty());
        assert_eq!(detached.root(), sector);
        assert_eq!(detached.parent(sector), None);
        assert_eq!(detached.parent(entity), Some(sector));
        assert!(tree.orphan(tree.root()).is_err());

        let root = tree.root();
        tree.insert_tree(root, "Sectors", detached).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.parent(sector), Some(root));
    }

    #[test]
    fn test_destroy_removes_descendants() {
        let (mut tree, sector, entity) = world();
        let removed = tree.destroy(sector).unwrap();
        assert_eq!(removed, vec![entity, sector]);
        assert!(!tree.contains(entity));
        assert!(tree.children(tree.root(), "Sectors").unwrap().is_empty());
        assert!(matches!(tree.destroy(sector), Err(Error::ScopeNotFound(_))));
    }

    #[test]
    fn test_adopt_rejects_cycles() {
        let (mut tree, sector, entity) = world();
        assert!(tree.adopt(sector, entity, "Inner").is_err());
        assert!(tree.adopt(sector, sector, "Self").is_err());

        let root = tree.root();
        tree.adopt(entity, root, "Entities").unwrap();
        assert_eq!(tree.parent(entity), Some(root));
        assert!(tree.children(sector, "Entities").unwrap().is_empty());
        assert_eq!(tree.children(root, "Entities").unwrap(), vec![entity]);
    }

    #[test]
    fn test_clone_is_independent() {
        let (tree, _, _) = world();
        let mut copy = tree.clone();
        assert_eq!(copy, tree);
        assert_ne!(copy.root(), tree.root());

        let sector = copy.children(copy.root(), "Sectors").unwrap()[0];
        assert_eq!(copy.parent(sector), Some(copy.root()));
        let entity = copy.children(sector, "Entities").unwrap()[0];
        copy.scope_mut(entity).unwrap().append("Health").set(5, 0).unwrap();

        assert_ne!(copy, tree);
        let original = tree.children(tree.root(), "Sectors").unwrap()[0];
        let original_entity = tree.children(original, "Entities").unwrap()[0];
        assert_eq!(
            tree.scope(original_entity).unwrap().find("Health").unwrap().get::<i32>(0).unwrap(),
            100
        );
    }

    #[test]
    fn test_lifecycle_journal_tracks_membership() {
        let (mut tree, sector, entity) = world();
        let root = tree.root();
        assert_eq!(
            tree.drain_lifecycle(),
            vec![
                Lifecycle::Attached(root),
                Lifecycle::Attached(sector),
                Lifecycle::Attached(entity),
            ]
        );

        let removed = tree.destroy(sector).unwrap();
        assert_eq!(
            tree.drain_lifecycle(),
            removed.iter().rev().copied().map(Lifecycle::Detached).collect::<Vec<_>>()
        );

        let copy = tree.clone_tree().unwrap();
        let copy_root = copy.root();
        tree.insert_tree(root, "Copies", copy).unwrap();
        assert_eq!(tree.drain_lifecycle(), vec![Lifecycle::Attached(copy_root)]);
        assert!(tree.drain_lifecycle().is_empty());
    }

    #[test]
    fn test_orphan_tolerates_unlisted_child() {
        let (mut tree, sector, entity) = world();
        if let Some(node) = tree.nodes.get_mut(&sector) {
            for datum in node.scope.attributes_mut() {
                datum.remove_scope(entity);
            }
        }

        let detached = tree.orphan(entity).unwrap();
        assert_eq!(detached.parent(entity), None);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_graft_copies_between_trees() {
        let (source, sector, _) = world();
        let mut target = ScopeTree::new();
        let root = target.root();
        let copy = target.graft(root, "Imported", &source, sector).unwrap();

        assert_eq!(target.len(), 3);
        assert!(target.equals(copy, &source, sector));
        assert_eq!(target.parent(copy), Some(root));
    }
}
