// Ousia - Semantic Document Framework
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The managed node graph.
//!
//! All nodes of projects, typesystems, ontologies and documents live in one
//! [`Manager`] arena and are addressed by generational [`NodeId`]s. Every
//! node has at most one owning (composition) parent; reference edges never
//! own their target. [`Manager::collect`] drops every node that is not
//! transitively owned by a registered root, so reference cycles never keep
//! nodes alive.
//!
//! Containers are [`NodeVector`]s with a name [`Index`]; the manager keeps
//! the indices current when nodes are renamed.

mod event;
mod index;
mod node;
mod resolve;
mod validate;

pub use event::{ListenerId, NameChange, NameChangeCallback};
pub use index::{Index, NodeVector};
pub use node::{Edge, NodeKind, Slot};
pub use resolve::ResolutionResult;
pub(crate) use validate::ValidationContext;

use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;

use slotmap::{new_key_type, SlotMap};

use crate::error::{LoggableException, OusiaResult};
use crate::location::SourceLocation;
use crate::rtti::{types, Rtti};
use crate::variant::Variant;

use event::Listener;

new_key_type! {
    /// Handle of a node in a [`Manager`].
    pub struct NodeId;
}

/// Unique, never reused node number.
pub type Uid = u64;

/// A node: common bookkeeping plus the class specific [`NodeKind`].
#[derive(Debug)]
pub struct NodeData {
    uid: Uid,
    name: String,
    parent: Option<NodeId>,
    slot: Option<Slot>,
    location: SourceLocation,
    pub(crate) kind: NodeKind,
    listeners: Vec<Listener>,
    validated: Cell<bool>,
}

impl NodeData {
    pub fn uid(&self) -> Uid {
        self.uid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning parent.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Slot of the parent this node is stored in.
    pub fn slot(&self) -> Option<Slot> {
        self.slot
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn rtti(&self) -> &'static Rtti {
        self.kind.rtti()
    }
}

/// Arena owning all nodes.
pub struct Manager {
    nodes: SlotMap<NodeId, NodeData>,
    roots: HashSet<NodeId>,
    callbacks: SlotMap<ListenerId, (NodeId, NameChangeCallback)>,
    next_uid: Uid,
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots.len())
            .field("listeners", &self.callbacks.len())
            .finish()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: HashSet::new(),
            callbacks: SlotMap::with_key(),
            next_uid: 1,
        }
    }

    pub(crate) fn create(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let uid = self.next_uid;
        self.next_uid += 1;
        self.nodes.insert(NodeData {
            uid,
            name: name.into(),
            parent: None,
            slot: None,
            location: SourceLocation::default(),
            kind,
            listeners: Vec::new(),
            validated: Cell::new(false),
        })
    }

    // ==================== Access ====================

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter()
    }

    /// Like [`Manager::get`] but failing for stale handles.
    pub fn node(&self, id: NodeId) -> OusiaResult<&NodeData> {
        self.nodes
            .get(id)
            .ok_or_else(|| LoggableException::structure("Invalid node handle"))
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    /// Mutable payload access; invalidates the cached validation state.
    pub(crate) fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        self.invalidate(id);
        self.nodes.get_mut(id).map(|n| &mut n.kind)
    }

    pub fn uid(&self, id: NodeId) -> Option<Uid> {
        self.nodes.get(id).map(|n| n.uid)
    }

    /// Name of a node; empty for unnamed or stale nodes.
    pub fn name(&self, id: NodeId) -> &str {
        self.nodes.get(id).map_or("", |n| n.name.as_str())
    }

    pub fn location(&self, id: NodeId) -> SourceLocation {
        self.nodes.get(id).map_or_else(SourceLocation::default, |n| n.location)
    }

    pub fn set_location(&mut self, id: NodeId, location: SourceLocation) {
        if let Some(n) = self.nodes.get_mut(id) {
            n.location = location;
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Type of a node; [`types::NONE`] for stale handles.
    pub fn rtti(&self, id: NodeId) -> &'static Rtti {
        self.nodes.get(id).map_or(&types::NONE, |n| n.rtti())
    }

    pub fn isa(&self, id: NodeId, ty: &Rtti) -> bool {
        self.nodes.get(id).map_or(false, |n| n.rtti().isa(ty))
    }

    /// Object variant referring to a node.
    pub fn object(&self, id: NodeId) -> Variant {
        Variant::object(id, self.rtti(id))
    }

    /// Nodes stored in a vector slot; empty if the node has no such slot.
    pub fn children(&self, id: NodeId, slot: Slot) -> &[NodeId] {
        self.kind(id)
            .and_then(|k| k.vector(slot))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Resolves a name in the index of a vector slot.
    pub fn child_by_name(&self, id: NodeId, slot: Slot, name: &str) -> Option<NodeId> {
        self.kind(id)
            .and_then(|k| k.vector(slot))
            .and_then(|v| v.resolve(name))
    }

    /// Nodes owned by `id`.
    pub fn composition_children(&self, id: NodeId) -> Vec<NodeId> {
        self.edges(id)
            .into_iter()
            .filter(|e| e.composition)
            .map(|e| e.target)
            .collect()
    }

    /// Nodes referred to by `id` without owning them.
    pub fn reference_targets(&self, id: NodeId) -> Vec<NodeId> {
        self.edges(id)
            .into_iter()
            .filter(|e| !e.composition)
            .map(|e| e.target)
            .collect()
    }

    pub fn edges(&self, id: NodeId) -> Vec<Edge> {
        self.kind(id).map(NodeKind::edges).unwrap_or_default()
    }

    /// Walks the owning parents starting with the parent of `id`.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Whether `ancestor` transitively owns `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Closest owning ancestor (or the node itself) of the given type.
    pub fn nearest_of_type(&self, id: NodeId, ty: &Rtti) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.isa(*n, ty))
    }

    /// Names from the outermost named ancestor down to the node.
    pub fn path(&self, id: NodeId) -> Vec<String> {
        let mut path: Vec<String> = std::iter::once(id)
            .chain(self.ancestors(id))
            .map(|n| self.name(n))
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        path.reverse();
        path
    }

    /// Dotted form of [`Manager::path`].
    pub fn path_string(&self, id: NodeId) -> String {
        self.path(id).join(".")
    }

    // ==================== Names ====================

    /// Renames a node, updating every index containing it and notifying
    /// registered listeners.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        let name = name.into();
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.name == name {
            return;
        }
        let change = NameChange {
            old_name: std::mem::replace(&mut node.name, name.clone()),
            new_name: name,
        };
        let listeners = node.listeners.clone();
        self.invalidate(id);
        for listener in listeners {
            match listener {
                Listener::Index { owner, slot } => {
                    if let Some(v) = self.nodes.get_mut(owner).and_then(|o| o.kind.vector_mut(slot)) {
                        v.rename(&change.old_name, &change.new_name, id);
                    }
                    self.invalidate(owner);
                }
                Listener::Callback(lid) => {
                    if let Some((_, callback)) = self.callbacks.get_mut(lid) {
                        callback(id, &change);
                    }
                }
            }
        }
    }

    /// Registers a callback invoked whenever `id` is renamed.
    pub fn add_name_listener(&mut self, id: NodeId, callback: NameChangeCallback) -> ListenerId {
        let lid = self.callbacks.insert((id, callback));
        if let Some(node) = self.nodes.get_mut(id) {
            node.listeners.push(Listener::Callback(lid));
        }
        lid
    }

    pub fn remove_name_listener(&mut self, lid: ListenerId) -> bool {
        match self.callbacks.remove(lid) {
            Some((id, _)) => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.listeners.retain(|l| *l != Listener::Callback(lid));
                }
                true
            }
            None => false,
        }
    }

    // ==================== Edges ====================

    /// Appends `child` to a vector slot of `owner`.
    ///
    /// For composition slots the child is first removed from its previous
    /// owner; making a node own one of its ancestors is rejected.
    pub(crate) fn attach(&mut self, owner: NodeId, slot: Slot, child: NodeId) -> OusiaResult<()> {
        self.check_attach(owner, slot, child)?;
        if slot.is_composition() {
            self.detach(child);
        }
        let name = self.name(child).to_string();
        if slot.is_single() {
            let previous = self
                .nodes
                .get_mut(owner)
                .and_then(|o| o.kind.single_mut(slot))
                .and_then(|s| s.replace(child));
            if let Some(previous) = previous {
                self.clear_parent(previous);
            }
        } else {
            let vector = self
                .nodes
                .get_mut(owner)
                .and_then(|o| o.kind.vector_mut(slot))
                .ok_or_else(|| LoggableException::structure(format!("Node has no slot {slot:?}")))?;
            vector.push(child, &name);
            if let Some(node) = self.nodes.get_mut(child) {
                node.listeners.push(Listener::Index { owner, slot });
            }
        }
        if slot.is_composition() {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = Some(owner);
                node.slot = Some(slot);
            }
        }
        self.invalidate(owner);
        Ok(())
    }

    fn check_attach(&self, owner: NodeId, slot: Slot, child: NodeId) -> OusiaResult<()> {
        let owner_node = self.node(owner)?;
        self.node(child)?;
        let has_slot = if slot.is_single() {
            matches!(
                (&owner_node.kind, slot),
                (NodeKind::StructuredClass(_), Slot::DescriptorAttributes)
                    | (NodeKind::AnnotationClass(_), Slot::DescriptorAttributes)
                    | (NodeKind::Document(_), Slot::DocumentRoot)
            )
        } else {
            let entity_field = matches!(slot, Slot::EntityField(_))
                && matches!(
                    owner_node.kind,
                    NodeKind::StructuredEntity(_) | NodeKind::AnnotationEntity(_)
                );
            entity_field || owner_node.kind.vector(slot).is_some()
        };
        if !has_slot {
            return Err(LoggableException::structure(format!(
                "{} has no slot {slot:?}",
                owner_node.rtti()
            )));
        }
        if slot.is_composition() && (owner == child || self.is_ancestor(child, owner)) {
            return Err(LoggableException::structure(format!(
                "Cannot make \"{}\" own its ancestor \"{}\"",
                self.path_string(owner),
                self.path_string(child)
            )));
        }
        Ok(())
    }

    /// Removes a node from its owner. Returns false if it had none.
    pub(crate) fn detach(&mut self, child: NodeId) -> bool {
        let Some((owner, slot)) = self
            .nodes
            .get(child)
            .and_then(|n| Some((n.parent?, n.slot?)))
        else {
            return false;
        };
        self.remove_from(owner, slot, child)
    }

    /// Removes `child` from a slot of `owner`.
    pub(crate) fn remove_from(&mut self, owner: NodeId, slot: Slot, child: NodeId) -> bool {
        let name = self.name(child).to_string();
        let removed = match self.nodes.get_mut(owner) {
            Some(o) if slot.is_single() => match o.kind.single_mut(slot) {
                Some(s) if *s == Some(child) => {
                    *s = None;
                    true
                }
                _ => false,
            },
            Some(o) => o
                .kind
                .vector_mut(slot)
                .map_or(false, |v| v.remove(child, &name)),
            None => false,
        };
        if !removed {
            return false;
        }
        if let Some(node) = self.nodes.get_mut(child) {
            if let Some(pos) = node
                .listeners
                .iter()
                .position(|l| *l == Listener::Index { owner, slot })
            {
                node.listeners.remove(pos);
            }
        }
        if slot.is_composition() {
            self.clear_parent(child);
        }
        self.invalidate(owner);
        true
    }

    fn clear_parent(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
            node.slot = None;
        }
    }

    /// Moves an element of a vector slot to a new position.
    pub(crate) fn move_in_slot(&mut self, owner: NodeId, slot: Slot, child: NodeId, pos: usize) {
        if let Some(v) = self.nodes.get_mut(owner).and_then(|o| o.kind.vector_mut(slot)) {
            v.move_to(child, pos);
        }
        self.invalidate(owner);
    }

    // ==================== Lifetime ====================

    /// Keeps `id` and everything it owns alive across [`Manager::collect`].
    pub fn add_root(&mut self, id: NodeId) {
        self.roots.insert(id);
    }

    pub fn remove_root(&mut self, id: NodeId) -> bool {
        self.roots.remove(&id)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.roots.contains(&id)
    }

    /// Drops every node not owned (transitively) by a root and returns the
    /// number of dropped nodes. References to dropped nodes dangle and are
    /// reported by validation.
    pub fn collect(&mut self) -> usize {
        self.roots.retain(|r| self.nodes.contains_key(*r));
        let mut marked: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().copied().collect();
        while let Some(id) = stack.pop() {
            if marked.insert(id) {
                stack.extend(self.composition_children(id));
            }
        }
        let dead: Vec<NodeId> = self
            .nodes
            .keys()
            .filter(|id| !marked.contains(id))
            .collect();
        for id in &dead {
            if let Some(node) = self.nodes.remove(*id) {
                for listener in node.listeners {
                    if let Listener::Callback(lid) = listener {
                        self.callbacks.remove(lid);
                    }
                }
            }
        }
        if !dead.is_empty() {
            for node in self.nodes.values_mut() {
                node.listeners.retain(|l| match l {
                    Listener::Index { owner, .. } => marked.contains(owner),
                    Listener::Callback(_) => true,
                });
            }
        }
        tracing::debug!(
            collected = dead.len(),
            remaining = self.nodes.len(),
            "garbage collection finished"
        );
        dead.len()
    }

    /// Forgets the cached validation result of `id` and its owners.
    pub fn invalidate(&self, id: NodeId) {
        let mut current = self.nodes.get(id);
        while let Some(n) = current {
            n.validated.set(false);
            current = n.parent.and_then(|p| self.nodes.get(p));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::TypesystemData;

    fn typesystem(mgr: &mut Manager, name: &str) -> NodeId {
        mgr.create(name, NodeKind::Typesystem(TypesystemData::default()))
    }

    fn ontology(mgr: &mut Manager, name: &str) -> NodeId {
        mgr.create(name, NodeKind::Ontology(Default::default()))
    }

    // ==================== Attach tests ====================

    #[test]
    fn test_attach_sets_parent_and_index() {
        let mut mgr = Manager::new();
        let project = mgr.create("p", NodeKind::Project(Default::default()));
        let ts = typesystem(&mut mgr, "ts");
        mgr.attach(project, Slot::ProjectTypesystems, ts).unwrap();
        assert_eq!(mgr.parent(ts), Some(project));
        assert_eq!(mgr.child_by_name(project, Slot::ProjectTypesystems, "ts"), Some(ts));
        assert_eq!(mgr.children(project, Slot::ProjectTypesystems), &[ts]);
    }

    #[test]
    fn test_attach_moves_between_owners() {
        let mut mgr = Manager::new();
        let a = mgr.create("a", NodeKind::Project(Default::default()));
        let b = mgr.create("b", NodeKind::Project(Default::default()));
        let ts = typesystem(&mut mgr, "ts");
        mgr.attach(a, Slot::ProjectTypesystems, ts).unwrap();
        mgr.attach(b, Slot::ProjectTypesystems, ts).unwrap();
        assert!(mgr.children(a, Slot::ProjectTypesystems).is_empty());
        assert!(mgr.child_by_name(a, Slot::ProjectTypesystems, "ts").is_none());
        assert_eq!(mgr.parent(ts), Some(b));
    }

    #[test]
    fn test_references_do_not_own() {
        let mut mgr = Manager::new();
        let o = ontology(&mut mgr, "o");
        let ts = typesystem(&mut mgr, "ts");
        mgr.attach(o, Slot::OntologyTypesystems, ts).unwrap();
        assert_eq!(mgr.parent(ts), None);
        assert_eq!(mgr.reference_targets(o), vec![ts]);
        assert!(mgr.composition_children(o).is_empty());
    }

    #[test]
    fn test_attach_rejects_missing_slot() {
        let mut mgr = Manager::new();
        let o = ontology(&mut mgr, "o");
        let ts = typesystem(&mut mgr, "ts");
        assert!(mgr.attach(ts, Slot::OntologyClasses, o).is_err());
    }

    #[test]
    fn test_remove_from() {
        let mut mgr = Manager::new();
        let project = mgr.create("p", NodeKind::Project(Default::default()));
        let ts = typesystem(&mut mgr, "ts");
        mgr.attach(project, Slot::ProjectTypesystems, ts).unwrap();
        assert!(mgr.detach(ts));
        assert!(!mgr.detach(ts));
        assert_eq!(mgr.parent(ts), None);
        assert!(mgr.child_by_name(project, Slot::ProjectTypesystems, "ts").is_none());
    }

    // ==================== Name tests ====================

    #[test]
    fn test_rename_updates_indices() {
        let mut mgr = Manager::new();
        let o1 = ontology(&mut mgr, "o1");
        let o2 = ontology(&mut mgr, "o2");
        let ts = typesystem(&mut mgr, "old");
        mgr.attach(o1, Slot::OntologyTypesystems, ts).unwrap();
        mgr.attach(o2, Slot::OntologyTypesystems, ts).unwrap();
        mgr.set_name(ts, "new");
        for o in [o1, o2] {
            assert!(mgr.child_by_name(o, Slot::OntologyTypesystems, "old").is_none());
            assert_eq!(mgr.child_by_name(o, Slot::OntologyTypesystems, "new"), Some(ts));
        }
    }

    #[test]
    fn test_name_listener() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut mgr = Manager::new();
        let ts = typesystem(&mut mgr, "a");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let lid = mgr.add_name_listener(
            ts,
            Box::new(move |_, change| sink.borrow_mut().push(change.clone())),
        );
        mgr.set_name(ts, "b");
        mgr.set_name(ts, "b");
        assert!(mgr.remove_name_listener(lid));
        mgr.set_name(ts, "c");
        assert_eq!(
            *seen.borrow(),
            vec![NameChange {
                old_name: "a".into(),
                new_name: "b".into()
            }]
        );
    }

    #[test]
    fn test_path() {
        let mut mgr = Manager::new();
        let project = mgr.create("", NodeKind::Project(Default::default()));
        let ts = typesystem(&mut mgr, "ts");
        mgr.attach(project, Slot::ProjectTypesystems, ts).unwrap();
        assert_eq!(mgr.path(ts), vec!["ts".to_string()]);
        assert_eq!(mgr.path_string(ts), "ts");
    }

    // ==================== Lifetime tests ====================

    #[test]
    fn test_collect_keeps_rooted_tree() {
        let mut mgr = Manager::new();
        let project = mgr.create("p", NodeKind::Project(Default::default()));
        let kept = typesystem(&mut mgr, "kept");
        let garbage = typesystem(&mut mgr, "garbage");
        mgr.attach(project, Slot::ProjectTypesystems, kept).unwrap();
        mgr.add_root(project);
        assert_eq!(mgr.collect(), 1);
        assert!(mgr.contains(kept));
        assert!(!mgr.contains(garbage));
    }

    #[test]
    fn test_collect_ignores_reference_cycles() {
        let mut mgr = Manager::new();
        let a = ontology(&mut mgr, "a");
        let b = ontology(&mut mgr, "b");
        mgr.attach(a, Slot::OntologyDependencies, b).unwrap();
        mgr.attach(b, Slot::OntologyDependencies, a).unwrap();
        mgr.add_root(a);
        assert_eq!(mgr.collect(), 1);
        assert!(mgr.contains(a));
        assert!(!mgr.contains(b));
        assert_eq!(mgr.children(a, Slot::OntologyDependencies), &[b]);
        mgr.remove_root(a);
        assert_eq!(mgr.collect(), 1);
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_stale_handle() {
        let mut mgr = Manager::new();
        let ts = typesystem(&mut mgr, "ts");
        mgr.collect();
        assert!(mgr.node(ts).is_err());
        assert_eq!(mgr.name(ts), "");
        assert_eq!(mgr.rtti(ts), &types::NONE);
    }
}
