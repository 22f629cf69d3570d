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

//! Name indices and node vectors.

use std::collections::HashMap;

use super::NodeId;

/// Maps names to the nodes of one container.
///
/// A name may be carried by several nodes; lookups return the node that was
/// inserted first. Shadowed nodes become visible again once the earlier
/// ones are removed or renamed. Unnamed nodes are not indexed.
#[derive(Debug, Clone, Default)]
pub struct Index {
    entries: HashMap<String, Vec<NodeId>>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node visible under `name`.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.entries.get(name).and_then(|ids| ids.first().copied())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn add(&mut self, name: &str, id: NodeId) {
        if !name.is_empty() {
            self.entries.entry(name.to_string()).or_default().push(id);
        }
    }

    pub(crate) fn remove(&mut self, name: &str, id: NodeId) {
        if let Some(ids) = self.entries.get_mut(name) {
            if let Some(pos) = ids.iter().position(|i| *i == id) {
                ids.remove(pos);
            }
            if ids.is_empty() {
                self.entries.remove(name);
            }
        }
    }

    pub(crate) fn rename(&mut self, old: &str, new: &str, id: NodeId) {
        self.remove(old, id);
        self.add(new, id);
    }
}

/// Ordered list of nodes with a name index.
///
/// Whether the vector owns its elements depends on the slot it is stored
/// in; the vector itself only keeps order and index consistent. Mutation
/// goes through the [`Manager`](super::Manager) so parent pointers and
/// rename subscriptions stay in sync.
#[derive(Debug, Clone, Default)]
pub struct NodeVector {
    items: Vec<NodeId>,
    index: Index,
}

impl NodeVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeId> {
        self.items.iter()
    }

    pub fn get(&self, i: usize) -> Option<NodeId> {
        self.items.get(i).copied()
    }

    pub fn first(&self) -> Option<NodeId> {
        self.items.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.items.last().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.items.contains(&id)
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.items.iter().position(|i| *i == id)
    }

    /// Node visible under `name`.
    pub fn resolve(&self, name: &str) -> Option<NodeId> {
        self.index.get(name)
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub(crate) fn push(&mut self, id: NodeId, name: &str) {
        self.items.push(id);
        self.index.add(name, id);
    }

    /// Removes the first occurrence of `id`.
    pub(crate) fn remove(&mut self, id: NodeId, name: &str) -> bool {
        match self.position(id) {
            Some(pos) => {
                self.items.remove(pos);
                self.index.remove(name, id);
                true
            }
            None => false,
        }
    }

    /// Moves an element to a new position, keeping the index untouched.
    pub(crate) fn move_to(&mut self, id: NodeId, pos: usize) {
        if let Some(from) = self.position(id) {
            self.items.remove(from);
            let pos = pos.min(self.items.len());
            self.items.insert(pos, id);
        }
    }

    pub(crate) fn rename(&mut self, old: &str, new: &str, id: NodeId) {
        self.index.rename(old, new, id);
    }
}

impl<'a> IntoIterator for &'a NodeVector {
    type Item = &'a NodeId;
    type IntoIter = std::slice::Iter<'a, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn id(n: u64) -> NodeId {
        NodeId::from(KeyData::from_ffi(n))
    }

    // ==================== Index tests ====================

    #[test]
    fn test_index_first_wins() {
        let mut index = Index::new();
        index.add("a", id(1));
        index.add("a", id(2));
        assert_eq!(index.get("a"), Some(id(1)));
        index.remove("a", id(1));
        assert_eq!(index.get("a"), Some(id(2)));
        index.remove("a", id(2));
        assert!(!index.contains("a"));
    }

    #[test]
    fn test_index_ignores_empty_names() {
        let mut index = Index::new();
        index.add("", id(1));
        assert!(index.is_empty());
    }

    #[test]
    fn test_index_rename() {
        let mut index = Index::new();
        index.add("old", id(1));
        index.rename("old", "new", id(1));
        assert_eq!(index.get("old"), None);
        assert_eq!(index.get("new"), Some(id(1)));
        assert_eq!(index.len(), 1);
    }

    // ==================== NodeVector tests ====================

    #[test]
    fn test_vector_push_remove() {
        let mut v = NodeVector::new();
        v.push(id(1), "x");
        v.push(id(2), "y");
        assert_eq!(v.as_slice(), &[id(1), id(2)]);
        assert_eq!(v.resolve("y"), Some(id(2)));
        assert!(v.remove(id(1), "x"));
        assert!(!v.remove(id(1), "x"));
        assert_eq!(v.resolve("x"), None);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn test_vector_move_to() {
        let mut v = NodeVector::new();
        for n in 1..=3 {
            v.push(id(n), "");
        }
        v.move_to(id(1), usize::MAX);
        assert_eq!(v.as_slice(), &[id(2), id(3), id(1)]);
        v.move_to(id(1), 0);
        assert_eq!(v.first(), Some(id(1)));
    }
}
