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

//! Name resolution over the node graph.
//!
//! A path `a.b.c` is matched by a node named `a` that is reachable from the
//! resolution root, followed by direct children named `b` and `c` found
//! through the indices of the composition containers. The first component
//! may be found anywhere below the root (compositum descent) or below a
//! node the root refers to (one reference hop, only from the root).

use std::collections::HashSet;

use crate::location::SourceLocation;
use crate::logger::{Logger, LoggerExt};
use crate::rtti::Rtti;

use super::{Manager, NodeId};

/// A resolved node and the root the search started at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionResult {
    pub node: NodeId,
    pub resolution_root: NodeId,
}

struct ResolutionState<'a> {
    path: &'a [&'a str],
    ty: &'a Rtti,
    root: NodeId,
    visited: HashSet<(NodeId, usize)>,
    results: Vec<NodeId>,
}

impl Manager {
    /// All nodes of type `ty` matching `path` as seen from `root`.
    pub fn resolve<S: AsRef<str>>(&self, root: NodeId, path: &[S], ty: &Rtti) -> Vec<ResolutionResult> {
        let path: Vec<&str> = path.iter().map(|s| s.as_ref()).collect();
        if path.is_empty() || !self.contains(root) {
            return Vec::new();
        }
        let mut state = ResolutionState {
            path: &path,
            ty,
            root,
            visited: HashSet::new(),
            results: Vec::new(),
        };
        self.visit(root, 0, &mut state);
        state
            .results
            .into_iter()
            .map(|node| ResolutionResult {
                node,
                resolution_root: root,
            })
            .collect()
    }

    /// Resolves `path` to exactly one node.
    ///
    /// Multiple matches are reported as error with one note per candidate;
    /// the first candidate is returned anyway.
    pub fn resolve_unique<S: AsRef<str>>(
        &self,
        root: NodeId,
        path: &[S],
        ty: &Rtti,
        logger: &mut dyn Logger,
        location: SourceLocation,
    ) -> Option<NodeId> {
        let results = self.resolve(root, path, ty);
        if results.len() > 1 {
            let dotted: Vec<&str> = path.iter().map(|s| s.as_ref()).collect();
            logger.error(
                format!(
                    "The reference \"{}\" is ambiguous!",
                    dotted.join(".")
                ),
                location,
            );
            for r in &results {
                logger.note(
                    format!("Resolves to \"{}\"", self.path_string(r.node)),
                    self.location(r.node),
                );
            }
        }
        results.first().map(|r| r.node)
    }

    fn visit(&self, id: NodeId, idx: usize, state: &mut ResolutionState<'_>) {
        if !state.visited.insert((id, idx)) {
            return;
        }
        let Some(node) = self.get(id) else {
            return;
        };
        if !node.name().is_empty() && node.name() == state.path[idx] {
            if idx + 1 == state.path.len() {
                if node.rtti().isa(state.ty) && !state.results.contains(&id) {
                    state.results.push(id);
                }
            } else {
                self.descend_index(id, idx + 1, state);
            }
        }
        if idx == 0 {
            for child in self.composition_children(id) {
                self.visit(child, 0, state);
            }
            if id == state.root {
                for target in self.reference_targets(id) {
                    self.visit(target, 0, state);
                }
            }
        }
    }

    /// Continues matching component `idx` among the owned children of `id`.
    fn descend_index(&self, id: NodeId, idx: usize, state: &mut ResolutionState<'_>) {
        let Some(kind) = self.kind(id) else {
            return;
        };
        let name = state.path[idx];
        let mut hits = Vec::new();
        for slot in kind.vector_slots() {
            if !slot.is_composition() {
                continue;
            }
            if let Some(hit) = kind.vector(slot).and_then(|v| v.resolve(name)) {
                hits.push(hit);
            }
        }
        for single in kind.owned_singles() {
            if self.name(single) == name {
                hits.push(single);
            }
        }
        for hit in hits {
            self.visit(hit, idx, state);
        }
    }
}
