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

//! The parser scope: nodes under construction and pending references.
//!
//! References that cannot be resolved when they are encountered (forward
//! references, cross references between includes) are stored together
//! with a snapshot of the scope stack and retried by
//! [`ParserScope::perform_deferred_resolution`] until no further progress
//! is made.

use std::fmt;

use crate::limits::Limits;
use crate::location::SourceLocation;
use crate::logger::{Logger, LoggerExt};
use crate::managed::{Manager, NodeId};
use crate::rtti::{types, Rtti};

/// Called with the resolved node (or a placeholder) and the node that was
/// the leaf of the scope when the reference was encountered.
pub type ResolutionCallback = Box<dyn FnMut(&mut Manager, NodeId, Option<NodeId>, &mut dyn Logger)>;

/// Creates a placeholder standing in for a node that is not resolvable yet.
pub type ImposterCallback = Box<dyn FnOnce(&mut Manager) -> NodeId>;

/// Flags attached to a depth of the scope stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserFlag {
    /// Set once the first statement that is not an import or include has
    /// been read.
    PostHead,
}

#[derive(Debug, Clone, Copy)]
struct FlagEntry {
    depth: usize,
    flag: ParserFlag,
    value: bool,
}

/// A reference waiting for its target.
pub struct DeferredResolution {
    nodes: Vec<NodeId>,
    path: Vec<String>,
    ty: &'static Rtti,
    owner: Option<NodeId>,
    callback: ResolutionCallback,
    location: SourceLocation,
}

impl DeferredResolution {
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn ty(&self) -> &'static Rtti {
        self.ty
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }
}

impl fmt::Debug for DeferredResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredResolution")
            .field("path", &self.path)
            .field("ty", &self.ty.name())
            .field("owner", &self.owner)
            .field("location", &self.location)
            .finish()
    }
}

/// Looks `path` up from every node of `nodes`, leaf first.
fn lookup(
    manager: &Manager,
    nodes: &[NodeId],
    path: &[String],
    ty: &Rtti,
    location: SourceLocation,
    logger: &mut dyn Logger,
) -> Option<NodeId> {
    nodes
        .iter()
        .rev()
        .find_map(|&root| manager.resolve_unique(root, path, ty, logger, location))
}

/// Splits a dotted reference into its components.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Stack of nodes under construction.
#[derive(Debug)]
pub struct ParserScope {
    nodes: Vec<NodeId>,
    flags: Vec<FlagEntry>,
    top_level_depth: usize,
    deferred: Vec<DeferredResolution>,
    max_resolution_passes: usize,
}

impl Default for ParserScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserScope {
    pub fn new() -> Self {
        Self::with_limits(&Limits::default())
    }

    pub fn with_limits(limits: &Limits) -> Self {
        Self {
            nodes: Vec::new(),
            flags: Vec::new(),
            top_level_depth: 0,
            deferred: Vec::new(),
            max_resolution_passes: limits.max_resolution_passes,
        }
    }

    /// A scope for an included file. It sees the current stack but cannot
    /// pop below it and collects its own deferred references.
    pub fn fork(&self) -> ParserScope {
        ParserScope {
            nodes: self.nodes.clone(),
            flags: self.flags.clone(),
            top_level_depth: self.nodes.len(),
            deferred: Vec::new(),
            max_resolution_passes: self.max_resolution_passes,
        }
    }

    /// Takes over the deferred references of a fork. Fails if the fork
    /// left nodes open.
    pub fn join(&mut self, fork: ParserScope, logger: &mut dyn Logger) -> bool {
        if fork.nodes.len() != fork.top_level_depth {
            logger.error(
                "Cannot join parser scope fork: an element was not closed",
                SourceLocation::default(),
            );
            return false;
        }
        self.deferred.extend(fork.deferred);
        true
    }

    pub fn push(&mut self, node: NodeId) {
        self.nodes.push(node);
    }

    /// Removes the leaf and the flags set at its depth.
    pub fn pop(&mut self, logger: &mut dyn Logger) -> bool {
        let depth = self.nodes.len();
        if depth <= self.top_level_depth {
            logger.error("No element here to end", SourceLocation::default());
            return false;
        }
        while self.flags.last().map_or(false, |f| f.depth >= depth) {
            self.flags.pop();
        }
        self.nodes.pop();
        true
    }

    pub fn root(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn leaf(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Types of the nodes on the stack, root first.
    pub fn type_signature(&self, manager: &Manager) -> Vec<&'static Rtti> {
        self.nodes.iter().map(|&n| manager.rtti(n)).collect()
    }

    /// Closest node of type `ty`. `max_depth` limits how far below the leaf
    /// the search goes; `Some(0)` only looks at the leaf.
    pub fn select(&self, manager: &Manager, ty: &'static Rtti, max_depth: Option<usize>) -> Option<NodeId> {
        self.select_one_of(manager, &[ty], max_depth)
    }

    pub fn select_one_of(&self, manager: &Manager, tys: &[&'static Rtti], max_depth: Option<usize>) -> Option<NodeId> {
        let limit = max_depth.map_or(usize::MAX, |d| d.saturating_add(1));
        self.nodes
            .iter()
            .rev()
            .take(limit)
            .copied()
            .find(|&n| manager.rtti(n).isa_one_of(tys))
    }

    /// Sets a flag for the current depth.
    pub fn set_flag(&mut self, flag: ParserFlag, value: bool) {
        let depth = self.nodes.len();
        for entry in self.flags.iter_mut().rev() {
            if entry.depth < depth {
                break;
            }
            if entry.flag == flag && entry.depth == depth {
                entry.value = value;
                return;
            }
        }
        self.flags.push(FlagEntry { depth, flag, value });
    }

    /// Most recently set value of `flag`; false if never set.
    pub fn flag(&self, flag: ParserFlag) -> bool {
        self.flags
            .iter()
            .rev()
            .find(|e| e.flag == flag)
            .map_or(false, |e| e.value)
    }

    /// Resolves `path` to a node of type `ty` as seen from the current
    /// stack.
    ///
    /// On success `callback` is invoked immediately and true is returned.
    /// Otherwise the reference is deferred; if an imposter is given, the
    /// callback is first invoked with the placeholder it creates.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve<S: AsRef<str>>(
        &mut self,
        manager: &mut Manager,
        ty: &'static Rtti,
        path: &[S],
        imposter: Option<ImposterCallback>,
        mut callback: ResolutionCallback,
        location: SourceLocation,
        logger: &mut dyn Logger,
    ) -> bool {
        let path: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
        let owner = self.leaf();
        if let Some(node) = lookup(manager, &self.nodes, &path, ty, location, logger) {
            callback(manager, node, owner, logger);
            return true;
        }
        if let Some(imposter) = imposter {
            let placeholder = imposter(manager);
            callback(manager, placeholder, owner, logger);
        }
        self.deferred.push(DeferredResolution {
            nodes: self.nodes.clone(),
            path,
            ty,
            owner,
            callback,
            location,
        });
        false
    }

    /// Resolves a type name. A `[]` suffix resolves the inner type and
    /// creates the matching array type in the closest typesystem.
    pub fn resolve_type(
        &mut self,
        manager: &mut Manager,
        name: &str,
        callback: ResolutionCallback,
        location: SourceLocation,
        logger: &mut dyn Logger,
    ) -> bool {
        let Some(inner) = name.strip_suffix("[]") else {
            return self.resolve(
                manager,
                &types::TYPE,
                &split_path(name),
                None,
                callback,
                location,
                logger,
            );
        };
        let typesystem = self.select(manager, &types::TYPESYSTEM, None);
        let mut callback = callback;
        let wrapped: ResolutionCallback = Box::new(move |mgr, inner, owner, logger| {
            let Some(ts) = typesystem.or_else(|| mgr.parent(inner)) else {
                logger.error(
                    format!("No typesystem to create \"{}[]\" in", mgr.name(inner)),
                    location,
                );
                return;
            };
            match mgr.create_array_type(ts, inner) {
                Ok(array) => callback(mgr, array, owner, logger),
                Err(e) => logger.log_exception(&e.with_location(location)),
            }
        });
        self.resolve_type(manager, inner, wrapped, location, logger)
    }

    /// Number of references waiting for resolution.
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Retries all deferred references until a pass resolves none of them.
    ///
    /// Callbacks run in the order the references were deferred within each
    /// pass. References still unresolved afterwards are reported as errors
    /// and dropped. Returns true if everything was resolved.
    pub fn perform_deferred_resolution(&mut self, manager: &mut Manager, logger: &mut dyn Logger) -> bool {
        let mut passes = 0;
        while !self.deferred.is_empty() && passes < self.max_resolution_passes {
            passes += 1;
            let pending = std::mem::take(&mut self.deferred);
            let before = pending.len();
            for mut entry in pending {
                match lookup(manager, &entry.nodes, &entry.path, entry.ty, entry.location, logger) {
                    Some(node) => (entry.callback)(manager, node, entry.owner, logger),
                    None => self.deferred.push(entry),
                }
            }
            tracing::debug!(
                pass = passes,
                resolved = before - self.deferred.len(),
                remaining = self.deferred.len(),
                "deferred resolution pass"
            );
            if self.deferred.len() == before {
                break;
            }
        }
        let ok = self.deferred.is_empty();
        for entry in self.deferred.drain(..) {
            logger.error(
                format!(
                    "Could not resolve {} \"{}\"",
                    entry.ty,
                    entry.path.join(".")
                ),
                entry.location,
            );
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::logger::ConcreteLogger;
    use crate::ranges::RangeSet;

    fn recorder() -> (Rc<RefCell<Vec<NodeId>>>, ResolutionCallback) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let callback: ResolutionCallback = Box::new(move |_, node, _, _| sink.borrow_mut().push(node));
        (seen, callback)
    }

    // ==================== Stack tests ====================

    #[test]
    fn test_push_pop_select() {
        let mut mgr = Manager::new();
        let project = mgr.create_project().unwrap();
        let ontology = mgr.create_project_ontology(project, "o").unwrap();
        let class = mgr
            .create_structured_class(ontology, "c", RangeSet::any(), None, false, false)
            .unwrap();
        let mut scope = ParserScope::new();
        scope.push(project);
        scope.push(ontology);
        scope.push(class);
        assert_eq!(scope.root(), Some(project));
        assert_eq!(scope.leaf(), Some(class));
        assert_eq!(scope.select(&mgr, &types::ONTOLOGY, None), Some(ontology));
        assert_eq!(scope.select(&mgr, &types::ONTOLOGY, Some(0)), None);
        assert_eq!(scope.select(&mgr, &types::ONTOLOGY, Some(1)), Some(ontology));
        assert_eq!(scope.select(&mgr, &types::DESCRIPTOR, None), Some(class));
        assert_eq!(
            scope.type_signature(&mgr),
            vec![&types::PROJECT, &types::ONTOLOGY, &types::STRUCTURED_CLASS]
        );

        let mut logger = ConcreteLogger::default();
        assert!(scope.pop(&mut logger));
        assert!(scope.pop(&mut logger));
        assert!(scope.pop(&mut logger));
        assert!(!scope.pop(&mut logger));
        assert!(logger.contains("No element here to end"));
    }

    #[test]
    fn test_flags_follow_depth() {
        let mut mgr = Manager::new();
        let project = mgr.create_project().unwrap();
        let mut scope = ParserScope::new();
        let mut logger = ConcreteLogger::default();
        assert!(!scope.flag(ParserFlag::PostHead));
        scope.push(project);
        scope.set_flag(ParserFlag::PostHead, true);
        assert!(scope.flag(ParserFlag::PostHead));
        scope.set_flag(ParserFlag::PostHead, false);
        assert!(!scope.flag(ParserFlag::PostHead));
        scope.set_flag(ParserFlag::PostHead, true);
        scope.pop(&mut logger);
        assert!(!scope.flag(ParserFlag::PostHead));
    }

    #[test]
    fn test_fork_join() {
        let mut mgr = Manager::new();
        let project = mgr.create_project().unwrap();
        let mut scope = ParserScope::new();
        scope.push(project);
        let mut fork = scope.fork();
        let mut logger = ConcreteLogger::default();
        assert!(!fork.pop(&mut logger));
        let (_, callback) = recorder();
        fork.resolve(&mut mgr, &types::ONTOLOGY, &["missing"], None, callback, SourceLocation::default(), &mut logger);
        assert_eq!(fork.deferred_count(), 1);
        assert_eq!(scope.deferred_count(), 0);

        let ts = mgr.create_typesystem("open");
        fork.push(ts);
        let mut unclosed = fork.fork();
        unclosed.push(ts);
        assert!(!fork.join(unclosed, &mut logger));
        fork.pop(&mut logger);
        assert!(scope.join(fork, &mut logger));
        assert_eq!(scope.deferred_count(), 1);
    }

    // ==================== Resolution tests ====================

    #[test]
    fn test_resolve_immediately() {
        let mut mgr = Manager::new();
        let project = mgr.create_project().unwrap();
        let ts = mgr.create_project_typesystem(project, "units").unwrap();
        let mut scope = ParserScope::new();
        scope.push(project);
        let (seen, callback) = recorder();
        let mut logger = ConcreteLogger::default();
        assert!(scope.resolve(&mut mgr, &types::TYPESYSTEM, &["units"], None, callback, SourceLocation::default(), &mut logger));
        assert_eq!(*seen.borrow(), vec![ts]);
        assert_eq!(scope.deferred_count(), 0);
    }

    #[test]
    fn test_deferred_fixpoint() {
        let mut mgr = Manager::new();
        let project = mgr.create_project().unwrap();
        let foo = mgr.create_project_ontology(project, "foo").unwrap();
        let mut scope = ParserScope::new();
        scope.push(project);
        let (seen, callback) = recorder();
        let mut logger = ConcreteLogger::default();
        assert!(!scope.resolve(
            &mut mgr,
            &types::FIELD_DESCRIPTOR,
            &["foo", "bar", "baz"],
            None,
            callback,
            SourceLocation::default(),
            &mut logger
        ));
        assert!(seen.borrow().is_empty());

        let bar = mgr
            .create_structured_class(foo, "bar", RangeSet::any(), None, false, false)
            .unwrap();
        let baz = mgr
            .create_field_descriptor(bar, crate::ontology::FieldType::Subtree, "baz", false)
            .unwrap();
        assert!(scope.perform_deferred_resolution(&mut mgr, &mut logger));
        assert_eq!(*seen.borrow(), vec![baz]);
        assert!(!logger.has_error());
    }

    #[test]
    fn test_deferred_chain_needs_two_passes() {
        let mut mgr = Manager::new();
        let project = mgr.create_project().unwrap();
        let mut scope = ParserScope::new();
        scope.push(project);
        let mut logger = ConcreteLogger::default();

        let (seen, callback) = recorder();
        scope.resolve(&mut mgr, &types::TYPESYSTEM, &["second"], None, callback, SourceLocation::default(), &mut logger);
        let creator: ResolutionCallback = Box::new(move |mgr, _, _, _| {
            mgr.create_project_typesystem(project, "second").unwrap();
        });
        scope.resolve(&mut mgr, &types::TYPESYSTEM, &["first"], None, creator, SourceLocation::default(), &mut logger);

        mgr.create_project_typesystem(project, "first").unwrap();
        assert!(scope.perform_deferred_resolution(&mut mgr, &mut logger));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_unresolved_reported() {
        let mut mgr = Manager::new();
        let project = mgr.create_project().unwrap();
        let mut scope = ParserScope::new();
        scope.push(project);
        let (seen, callback) = recorder();
        let mut logger = ConcreteLogger::default();
        let imposter: ImposterCallback = Box::new(|mgr| mgr.create_typesystem("placeholder"));
        scope.resolve(&mut mgr, &types::TYPESYSTEM, &["a", "b"], Some(imposter), callback, SourceLocation::default(), &mut logger);
        assert_eq!(seen.borrow().len(), 1);
        assert!(!scope.perform_deferred_resolution(&mut mgr, &mut logger));
        assert!(logger.contains("Could not resolve Typesystem \"a.b\""));
        assert_eq!(scope.deferred_count(), 0);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_resolve_array_type() {
        let mut mgr = Manager::new();
        let project = mgr.create_project().unwrap();
        let ts = mgr.create_project_typesystem(project, "units").unwrap();
        let mut scope = ParserScope::new();
        scope.push(project);
        scope.push(ts);
        let (seen, callback) = recorder();
        let mut logger = ConcreteLogger::default();
        assert!(scope.resolve_type(&mut mgr, "int[][]", callback, SourceLocation::default(), &mut logger));
        let outer = seen.borrow()[0];
        assert!(mgr.isa(outer, &types::ARRAY_TYPE));
        assert_eq!(mgr.name(outer), "int[][]");
        assert_eq!(mgr.parent(outer), Some(ts));
    }
}
