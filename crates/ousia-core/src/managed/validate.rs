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

//! Recursive validation of the node graph.
//!
//! [`Manager::validate`] checks a node, everything it owns and the integrity
//! of its reference edges. Successful results are memoised per node until
//! the node or one of its descendants changes.

use std::collections::{HashMap, HashSet};

use crate::location::SourceLocation;
use crate::logger::{Logger, LoggerExt};
use crate::tokens::is_identifier;

use super::{Manager, NodeId, NodeKind};

/// Results of one [`Manager::validate`] call.
///
/// Nodes reached a second time within the same call return the stored
/// result; nodes still in progress count as valid so cycles terminate.
#[derive(Debug, Default)]
pub(crate) struct ValidationContext {
    results: HashMap<NodeId, bool>,
}

impl Manager {
    /// Validates `id` and everything it owns, reporting problems to
    /// `logger`.
    pub fn validate(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let mut ctx = ValidationContext::default();
        self.validate_node(id, logger, &mut ctx)
    }

    pub(crate) fn validate_node(
        &self,
        id: NodeId,
        logger: &mut dyn Logger,
        ctx: &mut ValidationContext,
    ) -> bool {
        let Some(node) = self.get(id) else {
            logger.error("Dangling reference", SourceLocation::default());
            return false;
        };
        if node.validated.get() {
            return true;
        }
        if let Some(&result) = ctx.results.get(&id) {
            return result;
        }
        ctx.results.insert(id, true);
        logger.push_default_location(node.location());

        let mut valid = true;
        for edge in node.kind.edges() {
            if !self.contains(edge.target) {
                logger.error(
                    format!(
                        "{} \"{}\" has a dangling reference",
                        node.rtti(),
                        self.path_string(id)
                    ),
                    node.location(),
                );
                valid = false;
            }
        }

        valid &= match &node.kind {
            NodeKind::Project(_) => self.validate_project(id, logger),
            NodeKind::Typesystem(_) => self.validate_typesystem(id, logger),
            NodeKind::Type(_) => self.validate_type(id, logger),
            NodeKind::Attribute(_) => self.validate_attribute(id, logger),
            NodeKind::Ontology(_) => self.validate_ontology(id, logger, ctx),
            NodeKind::StructuredClass(_) => self.validate_structured_class(id, logger, ctx),
            NodeKind::AnnotationClass(_) => self.validate_descriptor(id, logger, ctx),
            NodeKind::FieldDescriptor(_) => self.validate_field_descriptor(id, logger),
            NodeKind::Document(_) => self.validate_document(id, logger),
            NodeKind::StructuredEntity(_) => self.validate_structured_entity(id, logger),
            NodeKind::AnnotationEntity(_) => self.validate_annotation_entity(id, logger),
            NodeKind::DocumentPrimitive(_) => true,
            NodeKind::Anchor(_) => self.validate_anchor(id, logger),
        };

        for child in self.composition_children(id) {
            if self.contains(child) {
                valid &= self.validate_node(child, logger, ctx);
            }
        }

        logger.pop_default_location();
        ctx.results.insert(id, valid);
        if valid {
            node.validated.set(true);
        }
        valid
    }

    /// Whether the node has been validated successfully and not changed
    /// since.
    pub fn is_validated(&self, id: NodeId) -> bool {
        self.get(id).map_or(false, |n| n.validated.get())
    }

    /// Checks that the node name is a valid identifier.
    pub(crate) fn validate_name(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let name = self.name(id);
        if is_identifier(name) {
            return true;
        }
        logger.error(
            format!(
                "Name \"{}\" of {} is not a valid identifier",
                name,
                self.rtti(id)
            ),
            self.location(id),
        );
        false
    }

    /// Checks that `ids` contains no two nodes with the same non-empty name.
    pub(crate) fn validate_unique_names(
        &self,
        ids: &[NodeId],
        what: &str,
        logger: &mut dyn Logger,
    ) -> bool {
        let mut seen: HashSet<&str> = HashSet::with_capacity(ids.len());
        let mut valid = true;
        for &id in ids {
            let name = self.name(id);
            if name.is_empty() {
                continue;
            }
            if !seen.insert(name) {
                logger.error(
                    format!("Multiple {what} with name \"{name}\""),
                    self.location(id),
                );
                valid = false;
            }
        }
        valid
    }

    /// Checks that the owner of `id` has the expected type.
    pub(crate) fn validate_parent(
        &self,
        id: NodeId,
        expected: &crate::rtti::Rtti,
        logger: &mut dyn Logger,
    ) -> bool {
        match self.parent(id) {
            Some(parent) if self.isa(parent, expected) => true,
            Some(parent) => {
                logger.error(
                    format!(
                        "Expected parent of {} \"{}\" to be {}, but got {}",
                        self.rtti(id),
                        self.name(id),
                        expected,
                        self.rtti(parent)
                    ),
                    self.location(id),
                );
                false
            }
            None => {
                logger.error(
                    format!("{} \"{}\" has no parent", self.rtti(id), self.name(id)),
                    self.location(id),
                );
                false
            }
        }
    }
}
