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

//! Ontologies: the grammar documents are checked against.
//!
//! Structured classes are the nonterminals of the block structure, field
//! descriptors their productions. A descriptor has at most one TREE field,
//! which is always kept as its last field; SUBTREE fields come first.
//! Structured classes inherit fields and attributes from their superclass
//! and may be transparent, i.e. implicitly inserted by parsers when
//! content needs wrapping.

use std::collections::{HashSet, VecDeque};

use crate::error::{LoggableException, OusiaResult};
use crate::location::SourceLocation;
use crate::logger::{Logger, LoggerExt};
use crate::managed::{Manager, NodeId, NodeKind, NodeVector, Slot, ValidationContext};
use crate::parser::ParserStateCallbacks;
use crate::ranges::RangeSet;
use crate::rtti::types;
use crate::tokens::{TokenDescriptor, TokenId, Tokens};
use crate::typesystem::{StructData, TypeKind};
use crate::whitespace::WhitespaceMode;

/// Name of the field used when no field name is given.
pub const DEFAULT_FIELD_NAME: &str = "$default";

/// Kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldType {
    /// The main content of a descriptor. At most one per descriptor.
    #[default]
    Tree,
    /// Additional structured content such as headings or captions.
    Subtree,
}

/// Payload of an ontology node.
#[derive(Debug, Clone, Default)]
pub struct OntologyData {
    pub(crate) classes: NodeVector,
    pub(crate) annotation_classes: NodeVector,
    pub(crate) dependencies: NodeVector,
    pub(crate) typesystems: NodeVector,
}

/// Data shared by structured and annotation classes.
#[derive(Debug, Clone, Default)]
pub struct DescriptorData {
    pub(crate) attributes: Option<NodeId>,
    pub(crate) fields: NodeVector,
    pub(crate) start_token: TokenDescriptor,
    pub(crate) end_token: TokenDescriptor,
}

impl DescriptorData {
    /// Struct type describing the attributes.
    pub fn attributes(&self) -> Option<NodeId> {
        self.attributes
    }

    /// Own fields, without inherited ones.
    pub fn fields(&self) -> &NodeVector {
        &self.fields
    }

    pub fn start_token(&self) -> &TokenDescriptor {
        &self.start_token
    }

    pub fn end_token(&self) -> &TokenDescriptor {
        &self.end_token
    }
}

/// Payload of a structured class.
#[derive(Debug, Clone)]
pub struct StructuredClassData {
    pub(crate) descriptor: DescriptorData,
    pub(crate) cardinality: RangeSet,
    pub(crate) superclass: Option<NodeId>,
    pub(crate) subclasses: NodeVector,
    pub(crate) transparent: bool,
    pub(crate) root: bool,
    pub(crate) short_token: TokenDescriptor,
}

impl StructuredClassData {
    pub fn descriptor(&self) -> &DescriptorData {
        &self.descriptor
    }

    pub fn cardinality(&self) -> &RangeSet {
        &self.cardinality
    }

    pub fn superclass(&self) -> Option<NodeId> {
        self.superclass
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Whether instances may be the root of a document.
    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn short_token(&self) -> &TokenDescriptor {
        &self.short_token
    }
}

/// Payload of a field descriptor.
#[derive(Debug, Clone)]
pub struct FieldData {
    pub(crate) field_type: FieldType,
    pub(crate) optional: bool,
    pub(crate) whitespace_mode: WhitespaceMode,
    pub(crate) primitive: bool,
    pub(crate) primitive_type: Option<NodeId>,
    pub(crate) children: NodeVector,
    pub(crate) start_token: TokenDescriptor,
    pub(crate) end_token: TokenDescriptor,
}

impl FieldData {
    fn new(field_type: FieldType, optional: bool, primitive_type: Option<NodeId>) -> Self {
        Self {
            field_type,
            optional,
            whitespace_mode: WhitespaceMode::default(),
            primitive: primitive_type.is_some(),
            primitive_type,
            children: NodeVector::default(),
            start_token: TokenDescriptor::empty(),
            end_token: TokenDescriptor::empty(),
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn whitespace_mode(&self) -> WhitespaceMode {
        self.whitespace_mode
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive
    }

    pub fn primitive_type(&self) -> Option<NodeId> {
        self.primitive_type
    }

    /// Declared child classes, without subclasses.
    pub fn children(&self) -> &NodeVector {
        &self.children
    }

    pub fn start_token(&self) -> &TokenDescriptor {
        &self.start_token
    }

    pub fn end_token(&self) -> &TokenDescriptor {
        &self.end_token
    }
}

/// Tokens of one descriptor or field, ranked by the number of transparent
/// classes a parser has to insert to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxDescriptor {
    pub open: TokenId,
    pub close: TokenId,
    pub short: TokenId,
    pub descriptor: NodeId,
    pub depth: usize,
}

impl SyntaxDescriptor {
    pub fn is_empty(&self) -> bool {
        self.open == Tokens::EMPTY && self.close == Tokens::EMPTY && self.short == Tokens::EMPTY
    }
}

fn token_slots(kind: &mut NodeKind) -> Vec<&mut TokenDescriptor> {
    match kind {
        NodeKind::StructuredClass(c) => vec![
            &mut c.descriptor.start_token,
            &mut c.descriptor.end_token,
            &mut c.short_token,
        ],
        NodeKind::AnnotationClass(d) => vec![&mut d.start_token, &mut d.end_token],
        NodeKind::FieldDescriptor(f) => vec![&mut f.start_token, &mut f.end_token],
        _ => Vec::new(),
    }
}

impl Manager {
    // ==================== Construction ====================

    pub fn create_ontology(&mut self, name: impl Into<String>) -> NodeId {
        self.create(name, NodeKind::Ontology(OntologyData::default()))
    }

    fn create_attributes_descriptor(&mut self, descriptor: NodeId) -> OusiaResult<NodeId> {
        let attributes = self.create("", NodeKind::Type(TypeKind::Struct(StructData::default())));
        self.attach(descriptor, Slot::DescriptorAttributes, attributes)?;
        Ok(attributes)
    }

    /// Creates a structured class in an ontology.
    pub fn create_structured_class(
        &mut self,
        ontology: NodeId,
        name: impl Into<String>,
        cardinality: RangeSet,
        superclass: Option<NodeId>,
        transparent: bool,
        root: bool,
    ) -> OusiaResult<NodeId> {
        let class = self.create(
            name,
            NodeKind::StructuredClass(StructuredClassData {
                descriptor: DescriptorData::default(),
                cardinality,
                superclass: None,
                subclasses: NodeVector::default(),
                transparent,
                root,
                short_token: TokenDescriptor::empty(),
            }),
        );
        self.attach(ontology, Slot::OntologyClasses, class)?;
        self.create_attributes_descriptor(class)?;
        if superclass.is_some() {
            self.set_superclass(class, superclass)?;
        }
        Ok(class)
    }

    pub fn create_annotation_class(&mut self, ontology: NodeId, name: impl Into<String>) -> OusiaResult<NodeId> {
        let class = self.create(name, NodeKind::AnnotationClass(DescriptorData::default()));
        self.attach(ontology, Slot::OntologyAnnotationClasses, class)?;
        self.create_attributes_descriptor(class)?;
        Ok(class)
    }

    fn field_name(name: impl Into<String>) -> String {
        let name = name.into();
        if name.is_empty() {
            DEFAULT_FIELD_NAME.to_string()
        } else {
            name
        }
    }

    /// Creates a non-primitive field. An empty name stands for the default
    /// field.
    pub fn create_field_descriptor(
        &mut self,
        descriptor: NodeId,
        field_type: FieldType,
        name: impl Into<String>,
        optional: bool,
    ) -> OusiaResult<NodeId> {
        let field = self.create(
            Self::field_name(name),
            NodeKind::FieldDescriptor(FieldData::new(field_type, optional, None)),
        );
        self.add_field_descriptor(descriptor, field)?;
        Ok(field)
    }

    /// Creates a field holding a single value of `primitive_type`.
    pub fn create_primitive_field_descriptor(
        &mut self,
        descriptor: NodeId,
        primitive_type: NodeId,
        field_type: FieldType,
        name: impl Into<String>,
        optional: bool,
    ) -> OusiaResult<NodeId> {
        let field = self.create(
            Self::field_name(name),
            NodeKind::FieldDescriptor(FieldData::new(field_type, optional, Some(primitive_type))),
        );
        self.add_field_descriptor(descriptor, field)?;
        Ok(field)
    }

    /// Adds a field to a descriptor, keeping TREE fields last.
    pub fn add_field_descriptor(&mut self, descriptor: NodeId, field: NodeId) -> OusiaResult<()> {
        if !self.isa(field, &types::FIELD_DESCRIPTOR) {
            return Err(LoggableException::structure("Only field descriptors can be added as fields"));
        }
        self.attach(descriptor, Slot::DescriptorFields, field)?;
        self.sort_fields(descriptor);
        Ok(())
    }

    /// Moves a field from its current descriptor to `descriptor`.
    pub fn move_field_descriptor(&mut self, descriptor: NodeId, field: NodeId) -> OusiaResult<()> {
        let previous = self.parent(field);
        self.add_field_descriptor(descriptor, field)?;
        if let Some(previous) = previous {
            self.sort_fields(previous);
        }
        Ok(())
    }

    /// Stable partition of the own fields: SUBTREE first, TREE last.
    fn sort_fields(&mut self, descriptor: NodeId) {
        let trees: Vec<NodeId> = self
            .field_descriptors(descriptor)
            .iter()
            .copied()
            .filter(|&f| self.field_type(f) == Some(FieldType::Tree))
            .collect();
        for tree in trees {
            let last = self.field_descriptors(descriptor).len().saturating_sub(1);
            self.move_in_slot(descriptor, Slot::DescriptorFields, tree, last);
        }
    }

    /// Allows instances of `class` (and its subclasses) in a field.
    pub fn add_child_class(&mut self, field: NodeId, class: NodeId) -> OusiaResult<()> {
        if !self.isa(class, &types::STRUCTURED_CLASS) {
            return Err(LoggableException::structure(format!(
                "\"{}\" is not a structured class",
                self.name(class)
            )));
        }
        if self.field_children(field).contains(&class) {
            return Ok(());
        }
        self.attach(field, Slot::FieldChildren, class)
    }

    /// Changes the superclass and re-parents the attribute descriptor.
    pub fn set_superclass(&mut self, class: NodeId, superclass: Option<NodeId>) -> OusiaResult<()> {
        if let Some(sup) = superclass {
            if !self.isa(sup, &types::STRUCTURED_CLASS) {
                return Err(LoggableException::structure(format!(
                    "Superclass \"{}\" is not a structured class",
                    self.name(sup)
                )));
            }
        }
        let Some(data) = self.structured_class(class) else {
            return Err(LoggableException::structure("Superclass can only be set on structured classes"));
        };
        let previous = data.superclass;
        if previous == superclass {
            return Ok(());
        }
        if let Some(previous) = previous {
            self.remove_from(previous, Slot::ClassSubclasses, class);
        }
        if let Some(NodeKind::StructuredClass(c)) = self.kind_mut(class) {
            c.superclass = superclass;
        }
        if let Some(sup) = superclass {
            self.attach(sup, Slot::ClassSubclasses, class)?;
        }
        if let Some(attributes) = self.attributes_descriptor(class) {
            let parent = superclass.and_then(|s| self.attributes_descriptor(s));
            self.set_struct_parent(attributes, parent)?;
        }
        Ok(())
    }

    fn structured_class_mut(&mut self, class: NodeId) -> OusiaResult<&mut StructuredClassData> {
        match self.kind_mut(class) {
            Some(NodeKind::StructuredClass(c)) => Ok(c),
            _ => Err(LoggableException::structure("Expected a structured class")),
        }
    }

    fn field_mut(&mut self, field: NodeId) -> OusiaResult<&mut FieldData> {
        match self.kind_mut(field) {
            Some(NodeKind::FieldDescriptor(f)) => Ok(f),
            _ => Err(LoggableException::structure("Expected a field descriptor")),
        }
    }

    pub fn set_cardinality(&mut self, class: NodeId, cardinality: RangeSet) -> OusiaResult<()> {
        self.structured_class_mut(class)?.cardinality = cardinality;
        Ok(())
    }

    pub fn set_transparent(&mut self, class: NodeId, transparent: bool) -> OusiaResult<()> {
        self.structured_class_mut(class)?.transparent = transparent;
        Ok(())
    }

    pub fn set_root(&mut self, class: NodeId, root: bool) -> OusiaResult<()> {
        self.structured_class_mut(class)?.root = root;
        Ok(())
    }

    pub fn set_short_token(&mut self, class: NodeId, token: TokenDescriptor) -> OusiaResult<()> {
        self.structured_class_mut(class)?.short_token = token;
        Ok(())
    }

    /// Sets the start token of a descriptor or field.
    pub fn set_start_token(&mut self, id: NodeId, token: TokenDescriptor) -> OusiaResult<()> {
        match self.kind_mut(id) {
            Some(NodeKind::StructuredClass(c)) => c.descriptor.start_token = token,
            Some(NodeKind::AnnotationClass(d)) => d.start_token = token,
            Some(NodeKind::FieldDescriptor(f)) => f.start_token = token,
            _ => return Err(LoggableException::structure("Node cannot have tokens")),
        }
        Ok(())
    }

    /// Sets the end token of a descriptor or field.
    pub fn set_end_token(&mut self, id: NodeId, token: TokenDescriptor) -> OusiaResult<()> {
        match self.kind_mut(id) {
            Some(NodeKind::StructuredClass(c)) => c.descriptor.end_token = token,
            Some(NodeKind::AnnotationClass(d)) => d.end_token = token,
            Some(NodeKind::FieldDescriptor(f)) => f.end_token = token,
            _ => return Err(LoggableException::structure("Node cannot have tokens")),
        }
        Ok(())
    }

    pub fn set_field_type(&mut self, field: NodeId, field_type: FieldType) -> OusiaResult<()> {
        self.field_mut(field)?.field_type = field_type;
        if let Some(descriptor) = self.parent(field) {
            self.sort_fields(descriptor);
        }
        Ok(())
    }

    pub fn set_field_optional(&mut self, field: NodeId, optional: bool) -> OusiaResult<()> {
        self.field_mut(field)?.optional = optional;
        Ok(())
    }

    pub fn set_field_whitespace_mode(&mut self, field: NodeId, mode: WhitespaceMode) -> OusiaResult<()> {
        self.field_mut(field)?.whitespace_mode = mode;
        Ok(())
    }

    pub fn add_ontology_dependency(&mut self, ontology: NodeId, dependency: NodeId) -> OusiaResult<()> {
        self.attach(ontology, Slot::OntologyDependencies, dependency)
    }

    pub fn add_ontology_typesystem(&mut self, ontology: NodeId, typesystem: NodeId) -> OusiaResult<()> {
        self.attach(ontology, Slot::OntologyTypesystems, typesystem)
    }

    /// Registers every user token of the ontology's descriptors and fields
    /// and stores the assigned ids. Returns the registered ids.
    pub fn register_ontology_tokens(
        &mut self,
        ontology: NodeId,
        callbacks: &mut dyn ParserStateCallbacks,
    ) -> Vec<TokenId> {
        let mut nodes = Vec::new();
        for &descriptor in self
            .ontology_classes(ontology)
            .iter()
            .chain(self.ontology_annotation_classes(ontology))
        {
            nodes.push(descriptor);
            nodes.extend_from_slice(self.field_descriptors(descriptor));
        }
        let mut ids = Vec::new();
        for id in nodes {
            let Some(kind) = self.kind_mut(id) else {
                continue;
            };
            for token in token_slots(kind) {
                if !token.special && !token.token.is_empty() {
                    token.id = callbacks.register_token(&token.token);
                    ids.push(token.id);
                }
            }
        }
        ids
    }

    // ==================== Queries ====================

    pub fn ontology_classes(&self, ontology: NodeId) -> &[NodeId] {
        self.children(ontology, Slot::OntologyClasses)
    }

    pub fn ontology_annotation_classes(&self, ontology: NodeId) -> &[NodeId] {
        self.children(ontology, Slot::OntologyAnnotationClasses)
    }

    pub fn structured_class(&self, class: NodeId) -> Option<&StructuredClassData> {
        match self.kind(class) {
            Some(NodeKind::StructuredClass(c)) => Some(c),
            _ => None,
        }
    }

    /// Descriptor data of a structured or annotation class.
    pub fn descriptor(&self, id: NodeId) -> Option<&DescriptorData> {
        match self.kind(id) {
            Some(NodeKind::StructuredClass(c)) => Some(&c.descriptor),
            Some(NodeKind::AnnotationClass(d)) => Some(d),
            _ => None,
        }
    }

    pub fn field(&self, field: NodeId) -> Option<&FieldData> {
        match self.kind(field) {
            Some(NodeKind::FieldDescriptor(f)) => Some(f),
            _ => None,
        }
    }

    pub fn field_type(&self, field: NodeId) -> Option<FieldType> {
        self.field(field).map(|f| f.field_type)
    }

    pub fn is_primitive_field(&self, field: NodeId) -> bool {
        self.field(field).map_or(false, |f| f.primitive)
    }

    pub fn field_children(&self, field: NodeId) -> &[NodeId] {
        self.children(field, Slot::FieldChildren)
    }

    pub fn attributes_descriptor(&self, descriptor: NodeId) -> Option<NodeId> {
        self.descriptor(descriptor).and_then(|d| d.attributes)
    }

    /// Own fields of a descriptor, TREE field last.
    pub fn field_descriptors(&self, descriptor: NodeId) -> &[NodeId] {
        self.children(descriptor, Slot::DescriptorFields)
    }

    pub fn superclass(&self, class: NodeId) -> Option<NodeId> {
        self.structured_class(class).and_then(|c| c.superclass)
    }

    pub fn subclasses(&self, class: NodeId) -> &[NodeId] {
        self.children(class, Slot::ClassSubclasses)
    }

    pub fn is_transparent(&self, class: NodeId) -> bool {
        self.structured_class(class).map_or(false, |c| c.transparent)
    }

    /// The class followed by its superclasses. Cycles are cut.
    pub fn class_chain(&self, class: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(class);
        while let Some(id) = current {
            if chain.contains(&id) || !self.contains(id) {
                break;
            }
            chain.push(id);
            current = self.superclass(id);
        }
        chain
    }

    /// Whether the superclass chain of `class` leads back to it.
    pub fn has_inheritance_cycle(&self, class: NodeId) -> bool {
        let chain = self.class_chain(class);
        chain
            .last()
            .and_then(|&top| self.superclass(top))
            .map_or(false, |s| chain.contains(&s))
    }

    /// Whether `class` is `other` or inherits from it.
    pub fn is_subclass_of(&self, class: NodeId, other: NodeId) -> bool {
        self.class_chain(class).contains(&other)
    }

    /// Fields of a descriptor including inherited ones.
    ///
    /// Inherited SUBTREE fields come first (outermost superclass first),
    /// followed by the class' own SUBTREE fields and finally the TREE
    /// field. Fields override inherited ones with the same name.
    pub fn effective_field_descriptors(&self, descriptor: NodeId) -> Vec<NodeId> {
        if self.structured_class(descriptor).is_none() {
            return self.field_descriptors(descriptor).to_vec();
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut levels: Vec<Vec<NodeId>> = Vec::new();
        let mut tree = None;
        for class in self.class_chain(descriptor) {
            let mut level = Vec::new();
            for &field in self.field_descriptors(class) {
                if !seen.insert(self.name(field)) {
                    continue;
                }
                if self.field_type(field) == Some(FieldType::Tree) {
                    if tree.is_none() {
                        tree = Some(field);
                    }
                } else {
                    level.push(field);
                }
            }
            levels.push(level);
        }
        let mut fields: Vec<NodeId> = levels.into_iter().rev().flatten().collect();
        fields.extend(tree);
        fields
    }

    /// Position of a field in the effective field list. An empty name
    /// stands for the default field.
    pub fn field_descriptor_index(&self, descriptor: NodeId, name: &str) -> Option<usize> {
        let name = if name.is_empty() { DEFAULT_FIELD_NAME } else { name };
        self.effective_field_descriptors(descriptor)
            .into_iter()
            .position(|f| self.name(f) == name)
    }

    pub fn field_descriptor_by_name(&self, descriptor: NodeId, name: &str) -> Option<NodeId> {
        self.field_descriptor_index(descriptor, name)
            .and_then(|i| self.effective_field_descriptors(descriptor).get(i).copied())
    }

    fn tree_fields(&self, descriptor: NodeId) -> Vec<NodeId> {
        self.effective_field_descriptors(descriptor)
            .into_iter()
            .filter(|&f| self.field_type(f) == Some(FieldType::Tree))
            .collect()
    }

    /// Classes allowed in a field: the declared children and all their
    /// transitive subclasses.
    pub fn permitted_children(&self, field: NodeId) -> Vec<NodeId> {
        let mut result: Vec<NodeId> = Vec::new();
        let mut queue: VecDeque<NodeId> = self.field_children(field).iter().copied().collect();
        while let Some(class) = queue.pop_front() {
            if result.contains(&class) {
                continue;
            }
            result.push(class);
            queue.extend(self.subclasses(class).iter().copied());
        }
        result
    }

    /// Shortest sequence `[field, class, field, ...]` leading from `start`
    /// (a descriptor or field) to a field permitting `target`.
    ///
    /// Intermediate classes are transparent and every field is a TREE
    /// field. Returns an empty path with `true` if `start` is a field that
    /// permits `target` directly, and an empty path with `false` if there
    /// is no unique shortest path.
    pub fn path_to(&self, start: NodeId, target: NodeId, logger: &mut dyn Logger) -> (Vec<NodeId>, bool) {
        let mut frontier: Vec<(NodeId, Vec<NodeId>)> = if self.isa(start, &types::FIELD_DESCRIPTOR) {
            vec![(start, Vec::new())]
        } else {
            self.tree_fields(start).into_iter().map(|f| (f, vec![f])).collect()
        };
        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(start);
        while !frontier.is_empty() {
            let mut found: Vec<Vec<NodeId>> = Vec::new();
            let mut next = Vec::new();
            for (field, path) in &frontier {
                let children = self.permitted_children(*field);
                if children.contains(&target) {
                    if !found.contains(path) {
                        found.push(path.clone());
                    }
                    continue;
                }
                for class in children {
                    if !self.is_transparent(class) || !visited.insert(class) {
                        continue;
                    }
                    for f in self.tree_fields(class) {
                        let mut extended = path.clone();
                        extended.push(class);
                        extended.push(f);
                        next.push((f, extended));
                    }
                }
            }
            if found.len() > 1 {
                logger.error(
                    format!(
                        "Ambiguous path from \"{}\" to \"{}\"",
                        self.path_string(start),
                        self.name(target)
                    ),
                    SourceLocation::default(),
                );
                for path in &found {
                    logger.note(
                        format!("Possible path: {}", self.format_node_path(path)),
                        SourceLocation::default(),
                    );
                }
                return (Vec::new(), false);
            }
            if let Some(path) = found.pop() {
                return (path, true);
            }
            frontier = next;
        }
        (Vec::new(), false)
    }

    fn format_node_path(&self, path: &[NodeId]) -> String {
        path.iter()
            .map(|&n| self.path_string(n))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Primitive TREE fields reachable from `descriptor` through transparent
    /// classes, closest first.
    pub fn default_fields(&self, descriptor: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(descriptor);
        let mut queue = VecDeque::from([descriptor]);
        while let Some(current) = queue.pop_front() {
            for field in self.tree_fields(current) {
                if self.is_primitive_field(field) {
                    result.push(field);
                    continue;
                }
                for class in self.permitted_children(field) {
                    if self.is_transparent(class) && visited.insert(class) {
                        queue.push_back(class);
                    }
                }
            }
        }
        result
    }

    /// Tokens of a descriptor or field.
    pub fn syntax_descriptor(&self, id: NodeId, depth: usize) -> SyntaxDescriptor {
        let (open, close, short) = match self.kind(id) {
            Some(NodeKind::StructuredClass(c)) => (
                c.descriptor.start_token.id,
                c.descriptor.end_token.id,
                c.short_token.id,
            ),
            Some(NodeKind::AnnotationClass(d)) => (d.start_token.id, d.end_token.id, Tokens::EMPTY),
            Some(NodeKind::FieldDescriptor(f)) => (f.start_token.id, f.end_token.id, Tokens::EMPTY),
            _ => (Tokens::EMPTY, Tokens::EMPTY, Tokens::EMPTY),
        };
        SyntaxDescriptor {
            open,
            close,
            short,
            descriptor: id,
            depth,
        }
    }

    /// Syntax descriptors of everything that may start inside `start` (a
    /// descriptor or field), ordered by the number of transparent classes
    /// in between.
    pub fn permitted_tokens(&self, start: NodeId) -> Vec<SyntaxDescriptor> {
        let mut result: Vec<SyntaxDescriptor> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<(NodeId, usize)> = if self.isa(start, &types::FIELD_DESCRIPTOR) {
            VecDeque::from([(start, 0)])
        } else {
            self.effective_field_descriptors(start)
                .into_iter()
                .map(|f| (f, 0))
                .collect()
        };
        let mut push = |sd: SyntaxDescriptor, result: &mut Vec<SyntaxDescriptor>| {
            if !sd.is_empty() && seen.insert(sd.descriptor) {
                result.push(sd);
            }
        };
        let mut expanded: HashSet<NodeId> = HashSet::new();
        while let Some((field, depth)) = queue.pop_front() {
            if !expanded.insert(field) {
                continue;
            }
            push(self.syntax_descriptor(field, depth), &mut result);
            for class in self.permitted_children(field) {
                push(self.syntax_descriptor(class, depth), &mut result);
                if self.is_transparent(class) {
                    for f in self.effective_field_descriptors(class) {
                        queue.push_back((f, depth + 1));
                    }
                }
            }
        }
        result
    }

    // ==================== Validation ====================

    pub(crate) fn validate_ontology(
        &self,
        id: NodeId,
        logger: &mut dyn Logger,
        ctx: &mut ValidationContext,
    ) -> bool {
        let mut valid = self.validate_name(id, logger);
        valid &= self.validate_unique_names(self.ontology_classes(id), "classes", logger);
        valid &= self.validate_unique_names(
            self.ontology_annotation_classes(id),
            "annotation classes",
            logger,
        );
        let typesystems = self.children(id, Slot::OntologyTypesystems);
        valid &= self.validate_unique_names(typesystems, "typesystems", logger);
        for &ts in typesystems {
            if self.contains(ts) {
                valid &= self.validate_node(ts, logger, ctx);
            }
        }
        valid
    }

    pub(crate) fn validate_descriptor(
        &self,
        id: NodeId,
        logger: &mut dyn Logger,
        _ctx: &mut ValidationContext,
    ) -> bool {
        let Some(data) = self.descriptor(id) else {
            return false;
        };
        let location = self.location(id);
        let name = self.name(id);
        let mut valid = self.validate_parent(id, &types::ONTOLOGY, logger);
        valid &= self.validate_name(id, logger);

        match data.attributes {
            Some(attributes) => {
                if self.struct_attribute_index(attributes, "name").is_some() {
                    logger.error(
                        format!("Attribute descriptor of \"{name}\" may not define an attribute \"name\""),
                        location,
                    );
                    valid = false;
                }
            }
            None => {
                logger.error(format!("\"{name}\" has no attribute descriptor"), location);
                valid = false;
            }
        }

        let fields = data.fields.as_slice();
        let trees: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, &f)| self.field_type(f) == Some(FieldType::Tree))
            .map(|(i, _)| i)
            .collect();
        if trees.len() > 1 {
            logger.error(format!("\"{name}\" has more than one TREE field"), location);
            valid = false;
        } else if trees.first().map_or(false, |&i| i + 1 != fields.len()) {
            logger.error(format!("The TREE field of \"{name}\" is not its last field"), location);
            valid = false;
        }
        valid &= self.validate_unique_names(fields, "fields", logger);

        for token in [&data.start_token, &data.end_token] {
            if !token.is_valid() {
                logger.error(
                    format!("\"{}\" is not a valid token for \"{name}\"", token.token),
                    location,
                );
                valid = false;
            }
        }
        valid
    }

    pub(crate) fn validate_structured_class(
        &self,
        id: NodeId,
        logger: &mut dyn Logger,
        ctx: &mut ValidationContext,
    ) -> bool {
        let Some(data) = self.structured_class(id) else {
            return false;
        };
        let location = self.location(id);
        let name = self.name(id);
        let mut valid = self.validate_descriptor(id, logger, ctx);

        if !data.cardinality.is_valid() {
            logger.error(
                format!("Cardinality {} of \"{name}\" is invalid", data.cardinality),
                location,
            );
            valid = false;
        }
        if !data.short_token.is_valid() {
            logger.error(
                format!("\"{}\" is not a valid token for \"{name}\"", data.short_token.token),
                location,
            );
            valid = false;
        }
        for &sub in data.subclasses.iter() {
            if self.superclass(sub) != Some(id) {
                logger.error(
                    format!(
                        "\"{}\" is listed as subclass of \"{name}\" but has a different superclass",
                        self.name(sub)
                    ),
                    self.location(sub),
                );
                valid = false;
            }
        }
        if self.has_inheritance_cycle(id) {
            logger.error(format!("Class \"{name}\" inherits from itself"), location);
            return false;
        }
        if let Some(sup) = data.superclass {
            if self.contains(sup) {
                valid &= self.validate_node(sup, logger, ctx);
            }
        }
        valid
    }

    pub(crate) fn validate_field_descriptor(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let Some(data) = self.field(id) else {
            return false;
        };
        let location = self.location(id);
        let name = self.name(id);
        let mut valid = self.validate_parent(id, &types::DESCRIPTOR, logger);

        if name.is_empty() {
            logger.error("Field has no name", location);
            valid = false;
        } else if name == DEFAULT_FIELD_NAME {
            if data.field_type != FieldType::Tree {
                logger.error("The default field must be a TREE field", location);
                valid = false;
            }
        } else {
            valid &= self.validate_name(id, logger);
        }

        if data.primitive {
            match data.primitive_type {
                Some(ty) if self.isa(ty, &types::TYPE) => {}
                _ => {
                    logger.error(format!("Primitive field \"{name}\" has no valid type"), location);
                    valid = false;
                }
            }
            if !data.children.is_empty() {
                logger.error(format!("Primitive field \"{name}\" may not have children"), location);
                valid = false;
            }
        } else {
            if data.primitive_type.is_some() {
                logger.error(format!("Non-primitive field \"{name}\" may not have a type"), location);
                valid = false;
            }
            if data.children.is_empty() {
                logger.error(format!("Non-primitive field \"{name}\" has no children"), location);
                valid = false;
            }
            valid &= self.validate_unique_names(&self.permitted_children(id), "child classes", logger);
        }

        for token in [&data.start_token, &data.end_token] {
            if !token.is_valid() {
                logger.error(
                    format!("\"{}\" is not a valid token for field \"{name}\"", token.token),
                    location,
                );
                valid = false;
            }
        }
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::ConcreteLogger;
    use crate::ranges::Range;
    use crate::tokens::TokenRegistry;

    struct Book {
        mgr: Manager,
        ontology: NodeId,
        book: NodeId,
        chapter: NodeId,
        section: NodeId,
        paragraph: NodeId,
        text: NodeId,
    }

    fn class(mgr: &mut Manager, ont: NodeId, name: &str, transparent: bool) -> NodeId {
        mgr.create_structured_class(ont, name, RangeSet::any(), None, transparent, false)
            .unwrap()
    }

    fn tree(mgr: &mut Manager, desc: NodeId, children: &[NodeId]) -> NodeId {
        let f = mgr.create_field_descriptor(desc, FieldType::Tree, "", false).unwrap();
        for &c in children {
            mgr.add_child_class(f, c).unwrap();
        }
        f
    }

    fn book() -> Book {
        let mut mgr = Manager::new();
        let sys = mgr.create_system_typesystem().unwrap();
        let string = mgr.lookup_type(sys, "string").unwrap();
        let ontology = mgr.create_ontology("book");
        mgr.add_ontology_typesystem(ontology, sys).unwrap();
        let book = mgr
            .create_structured_class(ontology, "book", RangeSet::single(1), None, false, true)
            .unwrap();
        let chapter = class(&mut mgr, ontology, "chapter", false);
        let section = class(&mut mgr, ontology, "section", false);
        let paragraph = class(&mut mgr, ontology, "paragraph", true);
        let text = class(&mut mgr, ontology, "text", true);
        tree(&mut mgr, book, &[chapter, paragraph]);
        tree(&mut mgr, chapter, &[section, paragraph]);
        tree(&mut mgr, section, &[paragraph]);
        tree(&mut mgr, paragraph, &[text]);
        mgr.create_primitive_field_descriptor(text, string, FieldType::Tree, "", false)
            .unwrap();
        Book {
            mgr,
            ontology,
            book,
            chapter,
            section,
            paragraph,
            text,
        }
    }

    // ==================== Field order tests ====================

    #[test]
    fn test_tree_field_kept_last() {
        let mut b = book();
        let tree = b.mgr.field_descriptors(b.chapter)[0];
        let heading = b
            .mgr
            .create_field_descriptor(b.chapter, FieldType::Subtree, "heading", true)
            .unwrap();
        assert_eq!(b.mgr.field_descriptors(b.chapter), &[heading, tree]);
        b.mgr.set_field_type(heading, FieldType::Tree).unwrap();
        b.mgr.set_field_type(tree, FieldType::Subtree).unwrap();
        assert_eq!(b.mgr.field_descriptors(b.chapter), &[tree, heading]);
    }

    #[test]
    fn test_move_field_descriptor() {
        let mut b = book();
        let title = b
            .mgr
            .create_field_descriptor(b.section, FieldType::Subtree, "title", false)
            .unwrap();
        b.mgr.add_child_class(title, b.paragraph).unwrap();
        b.mgr.move_field_descriptor(b.chapter, title).unwrap();
        assert_eq!(b.mgr.parent(title), Some(b.chapter));
        assert_eq!(b.mgr.field_descriptors(b.section).len(), 1);
        assert_eq!(b.mgr.field_descriptors(b.chapter)[0], title);
        assert_eq!(b.mgr.field_descriptors(b.chapter).len(), 2);
    }

    // ==================== Inheritance tests ====================

    #[test]
    fn test_effective_fields_override() {
        let mut b = book();
        let ont = b.ontology;
        let base = class(&mut b.mgr, ont, "base", false);
        let derived = class(&mut b.mgr, ont, "derived", false);
        b.mgr.set_superclass(derived, Some(base)).unwrap();

        let base_a = b.mgr.create_field_descriptor(base, FieldType::Subtree, "a", false).unwrap();
        let base_b = b.mgr.create_field_descriptor(base, FieldType::Subtree, "b", false).unwrap();
        let base_tree = tree(&mut b.mgr, base, &[b.paragraph]);
        let derived_b = b.mgr.create_field_descriptor(derived, FieldType::Subtree, "b", false).unwrap();
        let derived_c = b.mgr.create_field_descriptor(derived, FieldType::Subtree, "c", false).unwrap();

        assert_eq!(
            b.mgr.effective_field_descriptors(derived),
            vec![base_a, derived_b, derived_c, base_tree]
        );
        assert_eq!(b.mgr.field_descriptor_index(derived, ""), Some(3));
        assert_eq!(b.mgr.field_descriptor_by_name(derived, "b"), Some(derived_b));
        assert_eq!(b.mgr.effective_field_descriptors(base), vec![base_a, base_b, base_tree]);

        let derived_tree = tree(&mut b.mgr, derived, &[b.section]);
        assert_eq!(b.mgr.effective_field_descriptors(derived).last(), Some(&derived_tree));
    }

    #[test]
    fn test_superclass_updates_subclasses_and_attributes() {
        let mut b = book();
        let ont = b.ontology;
        let base = class(&mut b.mgr, ont, "base", false);
        let other = class(&mut b.mgr, ont, "other", false);
        let derived = class(&mut b.mgr, ont, "derived", false);
        b.mgr.set_superclass(derived, Some(base)).unwrap();
        assert_eq!(b.mgr.subclasses(base), &[derived]);
        let attrs = b.mgr.attributes_descriptor(derived).unwrap();
        assert_eq!(b.mgr.struct_parent(attrs), b.mgr.attributes_descriptor(base));

        b.mgr.set_superclass(derived, Some(other)).unwrap();
        assert!(b.mgr.subclasses(base).is_empty());
        assert_eq!(b.mgr.subclasses(other), &[derived]);
        assert_eq!(b.mgr.struct_parent(attrs), b.mgr.attributes_descriptor(other));
        assert!(b.mgr.is_subclass_of(derived, other));
        assert!(!b.mgr.is_subclass_of(derived, base));
    }

    #[test]
    fn test_permitted_children_include_subclasses() {
        let mut b = book();
        let ont = b.ontology;
        let sub = class(&mut b.mgr, ont, "special_section", false);
        let subsub = class(&mut b.mgr, ont, "very_special_section", false);
        b.mgr.set_superclass(sub, Some(b.section)).unwrap();
        b.mgr.set_superclass(subsub, Some(sub)).unwrap();
        let field = b.mgr.field_descriptors(b.chapter)[0];
        assert_eq!(
            b.mgr.permitted_children(field),
            vec![b.section, b.paragraph, sub, subsub]
        );
    }

    #[test]
    fn test_inheritance_cycle_invalid() {
        let mut b = book();
        let ont = b.ontology;
        let a = class(&mut b.mgr, ont, "a", false);
        let c = class(&mut b.mgr, ont, "c", false);
        b.mgr.set_superclass(a, Some(c)).unwrap();
        b.mgr.set_superclass(c, Some(a)).unwrap();
        assert!(b.mgr.has_inheritance_cycle(a));
        let mut logger = ConcreteLogger::default();
        assert!(!b.mgr.validate(b.ontology, &mut logger));
        assert!(logger.contains("inherits from itself"));
    }

    // ==================== Path tests ====================

    #[test]
    fn test_path_to() {
        let b = book();
        let mut logger = ConcreteLogger::default();
        let book_tree = b.mgr.field_descriptors(b.book)[0];
        let paragraph_tree = b.mgr.field_descriptors(b.paragraph)[0];

        assert_eq!(b.mgr.path_to(b.book, b.chapter, &mut logger), (vec![book_tree], true));
        assert_eq!(
            b.mgr.path_to(b.book, b.text, &mut logger),
            (vec![book_tree, b.paragraph, paragraph_tree], true)
        );
        assert_eq!(b.mgr.path_to(b.book, b.section, &mut logger), (vec![], false));
        assert_eq!(b.mgr.path_to(book_tree, b.chapter, &mut logger), (vec![], true));
        assert!(!logger.has_error());
    }

    #[test]
    fn test_path_to_ambiguous() {
        let mut b = book();
        let ont = b.ontology;
        let other = class(&mut b.mgr, ont, "other_wrapper", true);
        tree(&mut b.mgr, other, &[b.text]);
        let book_tree = b.mgr.field_descriptors(b.book)[0];
        b.mgr.add_child_class(book_tree, other).unwrap();
        let mut logger = ConcreteLogger::default();
        assert_eq!(b.mgr.path_to(b.book, b.text, &mut logger), (vec![], false));
        assert!(logger.contains("Ambiguous path"));
        assert!(logger.contains("Possible path"));
    }

    #[test]
    fn test_default_fields() {
        let b = book();
        let text_field = b.mgr.field_descriptors(b.text)[0];
        assert_eq!(b.mgr.default_fields(b.book), vec![text_field]);
        assert_eq!(b.mgr.default_fields(b.text), vec![text_field]);
        assert!(b.mgr.default_fields(b.chapter).contains(&text_field));
    }

    // ==================== Token tests ====================

    #[test]
    fn test_permitted_tokens() {
        let mut b = book();
        b.mgr.set_short_token(b.paragraph, TokenDescriptor::special(Tokens::PARAGRAPH)).unwrap();
        b.mgr.set_start_token(b.chapter, TokenDescriptor::user("##")).unwrap();
        let mut registry = TokenRegistry::new();
        let ids = b.mgr.register_ontology_tokens(b.ontology, &mut registry);
        assert_eq!(ids.len(), 1);
        let chapter_token = registry.token_id("##").unwrap();

        let tokens = b.mgr.permitted_tokens(b.book);
        let chapter = tokens.iter().find(|sd| sd.descriptor == b.chapter).unwrap();
        assert_eq!(chapter.open, chapter_token);
        assert_eq!(chapter.depth, 0);
        let paragraph = tokens.iter().find(|sd| sd.descriptor == b.paragraph).unwrap();
        assert_eq!(paragraph.short, Tokens::PARAGRAPH);
        assert!(tokens.iter().all(|sd| !sd.is_empty()));
    }

    // ==================== Validation tests ====================

    #[test]
    fn test_book_ontology_valid() {
        let b = book();
        let mut logger = ConcreteLogger::default();
        assert!(b.mgr.validate(b.ontology, &mut logger), "{:?}", logger.messages());
    }

    #[test]
    fn test_second_tree_field_invalid() {
        let mut b = book();
        let second = b.mgr.create_field_descriptor(b.chapter, FieldType::Tree, "second", false).unwrap();
        b.mgr.add_child_class(second, b.section).unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!b.mgr.validate(b.ontology, &mut logger));
        assert!(logger.contains("more than one TREE field"));
    }

    #[test]
    fn test_invalid_fields() {
        let mut b = book();
        let empty = b.mgr.create_field_descriptor(b.section, FieldType::Subtree, "empty", false).unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!b.mgr.validate(b.ontology, &mut logger));
        assert!(logger.contains("Non-primitive field \"empty\" has no children"));
        assert!(b.mgr.field_children(empty).is_empty());

        let mut b = book();
        b.mgr.create_field_descriptor(b.section, FieldType::Subtree, "", false).unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!b.mgr.validate(b.ontology, &mut logger));
        assert!(logger.contains("The default field must be a TREE field"));
    }

    #[test]
    fn test_name_attribute_invalid() {
        let mut b = book();
        let attrs = b.mgr.attributes_descriptor(b.chapter).unwrap();
        b.mgr.create_attribute(attrs, "name", None, None).unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!b.mgr.validate(b.ontology, &mut logger));
        assert!(logger.contains("may not define an attribute \"name\""));
    }

    #[test]
    fn test_invalid_cardinality() {
        let mut b = book();
        b.mgr.set_cardinality(b.section, RangeSet::from_range(Range::new(3, 1))).unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!b.mgr.validate(b.ontology, &mut logger));
        assert!(logger.contains("Cardinality"));
    }

    #[test]
    fn test_duplicate_child_names_invalid() {
        let mut b = book();
        let other = b.mgr.create_ontology("other");
        let dup = class(&mut b.mgr, other, "section", false);
        let field = b.mgr.field_descriptors(b.chapter)[0];
        b.mgr.add_child_class(field, dup).unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!b.mgr.validate(b.ontology, &mut logger));
        assert!(logger.contains("Multiple child classes with name \"section\""));
    }
}
