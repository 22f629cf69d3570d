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

//! Documents: instances of ontologies.
//!
//! A document owns one root structured entity and any number of
//! annotations. Entities hold one child vector per effective field of
//! their descriptor; structure nodes (entities, primitives and anchors)
//! live in exactly one such field.

use std::cmp::Ordering;

use crate::error::{LoggableException, OusiaResult};
use crate::logger::{Logger, LoggerExt};
use crate::managed::{Manager, NodeId, NodeKind, NodeVector, Slot};
use crate::ontology::{FieldType, DEFAULT_FIELD_NAME};
use crate::rtti::types;
use crate::variant::{Variant, VariantMap};

/// Payload of a document node.
#[derive(Debug, Clone, Default)]
pub struct DocumentData {
    pub(crate) root: Option<NodeId>,
    pub(crate) annotations: NodeVector,
    pub(crate) ontologies: NodeVector,
    pub(crate) typesystems: NodeVector,
}

/// Data shared by structured and annotation entities.
#[derive(Debug, Clone)]
pub struct EntityData {
    pub(crate) descriptor: NodeId,
    pub(crate) attributes: Variant,
    pub(crate) fields: Vec<NodeVector>,
}

impl EntityData {
    fn new(descriptor: NodeId, attributes: Variant) -> Self {
        Self {
            descriptor,
            attributes,
            fields: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> NodeId {
        self.descriptor
    }

    pub fn attributes(&self) -> &Variant {
        &self.attributes
    }

    pub fn fields(&self) -> &[NodeVector] {
        &self.fields
    }

    /// Field vector `i`, growing the field list as needed.
    pub(crate) fn field_mut(&mut self, i: usize) -> &mut NodeVector {
        if self.fields.len() <= i {
            self.fields.resize_with(i + 1, NodeVector::default);
        }
        &mut self.fields[i]
    }
}

/// Payload of an annotation entity.
#[derive(Debug, Clone)]
pub struct AnnotationEntityData {
    pub(crate) entity: EntityData,
    pub(crate) start: Option<NodeId>,
    pub(crate) end: Option<NodeId>,
}

impl AnnotationEntityData {
    pub fn entity(&self) -> &EntityData {
        &self.entity
    }

    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    pub fn end(&self) -> Option<NodeId> {
        self.end
    }
}

/// Payload of an anchor.
#[derive(Debug, Clone, Default)]
pub struct AnchorData {
    pub(crate) annotation: Option<NodeId>,
}

impl AnchorData {
    pub fn annotation(&self) -> Option<NodeId> {
        self.annotation
    }
}

fn default_attributes(attributes: Option<Variant>) -> Variant {
    attributes.unwrap_or_else(|| Variant::Map(VariantMap::new()))
}

impl Manager {
    // ==================== Construction ====================

    pub fn create_document(&mut self, name: impl Into<String>) -> NodeId {
        self.create(name, NodeKind::Document(DocumentData::default()))
    }

    pub fn add_document_ontology(&mut self, document: NodeId, ontology: NodeId) -> OusiaResult<()> {
        self.attach(document, Slot::DocumentOntologies, ontology)
    }

    pub fn add_document_typesystem(&mut self, document: NodeId, typesystem: NodeId) -> OusiaResult<()> {
        self.attach(document, Slot::DocumentTypesystems, typesystem)
    }

    fn create_entity(
        &mut self,
        class: NodeId,
        attributes: Option<Variant>,
        name: impl Into<String>,
    ) -> OusiaResult<NodeId> {
        if !self.isa(class, &types::STRUCTURED_CLASS) {
            return Err(LoggableException::structure(format!(
                "Cannot instantiate \"{}\": not a structured class",
                self.name(class)
            )));
        }
        Ok(self.create(
            name,
            NodeKind::StructuredEntity(EntityData::new(class, default_attributes(attributes))),
        ))
    }

    /// Creates the root entity of a document, replacing a previous root.
    pub fn create_root_structured_entity(
        &mut self,
        document: NodeId,
        class: NodeId,
        attributes: Option<Variant>,
        name: impl Into<String>,
    ) -> OusiaResult<NodeId> {
        let entity = self.create_entity(class, attributes, name)?;
        self.attach(document, Slot::DocumentRoot, entity)?;
        Ok(entity)
    }

    /// Creates an entity in field `field` of `parent`.
    pub fn create_child_structured_entity(
        &mut self,
        parent: NodeId,
        class: NodeId,
        attributes: Option<Variant>,
        field: &str,
        name: impl Into<String>,
    ) -> OusiaResult<NodeId> {
        let index = self.field_index(parent, field)?;
        let entity = self.create_entity(class, attributes, name)?;
        self.add_structure_node(parent, entity, index)?;
        Ok(entity)
    }

    pub fn create_child_document_primitive(
        &mut self,
        parent: NodeId,
        content: Variant,
        field: &str,
    ) -> OusiaResult<NodeId> {
        let index = self.field_index(parent, field)?;
        let primitive = self.create("", NodeKind::DocumentPrimitive(content));
        self.add_structure_node(parent, primitive, index)?;
        Ok(primitive)
    }

    pub fn create_child_anchor(&mut self, parent: NodeId, field: &str) -> OusiaResult<NodeId> {
        let index = self.field_index(parent, field)?;
        let anchor = self.create("", NodeKind::Anchor(AnchorData::default()));
        self.add_structure_node(parent, anchor, index)?;
        Ok(anchor)
    }

    /// Creates an annotation spanning `start` to `end`. Either anchor may be
    /// set later with [`Manager::set_annotation_end`].
    pub fn create_annotation(
        &mut self,
        document: NodeId,
        class: NodeId,
        attributes: Option<Variant>,
        start: Option<NodeId>,
        end: Option<NodeId>,
        name: impl Into<String>,
    ) -> OusiaResult<NodeId> {
        if !self.isa(class, &types::ANNOTATION_CLASS) {
            return Err(LoggableException::structure(format!(
                "Cannot annotate with \"{}\": not an annotation class",
                self.name(class)
            )));
        }
        let annotation = self.create(
            name,
            NodeKind::AnnotationEntity(AnnotationEntityData {
                entity: EntityData::new(class, default_attributes(attributes)),
                start: None,
                end: None,
            }),
        );
        self.attach(document, Slot::DocumentAnnotations, annotation)?;
        if let Some(start) = start {
            self.set_annotation_start(annotation, start)?;
        }
        if let Some(end) = end {
            self.set_annotation_end(annotation, end)?;
        }
        Ok(annotation)
    }

    fn bind_anchor(&mut self, annotation: NodeId, anchor: NodeId, start: bool) -> OusiaResult<()> {
        if !self.isa(anchor, &types::ANCHOR) {
            return Err(LoggableException::structure("Annotation endpoints must be anchors"));
        }
        let previous = match self.kind_mut(annotation) {
            Some(NodeKind::AnnotationEntity(a)) if start => a.start.replace(anchor),
            Some(NodeKind::AnnotationEntity(a)) => a.end.replace(anchor),
            _ => return Err(LoggableException::structure("Expected an annotation entity")),
        };
        if let Some(previous) = previous.filter(|&p| p != anchor) {
            if let Some(NodeKind::Anchor(a)) = self.kind_mut(previous) {
                a.annotation = None;
            }
        }
        if let Some(NodeKind::Anchor(a)) = self.kind_mut(anchor) {
            a.annotation = Some(annotation);
        }
        Ok(())
    }

    pub fn set_annotation_start(&mut self, annotation: NodeId, anchor: NodeId) -> OusiaResult<()> {
        self.bind_anchor(annotation, anchor, true)
    }

    pub fn set_annotation_end(&mut self, annotation: NodeId, anchor: NodeId) -> OusiaResult<()> {
        self.bind_anchor(annotation, anchor, false)
    }

    /// Moves a structure node into field `index` of `entity`, removing it
    /// from its previous field.
    pub fn add_structure_node(&mut self, entity: NodeId, node: NodeId, index: usize) -> OusiaResult<()> {
        if !self.isa(node, &types::STRUCTURE_NODE) {
            return Err(LoggableException::structure(format!(
                "{} cannot be part of a document structure",
                self.rtti(node)
            )));
        }
        let descriptor = self.entity_descriptor(entity)?;
        let count = self.effective_field_descriptors(descriptor).len();
        if index >= count {
            return Err(LoggableException::structure(format!(
                "Field index {index} out of range, \"{}\" has {count} fields",
                self.name(descriptor)
            )));
        }
        self.attach(entity, Slot::EntityField(index), node)
    }

    /// Removes a structure node from its entity. The node becomes parentless.
    pub fn remove_structure_node(&mut self, node: NodeId) -> bool {
        match self.get(node).and_then(|n| Some((n.parent()?, n.slot()?))) {
            Some((parent, slot @ Slot::EntityField(_))) => self.remove_from(parent, slot, node),
            _ => false,
        }
    }

    pub fn set_entity_attributes(&mut self, entity: NodeId, attributes: Variant) -> OusiaResult<()> {
        match self.kind_mut(entity) {
            Some(NodeKind::StructuredEntity(e)) => e.attributes = attributes,
            Some(NodeKind::AnnotationEntity(a)) => a.entity.attributes = attributes,
            _ => return Err(LoggableException::structure("Expected a document entity")),
        }
        Ok(())
    }

    /// Prepares the entity attributes with the descriptor's attribute
    /// schema and stores the result.
    pub fn prepare_entity_attributes(&mut self, entity: NodeId, logger: &mut dyn Logger) -> bool {
        let Some(data) = self.entity(entity) else {
            return false;
        };
        let mut attributes = data.attributes.clone();
        let Some(schema) = self.attributes_descriptor(data.descriptor) else {
            return false;
        };
        let ok = self.prepare(schema, &mut attributes, logger);
        ok && self.set_entity_attributes(entity, attributes).is_ok()
    }

    // ==================== Queries ====================

    pub fn document_root(&self, document: NodeId) -> Option<NodeId> {
        match self.kind(document) {
            Some(NodeKind::Document(d)) => d.root,
            _ => None,
        }
    }

    pub fn document_annotations(&self, document: NodeId) -> &[NodeId] {
        self.children(document, Slot::DocumentAnnotations)
    }

    pub fn document_ontologies(&self, document: NodeId) -> &[NodeId] {
        self.children(document, Slot::DocumentOntologies)
    }

    /// Entity data of a structured or annotation entity.
    pub fn entity(&self, id: NodeId) -> Option<&EntityData> {
        match self.kind(id) {
            Some(NodeKind::StructuredEntity(e)) => Some(e),
            Some(NodeKind::AnnotationEntity(a)) => Some(&a.entity),
            _ => None,
        }
    }

    pub fn annotation(&self, id: NodeId) -> Option<&AnnotationEntityData> {
        match self.kind(id) {
            Some(NodeKind::AnnotationEntity(a)) => Some(a),
            _ => None,
        }
    }

    pub fn anchor_annotation(&self, anchor: NodeId) -> Option<NodeId> {
        match self.kind(anchor) {
            Some(NodeKind::Anchor(a)) => a.annotation,
            _ => None,
        }
    }

    pub fn primitive_content(&self, id: NodeId) -> Option<&Variant> {
        match self.kind(id) {
            Some(NodeKind::DocumentPrimitive(v)) => Some(v),
            _ => None,
        }
    }

    pub fn entity_descriptor(&self, entity: NodeId) -> OusiaResult<NodeId> {
        self.entity(entity)
            .map(|e| e.descriptor)
            .ok_or_else(|| LoggableException::structure("Expected a document entity"))
    }

    pub fn entity_attributes(&self, entity: NodeId) -> Option<&Variant> {
        self.entity(entity).map(|e| &e.attributes)
    }

    /// Children of field `index` of an entity.
    pub fn entity_field(&self, entity: NodeId, index: usize) -> &[NodeId] {
        self.children(entity, Slot::EntityField(index))
    }

    /// Index of the field called `name` in the effective field list of the
    /// entity's descriptor. An empty name or `$default` refers to the TREE
    /// field.
    pub fn field_index(&self, entity: NodeId, name: &str) -> OusiaResult<usize> {
        let descriptor = self.entity_descriptor(entity)?;
        let fields = self.effective_field_descriptors(descriptor);
        if name.is_empty() || name == DEFAULT_FIELD_NAME {
            let trees: Vec<usize> = fields
                .iter()
                .enumerate()
                .filter(|(_, &f)| self.field_type(f) == Some(FieldType::Tree))
                .map(|(i, _)| i)
                .collect();
            return match trees.as_slice() {
                [i] => Ok(*i),
                _ => Err(LoggableException::structure(format!(
                    "\"{}\" has no default field",
                    self.name(descriptor)
                ))),
            };
        }
        fields
            .iter()
            .position(|&f| self.name(f) == name)
            .ok_or_else(|| {
                LoggableException::structure(format!(
                    "\"{}\" has no field \"{name}\"",
                    self.name(descriptor)
                ))
            })
    }

    /// Index of `field` in the effective field list of the entity's
    /// descriptor.
    pub fn field_descriptor_position(&self, entity: NodeId, field: NodeId) -> OusiaResult<usize> {
        let descriptor = self.entity_descriptor(entity)?;
        self.effective_field_descriptors(descriptor)
            .iter()
            .position(|&f| f == field)
            .ok_or_else(|| {
                LoggableException::structure(format!(
                    "\"{}\" has no field \"{}\"",
                    self.name(descriptor),
                    self.name(field)
                ))
            })
    }

    /// Position of a structure node: the document and the `(field, index)`
    /// pairs leading from the root to the node.
    fn document_position(&self, node: NodeId) -> Option<(NodeId, Vec<(usize, usize)>)> {
        let mut key = Vec::new();
        let mut current = node;
        loop {
            let data = self.get(current)?;
            match data.slot()? {
                Slot::EntityField(i) => {
                    let parent = data.parent()?;
                    let pos = self
                        .entity_field(parent, i)
                        .iter()
                        .position(|&c| c == current)?;
                    key.push((i, pos));
                    current = parent;
                }
                Slot::DocumentRoot => {
                    key.reverse();
                    return Some((data.parent()?, key));
                }
                _ => return None,
            }
        }
    }

    /// Whether `node` is part of the structure tree of `document`.
    pub fn has_child(&self, document: NodeId, node: NodeId) -> bool {
        self.document_position(node)
            .map_or(false, |(doc, _)| doc == document)
    }

    /// Orders two structure nodes of the same document. Ancestors come
    /// before their descendants. `None` if the nodes are not part of the
    /// same document.
    pub fn compare_document_order(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        let (doc_a, key_a) = self.document_position(a)?;
        let (doc_b, key_b) = self.document_position(b)?;
        (doc_a == doc_b).then(|| key_a.cmp(&key_b))
    }

    fn matches_start_anchor(&self, anchor: NodeId, class: Option<NodeId>, name: &str) -> bool {
        let Some(annotation) = self.anchor_annotation(anchor) else {
            return true;
        };
        let Some(data) = self.annotation(annotation) else {
            return false;
        };
        data.start == Some(anchor)
            && data.end.is_none()
            && (name.is_empty() || self.name(annotation) == name)
            && class.map_or(true, |c| data.entity.descriptor == c)
    }

    /// Searches the entity's TREE content backwards, innermost last child
    /// first.
    fn search_start_anchor_downwards(&self, entity: NodeId, class: Option<NodeId>, name: &str) -> Option<NodeId> {
        let index = self.field_index(entity, "").ok()?;
        self.search_start_anchor_in(entity, index, usize::MAX, class, name)
    }

    fn search_start_anchor_in(
        &self,
        entity: NodeId,
        index: usize,
        before: usize,
        class: Option<NodeId>,
        name: &str,
    ) -> Option<NodeId> {
        let children = self.entity_field(entity, index);
        let end = before.min(children.len());
        for &child in children[..end].iter().rev() {
            if self.isa(child, &types::ANCHOR) {
                if self.matches_start_anchor(child, class, name) {
                    return Some(child);
                }
            } else if self.isa(child, &types::STRUCTURED_ENTITY) {
                if let Some(anchor) = self.search_start_anchor_downwards(child, class, name) {
                    return Some(anchor);
                }
            }
        }
        None
    }

    /// Finds the closest preceding anchor that is either unbound or the
    /// open start of an annotation matching `class` and `name`.
    ///
    /// The search starts at the end of field `index` of `entity`, descends
    /// into preceding entities and continues upwards through TREE fields.
    /// It does not leave a SUBTREE field.
    pub fn search_start_anchor(
        &self,
        entity: NodeId,
        index: usize,
        class: Option<NodeId>,
        name: &str,
    ) -> Option<NodeId> {
        if let Some(anchor) = self.search_start_anchor_in(entity, index, usize::MAX, class, name) {
            return Some(anchor);
        }
        let mut current = entity;
        let mut current_index = index;
        loop {
            let descriptor = self.entity(current)?.descriptor;
            let field = self.effective_field_descriptors(descriptor).get(current_index).copied()?;
            if self.field_type(field) != Some(FieldType::Tree) {
                return None;
            }
            let node = self.get(current)?;
            let (parent, Slot::EntityField(parent_index)) = (node.parent()?, node.slot()?) else {
                return None;
            };
            let pos = self
                .entity_field(parent, parent_index)
                .iter()
                .position(|&c| c == current)?;
            if let Some(anchor) = self.search_start_anchor_in(parent, parent_index, pos, class, name) {
                return Some(anchor);
            }
            current = parent;
            current_index = parent_index;
        }
    }

    // ==================== Validation ====================

    pub(crate) fn validate_document(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let location = self.location(id);
        let mut valid = self.validate_unique_names(self.document_annotations(id), "annotations", logger);
        let Some(root) = self.document_root(id) else {
            logger.error(format!("Document \"{}\" has no root", self.name(id)), location);
            return false;
        };
        if let Some(class) = self.entity(root).map(|e| e.descriptor) {
            if !self.structured_class(class).map_or(false, |c| c.is_root()) {
                logger.error(
                    format!("Class \"{}\" is not allowed as document root", self.name(class)),
                    self.location(root),
                );
                valid = false;
            }
        }
        valid
    }

    pub(crate) fn validate_structured_entity(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let Some(data) = self.entity(id) else {
            return false;
        };
        let mut valid = true;
        match self.parent(id) {
            Some(parent) if self.isa(parent, &types::DOCUMENT) || self.isa(parent, &types::DOCUMENT_ENTITY) => {}
            _ => {
                logger.error(
                    format!("Entity \"{}\" is not part of a document", self.path_string(id)),
                    self.location(id),
                );
                valid = false;
            }
        }
        if !self.isa(data.descriptor, &types::STRUCTURED_CLASS) {
            logger.error("Structured entity is not an instance of a structured class", self.location(id));
            return false;
        }
        valid & self.validate_entity(id, data, logger)
    }

    pub(crate) fn validate_annotation_entity(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let Some(data) = self.annotation(id) else {
            return false;
        };
        let location = self.location(id);
        let name = self.name(id);
        let mut valid = self.validate_parent(id, &types::DOCUMENT, logger);
        if !self.isa(data.entity.descriptor, &types::ANNOTATION_CLASS) {
            logger.error(
                format!("Annotation \"{name}\" is not an instance of an annotation class"),
                location,
            );
            return false;
        }
        valid &= self.validate_entity(id, &data.entity, logger);

        let (Some(start), Some(end)) = (data.start, data.end) else {
            if data.start.is_none() {
                logger.error(format!("Annotation \"{name}\" has no start anchor"), location);
            }
            if data.end.is_none() {
                logger.error(format!("Annotation \"{name}\" has no end anchor"), location);
            }
            return false;
        };
        if let Some(document) = self.parent(id) {
            for (anchor, what) in [(start, "start"), (end, "end")] {
                if !self.has_child(document, anchor) {
                    logger.error(
                        format!("The {what} anchor of annotation \"{name}\" is not part of the document"),
                        location,
                    );
                    valid = false;
                }
            }
        }
        if valid && self.compare_document_order(start, end) != Some(Ordering::Less) {
            logger.error(
                format!("The start anchor of annotation \"{name}\" does not precede its end"),
                location,
            );
            valid = false;
        }
        valid
    }

    pub(crate) fn validate_anchor(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let location = self.location(id);
        let Some(annotation) = self.anchor_annotation(id) else {
            logger.error("Anchor is not connected to an annotation", location);
            return false;
        };
        match self.annotation(annotation) {
            Some(a) if a.start == Some(id) || a.end == Some(id) => true,
            _ => {
                logger.error(
                    format!(
                        "Anchor is not an endpoint of annotation \"{}\"",
                        self.name(annotation)
                    ),
                    location,
                );
                false
            }
        }
    }

    /// Attribute and field checks shared by both entity kinds.
    fn validate_entity(&self, id: NodeId, data: &EntityData, logger: &mut dyn Logger) -> bool {
        let location = self.location(id);
        let descriptor = data.descriptor;
        let mut valid = true;

        if let Some(schema) = self.attributes_descriptor(descriptor) {
            let mut attributes = data.attributes.clone();
            valid &= self.prepare(schema, &mut attributes, logger);
        }

        let fields = self.effective_field_descriptors(descriptor);
        if data.fields[fields.len().min(data.fields.len())..]
            .iter()
            .any(|v| !v.is_empty())
        {
            logger.error(
                format!(
                    "Entity of class \"{}\" has content in undefined fields",
                    self.name(descriptor)
                ),
                location,
            );
            valid = false;
        }

        for (i, &field) in fields.iter().enumerate() {
            let Some(field_data) = self.field(field) else {
                continue;
            };
            let field_name = self.name(field);
            let children: Vec<NodeId> = self
                .entity_field(id, i)
                .iter()
                .copied()
                .filter(|&c| !self.isa(c, &types::ANCHOR))
                .collect();

            if field_data.is_primitive() {
                match children.as_slice() {
                    [] if field_data.is_optional() => {}
                    [] => {
                        logger.error(format!("Missing primitive field \"{field_name}\""), location);
                        valid = false;
                    }
                    [child] => match (self.primitive_content(*child), field_data.primitive_type()) {
                        (Some(content), Some(ty)) => {
                            let mut content = content.clone();
                            valid &= self.prepare(ty, &mut content, logger);
                        }
                        _ => {
                            logger.error(
                                format!("Primitive field \"{field_name}\" must contain a primitive"),
                                self.location(*child),
                            );
                            valid = false;
                        }
                    },
                    _ => {
                        logger.error(
                            format!("Only one element allowed in primitive field \"{field_name}\""),
                            location,
                        );
                        valid = false;
                    }
                }
                continue;
            }

            if children.is_empty() && field_data.is_optional() {
                continue;
            }
            let declared = field_data.children().as_slice();
            let mut counts = vec![0usize; declared.len()];
            for &child in &children {
                if self.isa(child, &types::DOCUMENT_PRIMITIVE) {
                    logger.error(
                        format!("Primitive content is not allowed in field \"{field_name}\""),
                        self.location(child),
                    );
                    valid = false;
                    continue;
                }
                let Some(class) = self.entity(child).map(|e| e.descriptor) else {
                    continue;
                };
                let mut permitted = false;
                for (j, &allowed) in declared.iter().enumerate() {
                    if self.is_subclass_of(class, allowed) {
                        counts[j] += 1;
                        permitted = true;
                    }
                }
                if !permitted {
                    logger.error(
                        format!(
                            "`{}` is not allowed in field `{field_name}` of `{}`",
                            self.name(class),
                            self.name(descriptor)
                        ),
                        self.location(child),
                    );
                    valid = false;
                }
            }
            for (&allowed, &count) in declared.iter().zip(&counts) {
                let Some(class) = self.structured_class(allowed) else {
                    continue;
                };
                if !class.cardinality().contains(count) {
                    logger.error(
                        format!(
                            "`{field_name}` had {count} elements of class `{}`, which is invalid",
                            self.name(allowed)
                        ),
                        location,
                    );
                    valid = false;
                }
            }
        }
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::ConcreteLogger;
    use crate::ranges::RangeSet;

    struct Fixture {
        mgr: Manager,
        book: NodeId,
        chapter: NodeId,
        section: NodeId,
        paragraph: NodeId,
        text: NodeId,
        emphasis: NodeId,
    }

    fn fixture() -> Fixture {
        let mut mgr = Manager::new();
        let sys = mgr.create_system_typesystem().unwrap();
        let string = mgr.lookup_type(sys, "string").unwrap();
        let ont = mgr.create_ontology("book");
        let book = mgr
            .create_structured_class(ont, "book", RangeSet::single(1), None, false, true)
            .unwrap();
        let chapter = mgr
            .create_structured_class(ont, "chapter", RangeSet::any(), None, false, false)
            .unwrap();
        let section = mgr
            .create_structured_class(ont, "section", RangeSet::parse("1-*").unwrap(), None, false, false)
            .unwrap();
        let paragraph = mgr
            .create_structured_class(ont, "paragraph", RangeSet::any(), None, true, false)
            .unwrap();
        let text = mgr
            .create_structured_class(ont, "text", RangeSet::any(), None, true, false)
            .unwrap();
        let f = mgr.create_field_descriptor(book, FieldType::Tree, "", false).unwrap();
        mgr.add_child_class(f, chapter).unwrap();
        mgr.add_child_class(f, paragraph).unwrap();
        let f = mgr.create_field_descriptor(chapter, FieldType::Tree, "tree", false).unwrap();
        mgr.add_child_class(f, section).unwrap();
        let heading = mgr
            .create_field_descriptor(chapter, FieldType::Subtree, "heading", true)
            .unwrap();
        mgr.add_child_class(heading, paragraph).unwrap();
        let f = mgr.create_field_descriptor(section, FieldType::Tree, "", false).unwrap();
        mgr.add_child_class(f, paragraph).unwrap();
        let f = mgr.create_field_descriptor(paragraph, FieldType::Tree, "", false).unwrap();
        mgr.add_child_class(f, text).unwrap();
        mgr.create_primitive_field_descriptor(text, string, FieldType::Tree, "", false)
            .unwrap();
        let emphasis = mgr.create_annotation_class(ont, "emphasis").unwrap();
        Fixture {
            mgr,
            book,
            chapter,
            section,
            paragraph,
            text,
            emphasis,
        }
    }

    fn add_text(f: &mut Fixture, parent: NodeId, field: &str, content: &str) -> NodeId {
        let text = f
            .mgr
            .create_child_structured_entity(parent, f.text, None, field, "")
            .unwrap();
        f.mgr
            .create_child_document_primitive(text, Variant::from(content), "")
            .unwrap();
        text
    }

    // ==================== Field index tests ====================

    #[test]
    fn test_field_index() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let chapter = f
            .mgr
            .create_child_structured_entity(root, f.chapter, None, "", "c1")
            .unwrap();
        assert_eq!(f.mgr.field_index(chapter, "heading").unwrap(), 0);
        assert_eq!(f.mgr.field_index(chapter, "tree").unwrap(), 1);
        assert_eq!(f.mgr.field_index(chapter, "").unwrap(), 1);
        assert_eq!(f.mgr.field_index(chapter, DEFAULT_FIELD_NAME).unwrap(), 1);
        assert!(f.mgr.field_index(chapter, "missing").is_err());
        assert_eq!(f.mgr.document_root(doc), Some(root));
    }

    #[test]
    fn test_field_index_without_tree() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let ann = f
            .mgr
            .create_annotation(doc, f.emphasis, None, None, None, "")
            .unwrap();
        assert!(f.mgr.field_index(ann, "").is_err());
        assert!(f.mgr.field_index(root, "").is_ok());
    }

    #[test]
    fn test_add_structure_node_moves() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let c1 = f.mgr.create_child_structured_entity(root, f.chapter, None, "", "c1").unwrap();
        let c2 = f.mgr.create_child_structured_entity(root, f.chapter, None, "", "c2").unwrap();
        let p = f.mgr.create_child_structured_entity(c1, f.paragraph, None, "heading", "").unwrap();
        f.mgr.add_structure_node(c2, p, 0).unwrap();
        assert!(f.mgr.entity_field(c1, 0).is_empty());
        assert_eq!(f.mgr.entity_field(c2, 0), &[p]);
        assert_eq!(f.mgr.parent(p), Some(c2));
        assert!(f.mgr.add_structure_node(c2, p, 5).is_err());

        assert!(f.mgr.remove_structure_node(p));
        assert_eq!(f.mgr.parent(p), None);
        assert!(!f.mgr.remove_structure_node(p));
    }

    // ==================== Document order tests ====================

    #[test]
    fn test_document_order() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let p = f.mgr.create_child_structured_entity(root, f.paragraph, None, "", "").unwrap();
        let a = f.mgr.create_child_anchor(p, "").unwrap();
        let t = add_text(&mut f, p, "", "hello");
        let b = f.mgr.create_child_anchor(p, "").unwrap();

        assert_eq!(f.mgr.compare_document_order(a, b), Some(Ordering::Less));
        assert_eq!(f.mgr.compare_document_order(b, t), Some(Ordering::Greater));
        assert_eq!(f.mgr.compare_document_order(p, a), Some(Ordering::Less));
        assert!(f.mgr.has_child(doc, t));

        let other = f.mgr.create_document("other");
        assert!(!f.mgr.has_child(other, t));
        let loose = f.mgr.create_document("loose");
        let r2 = f.mgr.create_root_structured_entity(loose, f.book, None, "").unwrap();
        assert_eq!(f.mgr.compare_document_order(a, r2), None);
    }

    // ==================== Anchor search tests ====================

    #[test]
    fn test_search_start_anchor() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let p1 = f.mgr.create_child_structured_entity(root, f.paragraph, None, "", "").unwrap();
        let start = f.mgr.create_child_anchor(p1, "").unwrap();
        add_text(&mut f, p1, "", "emphasised");
        let ann = f
            .mgr
            .create_annotation(doc, f.emphasis, None, Some(start), None, "em")
            .unwrap();
        let p2 = f.mgr.create_child_structured_entity(root, f.paragraph, None, "", "").unwrap();

        assert_eq!(f.mgr.search_start_anchor(p2, 0, Some(f.emphasis), "em"), Some(start));
        assert_eq!(f.mgr.search_start_anchor(p2, 0, None, ""), Some(start));
        assert_eq!(f.mgr.search_start_anchor(p2, 0, None, "other"), None);

        let end = f.mgr.create_child_anchor(p2, "").unwrap();
        f.mgr.set_annotation_end(ann, end).unwrap();
        assert_eq!(f.mgr.search_start_anchor(p2, 0, Some(f.emphasis), ""), None);
        assert_eq!(f.mgr.anchor_annotation(end), Some(ann));
    }

    #[test]
    fn test_search_does_not_leave_subtree() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        f.mgr.create_child_anchor(root, "").unwrap();
        let chapter = f.mgr.create_child_structured_entity(root, f.chapter, None, "", "").unwrap();
        let heading = f
            .mgr
            .create_child_structured_entity(chapter, f.paragraph, None, "heading", "")
            .unwrap();
        assert_eq!(f.mgr.search_start_anchor(heading, 0, None, ""), None);
        let index = f.mgr.field_index(chapter, "heading").unwrap();
        assert_eq!(f.mgr.search_start_anchor(chapter, index, None, ""), None);
        assert!(f.mgr.search_start_anchor(chapter, 1, None, "").is_some());
    }

    // ==================== Validation tests ====================

    #[test]
    fn test_valid_document() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let chapter = f.mgr.create_child_structured_entity(root, f.chapter, None, "", "c1").unwrap();
        let section = f.mgr.create_child_structured_entity(chapter, f.section, None, "", "").unwrap();
        let p = f.mgr.create_child_structured_entity(section, f.paragraph, None, "", "").unwrap();
        let start = f.mgr.create_child_anchor(p, "").unwrap();
        add_text(&mut f, p, "", "some text");
        let end = f.mgr.create_child_anchor(p, "").unwrap();
        f.mgr
            .create_annotation(doc, f.emphasis, None, Some(start), Some(end), "em")
            .unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(f.mgr.validate(doc, &mut logger), "{:?}", logger.messages());
    }

    #[test]
    fn test_cardinality_violation() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        f.mgr.create_child_structured_entity(root, f.chapter, None, "", "").unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!f.mgr.validate(doc, &mut logger));
        assert!(logger.contains("`tree` had 0 elements of class `section`, which is invalid"));
    }

    #[test]
    fn test_primitive_field_rules() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let p = f.mgr.create_child_structured_entity(root, f.paragraph, None, "", "").unwrap();
        let text = f.mgr.create_child_structured_entity(p, f.text, None, "", "").unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!f.mgr.validate(doc, &mut logger));
        assert!(logger.contains("Missing primitive field"));

        f.mgr.create_child_document_primitive(text, "a".into(), "").unwrap();
        f.mgr.create_child_document_primitive(text, "b".into(), "").unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!f.mgr.validate(doc, &mut logger));
        assert!(logger.contains("Only one element allowed"));
    }

    #[test]
    fn test_child_not_permitted() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        f.mgr.create_child_structured_entity(root, f.section, None, "", "").unwrap();
        f.mgr.create_child_document_primitive(root, "loose".into(), "").unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!f.mgr.validate(doc, &mut logger));
        assert!(logger.contains("`section` is not allowed in field `$default` of `book`"));
        assert!(logger.contains("Primitive content is not allowed"));
    }

    #[test]
    fn test_root_rules() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let mut logger = ConcreteLogger::default();
        assert!(!f.mgr.validate(doc, &mut logger));
        assert!(logger.contains("has no root"));

        f.mgr.create_root_structured_entity(doc, f.paragraph, None, "").unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!f.mgr.validate(doc, &mut logger));
        assert!(logger.contains("is not allowed as document root"));
    }

    #[test]
    fn test_annotation_order() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let p = f.mgr.create_child_structured_entity(root, f.paragraph, None, "", "").unwrap();
        let a = f.mgr.create_child_anchor(p, "").unwrap();
        add_text(&mut f, p, "", "x");
        let b = f.mgr.create_child_anchor(p, "").unwrap();
        f.mgr
            .create_annotation(doc, f.emphasis, None, Some(b), Some(a), "")
            .unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!f.mgr.validate(doc, &mut logger));
        assert!(logger.contains("does not precede its end"));
    }

    #[test]
    fn test_dangling_anchor() {
        let mut f = fixture();
        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let p = f.mgr.create_child_structured_entity(root, f.paragraph, None, "", "").unwrap();
        f.mgr.create_child_anchor(p, "").unwrap();
        add_text(&mut f, p, "", "x");
        let mut logger = ConcreteLogger::default();
        assert!(!f.mgr.validate(doc, &mut logger));
        assert!(logger.contains("Anchor is not connected"));
    }

    #[test]
    fn test_entity_attributes() {
        let mut f = fixture();
        let attrs = f.mgr.attributes_descriptor(f.chapter).unwrap();
        let sys = f.mgr.create_system_typesystem().unwrap();
        let int = f.mgr.lookup_type(sys, "int").unwrap();
        f.mgr.create_attribute(attrs, "number", Some(int), None).unwrap();

        let doc = f.mgr.create_document("doc");
        let root = f.mgr.create_root_structured_entity(doc, f.book, None, "").unwrap();
        let mut map = VariantMap::new();
        map.insert("number".to_string(), Variant::from("seven"));
        let chapter = f
            .mgr
            .create_child_structured_entity(root, f.chapter, Some(Variant::Map(map)), "", "")
            .unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!f.mgr.prepare_entity_attributes(chapter, &mut logger));
        assert!(logger.has_error());

        let mut map = VariantMap::new();
        map.insert("number".to_string(), Variant::Int(7));
        f.mgr.set_entity_attributes(chapter, Variant::Map(map)).unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(f.mgr.prepare_entity_attributes(chapter, &mut logger));
        assert!(!logger.has_error());
    }
}
