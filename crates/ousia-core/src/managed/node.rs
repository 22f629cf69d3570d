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

//! Per-class node payloads and their edges.

use crate::document::{AnchorData, AnnotationEntityData, DocumentData, EntityData};
use crate::ontology::{DescriptorData, FieldData, OntologyData, StructuredClassData};
use crate::project::ProjectData;
use crate::rtti::{types, Rtti};
use crate::typesystem::{AttributeData, TypeKind, TypesystemData};
use crate::variant::Variant;

use super::index::NodeVector;
use super::NodeId;

/// Named edge container of a node.
///
/// Composition slots own their elements; every other slot only refers to
/// nodes owned elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    ProjectDocuments,
    ProjectOntologies,
    ProjectTypesystems,
    TypesystemTypes,
    TypesystemIncludes,
    StructAttributes,
    OntologyClasses,
    OntologyAnnotationClasses,
    OntologyDependencies,
    OntologyTypesystems,
    DescriptorAttributes,
    DescriptorFields,
    FieldChildren,
    ClassSubclasses,
    DocumentRoot,
    DocumentAnnotations,
    DocumentOntologies,
    DocumentTypesystems,
    EntityField(usize),
}

impl Slot {
    pub fn is_composition(self) -> bool {
        matches!(
            self,
            Slot::ProjectDocuments
                | Slot::ProjectOntologies
                | Slot::ProjectTypesystems
                | Slot::TypesystemTypes
                | Slot::StructAttributes
                | Slot::OntologyClasses
                | Slot::OntologyAnnotationClasses
                | Slot::DescriptorAttributes
                | Slot::DescriptorFields
                | Slot::DocumentRoot
                | Slot::DocumentAnnotations
                | Slot::EntityField(_)
        )
    }

    /// Slots holding at most one node.
    pub fn is_single(self) -> bool {
        matches!(self, Slot::DescriptorAttributes | Slot::DocumentRoot)
    }
}

/// An outgoing edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub target: NodeId,
    pub composition: bool,
}

/// Class specific payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Project(ProjectData),
    Typesystem(TypesystemData),
    Type(TypeKind),
    Attribute(AttributeData),
    Ontology(OntologyData),
    StructuredClass(StructuredClassData),
    AnnotationClass(DescriptorData),
    FieldDescriptor(FieldData),
    Document(DocumentData),
    StructuredEntity(EntityData),
    AnnotationEntity(AnnotationEntityData),
    DocumentPrimitive(Variant),
    Anchor(AnchorData),
}

impl NodeKind {
    pub fn rtti(&self) -> &'static Rtti {
        match self {
            NodeKind::Project(_) => &types::PROJECT,
            NodeKind::Typesystem(ts) if ts.system => &types::SYSTEM_TYPESYSTEM,
            NodeKind::Typesystem(_) => &types::TYPESYSTEM,
            NodeKind::Type(kind) => kind.rtti(),
            NodeKind::Attribute(_) => &types::ATTRIBUTE,
            NodeKind::Ontology(_) => &types::ONTOLOGY,
            NodeKind::StructuredClass(_) => &types::STRUCTURED_CLASS,
            NodeKind::AnnotationClass(_) => &types::ANNOTATION_CLASS,
            NodeKind::FieldDescriptor(_) => &types::FIELD_DESCRIPTOR,
            NodeKind::Document(_) => &types::DOCUMENT,
            NodeKind::StructuredEntity(_) => &types::STRUCTURED_ENTITY,
            NodeKind::AnnotationEntity(_) => &types::ANNOTATION_ENTITY,
            NodeKind::DocumentPrimitive(_) => &types::DOCUMENT_PRIMITIVE,
            NodeKind::Anchor(_) => &types::ANCHOR,
        }
    }

    /// Vector slots of this node, in resolution order.
    pub fn vector_slots(&self) -> Vec<Slot> {
        match self {
            NodeKind::Project(_) => vec![
                Slot::ProjectDocuments,
                Slot::ProjectOntologies,
                Slot::ProjectTypesystems,
            ],
            NodeKind::Typesystem(_) => vec![Slot::TypesystemTypes, Slot::TypesystemIncludes],
            NodeKind::Type(TypeKind::Struct(_)) => vec![Slot::StructAttributes],
            NodeKind::Ontology(_) => vec![
                Slot::OntologyClasses,
                Slot::OntologyAnnotationClasses,
                Slot::OntologyDependencies,
                Slot::OntologyTypesystems,
            ],
            NodeKind::StructuredClass(_) => vec![Slot::DescriptorFields, Slot::ClassSubclasses],
            NodeKind::AnnotationClass(_) => vec![Slot::DescriptorFields],
            NodeKind::FieldDescriptor(_) => vec![Slot::FieldChildren],
            NodeKind::Document(_) => vec![
                Slot::DocumentAnnotations,
                Slot::DocumentOntologies,
                Slot::DocumentTypesystems,
            ],
            NodeKind::StructuredEntity(e) => (0..e.fields.len()).map(Slot::EntityField).collect(),
            NodeKind::AnnotationEntity(a) => {
                (0..a.entity.fields.len()).map(Slot::EntityField).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn vector(&self, slot: Slot) -> Option<&NodeVector> {
        match (self, slot) {
            (NodeKind::Project(p), Slot::ProjectDocuments) => Some(&p.documents),
            (NodeKind::Project(p), Slot::ProjectOntologies) => Some(&p.ontologies),
            (NodeKind::Project(p), Slot::ProjectTypesystems) => Some(&p.typesystems),
            (NodeKind::Typesystem(t), Slot::TypesystemTypes) => Some(&t.types),
            (NodeKind::Typesystem(t), Slot::TypesystemIncludes) => Some(&t.includes),
            (NodeKind::Type(TypeKind::Struct(s)), Slot::StructAttributes) => Some(&s.attributes),
            (NodeKind::Ontology(o), Slot::OntologyClasses) => Some(&o.classes),
            (NodeKind::Ontology(o), Slot::OntologyAnnotationClasses) => Some(&o.annotation_classes),
            (NodeKind::Ontology(o), Slot::OntologyDependencies) => Some(&o.dependencies),
            (NodeKind::Ontology(o), Slot::OntologyTypesystems) => Some(&o.typesystems),
            (NodeKind::StructuredClass(c), Slot::DescriptorFields) => Some(&c.descriptor.fields),
            (NodeKind::StructuredClass(c), Slot::ClassSubclasses) => Some(&c.subclasses),
            (NodeKind::AnnotationClass(d), Slot::DescriptorFields) => Some(&d.fields),
            (NodeKind::FieldDescriptor(f), Slot::FieldChildren) => Some(&f.children),
            (NodeKind::Document(d), Slot::DocumentAnnotations) => Some(&d.annotations),
            (NodeKind::Document(d), Slot::DocumentOntologies) => Some(&d.ontologies),
            (NodeKind::Document(d), Slot::DocumentTypesystems) => Some(&d.typesystems),
            (NodeKind::StructuredEntity(e), Slot::EntityField(i)) => e.fields.get(i),
            (NodeKind::AnnotationEntity(a), Slot::EntityField(i)) => a.entity.fields.get(i),
            _ => None,
        }
    }

    /// Mutable access to a vector slot. Entity field vectors are created on
    /// demand.
    pub(crate) fn vector_mut(&mut self, slot: Slot) -> Option<&mut NodeVector> {
        match (self, slot) {
            (NodeKind::Project(p), Slot::ProjectDocuments) => Some(&mut p.documents),
            (NodeKind::Project(p), Slot::ProjectOntologies) => Some(&mut p.ontologies),
            (NodeKind::Project(p), Slot::ProjectTypesystems) => Some(&mut p.typesystems),
            (NodeKind::Typesystem(t), Slot::TypesystemTypes) => Some(&mut t.types),
            (NodeKind::Typesystem(t), Slot::TypesystemIncludes) => Some(&mut t.includes),
            (NodeKind::Type(TypeKind::Struct(s)), Slot::StructAttributes) => {
                Some(&mut s.attributes)
            }
            (NodeKind::Ontology(o), Slot::OntologyClasses) => Some(&mut o.classes),
            (NodeKind::Ontology(o), Slot::OntologyAnnotationClasses) => {
                Some(&mut o.annotation_classes)
            }
            (NodeKind::Ontology(o), Slot::OntologyDependencies) => Some(&mut o.dependencies),
            (NodeKind::Ontology(o), Slot::OntologyTypesystems) => Some(&mut o.typesystems),
            (NodeKind::StructuredClass(c), Slot::DescriptorFields) => {
                Some(&mut c.descriptor.fields)
            }
            (NodeKind::StructuredClass(c), Slot::ClassSubclasses) => Some(&mut c.subclasses),
            (NodeKind::AnnotationClass(d), Slot::DescriptorFields) => Some(&mut d.fields),
            (NodeKind::FieldDescriptor(f), Slot::FieldChildren) => Some(&mut f.children),
            (NodeKind::Document(d), Slot::DocumentAnnotations) => Some(&mut d.annotations),
            (NodeKind::Document(d), Slot::DocumentOntologies) => Some(&mut d.ontologies),
            (NodeKind::Document(d), Slot::DocumentTypesystems) => Some(&mut d.typesystems),
            (NodeKind::StructuredEntity(e), Slot::EntityField(i)) => Some(e.field_mut(i)),
            (NodeKind::AnnotationEntity(a), Slot::EntityField(i)) => Some(a.entity.field_mut(i)),
            _ => None,
        }
    }

    /// Single-node composition slots.
    pub(crate) fn single_mut(&mut self, slot: Slot) -> Option<&mut Option<NodeId>> {
        match (self, slot) {
            (NodeKind::StructuredClass(c), Slot::DescriptorAttributes) => {
                Some(&mut c.descriptor.attributes)
            }
            (NodeKind::AnnotationClass(d), Slot::DescriptorAttributes) => Some(&mut d.attributes),
            (NodeKind::Document(d), Slot::DocumentRoot) => Some(&mut d.root),
            _ => None,
        }
    }

    fn singles(&self) -> Vec<Edge> {
        let comp = |target| Edge {
            target,
            composition: true,
        };
        let reference = |target| Edge {
            target,
            composition: false,
        };
        let mut edges = Vec::new();
        match self {
            NodeKind::Project(p) => edges.extend(p.system_typesystem.map(reference)),
            NodeKind::Type(TypeKind::Array(inner)) => edges.push(reference(*inner)),
            NodeKind::Type(TypeKind::Struct(s)) => edges.extend(s.parent.map(reference)),
            NodeKind::Attribute(a) => edges.extend(a.ty.map(reference)),
            NodeKind::StructuredClass(c) => {
                edges.extend(c.descriptor.attributes.map(comp));
                edges.extend(c.superclass.map(reference));
            }
            NodeKind::AnnotationClass(d) => edges.extend(d.attributes.map(comp)),
            NodeKind::FieldDescriptor(f) => edges.extend(f.primitive_type.map(reference)),
            NodeKind::Document(d) => edges.extend(d.root.map(comp)),
            NodeKind::StructuredEntity(e) => edges.push(reference(e.descriptor)),
            NodeKind::AnnotationEntity(a) => {
                edges.push(reference(a.entity.descriptor));
                edges.extend(a.start.map(reference));
                edges.extend(a.end.map(reference));
            }
            NodeKind::Anchor(a) => edges.extend(a.annotation.map(reference)),
            _ => {}
        }
        edges
    }

    /// Nodes owned through single-node slots.
    pub(crate) fn owned_singles(&self) -> Vec<NodeId> {
        self.singles()
            .into_iter()
            .filter(|e| e.composition)
            .map(|e| e.target)
            .collect()
    }

    /// All outgoing edges.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = self.singles();
        for slot in self.vector_slots() {
            if let Some(v) = self.vector(slot) {
                let composition = slot.is_composition();
                edges.extend(v.iter().map(|&target| Edge {
                    target,
                    composition,
                }));
            }
        }
        edges
    }
}
