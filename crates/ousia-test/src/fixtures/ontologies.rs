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

//! Ontology fixtures.

use ousia_core::{FieldType, Manager, NodeId, RangeSet, Variant};

/// Handles of the "book" ontology.
///
/// `book` (root) contains chapters and paragraphs, `chapter` contains
/// sections and paragraphs, `section` contains subsections and paragraphs
/// and `subsection` contains paragraphs. `paragraph` and `text` are
/// transparent; `text` holds a string primitive.
#[derive(Debug, Clone, Copy)]
pub struct BookOntology {
    pub ontology: NodeId,
    pub book: NodeId,
    pub chapter: NodeId,
    pub section: NodeId,
    pub subsection: NodeId,
    pub paragraph: NodeId,
    pub text: NodeId,
}

fn tree(mgr: &mut Manager, class: NodeId, children: &[NodeId]) -> NodeId {
    let field = mgr
        .create_field_descriptor(class, FieldType::Tree, "", false)
        .expect("create tree field");
    for &child in children {
        mgr.add_child_class(field, child).expect("add child class");
    }
    field
}

fn class(mgr: &mut Manager, ontology: NodeId, name: &str, transparent: bool) -> NodeId {
    mgr.create_structured_class(ontology, name, RangeSet::any(), None, transparent, false)
        .expect("create structured class")
}

/// Creates the "book" ontology inside `project`.
pub fn book_ontology(mgr: &mut Manager, project: NodeId) -> BookOntology {
    let ontology = mgr
        .create_project_ontology(project, "book")
        .expect("create ontology");
    let book = mgr
        .create_structured_class(ontology, "book", RangeSet::single(1), None, false, true)
        .expect("create book");
    let chapter = class(mgr, ontology, "chapter", false);
    let section = class(mgr, ontology, "section", false);
    let subsection = class(mgr, ontology, "subsection", false);
    let paragraph = class(mgr, ontology, "paragraph", true);
    let text = class(mgr, ontology, "text", true);

    tree(mgr, book, &[chapter, paragraph]);
    tree(mgr, chapter, &[section, paragraph]);
    tree(mgr, section, &[subsection, paragraph]);
    tree(mgr, subsection, &[paragraph]);
    tree(mgr, paragraph, &[text]);

    let system = mgr.system_typesystem(project).expect("system typesystem");
    let string = mgr.lookup_type(system, "string").expect("string type");
    mgr.create_primitive_field_descriptor(text, string, FieldType::Tree, "", false)
        .expect("create text field");

    // Chapters and sections carry an optional title.
    for heading in [chapter, section] {
        let attributes = mgr.attributes_descriptor(heading).expect("attributes");
        mgr.create_attribute(attributes, "title", Some(string), Some(Variant::from("")))
            .expect("create title");
    }

    BookOntology {
        ontology,
        book,
        chapter,
        section,
        subsection,
        paragraph,
        text,
    }
}

/// Handles of the annotation ontology.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationOntology {
    pub ontology: NodeId,
    pub emphasis: NodeId,
    pub strong: NodeId,
    /// Carries a mandatory `author` string attribute.
    pub comment: NodeId,
}

/// Creates an ontology with the annotation classes `emphasis`, `strong`
/// and `comment`.
pub fn annotation_ontology(mgr: &mut Manager, project: NodeId) -> AnnotationOntology {
    let ontology = mgr
        .create_project_ontology(project, "markup")
        .expect("create ontology");
    let emphasis = mgr
        .create_annotation_class(ontology, "emphasis")
        .expect("create emphasis");
    let strong = mgr
        .create_annotation_class(ontology, "strong")
        .expect("create strong");
    let comment = mgr
        .create_annotation_class(ontology, "comment")
        .expect("create comment");

    let system = mgr.system_typesystem(project).expect("system typesystem");
    let string = mgr.lookup_type(system, "string").expect("string type");
    let attributes = mgr.attributes_descriptor(comment).expect("attributes");
    mgr.create_attribute(attributes, "author", Some(string), None)
        .expect("create author");

    AnnotationOntology {
        ontology,
        emphasis,
        strong,
        comment,
    }
}
