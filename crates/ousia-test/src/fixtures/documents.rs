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

//! Document fixtures.

use ousia_core::{Manager, NodeId, Variant, VariantMap};

use super::ontologies::{annotation_ontology, book_ontology, AnnotationOntology, BookOntology};

/// Handles of the sample document.
///
/// ```text
/// book
/// ├── chapter (title "Introduction")
/// │   └── paragraph: [anchor] text "Hello world" [anchor]
/// └── paragraph: text "Closing words"
/// ```
///
/// An `emphasis` annotation spans the anchors of the first paragraph.
#[derive(Debug, Clone, Copy)]
pub struct SampleDocument {
    pub document: NodeId,
    pub book: BookOntology,
    pub markup: AnnotationOntology,
    pub root: NodeId,
    pub chapter: NodeId,
    pub paragraph: NodeId,
    pub text: NodeId,
    pub start: NodeId,
    pub end: NodeId,
    pub emphasis: NodeId,
    pub closing: NodeId,
}

fn title(title: &str) -> Option<Variant> {
    let mut map = VariantMap::new();
    map.insert("title".to_string(), Variant::from(title));
    Some(Variant::Map(map))
}

fn text(mgr: &mut Manager, paragraph: NodeId, class: NodeId, content: &str) -> NodeId {
    let text = mgr
        .create_child_structured_entity(paragraph, class, None, "", "")
        .expect("create text");
    mgr.create_child_document_primitive(text, Variant::from(content), "")
        .expect("create primitive");
    text
}

/// Creates the book and markup ontologies and the sample document inside
/// `project`.
pub fn sample_document(mgr: &mut Manager, project: NodeId) -> SampleDocument {
    let book = book_ontology(mgr, project);
    let markup = annotation_ontology(mgr, project);

    let document = mgr
        .create_project_document(project, "sample")
        .expect("create document");
    mgr.add_document_ontology(document, book.ontology)
        .expect("add book ontology");
    mgr.add_document_ontology(document, markup.ontology)
        .expect("add markup ontology");

    let root = mgr
        .create_root_structured_entity(document, book.book, None, "")
        .expect("create root");
    let chapter = mgr
        .create_child_structured_entity(root, book.chapter, title("Introduction"), "", "intro")
        .expect("create chapter");
    let paragraph = mgr
        .create_child_structured_entity(chapter, book.paragraph, None, "", "")
        .expect("create paragraph");
    let start = mgr.create_child_anchor(paragraph, "").expect("create anchor");
    let hello = text(mgr, paragraph, book.text, "Hello world");
    let end = mgr.create_child_anchor(paragraph, "").expect("create anchor");
    let emphasis = mgr
        .create_annotation(document, markup.emphasis, None, Some(start), Some(end), "")
        .expect("create emphasis");

    let closing = mgr
        .create_child_structured_entity(root, book.paragraph, None, "", "")
        .expect("create paragraph");
    text(mgr, closing, book.text, "Closing words");

    SampleDocument {
        document,
        book,
        markup,
        root,
        chapter,
        paragraph,
        text: hello,
        start,
        end,
        emphasis,
        closing,
    }
}

/// A document whose root is a bare `book` without content.
pub fn empty_book(mgr: &mut Manager, project: NodeId) -> (BookOntology, NodeId) {
    let book = book_ontology(mgr, project);
    let document = mgr
        .create_project_document(project, "empty")
        .expect("create document");
    mgr.add_document_ontology(document, book.ontology)
        .expect("add ontology");
    mgr.create_root_structured_entity(document, book.book, None, "")
        .expect("create root");
    (book, document)
}
