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

//! Counting helpers for verifying document fixtures.

use ousia_core::rtti::types;
use ousia_core::{Manager, NodeId};

/// Visits `entity` and every structure node below it, depth first.
fn walk(mgr: &Manager, entity: NodeId, visit: &mut dyn FnMut(NodeId)) {
    visit(entity);
    let Some(data) = mgr.entity(entity) else {
        return;
    };
    for field in data.fields() {
        for &child in field {
            if mgr.isa(child, &types::STRUCTURED_ENTITY) {
                walk(mgr, child, visit);
            } else {
                visit(child);
            }
        }
    }
}

fn count_below(mgr: &Manager, document: NodeId, ty: &'static ousia_core::Rtti) -> usize {
    let Some(root) = mgr.document_root(document) else {
        return 0;
    };
    let mut count = 0;
    walk(mgr, root, &mut |n| {
        if mgr.isa(n, ty) {
            count += 1;
        }
    });
    count
}

/// Count structured entities in a document, including the root.
pub fn count_entities(mgr: &Manager, document: NodeId) -> usize {
    count_below(mgr, document, &types::STRUCTURED_ENTITY)
}

/// Count primitive content nodes in a document.
pub fn count_primitives(mgr: &Manager, document: NodeId) -> usize {
    count_below(mgr, document, &types::DOCUMENT_PRIMITIVE)
}

/// Count anchors in a document.
pub fn count_anchors(mgr: &Manager, document: NodeId) -> usize {
    count_below(mgr, document, &types::ANCHOR)
}

/// Count annotations of a document.
pub fn count_annotations(mgr: &Manager, document: NodeId) -> usize {
    mgr.document_annotations(document).len()
}

/// Concatenated string content of all primitives below `entity`.
pub fn text_content(mgr: &Manager, entity: NodeId) -> String {
    let mut text = String::new();
    walk(mgr, entity, &mut |n| {
        if let Some(content) = mgr.primitive_content(n) {
            text.push_str(&content.to_string());
        }
    });
    text
}
