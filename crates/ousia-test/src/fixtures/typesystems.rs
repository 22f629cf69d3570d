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

//! Typesystem fixtures.

use ousia_core::{Manager, NodeId, NullLogger, Variant};

/// Handles of the "color" typesystem.
#[derive(Debug, Clone, Copy)]
pub struct ColorTypesystem {
    pub typesystem: NodeId,
    /// Struct with mandatory `r`, `g`, `b` (int) and optional `a` (double,
    /// default 1.0).
    pub color: NodeId,
    /// Enumeration `left`, `center`, `right`.
    pub alignment: NodeId,
    /// `color[]`.
    pub palette: NodeId,
}

/// Creates the "color" typesystem inside `project`.
pub fn color_typesystem(mgr: &mut Manager, project: NodeId) -> ColorTypesystem {
    let typesystem = mgr
        .create_project_typesystem(project, "color")
        .expect("create typesystem");
    let int = mgr.lookup_type(typesystem, "int").expect("int type");
    let double = mgr.lookup_type(typesystem, "double").expect("double type");

    let color = mgr
        .create_struct_type(typesystem, "color")
        .expect("create color");
    for channel in ["r", "g", "b"] {
        mgr.create_attribute(color, channel, Some(int), None)
            .expect("create channel");
    }
    mgr.create_attribute(color, "a", Some(double), Some(Variant::Double(1.0)))
        .expect("create alpha");

    let alignment = mgr
        .create_enumeration_type(typesystem, "alignment", &["left", "center", "right"], &mut NullLogger)
        .expect("create alignment");
    let palette = mgr
        .create_array_type(typesystem, color)
        .expect("create palette");

    ColorTypesystem {
        typesystem,
        color,
        alignment,
        palette,
    }
}
