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

//! Property-based tests for the Ousia core.
//!
//! # Test Modules
//!
//! - `variant_json`: JSON output read back through the value reader
//! - `prepare`: idempotence of primitive type preparation
//! - `ordering`: totality and antisymmetry of value comparison
//! - `line_breaks`: line-break normalisation in the character reader
//!
//! Each module runs 1000 cases per property.

pub mod line_breaks;
pub mod ordering;
pub mod prepare;
pub mod variant_json;

use ousia_core::Variant;
use proptest::prelude::*;

/// Strings that survive JSON escaping and the value reader's escapes.
pub fn text() -> impl Strategy<Value = String> {
    "[ -~\t\né]{0,16}"
}

/// Pure-data values: no objects or functions.
pub fn data_variant() -> impl Strategy<Value = Variant> {
    let leaf = prop_oneof![
        Just(Variant::Null),
        any::<bool>().prop_map(Variant::Bool),
        any::<i64>().prop_map(Variant::Int),
        (-1.0e9_f64..1.0e9_f64).prop_map(Variant::Double),
        text().prop_map(Variant::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Variant::Array),
            prop::collection::btree_map("[a-z_]{1,6}", inner, 0..4)
                .prop_map(|m| Variant::Map(m.into_iter().collect())),
        ]
    })
}
