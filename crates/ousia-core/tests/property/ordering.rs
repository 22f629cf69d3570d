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

//! Property-based tests for value comparison.
//!
//! # Properties Tested
//!
//! 1. **Reflexivity**: every value compares equal to itself
//! 2. **Antisymmetry**: swapping operands reverses the ordering
//! 3. **Kind mismatch**: values of different kinds do not compare

use std::cmp::Ordering;

use ousia_core::{ErrorKind, Variant};
use proptest::prelude::*;

use super::text;

fn same_kind_pair() -> impl Strategy<Value = (Variant, Variant)> {
    prop_oneof![
        (any::<bool>(), any::<bool>()).prop_map(|(a, b)| (Variant::Bool(a), Variant::Bool(b))),
        (any::<i64>(), any::<i64>()).prop_map(|(a, b)| (Variant::Int(a), Variant::Int(b))),
        (any::<f64>(), any::<f64>()).prop_map(|(a, b)| (Variant::Double(a), Variant::Double(b))),
        (text(), text()).prop_map(|(a, b)| (Variant::String(a), Variant::magic(b))),
        (
            prop::collection::vec(any::<i64>(), 0..5),
            prop::collection::vec(any::<i64>(), 0..5)
        )
            .prop_map(|(a, b)| (
                Variant::Array(a.into_iter().map(Variant::Int).collect()),
                Variant::Array(b.into_iter().map(Variant::Int).collect())
            )),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Property: comparison is total and antisymmetric within a kind.
    #[test]
    fn prop_compare_antisymmetric((a, b) in same_kind_pair()) {
        let forward = a.compare(&b).unwrap();
        let backward = b.compare(&a).unwrap();
        prop_assert_eq!(forward, backward.reverse());
        prop_assert_eq!(a.compare(&a).unwrap(), Ordering::Equal);
    }

    /// Property: integers never compare with strings.
    #[test]
    fn prop_compare_kind_mismatch(i in any::<i64>(), s in text()) {
        let err = Variant::Int(i).compare(&Variant::String(s)).unwrap_err();
        prop_assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }
}
