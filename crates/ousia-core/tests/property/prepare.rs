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

//! Property-based tests for primitive type preparation.
//!
//! # Properties Tested
//!
//! 1. **Idempotence**: a value accepted by a primitive type is accepted
//!    again and left untouched
//! 2. **Shape on failure**: a rejected value is replaced by a value the
//!    type accepts

use ousia_core::{ConcreteLogger, Manager, NodeId, NullLogger, Variant};
use proptest::prelude::*;

use super::data_variant;

fn primitive_types() -> (Manager, Vec<NodeId>) {
    let mut mgr = Manager::new();
    let project = mgr.create_project().unwrap();
    let system = mgr.system_typesystem(project).unwrap();
    let types = ["string", "int", "double", "bool"]
        .iter()
        .map(|name| mgr.lookup_type(system, name).unwrap())
        .collect();
    (mgr, types)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Property: preparing an accepted value again changes nothing.
    #[test]
    fn prop_prepare_idempotent(value in data_variant(), index in 0usize..4) {
        let (mgr, types) = primitive_types();
        let ty = types[index];
        let mut first = value;
        if mgr.prepare(ty, &mut first, &mut NullLogger) {
            let mut second = first.clone();
            let mut logger = ConcreteLogger::default();
            prop_assert!(mgr.prepare(ty, &mut second, &mut logger), "{:?}", logger.messages());
            prop_assert_eq!(second, first);
        }
    }

    /// Property: a failed preparation leaves a value of the target type.
    #[test]
    fn prop_prepare_failure_leaves_default(value in data_variant(), index in 0usize..4) {
        let (mgr, types) = primitive_types();
        let ty = types[index];
        let mut prepared = value;
        if !mgr.prepare(ty, &mut prepared, &mut NullLogger) {
            let accepted = match index {
                0 => matches!(prepared, Variant::String(_)),
                1 => matches!(prepared, Variant::Int(_)),
                2 => matches!(prepared, Variant::Double(_)),
                _ => matches!(prepared, Variant::Bool(_)),
            };
            prop_assert!(accepted, "unexpected default {:?}", prepared);
        }
    }
}
