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

//! Property-based tests for JSON output.
//!
//! # Properties Tested
//!
//! 1. **Read-back stability**: JSON written for a value reads back through
//!    the generic value reader and serialises to the same bytes
//! 2. **Compact/pretty agreement**: both forms read back to the same value

use ousia_core::{ConcreteLogger, VariantReader, VariantWriter};
use proptest::prelude::*;

use super::data_variant;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Property: write, read and write again yields identical JSON.
    #[test]
    fn prop_json_read_back(value in data_variant()) {
        let json = VariantWriter::write_json(&value, false);
        let mut logger = ConcreteLogger::default();
        let (ok, parsed) = VariantReader::new().parse_generic_string(&json, &mut logger, 0);
        prop_assert!(ok, "failed to read {}: {:?}", json, logger.messages());
        prop_assert_eq!(VariantWriter::write_json(&parsed, false), json);
    }

    /// Property: pretty output reads back to the same value as compact output.
    #[test]
    fn prop_pretty_matches_compact(value in data_variant()) {
        let reader = VariantReader::new();
        let mut logger = ConcreteLogger::default();
        let compact = reader
            .parse_generic_string(&VariantWriter::write_json(&value, false), &mut logger, 0)
            .1;
        let pretty = reader
            .parse_generic_string(&VariantWriter::write_json(&value, true), &mut logger, 0)
            .1;
        prop_assert!(!logger.has_error(), "{:?}", logger.messages());
        prop_assert_eq!(
            VariantWriter::write_json(&compact, false),
            VariantWriter::write_json(&pretty, false)
        );
    }
}
