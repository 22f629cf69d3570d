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

//! Property-based tests for line-break normalisation.
//!
//! # Properties Tested
//!
//! 1. **Normalisation**: `"\r\n"`, `"\n\r"` and lone `'\r'` read as `'\n'`
//! 2. **Line counting**: the line number after reading everything is the
//!    number of line breaks plus one

use ousia_core::CharReader;
use proptest::prelude::*;

const BREAKS: [&str; 4] = ["\n", "\r\n", "\n\r", "\r"];

fn lines() -> impl Strategy<Value = (Vec<String>, Vec<usize>)> {
    prop::collection::vec("[a-z ]{1,8}", 1..8).prop_flat_map(|segments| {
        let n = segments.len() - 1;
        (Just(segments), prop::collection::vec(0usize..BREAKS.len(), n))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Property: every line-break flavour reads as a single newline.
    #[test]
    fn prop_line_breaks_normalised((segments, breaks) in lines()) {
        let mut input = segments[0].clone();
        for (segment, &b) in segments[1..].iter().zip(&breaks) {
            input.push_str(BREAKS[b]);
            input.push_str(segment);
        }

        let mut reader = CharReader::new(input, 0);
        let mut out = Vec::new();
        while let Some(c) = reader.read() {
            out.push(c);
        }
        prop_assert_eq!(String::from_utf8(out).unwrap(), segments.join("\n"));
        prop_assert_eq!(reader.line(), segments.len());
    }
}
