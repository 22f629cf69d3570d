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

//! Whitespace handling for character data.

use crate::reader::is_whitespace;

/// How whitespace in character data is treated before it reaches a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WhitespaceMode {
    /// Keep the data unchanged.
    Preserve,
    /// Remove leading and trailing whitespace.
    Trim,
    /// Trim and replace every inner whitespace run by a single space.
    #[default]
    Collapse,
}

fn is_ws(c: char) -> bool {
    c.is_ascii() && is_whitespace(c as u8)
}

/// Applies `mode` to `text`.
pub fn normalize_whitespace(text: &str, mode: WhitespaceMode) -> String {
    match mode {
        WhitespaceMode::Preserve => text.to_string(),
        WhitespaceMode::Trim => text.trim_matches(is_ws).to_string(),
        WhitespaceMode::Collapse => {
            let mut out = String::with_capacity(text.len());
            let mut pending_space = false;
            for c in text.chars() {
                if is_ws(c) {
                    pending_space = !out.is_empty();
                } else {
                    if pending_space {
                        out.push(' ');
                        pending_space = false;
                    }
                    out.push(c);
                }
            }
            out
        }
    }
}

/// Whether `text` consists of whitespace only.
pub fn is_blank(text: &str) -> bool {
    text.bytes().all(is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Normalisation tests ====================

    #[test]
    fn test_preserve() {
        assert_eq!(normalize_whitespace("  a \n b ", WhitespaceMode::Preserve), "  a \n b ");
    }

    #[test]
    fn test_trim() {
        assert_eq!(normalize_whitespace("\t a \n b \r\n", WhitespaceMode::Trim), "a \n b");
        assert_eq!(normalize_whitespace("   ", WhitespaceMode::Trim), "");
    }

    #[test]
    fn test_collapse() {
        assert_eq!(normalize_whitespace("  a \n\t b  c ", WhitespaceMode::Collapse), "a b c");
        assert_eq!(normalize_whitespace("\u{e4}  \u{f6}", WhitespaceMode::Collapse), "\u{e4} \u{f6}");
        assert_eq!(normalize_whitespace("", WhitespaceMode::Collapse), "");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(" \t\n"));
        assert!(is_blank(""));
        assert!(!is_blank(" x "));
    }
}
