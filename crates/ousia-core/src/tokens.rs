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

//! Identifiers, tokens and the token registry.
//!
//! Parsers report syntactic elements as [`TokenId`]s. A handful of ids are
//! reserved for tokens every format understands (see [`Tokens`]); all
//! other ids are handed out by a [`TokenRegistry`] for user-defined token
//! strings declared in ontologies.

use std::collections::HashMap;

use crate::location::SourceLocation;
use crate::logger::{Logger, LoggerExt, LoggerFork};
use crate::parser::ParserStateCallbacks;
use crate::reader::CharReader;
use crate::variant::{Variant, VariantReader, VariantType};
use crate::whitespace::{normalize_whitespace, WhitespaceMode};

/// Id of a token.
pub type TokenId = u32;

/// Reserved token ids.
pub struct Tokens;

impl Tokens {
    /// No token.
    pub const EMPTY: TokenId = TokenId::MAX;
    /// Character data.
    pub const DATA: TokenId = TokenId::MAX - 1;
    /// A single line break.
    pub const NEWLINE: TokenId = TokenId::MAX - 2;
    /// Two or more line breaks.
    pub const PARAGRAPH: TokenId = TokenId::MAX - 3;
    /// Three or more line breaks.
    pub const SECTION: TokenId = TokenId::MAX - 4;
    pub const INDENT: TokenId = TokenId::MAX - 5;
    pub const DEDENT: TokenId = TokenId::MAX - 6;

    /// Whether `id` is one of the reserved ids.
    pub fn is_reserved(id: TokenId) -> bool {
        id >= Self::DEDENT
    }

    /// Human readable name of a reserved id.
    pub fn name(id: TokenId) -> Option<&'static str> {
        match id {
            Self::EMPTY => Some("empty"),
            Self::DATA => Some("data"),
            Self::NEWLINE => Some("newline"),
            Self::PARAGRAPH => Some("paragraph"),
            Self::SECTION => Some("section"),
            Self::INDENT => Some("indent"),
            Self::DEDENT => Some("dedent"),
            _ => None,
        }
    }
}

/// Markup tokens of the native format that may not be redefined.
const RESERVED_TOKENS: [&str; 7] = ["\\", "%", "%{", "}%", "{!", "<\\", "\\>"];

#[inline]
fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

#[inline]
fn is_identifier_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'-'
}

/// Checks whether `s` matches `[A-Za-z_][A-Za-z0-9_-]*`.
///
/// # Examples
///
/// ```
/// use ousia_core::tokens::is_identifier;
///
/// assert!(is_identifier("chapter"));
/// assert!(is_identifier("_x-1"));
/// assert!(!is_identifier("1st"));
/// assert!(!is_identifier(""));
/// ```
pub fn is_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    match bytes.split_first() {
        Some((&first, rest)) => {
            is_identifier_start(first) && rest.iter().all(|&c| is_identifier_char(c))
        }
        None => false,
    }
}

/// Checks whether `s` is a dot-separated sequence of identifiers.
pub fn is_namespaced_identifier(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

/// Checks whether `s` may be used as user-defined token.
///
/// A token is non-empty, contains no whitespace, neither starts nor ends
/// with an alphanumeric character, is not one of the reserved markup
/// tokens and does not consist of braces only.
pub fn is_user_defined_token(s: &str) -> bool {
    let bytes = s.as_bytes();
    let (Some(&first), Some(&last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    if first.is_ascii_alphanumeric() || last.is_ascii_alphanumeric() {
        return false;
    }
    if RESERVED_TOKENS.contains(&s) {
        return false;
    }
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    bytes.iter().any(|&c| c != b'{' && c != b'}')
}

/// A token bound to a position of a descriptor: a reserved id or a user
/// token string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenDescriptor {
    pub token: String,
    pub id: TokenId,
    /// Set for reserved tokens.
    pub special: bool,
}

impl Default for TokenDescriptor {
    fn default() -> Self {
        Self::empty()
    }
}

impl TokenDescriptor {
    pub fn empty() -> Self {
        Self {
            token: String::new(),
            id: Tokens::EMPTY,
            special: false,
        }
    }

    /// Descriptor for a reserved token.
    pub fn special(id: TokenId) -> Self {
        Self {
            token: String::new(),
            id,
            special: true,
        }
    }

    /// Descriptor for a user token string; the id is assigned on
    /// registration.
    pub fn user(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            id: Tokens::EMPTY,
            special: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty() && self.id == Tokens::EMPTY
    }

    pub fn is_valid(&self) -> bool {
        self.special || self.is_empty() || is_user_defined_token(&self.token)
    }
}

/// Reference counted registry of user tokens and the current data
/// preparation settings of a parse.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    ids: HashMap<String, TokenId>,
    tokens: HashMap<TokenId, (String, usize)>,
    next_id: TokenId,
    whitespace_mode: WhitespaceMode,
    data_type: Option<VariantType>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token_id(&self, token: &str) -> Option<TokenId> {
        self.ids.get(token).copied()
    }

    pub fn token(&self, id: TokenId) -> Option<&str> {
        self.tokens.get(&id).map(|(s, _)| s.as_str())
    }

    pub fn whitespace_mode(&self) -> WhitespaceMode {
        self.whitespace_mode
    }

    pub fn data_type(&self) -> Option<VariantType> {
        self.data_type
    }

    /// Normalises raw character data and reads it as the current data type.
    ///
    /// Without data type the normalised text is returned as string. Data
    /// that cannot be read as the requested type is reported at `location`
    /// and replaced by the default of that type.
    pub fn prepare_data(
        &self,
        text: &str,
        location: SourceLocation,
        logger: &mut dyn Logger,
    ) -> Variant {
        let normalized = normalize_whitespace(text, self.whitespace_mode);
        let Some(ty) = self.data_type else {
            return Variant::String(normalized);
        };
        let mut reader = CharReader::new(normalized.as_str(), location.source_id());
        let mut fork = LoggerFork::new();
        let (ok, value) = VariantReader::new().parse_typed(ty, &mut reader, &mut fork, &[]);
        fork.purge();
        if ok && !reader.consume_whitespace() {
            return value;
        }
        logger.error(
            format!("Could not read \"{}\" as {}", normalized, ty.name()),
            location,
        );
        match ty {
            VariantType::Bool => Variant::Bool(false),
            VariantType::Int => Variant::Int(0),
            VariantType::Double => Variant::Double(0.0),
            VariantType::String | VariantType::Magic => Variant::String(String::new()),
            VariantType::Array => Variant::Array(Vec::new()),
            VariantType::Map => Variant::Map(Default::default()),
            _ => Variant::Null,
        }
    }
}

impl ParserStateCallbacks for TokenRegistry {
    fn set_whitespace_mode(&mut self, mode: WhitespaceMode) {
        self.whitespace_mode = mode;
    }

    fn set_data_type(&mut self, ty: Option<VariantType>) {
        self.data_type = ty;
    }

    fn supports_token(&self, token: &str) -> bool {
        is_user_defined_token(token)
    }

    fn register_token(&mut self, token: &str) -> TokenId {
        if let Some(&id) = self.ids.get(token) {
            if let Some((_, count)) = self.tokens.get_mut(&id) {
                *count += 1;
            }
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(token.to_string(), id);
        self.tokens.insert(id, (token.to_string(), 1));
        id
    }

    fn unregister_token(&mut self, id: TokenId) {
        let remove = match self.tokens.get_mut(&id) {
            Some((_, count)) => {
                *count -= 1;
                *count == 0
            }
            None => false,
        };
        if remove {
            if let Some((token, _)) = self.tokens.remove(&id) {
                self.ids.remove(&token);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::ConcreteLogger;

    // ==================== Identifier tests ====================

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("a"));
        assert!(is_identifier("Chapter_2"));
        assert!(is_identifier("x-y"));
        assert!(!is_identifier("-x"));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier("\u{e4}"));
    }

    #[test]
    fn test_is_namespaced_identifier() {
        assert!(is_namespaced_identifier("book"));
        assert!(is_namespaced_identifier("book.chapter.title"));
        assert!(!is_namespaced_identifier("book."));
        assert!(!is_namespaced_identifier(".book"));
        assert!(!is_namespaced_identifier("a..b"));
        assert!(!is_namespaced_identifier(""));
    }

    #[test]
    fn test_is_user_defined_token() {
        assert!(is_user_defined_token("*"));
        assert!(is_user_defined_token("**"));
        assert!(is_user_defined_token("<<"));
        assert!(is_user_defined_token("{*}"));
        assert!(!is_user_defined_token(""));
        assert!(!is_user_defined_token("a*"));
        assert!(!is_user_defined_token("*a"));
        assert!(!is_user_defined_token("* *"));
        assert!(!is_user_defined_token("%{"));
        assert!(!is_user_defined_token("\\"));
        assert!(!is_user_defined_token("{}"));
        assert!(!is_user_defined_token("{{"));
    }

    // ==================== TokenDescriptor tests ====================

    #[test]
    fn test_token_descriptor() {
        assert!(TokenDescriptor::empty().is_empty());
        assert!(TokenDescriptor::empty().is_valid());
        assert!(TokenDescriptor::special(Tokens::NEWLINE).is_valid());
        assert!(!TokenDescriptor::special(Tokens::NEWLINE).is_empty());
        assert!(TokenDescriptor::user("**").is_valid());
        assert!(!TokenDescriptor::user("ab").is_valid());
    }

    #[test]
    fn test_reserved_ids() {
        assert!(Tokens::is_reserved(Tokens::DATA));
        assert!(Tokens::is_reserved(Tokens::DEDENT));
        assert!(!Tokens::is_reserved(0));
        assert_eq!(Tokens::name(Tokens::PARAGRAPH), Some("paragraph"));
        assert_eq!(Tokens::name(7), None);
    }

    // ==================== Registry tests ====================

    #[test]
    fn test_registry_refcounts() {
        let mut reg = TokenRegistry::new();
        let a = reg.register_token("**");
        let b = reg.register_token("__");
        assert_ne!(a, b);
        assert_eq!(reg.register_token("**"), a);
        assert_eq!(reg.len(), 2);
        reg.unregister_token(a);
        assert_eq!(reg.token_id("**"), Some(a));
        reg.unregister_token(a);
        assert_eq!(reg.token_id("**"), None);
        assert_eq!(reg.token(b), Some("__"));
        reg.unregister_token(a);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_prepare_data_whitespace() {
        let mut reg = TokenRegistry::new();
        let mut logger = ConcreteLogger::default();
        let loc = SourceLocation::default();
        assert_eq!(reg.prepare_data("  a \n b ", loc, &mut logger), Variant::from("a b"));
        reg.set_whitespace_mode(WhitespaceMode::Preserve);
        assert_eq!(reg.prepare_data(" a ", loc, &mut logger), Variant::from(" a "));
        assert!(!logger.has_error());
    }

    #[test]
    fn test_prepare_data_typed() {
        let mut reg = TokenRegistry::new();
        let mut logger = ConcreteLogger::default();
        let loc = SourceLocation::default();
        reg.set_data_type(Some(VariantType::Int));
        assert_eq!(reg.prepare_data(" 42 ", loc, &mut logger), Variant::Int(42));
        assert!(!logger.has_error());
        assert_eq!(reg.prepare_data("4 2", loc, &mut logger), Variant::Int(0));
        assert!(logger.contains("Could not read \"4 2\" as integer"));
    }
}
