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

//! Parsing variants from character streams.
//!
//! The generic syntax is a superset of JSON: strings may use single quotes,
//! unquoted text is accepted as string, bare identifiers become magic
//! strings, and complex literals use `[...]` or `{...}` with either plain
//! values (arrays) or `key=value` / `key: value` entries (maps).

use crate::limits::Limits;
use crate::location::SourceId;
use crate::logger::{Logger, LoggerExt, LoggerFork};
use crate::reader::CharReader;
use crate::tokens::is_namespaced_identifier;

use super::number::Number;
use super::{Variant, VariantArray, VariantMap, VariantType};

/// Parser for the variant syntax.
#[derive(Debug, Clone, Default)]
pub struct VariantReader {
    limits: Limits,
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn into_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

impl VariantReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: Limits) -> Self {
        Self { limits }
    }

    /// Parses a single or double quoted string with escape sequences.
    ///
    /// Errors inside the string are logged and parsing continues; the
    /// returned flag is false if any error occurred.
    pub fn parse_string(&self, reader: &mut CharReader, logger: &mut dyn Logger) -> (bool, String) {
        reader.reset_peek();
        let start = reader.offset();
        let quote = match reader.read() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => {
                logger.error("Expected quote", reader.location_from(start));
                return (false, String::new());
            }
        };
        let mut out = Vec::new();
        let mut ok = true;
        let max_len = self.limits.max_string_length;
        loop {
            if out.len() > max_len {
                if ok {
                    logger.error("String literal too long", reader.location_from(start));
                }
                out.truncate(max_len);
                ok = false;
            }
            let Some(c) = reader.read() else {
                logger.error("Unterminated string literal", reader.location_from(start));
                return (false, into_string(out));
            };
            if c == quote {
                return (ok, into_string(out));
            }
            if c == b'\n' {
                logger.error(
                    "Unterminated string literal, unexpected line break",
                    reader.location_from(start),
                );
                return (false, into_string(out));
            }
            if c != b'\\' {
                out.push(c);
                continue;
            }
            let escape_start = reader.offset() - 1;
            let Some(e) = reader.read() else {
                continue;
            };
            match e {
                b'b' => out.push(0x08),
                b'f' => out.push(0x0c),
                b'n' => out.push(b'\n'),
                b'r' => out.push(b'\r'),
                b't' => out.push(b'\t'),
                b'v' => out.push(0x0b),
                b'\'' | b'"' | b'\\' => out.push(e),
                b'\n' => {}
                b'x' => match Number::parse_fixed_len_int(reader, 2, 16, logger) {
                    Some(v) => push_char(&mut out, char::from(v as u8)),
                    None => ok = false,
                },
                b'u' => match Number::parse_fixed_len_int(reader, 4, 16, logger) {
                    Some(v) => match char::from_u32(v) {
                        Some(ch) => push_char(&mut out, ch),
                        None => {
                            logger.error(
                                format!("Invalid unicode code point U+{v:04X}"),
                                reader.location_from(escape_start),
                            );
                            push_char(&mut out, char::REPLACEMENT_CHARACTER);
                            ok = false;
                        }
                    },
                    None => ok = false,
                },
                b'0'..=b'7' => {
                    let high = u32::from(e - b'0');
                    match Number::parse_fixed_len_int(reader, 2, 8, logger) {
                        Some(low) if high * 64 + low <= 0xFF => {
                            push_char(&mut out, char::from((high * 64 + low) as u8));
                        }
                        Some(_) => {
                            logger.error(
                                "Octal escape sequence out of range",
                                reader.location_from(escape_start),
                            );
                            ok = false;
                        }
                        None => ok = false,
                    }
                }
                other => {
                    logger.error(
                        format!("Unknown escape sequence \"\\{}\"", other.escape_ascii()),
                        reader.location_from(escape_start),
                    );
                    out.push(other);
                    ok = false;
                }
            }
        }
    }

    /// Reads until one of `delims` or the end of input and trims
    /// surrounding whitespace. The delimiter is not consumed.
    pub fn parse_unescaped_string(
        &self,
        reader: &mut CharReader,
        _logger: &mut dyn Logger,
        delims: &[u8],
    ) -> (bool, String) {
        reader.consume_whitespace();
        let mut out = Vec::new();
        loop {
            match reader.peek() {
                Some(c) if !delims.contains(&c) => {
                    reader.consume_peek();
                    out.push(c);
                }
                _ => {
                    reader.reset_peek();
                    break;
                }
            }
        }
        let s = into_string(out);
        (true, s.trim_end().to_string())
    }

    /// Parses an integer.
    pub fn parse_integer(
        &self,
        reader: &mut CharReader,
        logger: &mut dyn Logger,
        delims: &[u8],
    ) -> (bool, i64) {
        reader.consume_whitespace();
        let start = reader.offset();
        let mut number = Number::new();
        if !number.parse(reader, logger, delims) {
            return (false, 0);
        }
        if !number.is_int() {
            logger.error("Expected integer but got double", reader.location_from(start));
            return (false, number.double_value() as i64);
        }
        (true, number.int_value())
    }

    /// Parses a double; integers are accepted.
    pub fn parse_double(
        &self,
        reader: &mut CharReader,
        logger: &mut dyn Logger,
        delims: &[u8],
    ) -> (bool, f64) {
        reader.consume_whitespace();
        let mut number = Number::new();
        if !number.parse(reader, logger, delims) {
            return (false, 0.0);
        }
        (true, number.double_value())
    }

    /// Parses an array literal `[a, b, ...]`.
    pub fn parse_array(&self, reader: &mut CharReader, logger: &mut dyn Logger) -> (bool, VariantArray) {
        reader.consume_whitespace();
        let start = reader.offset();
        if reader.peek() != Some(b'[') {
            reader.reset_peek();
            logger.error("Expected '['", reader.location_from(start));
            return (false, VariantArray::new());
        }
        reader.reset_peek();
        match self.parse_complex_at(reader, logger, 0) {
            (ok, Variant::Array(a)) => (ok, a),
            (_, other) => {
                logger.error(
                    format!("Expected array but got {}", other.type_name()),
                    reader.location_from(start),
                );
                (false, VariantArray::new())
            }
        }
    }

    /// Parses a map literal `{key=value, ...}`.
    pub fn parse_object(&self, reader: &mut CharReader, logger: &mut dyn Logger) -> (bool, VariantMap) {
        reader.consume_whitespace();
        let start = reader.offset();
        let opener = reader.peek();
        reader.reset_peek();
        if !matches!(opener, Some(b'{') | Some(b'[')) {
            logger.error("Expected '{'", reader.location_from(start));
            return (false, VariantMap::new());
        }
        match self.parse_complex_at(reader, logger, 0) {
            (ok, Variant::Map(m)) => (ok, m),
            (ok, Variant::Array(a)) if a.is_empty() => (ok, VariantMap::new()),
            (_, other) => {
                logger.error(
                    format!("Expected map but got {}", other.type_name()),
                    reader.location_from(start),
                );
                (false, VariantMap::new())
            }
        }
    }

    /// Parses `[...]` or `{...}`; entries decide between array and map.
    pub fn parse_complex(&self, reader: &mut CharReader, logger: &mut dyn Logger) -> (bool, Variant) {
        reader.consume_whitespace();
        self.parse_complex_at(reader, logger, 0)
    }

    fn parse_complex_at(
        &self,
        reader: &mut CharReader,
        logger: &mut dyn Logger,
        depth: usize,
    ) -> (bool, Variant) {
        reader.reset_peek();
        let start = reader.offset();
        let close = match reader.read() {
            Some(b'[') => b']',
            Some(b'{') => b'}',
            _ => {
                logger.error("Expected '[' or '{'", reader.location_from(start));
                return (false, Variant::Null);
            }
        };
        let empty = || {
            if close == b'}' {
                Variant::Map(VariantMap::new())
            } else {
                Variant::Array(VariantArray::new())
            }
        };
        if depth >= self.limits.max_complex_depth {
            logger.error("Maximum nesting depth exceeded", reader.location_from(start));
            return (false, empty());
        }

        let key_delims = [b',', close, b'=', b':'];
        let value_delims = [b',', close];
        let mut array = VariantArray::new();
        let mut map = VariantMap::new();
        let mut ok = true;
        let mut mixed_reported = false;
        loop {
            if !reader.consume_whitespace() {
                logger.error(
                    format!("Unexpected end of input, expected '{}'", close as char),
                    reader.location_from(start),
                );
                ok = false;
                break;
            }
            if reader.peek() == Some(close) {
                reader.consume_peek();
                break;
            }
            reader.reset_peek();

            let (entry_ok, first) = self.parse_generic_at(reader, logger, &key_delims, depth + 1);
            ok &= entry_ok;
            reader.consume_whitespace();
            match reader.peek() {
                Some(b'=') | Some(b':') => {
                    reader.consume_peek();
                    let key_loc = reader.location();
                    let key = match first {
                        Variant::String(s) | Variant::Magic(s) => s,
                        other => {
                            logger.error(
                                format!("Invalid key of type {}", other.type_name()),
                                key_loc,
                            );
                            ok = false;
                            other.to_string_with(false)
                        }
                    };
                    let (value_ok, value) =
                        self.parse_generic_at(reader, logger, &value_delims, depth + 1);
                    ok &= value_ok;
                    if map.contains_key(&key) {
                        logger.warning(format!("Duplicate key \"{key}\""), key_loc);
                    }
                    map.insert(key, value);
                }
                _ => {
                    reader.reset_peek();
                    array.push(first);
                }
            }
            if !map.is_empty() && !array.is_empty() && !mixed_reported {
                logger.error(
                    "Cannot mix array entries and map entries",
                    reader.location_from(start),
                );
                ok = false;
                mixed_reported = true;
            }

            reader.consume_whitespace();
            match reader.peek() {
                Some(b',') => reader.consume_peek(),
                Some(c) if c == close => reader.reset_peek(),
                Some(c) => {
                    reader.reset_peek();
                    logger.error(
                        format!(
                            "Expected ',' or '{}' but got '{}'",
                            close as char,
                            c.escape_ascii()
                        ),
                        reader.location(),
                    );
                    reader.read();
                    ok = false;
                }
                None => reader.reset_peek(),
            }
        }

        let result = if !map.is_empty() {
            Variant::Map(map)
        } else if !array.is_empty() {
            Variant::Array(array)
        } else {
            empty()
        };
        (ok, result)
    }

    /// Parses any value: quoted strings, numbers, complex literals,
    /// `true`/`false`/`null`, identifiers (as magic strings) and finally
    /// unquoted text up to one of `delims`.
    pub fn parse_generic(
        &self,
        reader: &mut CharReader,
        logger: &mut dyn Logger,
        delims: &[u8],
    ) -> (bool, Variant) {
        self.parse_generic_at(reader, logger, delims, 0)
    }

    fn parse_generic_at(
        &self,
        reader: &mut CharReader,
        logger: &mut dyn Logger,
        delims: &[u8],
        depth: usize,
    ) -> (bool, Variant) {
        reader.consume_whitespace();
        let start = reader.offset();
        let Some(c) = reader.peek() else {
            reader.reset_peek();
            logger.error("Unexpected end of input, expected value", reader.location());
            return (false, Variant::Null);
        };
        reader.reset_peek();

        match c {
            b'"' | b'\'' => {
                let (ok, s) = self.parse_string(reader, logger);
                return (ok, Variant::String(s));
            }
            b'[' | b'{' => return self.parse_complex_at(reader, logger, depth),
            b'0'..=b'9' | b'-' | b'+' | b'.' => {
                if let Some(v) = self.try_parse_number(reader, logger, delims) {
                    return (true, v);
                }
            }
            _ => {}
        }

        let (ok, s) = self.parse_unescaped_string(reader, logger, delims);
        if s.is_empty() {
            logger.error("Expected value", reader.location_from(start));
            return (false, Variant::Null);
        }
        let value = match s.as_str() {
            "true" => Variant::Bool(true),
            "false" => Variant::Bool(false),
            "null" => Variant::Null,
            _ if is_namespaced_identifier(&s) => Variant::Magic(s),
            _ => Variant::String(s),
        };
        (ok, value)
    }

    /// Tries to read a number that is followed only by whitespace and a
    /// delimiter (or the end). The reader is left untouched on failure.
    fn try_parse_number(
        &self,
        reader: &mut CharReader,
        logger: &mut dyn Logger,
        delims: &[u8],
    ) -> Option<Variant> {
        let mut fork = reader.fork();
        let mut log_fork = LoggerFork::new();
        let mut number = Number::new();
        if number.parse(&mut fork, &mut log_fork, delims) {
            fork.consume_whitespace();
            let next = fork.peek();
            fork.reset_peek();
            if next.map_or(true, |c| delims.contains(&c)) {
                fork.commit(reader);
                log_fork.commit(logger);
                return Some(number.to_variant());
            }
        }
        log_fork.purge();
        None
    }

    /// Parses a complete string as generic value. Text that is not a single
    /// value is returned as string.
    pub fn parse_generic_string(
        &self,
        text: &str,
        logger: &mut dyn Logger,
        source_id: SourceId,
    ) -> (bool, Variant) {
        let mut reader = CharReader::new(text, source_id);
        if !reader.consume_whitespace() {
            return (true, Variant::String(String::new()));
        }
        let mut fork = LoggerFork::new();
        let (ok, value) = self.parse_generic(&mut reader, &mut fork, &[]);
        if reader.consume_whitespace() {
            fork.purge();
            return (true, Variant::String(text.trim().to_string()));
        }
        fork.commit(logger);
        (ok, value)
    }

    /// Parses a value of a fixed variant kind.
    pub fn parse_typed(
        &self,
        ty: VariantType,
        reader: &mut CharReader,
        logger: &mut dyn Logger,
        delims: &[u8],
    ) -> (bool, Variant) {
        reader.consume_whitespace();
        let start = reader.offset();
        match ty {
            VariantType::Int => {
                let (ok, i) = self.parse_integer(reader, logger, delims);
                (ok, Variant::Int(i))
            }
            VariantType::Double => {
                let (ok, d) = self.parse_double(reader, logger, delims);
                (ok, Variant::Double(d))
            }
            VariantType::Bool | VariantType::Null => {
                let (_, s) = self.parse_unescaped_string(reader, logger, delims);
                match (ty, s.as_str()) {
                    (VariantType::Bool, "true") => (true, Variant::Bool(true)),
                    (VariantType::Bool, "false") => (true, Variant::Bool(false)),
                    (VariantType::Null, "null") => (true, Variant::Null),
                    _ => {
                        logger.error(
                            format!("Expected {} but got \"{s}\"", ty.name()),
                            reader.location_from(start),
                        );
                        let default = if ty == VariantType::Bool {
                            Variant::Bool(false)
                        } else {
                            Variant::Null
                        };
                        (false, default)
                    }
                }
            }
            VariantType::String | VariantType::Magic => {
                let quoted = matches!(reader.peek(), Some(b'"' | b'\''));
                reader.reset_peek();
                let (ok, s) = if quoted {
                    self.parse_string(reader, logger)
                } else {
                    self.parse_unescaped_string(reader, logger, delims)
                };
                (ok, Variant::String(s))
            }
            VariantType::Array | VariantType::Map => {
                let (ok, v) = self.parse_complex(reader, logger);
                if v.kind() == ty || !ok {
                    (ok, v)
                } else {
                    logger.error(
                        format!("Expected {} but got {}", ty.name(), v.type_name()),
                        reader.location_from(start),
                    );
                    (false, v)
                }
            }
            VariantType::Object | VariantType::Function => self.parse_generic(reader, logger, delims),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::ConcreteLogger;

    fn generic(text: &str) -> (bool, Variant, ConcreteLogger) {
        let mut logger = ConcreteLogger::default();
        let mut reader = CharReader::new(text, 0);
        let (ok, v) = VariantReader::new().parse_generic(&mut reader, &mut logger, &[]);
        (ok, v, logger)
    }

    fn string(text: &str) -> (bool, String) {
        let mut logger = ConcreteLogger::default();
        let mut reader = CharReader::new(text, 0);
        VariantReader::new().parse_string(&mut reader, &mut logger)
    }

    // ==================== String tests ====================

    #[test]
    fn test_parse_string_quotes() {
        assert_eq!(string("\"hello\""), (true, "hello".to_string()));
        assert_eq!(string("'it\"s'"), (true, "it\"s".to_string()));
    }

    #[test]
    fn test_parse_string_escapes() {
        assert_eq!(
            string(r#""a\tb\nc\\d\"e\'f\v\b\f\r""#),
            (true, "a\tb\nc\\d\"e'f\x0b\x08\x0c\r".to_string())
        );
    }

    #[test]
    fn test_parse_string_hex_unicode_octal() {
        assert_eq!(string(r#""\x41\xe9""#), (true, "Aé".to_string()));
        assert_eq!(string(r#""\u03A9\u00e9""#), (true, "Ωé".to_string()));
        assert_eq!(string(r#""\101\377""#), (true, "Aÿ".to_string()));
    }

    #[test]
    fn test_parse_string_line_continuation() {
        assert_eq!(string("\"ab\\\ncd\""), (true, "abcd".to_string()));
    }

    #[test]
    fn test_parse_string_length_limit() {
        let limits = Limits {
            max_string_length: 3,
            ..Limits::default()
        };
        let mut logger = ConcreteLogger::default();
        let mut reader = CharReader::new("\"abcdef\" x", 0);
        let (ok, s) = VariantReader::with_limits(limits).parse_string(&mut reader, &mut logger);
        assert!(!ok);
        assert_eq!(s, "abc");
        assert!(logger.contains("too long"));
        assert!(reader.consume_whitespace());
        assert_eq!(reader.read(), Some(b'x'));
    }

    #[test]
    fn test_parse_string_errors() {
        assert!(!string("\"abc").0);
        assert!(!string("\"ab\ncd\"").0);
        assert!(!string(r#""\q""#).0);
        assert!(!string(r#""\xZZ""#).0);
        assert!(!string(r#""\777""#).0);
        assert!(!string(r#""\uD800""#).0);
        assert!(!string("abc").0);
    }

    // ==================== Generic tests ====================

    #[test]
    fn test_generic_numbers() {
        assert_eq!(generic("42").1, Variant::Int(42));
        assert_eq!(generic("-1.5e1").1, Variant::Double(-15.0));
        assert_eq!(generic("0x20").1, Variant::Int(32));
    }

    #[test]
    fn test_generic_keywords_and_magic() {
        assert_eq!(generic("true").1, Variant::Bool(true));
        assert_eq!(generic("null").1, Variant::Null);
        let (_, v, _) = generic("book.chapter");
        assert!(v.is_magic());
        assert_eq!(v, Variant::from("book.chapter"));
    }

    #[test]
    fn test_generic_unquoted_text() {
        let (ok, v, logger) = generic("hello world");
        assert!(ok);
        assert!(!v.is_magic());
        assert_eq!(v, Variant::from("hello world"));
        assert!(logger.messages().is_empty());
    }

    #[test]
    fn test_generic_number_prefix_is_text() {
        let (ok, v, logger) = generic("12 apples");
        assert!(ok);
        assert_eq!(v, Variant::from("12 apples"));
        assert!(logger.messages().is_empty());
    }

    #[test]
    fn test_generic_array() {
        let (ok, v, _) = generic("[1, 'two', three, [4]]");
        assert!(ok);
        assert_eq!(
            v,
            Variant::Array(vec![
                1.into(),
                "two".into(),
                Variant::magic("three"),
                Variant::Array(vec![4.into()]),
            ])
        );
    }

    #[test]
    fn test_generic_map_both_separators() {
        let (ok, v, _) = generic("{a=1, b: \"x\", c = [true]}");
        assert!(ok);
        let map = v.as_map().unwrap();
        assert_eq!(map["a"], 1.into());
        assert_eq!(map["b"], "x".into());
        assert_eq!(map["c"], Variant::Array(vec![true.into()]));
    }

    #[test]
    fn test_generic_map_in_brackets() {
        let (ok, v, _) = generic("[width=5]");
        assert!(ok);
        assert!(v.is_map());
    }

    #[test]
    fn test_generic_empty_complex() {
        assert_eq!(generic("[]").1, Variant::Array(vec![]));
        assert_eq!(generic("{}").1, Variant::Map(VariantMap::new()));
    }

    #[test]
    fn test_generic_mixed_entries_error() {
        let (ok, _, logger) = generic("[1, a=2]");
        assert!(!ok);
        assert!(logger.contains("Cannot mix"));
    }

    #[test]
    fn test_generic_unterminated_complex() {
        let (ok, v, logger) = generic("[1, 2");
        assert!(!ok);
        assert_eq!(v, Variant::Array(vec![1.into(), 2.into()]));
        assert!(logger.contains("expected ']'"));
    }

    #[test]
    fn test_generic_depth_limit() {
        let mut logger = ConcreteLogger::default();
        let mut reader = CharReader::new("[[[1]]]", 0);
        let limits = Limits {
            max_complex_depth: 2,
            ..Limits::default()
        };
        let (ok, _) = VariantReader::with_limits(limits).parse_generic(&mut reader, &mut logger, &[]);
        assert!(!ok);
        assert!(logger.contains("Maximum nesting depth"));
    }

    #[test]
    fn test_generic_stops_at_delimiter() {
        let mut logger = ConcreteLogger::default();
        let mut reader = CharReader::new("abc;def", 0);
        let (_, v) = VariantReader::new().parse_generic(&mut reader, &mut logger, &[b';']);
        assert_eq!(v, Variant::magic("abc"));
        assert_eq!(reader.read(), Some(b';'));
    }

    #[test]
    fn test_generic_string() {
        let r = VariantReader::new();
        let mut logger = ConcreteLogger::default();
        assert_eq!(r.parse_generic_string("  7 ", &mut logger, 0).1, 7.into());
        assert_eq!(
            r.parse_generic_string("[1] tail", &mut logger, 0).1,
            "[1] tail".into()
        );
        assert_eq!(r.parse_generic_string("", &mut logger, 0).1, "".into());
        assert!(logger.messages().is_empty());
    }

    // ==================== Typed tests ====================

    #[test]
    fn test_parse_typed() {
        let r = VariantReader::new();
        let mut logger = ConcreteLogger::default();
        let mut reader = CharReader::new("12", 0);
        assert_eq!(
            r.parse_typed(VariantType::Int, &mut reader, &mut logger, &[]),
            (true, Variant::Int(12))
        );
        let mut reader = CharReader::new("1.5", 0);
        assert!(!r.parse_typed(VariantType::Int, &mut reader, &mut logger, &[]).0);
        let mut reader = CharReader::new("maybe", 0);
        assert!(!r.parse_typed(VariantType::Bool, &mut reader, &mut logger, &[]).0);
        let mut reader = CharReader::new("'q'", 0);
        assert_eq!(
            r.parse_typed(VariantType::String, &mut reader, &mut logger, &[]).1,
            "q".into()
        );
    }

    #[test]
    fn test_parse_array_and_object() {
        let r = VariantReader::new();
        let mut logger = ConcreteLogger::default();
        let mut reader = CharReader::new("[1,2]", 0);
        assert_eq!(r.parse_array(&mut reader, &mut logger).1.len(), 2);
        let mut reader = CharReader::new("{a=1}", 0);
        assert_eq!(r.parse_object(&mut reader, &mut logger).1.len(), 1);
        let mut reader = CharReader::new("{}", 0);
        assert!(r.parse_object(&mut reader, &mut logger).0);
        let mut reader = CharReader::new("x", 0);
        assert!(!r.parse_array(&mut reader, &mut logger).0);
    }
}
