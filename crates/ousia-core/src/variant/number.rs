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

//! Number micro-parser.
//!
//! Accepts decimal integers, hexadecimal integers (`0x1F`) and doubles with
//! optional fraction and exponent. Parsing stops at whitespace or at one of
//! the given delimiters; anything else that does not fit the number syntax
//! is an error.

use crate::logger::{Logger, LoggerExt};
use crate::reader::{is_whitespace, CharReader};
use crate::variant::Variant;

pub(crate) const TOO_LARGE: &str = "Value too large to be represented";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    HasSign,
    LeadingZero,
    LeadingPoint,
    Int,
    Hex,
    Point,
    ExpInit,
    ExpHasSign,
    Exp,
}

/// Result of parsing a number.
#[derive(Debug, Clone, Default)]
pub struct Number {
    negative: bool,
    magnitude: u64,
    overflow: bool,
    is_double: bool,
    /// Decimal text of a double, fed to the standard float parser.
    text: String,
}

fn digit_value(c: u8, base: u32) -> Option<u32> {
    (c as char).to_digit(base)
}

impl Number {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_int(&self) -> bool {
        !self.is_double
    }

    pub fn int_value(&self) -> i64 {
        if self.negative {
            (-(self.magnitude as i128)) as i64
        } else {
            self.magnitude as i64
        }
    }

    pub fn double_value(&self) -> f64 {
        if self.is_double {
            self.text.parse::<f64>().unwrap_or(f64::NAN)
        } else {
            self.int_value() as f64
        }
    }

    /// The parsed number as integer or double variant.
    pub fn to_variant(&self) -> Variant {
        if self.is_double {
            Variant::Double(self.double_value())
        } else {
            Variant::Int(self.int_value())
        }
    }

    fn push_digit(&mut self, base: u64, digit: u32) {
        match self
            .magnitude
            .checked_mul(base)
            .and_then(|v| v.checked_add(u64::from(digit)))
        {
            Some(v) => self.magnitude = v,
            None => self.overflow = true,
        }
    }

    /// Parses a number at the read cursor of `reader`.
    ///
    /// Every accepted character is consumed immediately; callers wanting to
    /// backtrack should parse from a fork. On success the reader stands on
    /// the terminating whitespace or delimiter.
    pub fn parse(&mut self, reader: &mut CharReader, logger: &mut dyn Logger, delims: &[u8]) -> bool {
        *self = Number::new();
        reader.reset_peek();
        let mut state = State::Init;
        let mut hex_digits = 0usize;
        loop {
            let Some(c) = reader.peek() else {
                reader.reset_peek();
                break;
            };
            if is_whitespace(c) || delims.contains(&c) {
                reader.reset_peek();
                break;
            }
            let next = match state {
                State::Init | State::HasSign => match c {
                    b'-' | b'+' if state == State::Init => {
                        self.negative = c == b'-';
                        self.text.push(c as char);
                        Some(State::HasSign)
                    }
                    b'0' => Some(State::LeadingZero),
                    b'.' => {
                        self.is_double = true;
                        self.text.push('.');
                        Some(State::LeadingPoint)
                    }
                    b'1'..=b'9' => {
                        self.push_digit(10, u32::from(c - b'0'));
                        self.text.push(c as char);
                        Some(State::Int)
                    }
                    _ => None,
                },
                State::LeadingZero => match c {
                    b'x' | b'X' => Some(State::Hex),
                    b'.' => {
                        self.is_double = true;
                        self.text.push_str("0.");
                        Some(State::Point)
                    }
                    b'e' | b'E' => {
                        self.is_double = true;
                        self.text.push_str("0e");
                        Some(State::ExpInit)
                    }
                    b'0'..=b'9' => {
                        self.push_digit(10, u32::from(c - b'0'));
                        self.text.push(c as char);
                        Some(State::Int)
                    }
                    _ => None,
                },
                State::LeadingPoint | State::Point | State::Int => match c {
                    b'0'..=b'9' => {
                        if state == State::Int {
                            self.push_digit(10, u32::from(c - b'0'));
                        }
                        self.text.push(c as char);
                        Some(if state == State::LeadingPoint {
                            State::Point
                        } else {
                            state
                        })
                    }
                    b'.' if state == State::Int => {
                        self.is_double = true;
                        self.text.push('.');
                        Some(State::Point)
                    }
                    b'e' | b'E' if state != State::LeadingPoint => {
                        self.is_double = true;
                        self.text.push('e');
                        Some(State::ExpInit)
                    }
                    _ => None,
                },
                State::Hex => match digit_value(c, 16) {
                    Some(d) => {
                        hex_digits += 1;
                        self.push_digit(16, d);
                        Some(State::Hex)
                    }
                    None => None,
                },
                State::ExpInit => match c {
                    b'-' | b'+' => {
                        self.text.push(c as char);
                        Some(State::ExpHasSign)
                    }
                    b'0'..=b'9' => {
                        self.text.push(c as char);
                        Some(State::Exp)
                    }
                    _ => None,
                },
                State::ExpHasSign | State::Exp => match c {
                    b'0'..=b'9' => {
                        self.text.push(c as char);
                        Some(State::Exp)
                    }
                    _ => None,
                },
            };
            match next {
                Some(s) => {
                    state = s;
                    reader.consume_peek();
                }
                None => {
                    reader.reset_peek();
                    logger.error(
                        format!("Unexpected character '{}' in number", c.escape_ascii()),
                        reader.location(),
                    );
                    return false;
                }
            }
        }

        let complete = match state {
            State::LeadingZero | State::Int | State::Point | State::Exp => true,
            State::Hex => hex_digits > 0,
            _ => false,
        };
        if !complete {
            logger.error("Unexpected end of number", reader.location());
            return false;
        }
        let too_large = if self.is_double {
            !self.double_value().is_finite()
        } else {
            let limit = if self.negative {
                i64::MAX as u64 + 1
            } else {
                i64::MAX as u64
            };
            self.overflow || self.magnitude > limit
        };
        if too_large {
            logger.error(TOO_LARGE, reader.location());
            return false;
        }
        true
    }

    /// Parses a complete string as number, allowing surrounding whitespace.
    pub fn parse_text(text: &str, logger: &mut dyn Logger) -> Option<Number> {
        let mut reader = CharReader::new(text, crate::location::INVALID_SOURCE_ID);
        reader.consume_whitespace();
        let mut number = Number::new();
        if !number.parse(&mut reader, logger, &[]) {
            return None;
        }
        if reader.consume_whitespace() {
            logger.error(
                format!("Unexpected characters after number in \"{text}\""),
                reader.location(),
            );
            return None;
        }
        Some(number)
    }

    /// Reads exactly `len` digits of the given base.
    pub fn parse_fixed_len_int(
        reader: &mut CharReader,
        len: usize,
        base: u32,
        logger: &mut dyn Logger,
    ) -> Option<u32> {
        let mut value: u32 = 0;
        for _ in 0..len {
            let start = reader.offset();
            let digit = reader.peek().and_then(|c| digit_value(c, base));
            match digit {
                Some(d) => {
                    reader.consume_peek();
                    value = value.checked_mul(base)?.checked_add(d)?;
                }
                None => {
                    reader.reset_peek();
                    logger.error(
                        format!("Expected {len} digits of base {base}"),
                        reader.location_from(start),
                    );
                    return None;
                }
            }
        }
        Some(value)
    }
}
