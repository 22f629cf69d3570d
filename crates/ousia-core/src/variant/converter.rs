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

//! In-place variant conversion.
//!
//! Every conversion function either succeeds and returns `true`, or logs an
//! error, replaces the variant with the default value of the target type and
//! returns `false`. A failed conversion therefore always leaves a value of
//! the requested type behind.

use crate::function::NullFunction;
use crate::location::SourceLocation;
use crate::logger::{ConcreteLogger, Logger, LoggerExt};
use crate::rtti::{types, Rtti};

use super::number::{Number, TOO_LARGE};
use super::{Variant, VariantArray, VariantMap, VariantWriter};

/// How lenient conversions are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMode {
    /// Only total, lossless conversions (e.g. integer to double).
    Safe,
    /// Also lossy conversions (e.g. double to integer, string to number).
    All,
}

pub struct VariantConverter;

fn fail(var: &mut Variant, target: &str, default: Variant, logger: &mut dyn Logger) -> bool {
    logger.error(
        format!("Cannot convert {} to {}", var.type_name(), target),
        SourceLocation::default(),
    );
    *var = default;
    false
}

/// Parses a string as number. Syntax messages are dropped; an overflow is
/// reported to `logger`.
fn parse_number(s: &str, logger: &mut dyn Logger) -> Option<Number> {
    let mut scratch = ConcreteLogger::default();
    let result = Number::parse_text(s, &mut scratch);
    if result.is_none() && scratch.contains(TOO_LARGE) {
        logger.error(TOO_LARGE, SourceLocation::default());
    }
    result
}

/// Unwraps a single-element array in ALL mode.
fn single_element(var: &Variant) -> Option<Variant> {
    match var {
        Variant::Array(a) if a.len() == 1 => Some(a[0].clone()),
        _ => None,
    }
}

impl VariantConverter {
    pub fn to_bool(var: &mut Variant, logger: &mut dyn Logger, mode: ConversionMode) -> bool {
        if var.is_bool() {
            return true;
        }
        if mode == ConversionMode::Safe {
            return fail(var, "boolean", Variant::Bool(false), logger);
        }
        let value = match var {
            Variant::Null => false,
            Variant::Int(i) => *i != 0,
            Variant::Double(d) => *d != 0.0,
            Variant::String(s) | Variant::Magic(s) => match s.as_str() {
                "true" => true,
                "false" => false,
                other => !other.is_empty(),
            },
            Variant::Object(_) => true,
            Variant::Array(_) => match single_element(var) {
                Some(mut inner) => {
                    let ok = Self::to_bool(&mut inner, logger, mode);
                    *var = inner;
                    return ok;
                }
                None => return fail(var, "boolean", Variant::Bool(false), logger),
            },
            _ => return fail(var, "boolean", Variant::Bool(false), logger),
        };
        *var = Variant::Bool(value);
        true
    }

    pub fn to_int(var: &mut Variant, logger: &mut dyn Logger, mode: ConversionMode) -> bool {
        if var.is_int() {
            return true;
        }
        if mode == ConversionMode::Safe {
            return fail(var, "integer", Variant::Int(0), logger);
        }
        let value = match var {
            Variant::Null => 0,
            Variant::Bool(b) => i64::from(*b),
            Variant::Double(d) if d.is_finite() => d.trunc() as i64,
            Variant::String(s) | Variant::Magic(s) => match parse_number(s, logger) {
                Some(n) if n.is_int() => n.int_value(),
                Some(n) if n.double_value().is_finite() => n.double_value().trunc() as i64,
                _ => {
                    let msg = format!("Cannot convert string \"{s}\" to integer");
                    logger.error(msg, SourceLocation::default());
                    *var = Variant::Int(0);
                    return false;
                }
            },
            Variant::Array(_) => match single_element(var) {
                Some(mut inner) => {
                    let ok = Self::to_int(&mut inner, logger, mode);
                    *var = inner;
                    return ok;
                }
                None => return fail(var, "integer", Variant::Int(0), logger),
            },
            _ => return fail(var, "integer", Variant::Int(0), logger),
        };
        *var = Variant::Int(value);
        true
    }

    pub fn to_double(var: &mut Variant, logger: &mut dyn Logger, mode: ConversionMode) -> bool {
        match var {
            Variant::Double(_) => return true,
            Variant::Int(i) => {
                *var = Variant::Double(*i as f64);
                return true;
            }
            _ => {}
        }
        if mode == ConversionMode::Safe {
            return fail(var, "double", Variant::Double(0.0), logger);
        }
        let value = match var {
            Variant::Null => 0.0,
            Variant::Bool(b) => f64::from(u8::from(*b)),
            Variant::String(s) | Variant::Magic(s) => match parse_number(s, logger) {
                Some(n) => n.double_value(),
                None => {
                    let msg = format!("Cannot convert string \"{s}\" to double");
                    logger.error(msg, SourceLocation::default());
                    *var = Variant::Double(0.0);
                    return false;
                }
            },
            Variant::Array(_) => match single_element(var) {
                Some(mut inner) => {
                    let ok = Self::to_double(&mut inner, logger, mode);
                    *var = inner;
                    return ok;
                }
                None => return fail(var, "double", Variant::Double(0.0), logger),
            },
            _ => return fail(var, "double", Variant::Double(0.0), logger),
        };
        *var = Variant::Double(value);
        true
    }

    pub fn to_string(var: &mut Variant, logger: &mut dyn Logger, mode: ConversionMode) -> bool {
        let text = match var {
            Variant::String(_) => return true,
            Variant::Magic(s) => std::mem::take(s),
            Variant::Null | Variant::Bool(_) | Variant::Int(_) | Variant::Double(_) => {
                var.to_string_with(false)
            }
            Variant::Array(_) | Variant::Map(_) if mode == ConversionMode::All => {
                VariantWriter::write_json(var, false)
            }
            Variant::Object(_) | Variant::Function(_) if mode == ConversionMode::All => {
                var.to_string_with(false)
            }
            _ => return fail(var, "string", Variant::String(String::new()), logger),
        };
        *var = Variant::String(text);
        true
    }

    /// Converts to an array whose elements are converted to `inner`.
    pub fn to_array(
        var: &mut Variant,
        inner: &'static Rtti,
        logger: &mut dyn Logger,
        mode: ConversionMode,
    ) -> bool {
        if !var.is_array() {
            if mode == ConversionMode::Safe {
                return fail(var, "array", Variant::Array(VariantArray::new()), logger);
            }
            let value = std::mem::take(var);
            *var = Variant::Array(vec![value]);
        }
        let mut ok = true;
        if let Variant::Array(items) = var {
            for item in items.iter_mut() {
                ok &= Self::convert(item, inner, &types::NONE, logger, mode);
            }
        }
        ok
    }

    /// Converts to a map whose values are converted to `inner`.
    pub fn to_map(
        var: &mut Variant,
        inner: &'static Rtti,
        logger: &mut dyn Logger,
        mode: ConversionMode,
    ) -> bool {
        if !var.is_map() {
            return fail(var, "map", Variant::Map(VariantMap::new()), logger);
        }
        let mut ok = true;
        if let Variant::Map(entries) = var {
            for value in entries.values_mut() {
                ok &= Self::convert(value, inner, &types::NONE, logger, mode);
            }
        }
        ok
    }

    pub fn to_function(var: &mut Variant, logger: &mut dyn Logger) -> bool {
        if var.is_function() {
            return true;
        }
        fail(var, "function", Variant::function(NullFunction), logger)
    }

    /// Converts `var` to the variant kind or node type described by `ty`.
    ///
    /// `inner` restricts the elements of arrays and the values of maps.
    /// [`types::NONE`] accepts anything.
    pub fn convert(
        var: &mut Variant,
        ty: &'static Rtti,
        inner: &'static Rtti,
        logger: &mut dyn Logger,
        mode: ConversionMode,
    ) -> bool {
        if ty == &types::NONE {
            return true;
        }
        if ty == &types::NULLPTR {
            if var.is_null() {
                return true;
            }
            return fail(var, "null", Variant::Null, logger);
        }
        if ty == &types::BOOL {
            return Self::to_bool(var, logger, mode);
        }
        if ty == &types::INT {
            return Self::to_int(var, logger, mode);
        }
        if ty == &types::DOUBLE {
            return Self::to_double(var, logger, mode);
        }
        if ty == &types::STRING {
            return Self::to_string(var, logger, mode);
        }
        if ty == &types::ARRAY {
            return Self::to_array(var, inner, logger, mode);
        }
        if ty == &types::MAP {
            return Self::to_map(var, inner, logger, mode);
        }
        if ty == &types::FUNCTION {
            return Self::to_function(var, logger);
        }
        match var {
            Variant::Object(o) if o.rtti().isa(ty) => true,
            _ => {
                logger.error(
                    format!(
                        "Expected object of type \"{}\" but got {}",
                        ty.name(),
                        var.type_name()
                    ),
                    SourceLocation::default(),
                );
                *var = Variant::Null;
                false
            }
        }
    }
}
