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

//! Dynamically typed values.
//!
//! [`Variant`] is the value type used for attributes, function arguments
//! and parser data. Magic strings are strings that were written as bare
//! identifiers in the input; they compare equal to ordinary strings with
//! the same content but may additionally be resolved as node names.

mod converter;
mod number;
mod reader;
mod writer;

pub use converter::{ConversionMode, VariantConverter};
pub use number::Number;
pub use reader::VariantReader;
pub use writer::VariantWriter;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::{ErrorKind, LoggableException, OusiaResult};
use crate::function::Function;
use crate::logger::ExceptionLogger;
use crate::managed::NodeId;
use crate::rtti::{types, Rtti};

pub type VariantArray = Vec<Variant>;
pub type VariantMap = BTreeMap<String, Variant>;

/// Kind tag of a [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantType {
    Null,
    Bool,
    Int,
    Double,
    String,
    Magic,
    Array,
    Map,
    Object,
    Function,
}

impl VariantType {
    /// Name used in messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Double => "double",
            Self::String => "string",
            Self::Magic => "magic string",
            Self::Array => "array",
            Self::Map => "map",
            Self::Object => "object",
            Self::Function => "function",
        }
    }

    /// Descriptor of the kind.
    pub fn rtti(self) -> &'static Rtti {
        match self {
            Self::Null => &types::NULLPTR,
            Self::Bool => &types::BOOL,
            Self::Int => &types::INT,
            Self::Double => &types::DOUBLE,
            Self::String | Self::Magic => &types::STRING,
            Self::Array => &types::ARRAY,
            Self::Map => &types::MAP,
            Self::Object => &types::NODE,
            Self::Function => &types::FUNCTION,
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a node stored in a variant.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    id: NodeId,
    rtti: &'static Rtti,
}

impl ObjectRef {
    pub fn new(id: NodeId, rtti: &'static Rtti) -> Self {
        Self { id, rtti }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Type of the referenced node.
    pub fn rtti(&self) -> &'static Rtti {
        self.rtti
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.rtti.name(), self.id)
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Variant {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    /// A string that was written as a bare identifier.
    Magic(String),
    Array(VariantArray),
    Map(VariantMap),
    Object(ObjectRef),
    Function(Rc<dyn Function>),
}

impl Variant {
    /// Creates a magic string.
    pub fn magic(s: impl Into<String>) -> Self {
        Self::Magic(s.into())
    }

    pub fn object(id: NodeId, rtti: &'static Rtti) -> Self {
        Self::Object(ObjectRef::new(id, rtti))
    }

    pub fn function(f: impl Function + 'static) -> Self {
        Self::Function(Rc::new(f))
    }

    pub fn kind(&self) -> VariantType {
        match self {
            Self::Null => VariantType::Null,
            Self::Bool(_) => VariantType::Bool,
            Self::Int(_) => VariantType::Int,
            Self::Double(_) => VariantType::Double,
            Self::String(_) => VariantType::String,
            Self::Magic(_) => VariantType::Magic,
            Self::Array(_) => VariantType::Array,
            Self::Map(_) => VariantType::Map,
            Self::Object(_) => VariantType::Object,
            Self::Function(_) => VariantType::Function,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Descriptor of the value; objects report the type of their node.
    pub fn rtti(&self) -> &'static Rtti {
        match self {
            Self::Object(o) => o.rtti,
            other => other.kind().rtti(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Self::Double(_))
    }

    /// True for strings and magic strings.
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_) | Self::Magic(_))
    }

    pub fn is_magic(&self) -> bool {
        matches!(self, Self::Magic(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// True for null, booleans, numbers and strings.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Null
                | Self::Bool(_)
                | Self::Int(_)
                | Self::Double(_)
                | Self::String(_)
                | Self::Magic(_)
        )
    }

    fn mismatch(&self, requested: VariantType) -> LoggableException {
        LoggableException::type_mismatch(self.type_name(), requested.name())
    }

    // Strict accessors: no conversion, a different kind is an error.

    pub fn as_bool(&self) -> OusiaResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(self.mismatch(VariantType::Bool)),
        }
    }

    pub fn as_int(&self) -> OusiaResult<i64> {
        match self {
            Self::Int(i) => Ok(*i),
            _ => Err(self.mismatch(VariantType::Int)),
        }
    }

    pub fn as_double(&self) -> OusiaResult<f64> {
        match self {
            Self::Double(d) => Ok(*d),
            _ => Err(self.mismatch(VariantType::Double)),
        }
    }

    pub fn as_str(&self) -> OusiaResult<&str> {
        match self {
            Self::String(s) | Self::Magic(s) => Ok(s),
            _ => Err(self.mismatch(VariantType::String)),
        }
    }

    pub fn as_array(&self) -> OusiaResult<&VariantArray> {
        match self {
            Self::Array(a) => Ok(a),
            _ => Err(self.mismatch(VariantType::Array)),
        }
    }

    pub fn as_array_mut(&mut self) -> OusiaResult<&mut VariantArray> {
        match self {
            Self::Array(a) => Ok(a),
            other => Err(other.mismatch(VariantType::Array)),
        }
    }

    pub fn as_map(&self) -> OusiaResult<&VariantMap> {
        match self {
            Self::Map(m) => Ok(m),
            _ => Err(self.mismatch(VariantType::Map)),
        }
    }

    pub fn as_map_mut(&mut self) -> OusiaResult<&mut VariantMap> {
        match self {
            Self::Map(m) => Ok(m),
            other => Err(other.mismatch(VariantType::Map)),
        }
    }

    pub fn as_object(&self) -> OusiaResult<ObjectRef> {
        match self {
            Self::Object(o) => Ok(*o),
            _ => Err(self.mismatch(VariantType::Object)),
        }
    }

    pub fn as_function(&self) -> OusiaResult<&Rc<dyn Function>> {
        match self {
            Self::Function(f) => Ok(f),
            _ => Err(self.mismatch(VariantType::Function)),
        }
    }

    // Lenient accessors: convert a copy in ALL mode, fail on error.

    fn convert_copy(
        &self,
        f: impl FnOnce(&mut Variant, &mut ExceptionLogger) -> bool,
    ) -> OusiaResult<Variant> {
        let mut copy = self.clone();
        let mut logger = ExceptionLogger::new(ErrorKind::Conversion);
        f(&mut copy, &mut logger);
        logger.into_result(copy)
    }

    pub fn to_bool(&self) -> OusiaResult<bool> {
        self.convert_copy(|v, l| VariantConverter::to_bool(v, l, ConversionMode::All))?
            .as_bool()
    }

    pub fn to_int(&self) -> OusiaResult<i64> {
        self.convert_copy(|v, l| VariantConverter::to_int(v, l, ConversionMode::All))?
            .as_int()
    }

    pub fn to_double(&self) -> OusiaResult<f64> {
        self.convert_copy(|v, l| VariantConverter::to_double(v, l, ConversionMode::All))?
            .as_double()
    }

    /// Converts to a string (never fails for primitives, arrays or maps).
    pub fn to_string_value(&self) -> OusiaResult<String> {
        match self.convert_copy(|v, l| VariantConverter::to_string(v, l, ConversionMode::All))? {
            Variant::String(s) | Variant::Magic(s) => Ok(s),
            other => Err(other.mismatch(VariantType::String)),
        }
    }

    pub fn to_array(&self) -> OusiaResult<VariantArray> {
        match self.convert_copy(|v, l| {
            VariantConverter::to_array(v, &types::NONE, l, ConversionMode::All)
        })? {
            Variant::Array(a) => Ok(a),
            other => Err(other.mismatch(VariantType::Array)),
        }
    }

    pub fn to_map(&self) -> OusiaResult<VariantMap> {
        match self.convert_copy(|v, l| {
            VariantConverter::to_map(v, &types::NONE, l, ConversionMode::All)
        })? {
            Variant::Map(m) => Ok(m),
            other => Err(other.mismatch(VariantType::Map)),
        }
    }

    /// Renders the value as text. With `escape` set, strings are quoted
    /// and escaped; nested strings inside arrays and maps always are.
    pub fn to_string_with(&self, escape: bool) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Double(d) => format_double(*d),
            Self::String(s) | Self::Magic(s) => {
                if escape {
                    VariantWriter::escape_string(s)
                } else {
                    s.clone()
                }
            }
            Self::Array(_) | Self::Map(_) => VariantWriter::write_json(self, false),
            Self::Object(o) => format!("<object {:?}>", o),
            Self::Function(_) => "<function>".to_string(),
        }
    }

    /// Total comparison of two values of the same kind.
    ///
    /// Strings and magic strings compare by content. Comparing values of
    /// different kinds fails with a type mismatch.
    pub fn compare(&self, other: &Variant) -> OusiaResult<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Ok(Ordering::Equal),
            (Self::Bool(a), Self::Bool(b)) => Ok(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Ok(a.cmp(b)),
            (Self::Double(a), Self::Double(b)) => Ok(a.total_cmp(b)),
            (Self::String(a) | Self::Magic(a), Self::String(b) | Self::Magic(b)) => Ok(a.cmp(b)),
            (Self::Array(a), Self::Array(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ord => return Ok(ord),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (Self::Map(a), Self::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    match ka.cmp(kb) {
                        Ordering::Equal => {}
                        ord => return Ok(ord),
                    }
                    match va.compare(vb)? {
                        Ordering::Equal => {}
                        ord => return Ok(ord),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (Self::Object(a), Self::Object(b)) => Ok(a.id.cmp(&b.id)),
            (Self::Function(a), Self::Function(b)) => Ok(fn_addr(a).cmp(&fn_addr(b))),
            _ => Err(LoggableException::type_mismatch(
                other.type_name(),
                self.type_name(),
            )),
        }
    }
}

fn fn_addr(f: &Rc<dyn Function>) -> usize {
    Rc::as_ptr(f) as *const () as usize
}

/// Formats a double with six fractional digits; non-finite values print
/// as `inf`, `-inf` or `NaN`.
pub(crate) fn format_double(d: f64) -> String {
    if d.is_finite() {
        format!("{d:.6}")
    } else {
        d.to_string()
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.total_cmp(b) == Ordering::Equal,
            (Self::String(a) | Self::Magic(a), Self::String(b) | Self::Magic(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.id == b.id,
            (Self::Function(a), Self::Function(b)) => fn_addr(a) == fn_addr(b),
            _ => false,
        }
    }
}

impl Eq for Variant {}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other).ok()
    }
}

impl Hash for Variant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Strings and magic strings share a discriminant so that equal
        // values hash equally.
        match self {
            Self::Null => 0u8.hash(state),
            Self::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Self::Int(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Self::Double(d) => {
                3u8.hash(state);
                d.to_bits().hash(state);
            }
            Self::String(s) | Self::Magic(s) => {
                4u8.hash(state);
                s.hash(state);
            }
            Self::Array(a) => {
                5u8.hash(state);
                a.hash(state);
            }
            Self::Map(m) => {
                6u8.hash(state);
                m.hash(state);
            }
            Self::Object(o) => {
                7u8.hash(state);
                o.id.hash(state);
            }
            Self::Function(f) => {
                8u8.hash(state);
                fn_addr(f).hash(state);
            }
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_with(false))
    }
}

impl From<bool> for Variant {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Variant {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Variant {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Variant {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Variant {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<VariantArray> for Variant {
    fn from(a: VariantArray) -> Self {
        Self::Array(a)
    }
}

impl From<VariantMap> for Variant {
    fn from(m: VariantMap) -> Self {
        Self::Map(m)
    }
}

impl From<ObjectRef> for Variant {
    fn from(o: ObjectRef) -> Self {
        Self::Object(o)
    }
}

impl From<Rc<dyn Function>> for Variant {
    fn from(f: Rc<dyn Function>) -> Self {
        Self::Function(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Variant) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    // ==================== Kind tests ====================

    #[test]
    fn test_kind_and_names() {
        assert_eq!(Variant::Null.kind(), VariantType::Null);
        assert_eq!(Variant::from(7.5).type_name(), "double");
        assert_eq!(Variant::from(7).type_name(), "integer");
        assert_eq!(Variant::magic("x").type_name(), "magic string");
        assert!(Variant::magic("x").is_string());
        assert!(!Variant::from("x").is_magic());
    }

    #[test]
    fn test_is_primitive() {
        assert!(Variant::from(true).is_primitive());
        assert!(!Variant::Array(vec![]).is_primitive());
        assert!(!Variant::Map(VariantMap::new()).is_primitive());
    }

    // ==================== Strict accessor tests ====================

    #[test]
    fn test_strict_accessors() {
        assert!(Variant::from(true).as_bool().unwrap());
        assert_eq!(Variant::from(5).as_int().unwrap(), 5);
        assert_eq!(Variant::magic("m").as_str().unwrap(), "m");
        let err = Variant::from(7.0).as_int().unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert!(err.message.contains("integer"));
        assert!(err.message.contains("double"));
    }

    #[test]
    fn test_mutable_accessors() {
        let mut v = Variant::Array(vec![Variant::from(1)]);
        v.as_array_mut().unwrap().push(Variant::from(2));
        assert_eq!(v.as_array().unwrap().len(), 2);
        assert!(v.as_map_mut().is_err());
    }

    // ==================== Lenient accessor tests ====================

    #[test]
    fn test_lenient_accessors() {
        assert_eq!(Variant::from(7.9).to_int().unwrap(), 7);
        assert_eq!(Variant::from("42").to_int().unwrap(), 42);
        assert!(Variant::from(1).to_bool().unwrap());
        assert_eq!(Variant::from(true).to_double().unwrap(), 1.0);
        assert_eq!(Variant::from(3).to_string_value().unwrap(), "3");
        assert_eq!(
            Variant::from(3).to_array().unwrap(),
            vec![Variant::from(3)]
        );
        assert!(Variant::from("abc").to_int().is_err());
    }

    // ==================== Equality and hashing tests ====================

    #[test]
    fn test_string_magic_equal() {
        let a = Variant::from("name");
        let b = Variant::magic("name");
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_int_double_not_equal() {
        assert_ne!(Variant::from(1), Variant::from(1.0));
    }

    #[test]
    fn test_nan_equals_itself() {
        let nan = Variant::from(f64::NAN);
        assert_eq!(nan, nan.clone());
    }

    #[test]
    fn test_function_identity() {
        let f: Rc<dyn Function> = Rc::new(crate::function::NullFunction);
        let a = Variant::Function(Rc::clone(&f));
        let b = Variant::Function(f);
        let c = Variant::function(crate::function::NullFunction);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    // ==================== Ordering tests ====================

    #[test]
    fn test_compare_same_kind() {
        assert_eq!(
            Variant::from(1).compare(&Variant::from(2)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Variant::from("b").compare(&Variant::magic("a")).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            Variant::Array(vec![1.into(), 2.into()])
                .compare(&Variant::Array(vec![1.into()]))
                .unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_mixed_kinds_fails() {
        let err = Variant::from(1).compare(&Variant::from("1")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert!(Variant::from(1).partial_cmp(&Variant::from(1.0)).is_none());
    }

    // ==================== Rendering tests ====================

    #[test]
    fn test_to_string_with() {
        assert_eq!(Variant::Null.to_string(), "null");
        assert_eq!(Variant::from(7.0).to_string(), "7.000000");
        assert_eq!(Variant::from(7.25).to_string(), "7.250000");
        assert_eq!(Variant::from(-0.5).to_string(), "-0.500000");
        assert_eq!(Variant::from(f64::INFINITY).to_string(), "inf");
        assert_eq!(Variant::from("a\"b").to_string_with(true), "\"a\\\"b\"");
        assert_eq!(Variant::from("a\"b").to_string_with(false), "a\"b");
        assert_eq!(
            Variant::Array(vec![1.into(), "x".into()]).to_string(),
            "[1,\"x\"]"
        );
    }
}
