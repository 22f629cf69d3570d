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

//! # Ousia - Semantic Document Framework
//!
//! Ousia represents structured documents together with the ontologies that
//! describe their legal shapes and the typesystems that describe their
//! attributes. This crate re-exports the core model and adds a few
//! convenience entry points.
//!
//! ## Quick Start
//!
//! ```rust
//! use ousia::{read_variant, to_json, Variant};
//!
//! let value = read_variant("{width: 12, unit: px, tags: [a, b]}").unwrap();
//! assert_eq!(
//!     to_json(&value),
//!     r#"{"tags":["a","b"],"unit":"px","width":12}"#
//! );
//!
//! let back = ousia::from_json(&to_json(&value)).unwrap();
//! assert_eq!(back.as_map().unwrap().len(), 3);
//! ```
//!
//! ## Modules
//!
//! - [`parser`]: parser scope and state stack
//! - [`ontology`], [`document`], [`typesystem`]: schema and content
//! - [`rtti`]: node type descriptors

// Re-export core types
pub use ousia_core::{
    // Values
    ConversionMode,
    Variant,
    VariantArray,
    VariantConverter,
    VariantMap,
    VariantReader,
    VariantType,
    VariantWriter,
    // Graph
    FieldType,
    Manager,
    NodeId,
    NodeKind,
    RangeSet,
    Slot,
    // Diagnostics
    ConcreteLogger,
    ErrorKind,
    ExceptionLogger,
    Logger,
    LoggerExt,
    LoggableException,
    Message,
    OusiaResult,
    Severity,
    SourceLocation,
    TracingLogger,
    // Configuration
    Limits,
    ReaderOptions,
    ReaderOptionsBuilder,
};

// Error handling extensions
mod error_ext;
pub use error_ext::OusiaResultExt;

pub mod parser {
    //! Parser scope and state stack
    pub use ousia_core::parser::*;
}

pub mod ontology {
    //! Ontology model
    pub use ousia_core::ontology::*;
}

pub mod document {
    //! Document model
    pub use ousia_core::document::*;
}

pub mod typesystem {
    //! Typesystem model
    pub use ousia_core::typesystem::*;
}

pub mod rtti {
    //! Runtime type descriptors of graph nodes
    pub use ousia_core::rtti::*;
}

use ousia_core::{CharReader, NullLogger};

/// Reads a single value in the Ousia value syntax.
///
/// Accepts everything [`VariantReader::parse_generic`] does: quoted and
/// unquoted strings, numbers, `true`/`false`/`null`, arrays and maps.
/// The first error is returned; trailing input is an error too.
///
/// # Examples
///
/// ```rust
/// use ousia::{read_variant, Variant};
///
/// assert_eq!(read_variant("42").unwrap(), Variant::Int(42));
/// assert_eq!(read_variant("[1, \"two\"]").unwrap().as_array().unwrap().len(), 2);
/// assert!(read_variant("[1, 2").is_err());
/// ```
pub fn read_variant(text: &str) -> OusiaResult<Variant> {
    read_variant_with_options(text, &ReaderOptions::default())
}

/// Reads a single value with explicit reader options.
pub fn read_variant_with_options(text: &str, options: &ReaderOptions) -> OusiaResult<Variant> {
    let mut reader = CharReader::new(text, 0);
    let mut logger = ExceptionLogger::new(ErrorKind::Syntax);
    let (_, value) =
        VariantReader::with_limits(options.limits.clone()).parse_generic(&mut reader, &mut logger, &[]);
    if let Some(err) = logger.take_exception() {
        return Err(err);
    }
    if reader.consume_whitespace() {
        return Err(LoggableException::syntax("Unexpected trailing input").with_location(reader.location()));
    }
    tracing::trace!(kind = %value.kind(), "read variant");
    Ok(value)
}

/// Writes a value as compact JSON.
///
/// # Examples
///
/// ```rust
/// use ousia::{to_json, Variant};
///
/// assert_eq!(to_json(&Variant::Double(7.0)), "7.0");
/// ```
pub fn to_json(value: &Variant) -> String {
    VariantWriter::write_json(value, false)
}

/// Writes a value as indented JSON.
pub fn to_json_pretty(value: &Variant) -> String {
    VariantWriter::write_json(value, true)
}

/// Parses JSON text into a value.
pub fn from_json(json: &str) -> OusiaResult<Variant> {
    let value: serde_json::Value = serde_json::from_str(json).context("while parsing JSON")?;
    Ok(from_json_value(value))
}

/// Converts a `serde_json::Value`. Integers outside the `i64` range become
/// doubles.
pub fn from_json_value(value: serde_json::Value) -> Variant {
    match value {
        serde_json::Value::Null => Variant::Null,
        serde_json::Value::Bool(b) => Variant::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Variant::Int(i),
            None => Variant::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Variant::String(s),
        serde_json::Value::Array(items) => Variant::Array(items.into_iter().map(from_json_value).collect()),
        serde_json::Value::Object(entries) => Variant::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, from_json_value(v)))
                .collect(),
        ),
    }
}

/// Validates `node` and everything it owns.
///
/// Returns the first error as exception. Use [`Manager::validate`] with a
/// [`ConcreteLogger`] to see every message.
pub fn validate(manager: &Manager, node: NodeId) -> OusiaResult<()> {
    let mut logger = ExceptionLogger::new(ErrorKind::Structure);
    manager.validate(node, &mut logger);
    logger.into_result(())
}

/// Returns true if `node` validates; messages are discarded.
pub fn is_valid(manager: &Manager, node: NodeId) -> bool {
    manager.validate(node, &mut NullLogger)
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_scalars() {
        assert_eq!(read_variant("true").unwrap(), Variant::Bool(true));
        assert_eq!(read_variant("  -3.5 ").unwrap(), Variant::Double(-3.5));
        assert_eq!(read_variant("null").unwrap(), Variant::Null);
        assert_eq!(read_variant("'quoted'").unwrap(), Variant::from("quoted"));
    }

    #[test]
    fn test_read_trailing_input() {
        let err = read_variant("[1] [2]").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_read_depth_limit() {
        let options = ReaderOptions {
            limits: Limits {
                max_complex_depth: 2,
                ..Limits::default()
            },
            ..ReaderOptions::default()
        };
        assert!(read_variant_with_options("[[1]]", &options).is_ok());
        assert!(read_variant_with_options("[[[1]]]", &options).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let value = read_variant("{a: [1, 2.5, \"x\"], b: null}").unwrap();
        let json = to_json(&value);
        assert_eq!(from_json(&json).unwrap(), value);
        assert!(to_json_pretty(&value).contains('\n'));
    }

    #[test]
    fn test_from_json_error() {
        let err = from_json("{").unwrap_err();
        assert_eq!(err.context.as_deref(), Some("while parsing JSON"));
    }

    #[test]
    fn test_validate() {
        let mut mgr = Manager::new();
        let project = mgr.create_project().unwrap();
        let ontology = mgr.create_project_ontology(project, "o").unwrap();
        assert!(validate(&mgr, ontology).is_ok());
        mgr.create_structured_class(ontology, "a", RangeSet::any(), None, false, false)
            .unwrap();
        mgr.create_structured_class(ontology, "a", RangeSet::any(), None, false, false)
            .unwrap();
        let err = validate(&mgr, ontology).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Structure);
        assert!(!is_valid(&mgr, ontology));
    }
}
