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

//! Core data model and parser infrastructure of the Ousia document
//! framework.
//!
//! Ousia describes documents with three kinds of schema nodes:
//! typesystems define attribute types, ontologies define the structure
//! documents may have and documents instantiate both. All nodes live in a
//! single [`Manager`] arena and refer to each other by [`NodeId`].
//!
//! # Layers
//!
//! - Input: [`reader`] provides a buffered, line-break normalising
//!   [`CharReader`] with source locations.
//! - Diagnostics: [`logger`] routes messages with severities and source
//!   contexts; [`LoggableException`] covers structural failures.
//! - Values: [`variant`] holds dynamically typed values with conversion
//!   and JSON output; [`typesystem`] checks and completes them.
//! - Schema and content: [`ontology`] and [`document`] extend the
//!   [`Manager`] with construction, query and validation.
//! - Parsing: [`parser`] contains the scope used for name resolution and
//!   the state stack format parsers report their events to.
//!
//! # Examples
//!
//! ```
//! use ousia_core::{ConcreteLogger, Manager, RangeSet};
//!
//! let mut manager = Manager::new();
//! let project = manager.create_project().unwrap();
//! let ontology = manager.create_project_ontology(project, "book").unwrap();
//! manager
//!     .create_structured_class(ontology, "book", RangeSet::any(), None, false, true)
//!     .unwrap();
//!
//! let mut logger = ConcreteLogger::default();
//! assert!(manager.validate(ontology, &mut logger));
//! ```

pub mod argument;
pub mod document;
mod error;
pub mod function;
mod limits;
pub mod location;
pub mod logger;
pub mod managed;
pub mod ontology;
pub mod parser;
mod project;
pub mod ranges;
pub mod reader;
pub mod rtti;
pub mod tokens;
pub mod typesystem;
pub mod variant;
pub mod whitespace;

pub use argument::{Argument, Arguments};
pub use document::{AnchorData, AnnotationEntityData, DocumentData, EntityData};
pub use error::{ErrorKind, LoggableException, OusiaResult};
pub use function::{Function, Method, NativeFunction, NullFunction, Property, PropertyType};
pub use limits::{Limits, ReaderOptions, ReaderOptionsBuilder};
pub use location::{SourceContext, SourceId, SourceLocation, TextSourceContext};
pub use logger::{
    ConcreteLogger, ExceptionLogger, Logger, LoggerExt, LoggerFork, Message, NullLogger, Severity,
    TracingLogger,
};
pub use managed::{Manager, NodeId, NodeKind, NodeVector, ResolutionResult, Slot};
pub use ontology::{FieldType, SyntaxDescriptor, DEFAULT_FIELD_NAME};
pub use parser::{
    Handler, HandlerData, ParserContext, ParserScope, ParserState, ParserStateCallbacks,
    ParserStateStack, ParserStates,
};
pub use project::ProjectData;
pub use ranges::{Range, RangeSet};
pub use reader::{Buffer, CharReader};
pub use rtti::Rtti;
pub use tokens::{TokenDescriptor, TokenId, TokenRegistry, Tokens};
pub use typesystem::TypeKind;
pub use variant::{
    ConversionMode, Variant, VariantArray, VariantConverter, VariantMap, VariantReader,
    VariantType, VariantWriter,
};
pub use whitespace::WhitespaceMode;
