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

//! Error types shared by all Ousia components.
//!
//! Recoverable problems are reported through a [`Logger`](crate::Logger)
//! and never abort an operation. A [`LoggableException`] is raised only
//! when an operation cannot produce any meaningful result; it carries the
//! same information as a log message and can be forwarded to a logger
//! unchanged.

use std::fmt;
use thiserror::Error;

use crate::location::SourceLocation;

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A variant held a different type than requested.
    TypeMismatch,
    /// A value could not be converted to the requested type.
    Conversion,
    /// A command was not valid in the current parser state.
    InvalidCommand,
    /// The node graph was asked to do something structurally impossible.
    Structure,
    /// A name could not be resolved.
    Resolution,
    /// Lexical or syntactic violation in the input.
    Syntax,
    /// I/O error while reading an input source.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch => write!(f, "TypeMismatchError"),
            Self::Conversion => write!(f, "ConversionError"),
            Self::InvalidCommand => write!(f, "InvalidCommandError"),
            Self::Structure => write!(f, "StructureError"),
            Self::Resolution => write!(f, "ResolutionError"),
            Self::Syntax => write!(f, "SyntaxError"),
            Self::Io => write!(f, "IOError"),
        }
    }
}

/// An error that can be logged as a message at a source location.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct LoggableException {
    /// The kind of error.
    pub kind: ErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Location the error refers to, if known.
    pub location: Option<SourceLocation>,
    /// Additional context (e.g., "while converting attribute \"width\"").
    pub context: Option<String>,
}

impl LoggableException {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
            context: None,
        }
    }

    /// Attach the source location the error refers to.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        if location.is_valid() {
            self.location = Some(location);
        }
        self
    }

    /// Add context information.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Location of the error, or the invalid location if unknown.
    pub fn location(&self) -> SourceLocation {
        self.location.unwrap_or_default()
    }

    /// Error raised by the typed variant accessors.
    pub fn type_mismatch(actual: &str, requested: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("Variant: Requested \"{requested}\" but is \"{actual}\""),
        )
    }

    // Convenience constructors for each error kind
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conversion, message)
    }

    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCommand, message)
    }

    pub fn structure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structure, message)
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }
}

impl From<std::io::Error> for LoggableException {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

/// Result type for Ousia operations.
pub type OusiaResult<T> = Result<T, LoggableException>;
