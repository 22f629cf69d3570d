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

//! Error context helpers.
//!
//! Extension methods for `Result<T, LoggableException>` and common
//! foreign error types that annotate failures as they propagate.
//!
//! # Examples
//!
//! ```rust
//! use ousia::{read_variant, OusiaResultExt};
//!
//! fn load_setting(name: &str, text: &str) -> ousia::OusiaResult<ousia::Variant> {
//!     read_variant(text).with_context(|| format!("while reading setting {name}"))
//! }
//!
//! let err = load_setting("width", "[1, 2").unwrap_err();
//! assert_eq!(err.context.as_deref(), Some("while reading setting width"));
//! ```

use std::fmt;

use crate::LoggableException;

/// Extension trait for adding context to results.
///
/// Context is stored in the exception's `context` field; the message is
/// left untouched. Nested contexts are joined outermost first.
pub trait OusiaResultExt<T> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, LoggableException>
    where
        C: fmt::Display;

    /// Adds lazily computed context to an error.
    fn with_context<C, F>(self, f: F) -> Result<T, LoggableException>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

impl<T> OusiaResultExt<T> for Result<T, LoggableException> {
    fn context<C>(self, context: C) -> Result<T, LoggableException>
    where
        C: fmt::Display,
    {
        self.map_err(|e| add_context(e, context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, LoggableException>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| add_context(e, f().to_string()))
    }
}

impl<T> OusiaResultExt<T> for Result<T, std::io::Error> {
    fn context<C>(self, context: C) -> Result<T, LoggableException>
    where
        C: fmt::Display,
    {
        self.map_err(|e| LoggableException::io(e.to_string()).with_context(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, LoggableException>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| LoggableException::io(e.to_string()).with_context(f().to_string()))
    }
}

impl<T> OusiaResultExt<T> for Result<T, serde_json::Error> {
    fn context<C>(self, context: C) -> Result<T, LoggableException>
    where
        C: fmt::Display,
    {
        self.map_err(|e| LoggableException::syntax(e.to_string()).with_context(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, LoggableException>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| LoggableException::syntax(e.to_string()).with_context(f().to_string()))
    }
}

/// Prepends `new_context` to the existing context, separated by "; ".
fn add_context(mut error: LoggableException, new_context: String) -> LoggableException {
    if new_context.is_empty() {
        return error;
    }
    error.context = Some(match error.context {
        Some(existing) => format!("{new_context}; {existing}"),
        None => new_context,
    });
    error
}
