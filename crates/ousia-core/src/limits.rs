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

//! Resource limits for readers and resolution.

use crate::variant::ConversionMode;

/// Configurable limits bounding the resources consumed while reading
/// input and resolving references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Size of a single buffer chunk in bytes (default: 64 KiB).
    pub chunk_size: usize,
    /// Bytes a cursor may always move back (default: 128).
    pub lookback: usize,
    /// Maximum nesting depth of array and map literals (default: 128).
    pub max_complex_depth: usize,
    /// Maximum number of passes over the deferred resolution list
    /// (default: 64).
    pub max_resolution_passes: usize,
    /// Maximum number of bytes shown in a source context (default: 80).
    pub max_context_length: usize,
    /// Maximum length of a string literal in bytes (default: 1 MB).
    pub max_string_length: usize,
    /// Maximum depth of the parser state stack (default: 1024).
    pub max_stack_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024, // 64 KiB
            lookback: 128,
            max_complex_depth: 128,
            max_resolution_passes: 64,
            max_context_length: 80,
            max_string_length: 1024 * 1024, // 1 MB
            max_stack_depth: 1024,
        }
    }
}

impl Limits {
    /// Create limits with no restrictions (for testing).
    ///
    /// Chunk size and lookback are kept at their defaults since they
    /// control buffering rather than bound it.
    pub fn unlimited() -> Self {
        Self {
            max_complex_depth: usize::MAX,
            max_resolution_passes: usize::MAX,
            max_context_length: usize::MAX,
            max_string_length: usize::MAX,
            max_stack_depth: usize::MAX,
            ..Self::default()
        }
    }
}

/// Options for the variant reader and the char reader.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Resource limits.
    pub limits: Limits,
    /// Mode used when converting parsed data to declared types.
    pub conversion_mode: ConversionMode,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            conversion_mode: ConversionMode::Safe,
        }
    }
}

impl ReaderOptions {
    /// Create a builder for reader options.
    pub fn builder() -> ReaderOptionsBuilder {
        ReaderOptionsBuilder::new()
    }
}

/// Builder for ergonomic construction of [`ReaderOptions`].
///
/// ```text
/// let opts = ReaderOptions::builder()
///     .chunk_size(4096)
///     .max_complex_depth(16)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ReaderOptionsBuilder {
    limits: Limits,
    conversion_mode: ConversionMode,
}

impl ReaderOptionsBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self {
            limits: Limits::default(),
            conversion_mode: ConversionMode::Safe,
        }
    }

    /// Set the buffer chunk size in bytes.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.limits.chunk_size = size.max(1);
        self
    }

    /// Set the guaranteed lookback in bytes.
    pub fn lookback(mut self, lookback: usize) -> Self {
        self.limits.lookback = lookback;
        self
    }

    /// Set the maximum nesting depth of complex literals.
    pub fn max_complex_depth(mut self, depth: usize) -> Self {
        self.limits.max_complex_depth = depth;
        self
    }

    /// Set the maximum number of deferred resolution passes.
    pub fn max_resolution_passes(mut self, passes: usize) -> Self {
        self.limits.max_resolution_passes = passes;
        self
    }

    /// Set the maximum length of a source context.
    pub fn max_context_length(mut self, length: usize) -> Self {
        self.limits.max_context_length = length;
        self
    }

    /// Set the maximum length of string literals.
    pub fn max_string_length(mut self, length: usize) -> Self {
        self.limits.max_string_length = length;
        self
    }

    /// Set the maximum parser state stack depth.
    pub fn max_stack_depth(mut self, depth: usize) -> Self {
        self.limits.max_stack_depth = depth;
        self
    }

    /// Set the conversion mode for typed data.
    pub fn conversion_mode(mut self, mode: ConversionMode) -> Self {
        self.conversion_mode = mode;
        self
    }

    /// Replace all limits at once.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Build the options.
    pub fn build(self) -> ReaderOptions {
        ReaderOptions {
            limits: self.limits,
            conversion_mode: self.conversion_mode,
        }
    }
}

impl Default for ReaderOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
