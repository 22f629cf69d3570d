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

//! Source locations and human readable source contexts.
//!
//! A [`SourceLocation`] is a compact byte range inside one input source.
//! Line and column numbers are only computed on demand, when a message is
//! about to be shown to a user, by turning the location into a
//! [`SourceContext`].
//!
//! # Examples
//!
//! ```
//! use ousia_core::{SourceLocation, TextSourceContext};
//!
//! let loc = SourceLocation::new(0, 6, 11);
//! assert!(loc.is_valid());
//! assert_eq!(loc.length(), 5);
//!
//! let text = TextSourceContext::new("test.osml", "hello\nworld");
//! let ctx = text.context(&loc, 80);
//! assert_eq!(ctx.start_line, 2);
//! assert_eq!(ctx.start_column, 1);
//! assert_eq!(ctx.text, "world");
//! ```

use std::fmt;

/// Identifier of an input source.
pub type SourceId = u32;

/// Byte offset inside an input source.
pub type SourceOffset = u32;

/// Source id marking an unknown source.
pub const INVALID_SOURCE_ID: SourceId = SourceId::MAX;

/// Offset marking an unknown position.
pub const INVALID_SOURCE_OFFSET: SourceOffset = SourceOffset::MAX;

/// A half-open byte range `[start, end)` inside the source `source_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceLocation {
    source_id: SourceId,
    start: SourceOffset,
    end: SourceOffset,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self {
            source_id: INVALID_SOURCE_ID,
            start: INVALID_SOURCE_OFFSET,
            end: INVALID_SOURCE_OFFSET,
        }
    }
}

impl SourceLocation {
    /// Creates a location spanning `[start, end)`. A reversed range is
    /// normalised so that `start <= end`.
    #[inline]
    pub const fn new(source_id: SourceId, start: SourceOffset, end: SourceOffset) -> Self {
        if start <= end {
            Self {
                source_id,
                start,
                end,
            }
        } else {
            Self {
                source_id,
                start: end,
                end: start,
            }
        }
    }

    /// Creates an empty location at `offset`.
    #[inline]
    pub const fn at(source_id: SourceId, offset: SourceOffset) -> Self {
        Self::new(source_id, offset, offset)
    }

    /// Creates a location from `usize` offsets, clamping them to the
    /// representable range.
    pub fn from_offsets(source_id: SourceId, start: usize, end: usize) -> Self {
        let clamp = |v: usize| SourceOffset::try_from(v).unwrap_or(INVALID_SOURCE_OFFSET - 1);
        Self::new(source_id, clamp(start), clamp(end))
    }

    /// Returns true if both the source and the range are known.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.source_id != INVALID_SOURCE_ID
            && self.start != INVALID_SOURCE_OFFSET
            && self.end != INVALID_SOURCE_OFFSET
    }

    #[inline]
    pub const fn source_id(&self) -> SourceId {
        self.source_id
    }

    #[inline]
    pub const fn start(&self) -> SourceOffset {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> SourceOffset {
        self.end
    }

    /// Length of the range in bytes, zero for invalid locations.
    #[inline]
    pub const fn length(&self) -> SourceOffset {
        if self.is_valid() {
            self.end - self.start
        } else {
            0
        }
    }

    /// Returns a location covering both `self` and `other`. If only one of
    /// them is valid (or they live in different sources) that one wins.
    pub fn merge(&self, other: &SourceLocation) -> SourceLocation {
        match (self.is_valid(), other.is_valid()) {
            (true, true) if self.source_id == other.source_id => SourceLocation::new(
                self.source_id,
                self.start.min(other.start),
                self.end.max(other.end),
            ),
            (true, _) => *self,
            (false, _) => *other,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}-{}", self.source_id, self.start, self.end)
        } else {
            write!(f, "<unknown>")
        }
    }
}

/// Human readable description of a [`SourceLocation`].
///
/// Lines and columns are 1-based; a line of zero means the position is
/// unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceContext {
    /// Name of the file the location refers to, may be empty.
    pub filename: String,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    /// Excerpt of the line the location starts in.
    pub text: String,
    /// Byte offset of the location start relative to `text`.
    pub rel_pos: usize,
    /// Length of the highlighted range inside `text`.
    pub rel_len: usize,
    /// The excerpt was cut at its start.
    pub truncated_start: bool,
    /// The excerpt was cut at its end.
    pub truncated_end: bool,
}

impl SourceContext {
    /// Returns true if at least the start line is known.
    pub fn is_valid(&self) -> bool {
        self.start_line > 0
    }

    pub fn has_file(&self) -> bool {
        !self.filename.is_empty()
    }

    /// Returns true if the context contains an excerpt of the source.
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_file() {
            write!(f, "{}", self.filename)?;
            if self.is_valid() {
                write!(f, ":")?;
            }
        }
        if self.is_valid() {
            write!(f, "{}:{}", self.start_line, self.start_column)?;
        }
        Ok(())
    }
}

/// Callback turning a location into a context.
pub type SourceContextCallback = Box<dyn Fn(&SourceLocation) -> SourceContext>;

/// Context callback which knows nothing about any source.
pub fn null_source_context_callback() -> SourceContextCallback {
    Box::new(|_| SourceContext::default())
}

/// Computes [`SourceContext`]s for a source held in memory.
#[derive(Debug, Clone)]
pub struct TextSourceContext {
    filename: String,
    text: String,
    line_starts: Vec<usize>,
}

impl TextSourceContext {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        let mut iter = memchr::memchr2_iter(b'\n', b'\r', bytes);
        while let Some(pos) = iter.next() {
            // "\r\n" and "\n\r" count as a single break
            let mut next = pos + 1;
            if next < bytes.len()
                && matches!(bytes[next], b'\n' | b'\r')
                && bytes[next] != bytes[pos]
            {
                next += 1;
                iter.next();
            }
            line_starts.push(next);
        }
        Self {
            filename: filename.into(),
            text,
            line_starts,
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }

    fn column_of(&self, line: usize, offset: usize) -> usize {
        let start = self.line_starts[line];
        let end = offset.min(self.text.len());
        self.text
            .get(start..end)
            .map(|s| s.chars().count())
            .unwrap_or(end - start)
            + 1
    }

    fn line_end(&self, line: usize) -> usize {
        let start = self.line_starts[line];
        let rest = &self.text.as_bytes()[start..];
        start + memchr::memchr2(b'\n', b'\r', rest).unwrap_or(rest.len())
    }

    /// Builds the context of `loc`, keeping the excerpt at most
    /// `max_context` bytes long.
    pub fn context(&self, loc: &SourceLocation, max_context: usize) -> SourceContext {
        if !loc.is_valid() {
            return SourceContext {
                filename: self.filename.clone(),
                ..SourceContext::default()
            };
        }
        let start = (loc.start() as usize).min(self.text.len());
        let end = (loc.end() as usize).min(self.text.len());
        let start_line = self.line_of(start);
        let end_line = self.line_of(end);

        let line_start = self.line_starts[start_line];
        let line_end = self.line_end(start_line);
        let mut from = line_start;
        let mut to = line_end;
        if to - from > max_context {
            let half = max_context / 2;
            from = start.saturating_sub(half).max(line_start);
            to = (from + max_context).min(line_end);
        }
        while from > line_start && !self.text.is_char_boundary(from) {
            from -= 1;
        }
        while to < line_end && !self.text.is_char_boundary(to) {
            to += 1;
        }
        let rel_pos = start - from;
        SourceContext {
            filename: self.filename.clone(),
            start_line: start_line + 1,
            start_column: self.column_of(start_line, start),
            end_line: end_line + 1,
            end_column: self.column_of(end_line, end),
            text: self.text[from..to].to_string(),
            rel_pos,
            rel_len: end.min(to).saturating_sub(start),
            truncated_start: from > line_start,
            truncated_end: to < line_end,
        }
    }

    /// Wraps this source into a callback usable by loggers.
    pub fn into_callback(self, max_context: usize) -> SourceContextCallback {
        Box::new(move |loc| self.context(loc, max_context))
    }
}
