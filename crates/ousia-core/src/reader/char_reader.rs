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

//! Character reader on top of [`Buffer`].
//!
//! A [`CharReader`] owns two cursors into a shared buffer: the read cursor
//! and the peek cursor. Peeking advances only the peek cursor, so parsers
//! can look ahead and then either consume what they peeked or reset.
//! `"\r\n"`, `"\n\r"` and lone `'\r'` are normalised to a single `'\n'`.
//!
//! # Examples
//!
//! ```
//! use ousia_core::CharReader;
//!
//! let mut reader = CharReader::new("ab\r\nc", 0);
//! assert_eq!(reader.peek(), Some(b'a'));
//! assert_eq!(reader.peek(), Some(b'b'));
//! reader.reset_peek();
//! assert_eq!(reader.read(), Some(b'a'));
//! assert_eq!(reader.read(), Some(b'b'));
//! assert_eq!(reader.read(), Some(b'\n'));
//! assert_eq!(reader.line(), 2);
//! ```

use std::cell::RefCell;
use std::io::Read;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use super::buffer::{Buffer, CursorId, ReadCallback};
use crate::limits::Limits;
use crate::location::{SourceId, SourceLocation};

/// Excerpt of the line around the read cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderContext {
    pub text: String,
    /// Byte offset of the read cursor inside `text`.
    pub rel_pos: usize,
    pub truncated_start: bool,
    pub truncated_end: bool,
}

/// Returns true for the whitespace characters recognised by all readers.
#[inline]
pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

#[inline]
fn is_line_break(c: u8) -> bool {
    c == b'\n' || c == b'\r'
}

pub struct CharReader {
    buffer: Rc<RefCell<Buffer>>,
    read_cursor: CursorId,
    peek_cursor: CursorId,
    /// Peek cursor sits on the read cursor.
    coherent: bool,
    source_id: SourceId,
    line: usize,
    column: usize,
}

impl std::fmt::Debug for CharReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharReader")
            .field("offset", &self.offset())
            .field("line", &self.line)
            .field("column", &self.column)
            .field("coherent", &self.coherent)
            .finish()
    }
}

impl CharReader {
    /// Creates a reader over a string held in memory.
    pub fn new(text: impl Into<String>, source_id: SourceId) -> Self {
        Self::with_buffer(
            Rc::new(RefCell::new(Buffer::from_bytes(text.into().into_bytes()))),
            source_id,
        )
    }

    /// Creates a reader pulling its input from a callback.
    pub fn from_callback(callback: ReadCallback, source_id: SourceId, limits: &Limits) -> Self {
        Self::with_buffer(
            Rc::new(RefCell::new(Buffer::from_callback(callback, limits))),
            source_id,
        )
    }

    /// Creates a reader over any [`Read`] implementation.
    pub fn from_read<R: Read + 'static>(input: R, source_id: SourceId, limits: &Limits) -> Self {
        Self::with_buffer(
            Rc::new(RefCell::new(Buffer::from_read(input, limits))),
            source_id,
        )
    }

    fn with_buffer(buffer: Rc<RefCell<Buffer>>, source_id: SourceId) -> Self {
        let (read_cursor, peek_cursor) = {
            let mut b = buffer.borrow_mut();
            (b.create_cursor(), b.create_cursor())
        };
        Self {
            buffer,
            read_cursor,
            peek_cursor,
            coherent: true,
            source_id,
            line: 1,
            column: 1,
        }
    }

    /// Reads one normalised character at `cursor`.
    fn read_at(buffer: &mut Buffer, cursor: CursorId) -> Option<u8> {
        let c = buffer.read(cursor)?;
        if is_line_break(c) {
            if let Some(next) = buffer.fetch(cursor) {
                if is_line_break(next) && next != c {
                    buffer.read(cursor);
                }
            }
            return Some(b'\n');
        }
        Some(c)
    }

    fn advance_position(&mut self, c: u8) {
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else if c & 0xC0 != 0x80 {
            // UTF-8 continuation bytes do not start a new column
            self.column += 1;
        }
    }

    /// Reads the next character and advances the read cursor.
    pub fn read(&mut self) -> Option<u8> {
        let c = {
            let mut buffer = self.buffer.borrow_mut();
            let c = Self::read_at(&mut buffer, self.read_cursor);
            if self.coherent {
                buffer.copy_cursor(self.read_cursor, self.peek_cursor);
            } else if buffer.offset(self.peek_cursor) <= buffer.offset(self.read_cursor) {
                buffer.copy_cursor(self.read_cursor, self.peek_cursor);
                self.coherent = true;
            }
            c
        }?;
        self.advance_position(c);
        Some(c)
    }

    /// Reads the next character at the peek cursor.
    pub fn peek(&mut self) -> Option<u8> {
        let c = Self::read_at(&mut self.buffer.borrow_mut(), self.peek_cursor);
        if c.is_some() {
            self.coherent = false;
        }
        c
    }

    /// Moves the peek cursor back to the read cursor.
    pub fn reset_peek(&mut self) {
        if !self.coherent {
            self.buffer
                .borrow_mut()
                .copy_cursor(self.read_cursor, self.peek_cursor);
            self.coherent = true;
        }
    }

    /// Moves the read cursor forward to the peek cursor.
    pub fn consume_peek(&mut self) {
        if self.coherent {
            return;
        }
        let target = self.buffer.borrow().offset(self.peek_cursor);
        while self.offset() < target {
            let c = Self::read_at(&mut self.buffer.borrow_mut(), self.read_cursor);
            match c {
                Some(c) => self.advance_position(c),
                None => break,
            }
        }
        self.coherent = true;
    }

    /// Skips whitespace. Returns true if at least one character remains.
    pub fn consume_whitespace(&mut self) -> bool {
        self.reset_peek();
        loop {
            match self.peek() {
                Some(c) if is_whitespace(c) => self.consume_peek(),
                Some(_) => {
                    self.reset_peek();
                    return true;
                }
                None => {
                    self.reset_peek();
                    return false;
                }
            }
        }
    }

    /// Reads raw bytes without line-break normalisation into `buf`.
    /// Returns the number of bytes read.
    pub fn read_raw(&mut self, buf: &mut [u8]) -> usize {
        let mut n = 0;
        while n < buf.len() {
            let c = self.buffer.borrow_mut().read(self.read_cursor);
            match c {
                Some(c) => {
                    buf[n] = c;
                    n += 1;
                    self.advance_position(c);
                }
                None => break,
            }
        }
        self.buffer
            .borrow_mut()
            .copy_cursor(self.read_cursor, self.peek_cursor);
        self.coherent = true;
        n
    }

    /// Returns true once the read cursor has consumed all input.
    pub fn at_end(&self) -> bool {
        self.buffer.borrow_mut().at_end(self.read_cursor)
    }

    /// Byte offset of the read cursor.
    pub fn offset(&self) -> usize {
        self.buffer.borrow().offset(self.read_cursor)
    }

    /// Byte offset of the peek cursor.
    pub fn peek_offset(&self) -> usize {
        self.buffer.borrow().offset(self.peek_cursor)
    }

    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// Current line of the read cursor (1-based).
    pub fn line(&self) -> usize {
        self.line
    }

    /// Current column of the read cursor (1-based, counted in characters).
    pub fn column(&self) -> usize {
        self.column
    }

    /// Location of the single position at the read cursor.
    pub fn location(&self) -> SourceLocation {
        SourceLocation::from_offsets(self.source_id, self.offset(), self.offset())
    }

    /// Location spanning from `start` to the read cursor.
    pub fn location_from(&self, start: usize) -> SourceLocation {
        SourceLocation::from_offsets(self.source_id, start, self.offset())
    }

    /// Returns the line around the read cursor, at most `max_size` bytes.
    pub fn get_context(&self, max_size: usize) -> ReaderContext {
        let mut buffer = self.buffer.borrow_mut();
        let cur = buffer.create_cursor_from(self.read_cursor);
        let pos = buffer.offset(cur);
        let moved = buffer.move_cursor(cur, -(max_size.min(isize::MAX as usize) as isize));
        let back = moved.unsigned_abs();
        let mut before = Vec::with_capacity(back);
        for _ in 0..back {
            if let Some(b) = buffer.read(cur) {
                before.push(b);
            }
        }
        let line_start = memchr::memrchr2(b'\n', b'\r', &before).map(|p| p + 1);
        let truncated_start = line_start.is_none() && pos > back;
        let prefix = &before[line_start.unwrap_or(0)..];

        let mut after = Vec::new();
        let mut truncated_end = false;
        loop {
            if prefix.len() + after.len() >= max_size {
                truncated_end = buffer.fetch(cur).map_or(false, |b| !is_line_break(b));
                break;
            }
            match buffer.read(cur) {
                Some(b) if !is_line_break(b) => after.push(b),
                _ => break,
            }
        }
        buffer.delete_cursor(cur);

        let rel_pos = prefix.len();
        let mut bytes = prefix.to_vec();
        bytes.extend_from_slice(&after);
        ReaderContext {
            text: String::from_utf8_lossy(&bytes).into_owned(),
            rel_pos,
            truncated_start,
            truncated_end,
        }
    }

    /// Creates a fork sharing this reader's buffer and positions.
    pub fn fork(&self) -> CharReaderFork {
        let (read_cursor, peek_cursor) = {
            let mut b = self.buffer.borrow_mut();
            (
                b.create_cursor_from(self.read_cursor),
                b.create_cursor_from(self.peek_cursor),
            )
        };
        CharReaderFork {
            reader: CharReader {
                buffer: Rc::clone(&self.buffer),
                read_cursor,
                peek_cursor,
                coherent: self.coherent,
                source_id: self.source_id,
                line: self.line,
                column: self.column,
            },
        }
    }
}

impl Drop for CharReader {
    fn drop(&mut self) {
        if let Ok(mut buffer) = self.buffer.try_borrow_mut() {
            buffer.delete_cursor(self.read_cursor);
            buffer.delete_cursor(self.peek_cursor);
        }
    }
}

/// A speculative copy of a [`CharReader`].
///
/// The fork reads independently of its parent; [`CharReaderFork::commit`]
/// moves the parent to the position the fork reached.
#[derive(Debug)]
pub struct CharReaderFork {
    reader: CharReader,
}

impl CharReaderFork {
    /// Moves `parent` to the positions of this fork.
    pub fn commit(self, parent: &mut CharReader) {
        {
            let mut buffer = parent.buffer.borrow_mut();
            buffer.copy_cursor(self.reader.read_cursor, parent.read_cursor);
            buffer.copy_cursor(self.reader.peek_cursor, parent.peek_cursor);
        }
        parent.coherent = self.reader.coherent;
        parent.line = self.reader.line;
        parent.column = self.reader.column;
    }
}

impl Deref for CharReaderFork {
    type Target = CharReader;

    fn deref(&self) -> &CharReader {
        &self.reader
    }
}

impl DerefMut for CharReaderFork {
    fn deref_mut(&mut self) -> &mut CharReader {
        &mut self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_string(reader: &mut CharReader) -> String {
        let mut out = Vec::new();
        while let Some(c) = reader.read() {
            out.push(c);
        }
        String::from_utf8(out).unwrap()
    }

    fn chunked(text: &'static str, chunk_size: usize) -> CharReader {
        let bytes = text.as_bytes();
        let mut pos = 0;
        let limits = Limits {
            chunk_size,
            lookback: 4,
            ..Limits::default()
        };
        CharReader::from_callback(
            Box::new(move |buf| {
                let n = buf.len().min(bytes.len() - pos);
                buf[..n].copy_from_slice(&bytes[pos..pos + n]);
                pos += n;
                n
            }),
            0,
            &limits,
        )
    }

    // ==================== Line break tests ====================

    #[test]
    fn test_line_break_normalisation() {
        let mut reader = CharReader::new("a\r\nb\n\rc\rd\ne", 0);
        assert_eq!(read_string(&mut reader), "a\nb\nc\nd\ne");
        assert_eq!(reader.line(), 5);
    }

    #[test]
    fn test_double_newline_not_merged() {
        let mut reader = CharReader::new("a\n\nb", 0);
        assert_eq!(read_string(&mut reader), "a\n\nb");
    }

    #[test]
    fn test_line_break_across_chunks() {
        let mut reader = chunked("ab\r\ncd", 3);
        assert_eq!(read_string(&mut reader), "ab\ncd");
    }

    #[test]
    fn test_column_counts_characters() {
        let mut reader = CharReader::new("äb\nc", 0);
        reader.read();
        reader.read();
        assert_eq!(reader.column(), 2);
        reader.read();
        assert_eq!(reader.column(), 3);
        reader.read();
        assert_eq!((reader.line(), reader.column()), (2, 1));
    }

    // ==================== Peek tests ====================

    #[test]
    fn test_peek_and_reset() {
        let mut reader = CharReader::new("xyz", 0);
        assert_eq!(reader.peek(), Some(b'x'));
        assert_eq!(reader.peek(), Some(b'y'));
        assert_eq!(reader.offset(), 0);
        reader.reset_peek();
        assert_eq!(reader.peek(), Some(b'x'));
        reader.reset_peek();
        assert_eq!(reader.read(), Some(b'x'));
    }

    #[test]
    fn test_consume_peek() {
        let mut reader = CharReader::new("a\nbc", 0);
        reader.peek();
        reader.peek();
        reader.peek();
        reader.consume_peek();
        assert_eq!(reader.offset(), 3);
        assert_eq!(reader.line(), 2);
        assert_eq!(reader.column(), 2);
        assert_eq!(reader.read(), Some(b'c'));
    }

    #[test]
    fn test_read_catches_up_with_peek() {
        let mut reader = CharReader::new("abc", 0);
        reader.peek();
        reader.read();
        reader.read();
        assert_eq!(reader.peek(), Some(b'c'));
    }

    #[test]
    fn test_consume_whitespace() {
        let mut reader = CharReader::new(" \t\n\x0b x", 0);
        assert!(reader.consume_whitespace());
        assert_eq!(reader.read(), Some(b'x'));
        assert!(!reader.consume_whitespace());
        assert!(reader.at_end());
    }

    #[test]
    fn test_read_raw_keeps_line_breaks() {
        let mut reader = CharReader::new("a\r\nb", 0);
        let mut buf = [0u8; 8];
        assert_eq!(reader.read_raw(&mut buf), 4);
        assert_eq!(&buf[..4], b"a\r\nb");
    }

    // ==================== Fork tests ====================

    #[test]
    fn test_fork_is_independent() {
        let mut reader = CharReader::new("hello", 0);
        reader.read();
        {
            let mut fork = reader.fork();
            assert_eq!(fork.read(), Some(b'e'));
            assert_eq!(fork.read(), Some(b'l'));
        }
        assert_eq!(reader.read(), Some(b'e'));
    }

    #[test]
    fn test_fork_commit() {
        let mut reader = CharReader::new("ab\ncd", 0);
        let mut fork = reader.fork();
        for _ in 0..4 {
            fork.read();
        }
        fork.commit(&mut reader);
        assert_eq!(reader.offset(), 4);
        assert_eq!(reader.line(), 2);
        assert_eq!(reader.read(), Some(b'd'));
    }

    #[test]
    fn test_nested_fork() {
        let mut reader = CharReader::new("abc", 0);
        let mut outer = reader.fork();
        outer.read();
        let mut inner = outer.fork();
        inner.read();
        inner.commit(&mut outer);
        outer.commit(&mut reader);
        assert_eq!(reader.read(), Some(b'c'));
    }

    // ==================== Context tests ====================

    #[test]
    fn test_get_context() {
        let mut reader = CharReader::new("first line\nsecond line\nthird", 0);
        for _ in 0..18 {
            reader.read();
        }
        let ctx = reader.get_context(80);
        assert_eq!(ctx.text, "second line");
        assert_eq!(ctx.rel_pos, 7);
        assert!(!ctx.truncated_start);
        assert!(!ctx.truncated_end);
    }

    #[test]
    fn test_get_context_truncated() {
        let mut reader = CharReader::new("0123456789abcdefghij", 0);
        for _ in 0..10 {
            reader.read();
        }
        let ctx = reader.get_context(6);
        assert_eq!(ctx.text, "456789");
        assert_eq!(ctx.rel_pos, 6);
        assert!(ctx.truncated_start);
        assert!(ctx.truncated_end);
        assert_eq!(reader.read(), Some(b'a'));
    }

    #[test]
    fn test_location() {
        let mut reader = CharReader::new("abc", 7);
        reader.read();
        let loc = reader.location_from(0);
        assert_eq!(loc.source_id(), 7);
        assert_eq!((loc.start(), loc.end()), (0, 1));
    }
}
