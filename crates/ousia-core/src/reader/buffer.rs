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

//! Chunked byte buffer with multiple independent cursors.
//!
//! Input is pulled from a source callback in chunks of `chunk_size` bytes
//! and kept in a deque of buckets. Every cursor can move back by at least
//! `lookback` bytes from wherever it stands; the oldest bucket is recycled
//! as soon as no cursor needs it for that guarantee anymore.

use std::collections::VecDeque;
use std::fmt;
use std::io::Read;

use slotmap::{new_key_type, SlotMap};

use crate::limits::Limits;

new_key_type! {
    /// Handle of a cursor inside a [`Buffer`].
    pub struct CursorId;
}

/// Callback filling a byte slice with input and returning the number of
/// bytes written. Zero signals the end of the input.
pub type ReadCallback = Box<dyn FnMut(&mut [u8]) -> usize>;

struct Bucket {
    data: Vec<u8>,
    /// Absolute offset of the first byte in `data`.
    start: usize,
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    bucket: usize,
    offs: usize,
}

pub struct Buffer {
    buckets: VecDeque<Bucket>,
    cursors: SlotMap<CursorId, Cursor>,
    callback: Option<ReadCallback>,
    reached_end: bool,
    chunk_size: usize,
    lookback: usize,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("buckets", &self.buckets.len())
            .field("cursors", &self.cursors.len())
            .field("reached_end", &self.reached_end)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl Buffer {
    /// Creates a buffer pulling its input from `callback`.
    pub fn from_callback(callback: ReadCallback, limits: &Limits) -> Self {
        Self {
            buckets: VecDeque::from([Bucket {
                data: Vec::new(),
                start: 0,
            }]),
            cursors: SlotMap::with_key(),
            callback: Some(callback),
            reached_end: false,
            chunk_size: limits.chunk_size.max(1),
            lookback: limits.lookback,
        }
    }

    /// Creates a buffer over a fixed byte string.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let limits = Limits::default();
        Self {
            buckets: VecDeque::from([Bucket {
                data: bytes.into(),
                start: 0,
            }]),
            cursors: SlotMap::with_key(),
            callback: None,
            reached_end: true,
            chunk_size: limits.chunk_size,
            lookback: limits.lookback,
        }
    }

    /// Creates a buffer pulling from an [`std::io::Read`] implementation.
    /// Read errors are reported through `tracing` and end the input.
    pub fn from_read<R: Read + 'static>(mut input: R, limits: &Limits) -> Self {
        Self::from_callback(
            Box::new(move |buf| loop {
                match input.read(buf) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "input read failed");
                        break 0;
                    }
                }
            }),
            limits,
        )
    }

    /// Creates a cursor at the oldest byte still held.
    pub fn create_cursor(&mut self) -> CursorId {
        self.cursors.insert(Cursor { bucket: 0, offs: 0 })
    }

    /// Creates a cursor at the position of `other`.
    pub fn create_cursor_from(&mut self, other: CursorId) -> CursorId {
        let cursor = self.cursors.get(other).copied().unwrap_or(Cursor { bucket: 0, offs: 0 });
        self.cursors.insert(cursor)
    }

    pub fn delete_cursor(&mut self, cursor: CursorId) {
        self.cursors.remove(cursor);
    }

    /// Moves `dst` to the position of `src`.
    pub fn copy_cursor(&mut self, src: CursorId, dst: CursorId) {
        if let Some(c) = self.cursors.get(src).copied() {
            if let Some(d) = self.cursors.get_mut(dst) {
                *d = c;
            }
        }
    }

    /// Absolute offset of a cursor.
    pub fn offset(&self, cursor: CursorId) -> usize {
        self.cursors
            .get(cursor)
            .map(|c| self.buckets[c.bucket].start + c.offs)
            .unwrap_or(0)
    }

    /// Returns true if no more bytes can be read at `cursor`.
    pub fn at_end(&mut self, cursor: CursorId) -> bool {
        !self.ensure_data(cursor)
    }

    /// Reads the byte at `cursor` and advances it.
    pub fn read(&mut self, cursor: CursorId) -> Option<u8> {
        if !self.ensure_data(cursor) {
            return None;
        }
        let c = self.cursors.get_mut(cursor)?;
        let byte = self.buckets[c.bucket].data[c.offs];
        c.offs += 1;
        Some(byte)
    }

    /// Returns the byte at `cursor` without advancing.
    pub fn fetch(&mut self, cursor: CursorId) -> Option<u8> {
        if !self.ensure_data(cursor) {
            return None;
        }
        let c = self.cursors.get(cursor)?;
        Some(self.buckets[c.bucket].data[c.offs])
    }

    /// Moves a cursor by `delta` bytes and returns the distance actually
    /// moved. Moving forward stops at the end of input, moving backward at
    /// the oldest byte still held.
    pub fn move_cursor(&mut self, cursor: CursorId, delta: isize) -> isize {
        if delta >= 0 {
            let mut moved = 0;
            while moved < delta {
                if !self.ensure_data(cursor) {
                    break;
                }
                let Some(c) = self.cursors.get_mut(cursor) else {
                    break;
                };
                let available = self.buckets[c.bucket].data.len() - c.offs;
                let step = available.min((delta - moved) as usize);
                c.offs += step;
                moved += step as isize;
            }
            moved
        } else {
            let Some(c) = self.cursors.get_mut(cursor) else {
                return 0;
            };
            let mut remaining = delta.unsigned_abs();
            let mut moved = 0usize;
            loop {
                let step = remaining.min(c.offs);
                c.offs -= step;
                remaining -= step;
                moved += step;
                if remaining == 0 || c.bucket == 0 {
                    break;
                }
                c.bucket -= 1;
                c.offs = self.buckets[c.bucket].data.len();
            }
            -(moved as isize)
        }
    }

    /// Makes sure a byte is available at `cursor`, pulling new chunks from
    /// the source when needed.
    fn ensure_data(&mut self, cursor: CursorId) -> bool {
        loop {
            let Some(c) = self.cursors.get_mut(cursor) else {
                return false;
            };
            if c.offs < self.buckets[c.bucket].data.len() {
                return true;
            }
            if c.bucket + 1 < self.buckets.len() {
                c.bucket += 1;
                c.offs = 0;
                continue;
            }
            if !self.next_bucket() {
                return false;
            }
        }
    }

    /// The front bucket may be recycled if every cursor keeps at least
    /// `lookback` bytes of history without it.
    fn can_recycle_front(&self) -> bool {
        if self.buckets.len() < 2 {
            return false;
        }
        let second_start = self.buckets[1].start;
        self.cursors.values().all(|c| {
            c.bucket > 0 && self.buckets[c.bucket].start + c.offs >= second_start + self.lookback
        })
    }

    fn next_bucket(&mut self) -> bool {
        if self.reached_end || self.callback.is_none() {
            self.reached_end = true;
            return false;
        }
        let mut data = Vec::new();
        if self.can_recycle_front() {
            if let Some(front) = self.buckets.pop_front() {
                for c in self.cursors.values_mut() {
                    c.bucket -= 1;
                }
                data = front.data;
            }
        }
        data.clear();
        data.resize(self.chunk_size, 0);
        let n = match self.callback.as_mut() {
            Some(callback) => callback(&mut data).min(self.chunk_size),
            None => 0,
        };
        if n == 0 {
            self.reached_end = true;
            return false;
        }
        data.truncate(n);
        let start = self
            .buckets
            .back()
            .map(|b| b.start + b.data.len())
            .unwrap_or(0);
        self.buckets.push_back(Bucket { data, start });
        true
    }

    /// Number of buckets currently held.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Offset of the oldest byte still held.
    pub fn first_offset(&self) -> usize {
        self.buckets.front().map(|b| b.start).unwrap_or(0)
    }
}
