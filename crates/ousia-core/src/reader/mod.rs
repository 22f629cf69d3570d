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

//! Byte buffering and character reading.
//!
//! [`Buffer`] pulls input in chunks and hands out cursors; [`CharReader`]
//! builds a line-break normalising character stream with lookahead and
//! forking on top of it.

mod buffer;
mod char_reader;

pub use buffer::{Buffer, CursorId, ReadCallback};
pub use char_reader::{is_whitespace, CharReader, CharReaderFork, ReaderContext};
