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

//! Format-independent parsing infrastructure.
//!
//! A format parser turns its input into commands, data and tokens and
//! reports them to a [`ParserStateStack`]. Handlers build the node graph
//! through the [`ParserContext`] and use the [`ParserScope`] to find and
//! reference nodes.

mod callbacks;
mod context;
mod deductor;
mod scope;
mod stack;
mod state;

pub use callbacks::ParserStateCallbacks;
pub use context::ParserContext;
pub use deductor::ParserStateDeductor;
pub use scope::{
    split_path, DeferredResolution, ImposterCallback, ParserFlag, ParserScope, ResolutionCallback,
};
pub use stack::ParserStateStack;
pub use state::{
    DefaultHandler, Handler, HandlerConstructor, HandlerData, ParserState, ParserStateBuilder,
    ParserStates, StateId,
};
