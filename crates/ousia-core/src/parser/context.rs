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

//! Everything a handler may touch while a file is being parsed.

use crate::location::{SourceId, SourceLocation};
use crate::logger::Logger;
use crate::managed::{Manager, NodeId};
use crate::rtti::Rtti;

use super::callbacks::ParserStateCallbacks;
use super::scope::{ImposterCallback, ParserScope, ResolutionCallback};

/// Borrowed parse environment handed to every handler call.
///
/// The fields are public so handlers can split the borrows; the helper
/// methods cover the common combinations.
pub struct ParserContext<'a> {
    pub manager: &'a mut Manager,
    pub scope: &'a mut ParserScope,
    pub logger: &'a mut dyn Logger,
    pub callbacks: &'a mut dyn ParserStateCallbacks,
    pub project: NodeId,
    pub source_id: SourceId,
}

impl<'a> ParserContext<'a> {
    pub fn new(
        manager: &'a mut Manager,
        scope: &'a mut ParserScope,
        logger: &'a mut dyn Logger,
        callbacks: &'a mut dyn ParserStateCallbacks,
        project: NodeId,
        source_id: SourceId,
    ) -> Self {
        Self {
            manager,
            scope,
            logger,
            callbacks,
            project,
            source_id,
        }
    }

    /// Location inside the file being parsed.
    pub fn location(&self, start: usize, end: usize) -> SourceLocation {
        SourceLocation::from_offsets(self.source_id, start, end)
    }

    /// Closest node of type `ty` on the scope stack.
    pub fn select(&self, ty: &'static Rtti) -> Option<NodeId> {
        self.scope.select(self.manager, ty, None)
    }

    /// See [`ParserScope::resolve`].
    pub fn resolve<S: AsRef<str>>(
        &mut self,
        ty: &'static Rtti,
        path: &[S],
        imposter: Option<ImposterCallback>,
        callback: ResolutionCallback,
        location: SourceLocation,
    ) -> bool {
        self.scope
            .resolve(self.manager, ty, path, imposter, callback, location, self.logger)
    }

    /// See [`ParserScope::resolve_type`].
    pub fn resolve_type(&mut self, name: &str, callback: ResolutionCallback, location: SourceLocation) -> bool {
        self.scope
            .resolve_type(self.manager, name, callback, location, self.logger)
    }

    /// Retries every deferred reference; see
    /// [`ParserScope::perform_deferred_resolution`].
    pub fn perform_deferred_resolution(&mut self) -> bool {
        self.scope
            .perform_deferred_resolution(self.manager, self.logger)
    }
}
