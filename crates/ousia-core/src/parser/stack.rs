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

//! The stack of running handlers.
//!
//! Format parsers report commands, data and tokens to a
//! [`ParserStateStack`], which dispatches commands to states and forwards
//! everything else to the handler on top.

use crate::error::{LoggableException, OusiaResult};
use crate::limits::Limits;
use crate::location::SourceLocation;
use crate::logger::LoggerExt;
use crate::variant::{Variant, VariantMap};

use super::context::ParserContext;
use super::deductor::ParserStateDeductor;
use super::state::{DefaultHandler, Handler, HandlerConstructor, HandlerData, ParserStates, StateId};

struct StackEntry {
    handler: Box<dyn Handler>,
    state: StateId,
    valid: bool,
}

/// Dispatches parser events to handlers.
pub struct ParserStateStack {
    states: ParserStates,
    stack: Vec<StackEntry>,
    max_depth: usize,
}

impl ParserStateStack {
    pub fn new(states: ParserStates) -> Self {
        Self::with_limits(states, &Limits::default())
    }

    pub fn with_limits(states: ParserStates, limits: &Limits) -> Self {
        Self {
            states,
            stack: Vec::new(),
            max_depth: limits.max_stack_depth,
        }
    }

    pub fn states(&self) -> &ParserStates {
        &self.states
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// State on top of the stack, or [`ParserStates::NONE`].
    pub fn current_state(&self) -> StateId {
        self.stack.last().map_or(ParserStates::NONE, |e| e.state)
    }

    /// Name of the command on top of the stack.
    pub fn current_command_name(&self) -> Option<&str> {
        self.stack.last().map(|e| e.handler.name())
    }

    /// Whether the handler on top of the stack accepted its start.
    pub fn is_valid(&self) -> bool {
        self.stack.last().map_or(false, |e| e.valid)
    }

    /// Commands that may be started in the current state.
    pub fn expected_commands(&self) -> Vec<String> {
        self.states.expected_commands(self.current_state())
    }

    /// Target state and constructor for `name`. The flag is false if the
    /// command falls back to the child handler of the current state.
    fn find_target(&self, name: &str) -> Option<(StateId, HandlerConstructor)> {
        let current = self.current_state();
        if let Some((id, state)) = self
            .states
            .by_name(name)
            .find(|(_, s)| s.accepts_parent(current))
        {
            return Some((id, state.element_handler().unwrap_or(DefaultHandler::create)));
        }
        let child = self.states.get(current)?.child_handler()?;
        Some((current, child))
    }

    /// Starts the command `name`.
    ///
    /// Fails if no state accepts the command here. Argument problems are
    /// logged; the handler is pushed anyway. A handler whose start fails, or
    /// whose parent is invalid, stays on the stack as invalid so that the
    /// paired [`end`](Self::end) still pops it.
    pub fn start(
        &mut self,
        ctx: &mut ParserContext<'_>,
        name: &str,
        args: &mut VariantMap,
        location: SourceLocation,
    ) -> OusiaResult<()> {
        let Some((state, ctor)) = self.find_target(name) else {
            let expected = self.expected_commands();
            let message = if expected.is_empty() {
                format!("Unexpected command \"{name}\", expected no command here")
            } else {
                format!(
                    "Unexpected command \"{name}\", expected one of {}",
                    expected
                        .iter()
                        .map(|e| format!("\"{e}\""))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            return Err(LoggableException::invalid_command(message).with_location(location));
        };
        if self.stack.len() >= self.max_depth {
            return Err(LoggableException::invalid_command(format!(
                "Maximum nesting depth of {} exceeded",
                self.max_depth
            ))
            .with_location(location));
        }

        // A child handler runs in the current state, so its arguments are
        // checked against that state's signature.
        if let Some(target) = self.states.get(state) {
            target.arguments().validate_map(args, ctx.logger, true);
        }

        let parent_valid = self.stack.last().map_or(true, |e| e.valid);
        let mut handler = ctor(HandlerData {
            name: name.to_string(),
            state,
            location,
        });
        let valid = parent_valid && handler.start(ctx, args);
        tracing::debug!(command = name, depth = self.stack.len() + 1, valid, "start");
        self.stack.push(StackEntry {
            handler,
            state,
            valid,
        });
        Ok(())
    }

    /// Ends the command on top of the stack.
    pub fn end(&mut self, ctx: &mut ParserContext<'_>) -> OusiaResult<()> {
        let Some(mut entry) = self.stack.pop() else {
            return Err(LoggableException::invalid_command("No command here to end"));
        };
        if entry.valid {
            entry.handler.end(ctx);
        }
        tracing::debug!(command = entry.handler.name(), depth = self.stack.len(), "end");
        Ok(())
    }

    fn top(&mut self, what: &str) -> OusiaResult<Option<&mut Box<dyn Handler>>> {
        match self.stack.last_mut() {
            None => Err(LoggableException::invalid_command(format!(
                "No command to receive {what}"
            ))),
            Some(entry) if entry.valid => Ok(Some(&mut entry.handler)),
            Some(_) => Ok(None),
        }
    }

    /// Character data for field `field` of the top handler. Returns
    /// false if the handler is invalid or rejected the data.
    pub fn data(&mut self, ctx: &mut ParserContext<'_>, data: &Variant, field: usize) -> OusiaResult<bool> {
        Ok(self
            .top("data")?
            .map_or(false, |h| h.data(ctx, data, field)))
    }

    pub fn field_start(&mut self, ctx: &mut ParserContext<'_>, is_default: bool, field: usize) -> OusiaResult<bool> {
        Ok(self
            .top("a field")?
            .map_or(false, |h| h.field_start(ctx, is_default, field)))
    }

    pub fn field_end(&mut self, ctx: &mut ParserContext<'_>) -> OusiaResult<()> {
        if let Some(h) = self.top("a field end")? {
            h.field_end(ctx);
        }
        Ok(())
    }

    pub fn annotation_start(
        &mut self,
        ctx: &mut ParserContext<'_>,
        class_name: &str,
        args: &mut VariantMap,
    ) -> OusiaResult<bool> {
        Ok(self
            .top("an annotation")?
            .map_or(false, |h| h.annotation_start(ctx, class_name, args)))
    }

    pub fn annotation_end(
        &mut self,
        ctx: &mut ParserContext<'_>,
        class_name: &str,
        element_name: &str,
    ) -> OusiaResult<bool> {
        Ok(self
            .top("an annotation end")?
            .map_or(false, |h| h.annotation_end(ctx, class_name, element_name)))
    }

    pub fn token(&mut self, ctx: &mut ParserContext<'_>, token: &Variant) -> OusiaResult<bool> {
        Ok(self
            .top("a token")?
            .map_or(false, |h| h.token(ctx, token)))
    }

    /// Pushes a default handler for the state matching the node types on
    /// the scope stack. Logs an error and returns false unless exactly one
    /// state matches.
    pub fn deduce(&mut self, ctx: &mut ParserContext<'_>) -> bool {
        let signature = ctx.scope.type_signature(ctx.manager);
        let candidates = ParserStateDeductor::new(signature, &self.states).deduce();
        if let [state] = *candidates.as_slice() {
            let name = self
                .states
                .get(state)
                .map(|s| s.name().to_string())
                .unwrap_or_default();
            tracing::debug!(command = %name, "deduced parser state");
            self.stack.push(StackEntry {
                handler: DefaultHandler::create(HandlerData {
                    name,
                    state,
                    location: SourceLocation::default(),
                }),
                state,
                valid: true,
            });
            return true;
        }
        ctx.logger.error("Cannot deduce parser state", SourceLocation::default());
        for id in candidates {
            if let Some(state) = self.states.get(id) {
                ctx.logger.note(
                    format!("Possible state: \"{}\"", state.name()),
                    SourceLocation::default(),
                );
            }
        }
        false
    }
}
