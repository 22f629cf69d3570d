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

//! Parser states and the handlers instantiated for them.
//!
//! A [`ParserState`] names a command, the states it may appear under, the
//! arguments it takes and the node types its handler creates. States are
//! registered in a [`ParserStates`] table and referred to by [`StateId`].

use std::fmt;

use crate::argument::Arguments;
use crate::location::SourceLocation;
use crate::logger::LoggerExt;
use crate::rtti::Rtti;
use crate::variant::{Variant, VariantMap};

use super::context::ParserContext;

/// Index of a state in a [`ParserStates`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identity of a running handler.
#[derive(Debug, Clone)]
pub struct HandlerData {
    /// Command name the handler was started with.
    pub name: String,
    pub state: StateId,
    pub location: SourceLocation,
}

/// Creates the handler for a state.
pub type HandlerConstructor = fn(HandlerData) -> Box<dyn Handler>;

/// Receives the events of one element.
///
/// Every event has a default implementation; events a handler does not
/// expect are reported through the logger and answered with `false`.
pub trait Handler {
    fn handler_data(&self) -> &HandlerData;

    fn name(&self) -> &str {
        &self.handler_data().name
    }

    fn location(&self) -> SourceLocation {
        self.handler_data().location
    }

    /// Called once after the handler was pushed. Returning false marks the
    /// handler as invalid; it receives no further events.
    fn start(&mut self, _ctx: &mut ParserContext<'_>, _args: &mut VariantMap) -> bool {
        true
    }

    /// Called when the element is closed.
    fn end(&mut self, _ctx: &mut ParserContext<'_>) {}

    /// Character data for the field with index `field`.
    fn data(&mut self, ctx: &mut ParserContext<'_>, _data: &Variant, _field: usize) -> bool {
        ctx.logger.error("Did not expect any data here", self.location());
        false
    }

    /// An explicit field is opened. `is_default` is set if the field was
    /// not named.
    fn field_start(&mut self, ctx: &mut ParserContext<'_>, is_default: bool, _field: usize) -> bool {
        if is_default {
            return true;
        }
        ctx.logger.error(
            format!("\"{}\" does not have any fields", self.name()),
            self.location(),
        );
        false
    }

    fn field_end(&mut self, _ctx: &mut ParserContext<'_>) {}

    /// An annotation of class `class_name` starts inside this element.
    fn annotation_start(
        &mut self,
        ctx: &mut ParserContext<'_>,
        class_name: &str,
        _args: &mut VariantMap,
    ) -> bool {
        ctx.logger.error(
            format!("Cannot start annotation \"{class_name}\" here"),
            self.location(),
        );
        false
    }

    fn annotation_end(&mut self, ctx: &mut ParserContext<'_>, class_name: &str, _element_name: &str) -> bool {
        ctx.logger.error(
            format!("Cannot end annotation \"{class_name}\" here"),
            self.location(),
        );
        false
    }

    /// A registered user token was encountered.
    fn token(&mut self, ctx: &mut ParserContext<'_>, token: &Variant) -> bool {
        ctx.logger.error(
            format!("Did not expect token {token} here"),
            self.location(),
        );
        false
    }
}

/// Handler that accepts start and end and nothing else. Used for states
/// without an element handler and for deduced states.
#[derive(Debug, Clone)]
pub struct DefaultHandler {
    data: HandlerData,
}

impl DefaultHandler {
    pub fn create(data: HandlerData) -> Box<dyn Handler> {
        Box::new(Self { data })
    }
}

impl Handler for DefaultHandler {
    fn handler_data(&self) -> &HandlerData {
        &self.data
    }
}

/// A command of the input format.
#[derive(Clone)]
pub struct ParserState {
    name: String,
    parents: Vec<StateId>,
    arguments: Arguments,
    created_node_types: Vec<&'static Rtti>,
    element_handler: Option<HandlerConstructor>,
    child_handler: Option<HandlerConstructor>,
}

impl ParserState {
    pub fn builder(name: impl Into<String>) -> ParserStateBuilder {
        ParserStateBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parents(&self) -> &[StateId] {
        &self.parents
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn created_node_types(&self) -> &[&'static Rtti] {
        &self.created_node_types
    }

    pub fn element_handler(&self) -> Option<HandlerConstructor> {
        self.element_handler
    }

    pub fn child_handler(&self) -> Option<HandlerConstructor> {
        self.child_handler
    }

    /// True if the state may be started directly below `current`.
    pub fn accepts_parent(&self, current: StateId) -> bool {
        self.parents
            .iter()
            .any(|&p| p == current || p == ParserStates::ALL)
    }

    /// True if the handler may have created a node of type `ty`.
    pub fn creates(&self, ty: &'static Rtti) -> bool {
        self.created_node_types.iter().any(|&t| ty.isa(t))
    }
}

impl fmt::Debug for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserState")
            .field("name", &self.name)
            .field("parents", &self.parents)
            .field("created_node_types", &self.created_node_types)
            .field("element_handler", &self.element_handler.is_some())
            .field("child_handler", &self.child_handler.is_some())
            .finish()
    }
}

/// Builder for [`ParserState`].
///
/// # Examples
///
/// ```
/// use ousia_core::parser::{ParserState, ParserStates};
/// use ousia_core::rtti::types;
///
/// let mut states = ParserStates::new();
/// let ontology = states.register(
///     ParserState::builder("ontology")
///         .parent(ParserStates::NONE)
///         .created_node_type(&types::ONTOLOGY)
///         .build(),
/// );
/// assert_eq!(states.get(ontology).map(|s| s.name()), Some("ontology"));
/// ```
#[derive(Debug, Clone)]
pub struct ParserStateBuilder {
    state: ParserState,
}

impl ParserStateBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: ParserState {
                name: name.into(),
                parents: Vec::new(),
                arguments: Arguments::none(),
                created_node_types: Vec::new(),
                element_handler: None,
                child_handler: None,
            },
        }
    }

    pub fn parent(mut self, parent: StateId) -> Self {
        if !self.state.parents.contains(&parent) {
            self.state.parents.push(parent);
        }
        self
    }

    pub fn parents(mut self, parents: &[StateId]) -> Self {
        for &p in parents {
            self = self.parent(p);
        }
        self
    }

    pub fn arguments(mut self, arguments: Arguments) -> Self {
        self.state.arguments = arguments;
        self
    }

    pub fn created_node_type(mut self, ty: &'static Rtti) -> Self {
        self.state.created_node_types.push(ty);
        self
    }

    pub fn created_node_types(mut self, tys: &[&'static Rtti]) -> Self {
        self.state.created_node_types.extend_from_slice(tys);
        self
    }

    pub fn element_handler(mut self, ctor: HandlerConstructor) -> Self {
        self.state.element_handler = Some(ctor);
        self
    }

    /// Handler used for commands that match no registered state while this
    /// state is on top of the stack.
    pub fn child_handler(mut self, ctor: HandlerConstructor) -> Self {
        self.state.child_handler = Some(ctor);
        self
    }

    pub fn build(self) -> ParserState {
        self.state
    }
}

/// Table of registered states.
///
/// Two pseudo states are always present: [`ParserStates::NONE`] stands for
/// the empty stack and [`ParserStates::ALL`] used as parent admits a state
/// anywhere. Neither can be started by name.
#[derive(Debug, Clone)]
pub struct ParserStates {
    states: Vec<ParserState>,
}

impl Default for ParserStates {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserStates {
    pub const NONE: StateId = StateId(0);
    pub const ALL: StateId = StateId(1);

    pub fn new() -> Self {
        Self {
            states: vec![
                ParserStateBuilder::new("$none").build(),
                ParserStateBuilder::new("$all").build(),
            ],
        }
    }

    pub fn register(&mut self, state: ParserState) -> StateId {
        self.states.push(state);
        StateId(self.states.len() - 1)
    }

    pub fn get(&self, id: StateId) -> Option<&ParserState> {
        self.states.get(id.0)
    }

    /// Adds a parent after registration, for states that nest recursively.
    pub fn add_parent(&mut self, id: StateId, parent: StateId) {
        if let Some(state) = self.states.get_mut(id.0) {
            if !state.parents.contains(&parent) {
                state.parents.push(parent);
            }
        }
    }

    pub fn is_pseudo(id: StateId) -> bool {
        id == Self::NONE || id == Self::ALL
    }

    /// Registered states without the pseudo states.
    pub fn iter(&self) -> impl Iterator<Item = (StateId, &ParserState)> + '_ {
        self.states
            .iter()
            .enumerate()
            .skip(2)
            .map(|(i, s)| (StateId(i), s))
    }

    /// States called `name`, in registration order.
    pub fn by_name<'s>(&'s self, name: &'s str) -> impl Iterator<Item = (StateId, &'s ParserState)> + 's {
        self.iter().filter(move |(_, s)| s.name == name)
    }

    /// Sorted, deduplicated names of the commands allowed below `current`.
    pub fn expected_commands(&self, current: StateId) -> Vec<String> {
        let mut names: Vec<String> = self
            .iter()
            .filter(|(_, s)| s.accepts_parent(current))
            .map(|(_, s)| s.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.states.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rtti::types;

    // ==================== Registry tests ====================

    #[test]
    fn test_pseudo_states_hidden() {
        let states = ParserStates::new();
        assert!(states.is_empty());
        assert_eq!(states.iter().count(), 0);
        assert!(states.get(ParserStates::NONE).is_some());
        assert!(ParserStates::is_pseudo(ParserStates::ALL));
        assert_eq!(states.by_name("$none").count(), 0);
    }

    #[test]
    fn test_expected_commands() {
        let mut states = ParserStates::new();
        let doc = states.register(ParserState::builder("document").parent(ParserStates::NONE).build());
        states.register(ParserState::builder("import").parent(ParserStates::ALL).build());
        states.register(ParserState::builder("section").parent(doc).build());
        states.register(ParserState::builder("include").parents(&[ParserStates::NONE, doc]).build());
        assert_eq!(
            states.expected_commands(ParserStates::NONE),
            vec!["document", "import", "include"]
        );
        assert_eq!(states.expected_commands(doc), vec!["import", "include", "section"]);
    }

    #[test]
    fn test_add_parent() {
        let mut states = ParserStates::new();
        let list = states.register(ParserState::builder("list").parent(ParserStates::NONE).build());
        states.add_parent(list, list);
        states.add_parent(list, list);
        let state = states.get(list).unwrap();
        assert_eq!(state.parents(), &[ParserStates::NONE, list]);
        assert!(state.accepts_parent(list));
    }

    // ==================== State tests ====================

    #[test]
    fn test_creates_subtypes() {
        let state = ParserState::builder("class")
            .created_node_type(&types::DESCRIPTOR)
            .build();
        assert!(state.creates(&types::STRUCTURED_CLASS));
        assert!(state.creates(&types::ANNOTATION_CLASS));
        assert!(!state.creates(&types::ONTOLOGY));
    }

    #[test]
    fn test_builder_dedups_parents() {
        let state = ParserState::builder("x")
            .parent(ParserStates::NONE)
            .parent(ParserStates::NONE)
            .build();
        assert_eq!(state.parents().len(), 1);
        assert!(state.element_handler().is_none());
        assert!(!state.arguments().is_valid());
    }
}
