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

//! Reconstructs the parser state from the node types on the scope stack.
//!
//! Used when parsing resumes inside an existing scope, e.g. in an included
//! file: the scope holds nodes but the state stack is empty.
//!
//! `active[d][s]` records whether state `s` can have produced the first
//! `d + 1` entries of the signature. A state is active at depth `d` if one
//! of its parents is active at `d - 1` and it creates a supertype of
//! `signature[d]`. States that create nothing only select between other
//! states; they are active at `d` if a parent is active at `d`.
//!
//! Leading signature entries no registered state creates (the project, for
//! instance) form an ambient prefix during which only the empty stack is
//! active.

use crate::rtti::Rtti;

use super::state::{ParserStates, StateId};

pub struct ParserStateDeductor<'a> {
    signature: Vec<&'static Rtti>,
    states: &'a ParserStates,
    ids: Vec<StateId>,
}

impl<'a> ParserStateDeductor<'a> {
    pub fn new(signature: Vec<&'static Rtti>, states: &'a ParserStates) -> Self {
        let ids = states.iter().map(|(id, _)| id).collect();
        Self {
            signature,
            states,
            ids,
        }
    }

    /// Number of leading signature entries no state creates.
    fn ambient_prefix(&self) -> usize {
        self.signature
            .iter()
            .take_while(|&&ty| !self.states.iter().any(|(_, s)| s.creates(ty)))
            .count()
    }

    fn creates(&self, id: StateId, ty: &'static Rtti) -> bool {
        self.states.get(id).map_or(false, |s| s.creates(ty))
    }

    fn is_generative(&self, id: StateId) -> bool {
        self.states
            .get(id)
            .map_or(false, |s| !s.created_node_types().is_empty())
    }

    /// Whether a parent of `id` is active in `row`. `empty_stack` tells
    /// whether the empty stack counts as active there.
    fn parent_active(&self, id: StateId, row: &[bool], empty_stack: bool) -> bool {
        let Some(state) = self.states.get(id) else {
            return false;
        };
        let any_active = empty_stack || row.iter().any(|&a| a);
        state.parents().iter().any(|&p| {
            if p == ParserStates::ALL {
                any_active
            } else if p == ParserStates::NONE {
                empty_stack
            } else {
                self.ids
                    .iter()
                    .position(|&i| i == p)
                    .map_or(false, |idx| row[idx])
            }
        })
    }

    /// Activates non-generative states below active states of the same
    /// depth until nothing changes.
    fn close_row(&self, row: &mut [bool], empty_stack: bool) {
        loop {
            let mut changed = false;
            for (idx, &id) in self.ids.iter().enumerate() {
                if !row[idx] && !self.is_generative(id) && self.parent_active(id, row, empty_stack) {
                    row[idx] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// States that could be on top of the stack for the given signature.
    pub fn deduce(&self) -> Vec<StateId> {
        let prefix = self.ambient_prefix();
        if prefix == self.signature.len() {
            return Vec::new();
        }

        let mut previous: Vec<bool> = Vec::new();
        for (depth, &ty) in self.signature.iter().enumerate().skip(prefix) {
            let mut row = vec![false; self.ids.len()];
            for (idx, &id) in self.ids.iter().enumerate() {
                if !self.creates(id, ty) {
                    continue;
                }
                row[idx] = if depth == 0 {
                    true
                } else if depth == prefix {
                    self.parent_active(id, &previous_or_empty(&previous, self.ids.len()), true)
                } else {
                    self.parent_active(id, &previous, false)
                };
            }
            self.close_row(&mut row, false);
            tracing::trace!(depth, ty = ty.name(), active = row.iter().filter(|&&a| a).count(), "deduction row");
            previous = row;
        }

        self.ids
            .iter()
            .zip(previous)
            .filter(|(_, active)| *active)
            .map(|(&id, _)| id)
            .collect()
    }
}

fn previous_or_empty(previous: &[bool], len: usize) -> Vec<bool> {
    if previous.is_empty() {
        vec![false; len]
    } else {
        previous.to_vec()
    }
}
