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

//! Name change notification.

use slotmap::new_key_type;

use super::{NodeId, Slot};

new_key_type! {
    /// Handle of a registered name change callback.
    pub struct ListenerId;
}

/// Payload of a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameChange {
    pub old_name: String,
    pub new_name: String,
}

/// Callback invoked with the renamed node.
pub type NameChangeCallback = Box<dyn FnMut(NodeId, &NameChange)>;

/// Subscription of something interested in renames of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Listener {
    /// The index of the vector `slot` of `owner` contains the node.
    Index { owner: NodeId, slot: Slot },
    /// A user callback.
    Callback(ListenerId),
}
