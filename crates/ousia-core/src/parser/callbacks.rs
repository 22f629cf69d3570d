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

//! Hooks handlers use to reconfigure the underlying format parser.

use crate::tokens::TokenId;
use crate::variant::VariantType;
use crate::whitespace::WhitespaceMode;

/// Settings and token registrations a format parser exposes to handlers.
pub trait ParserStateCallbacks {
    /// Controls how the next block of character data is normalised.
    fn set_whitespace_mode(&mut self, mode: WhitespaceMode);

    /// Type the next block of character data is read as. `None` delivers
    /// plain strings.
    fn set_data_type(&mut self, ty: Option<VariantType>);

    /// Whether the format can recognise `token` at all.
    fn supports_token(&self, token: &str) -> bool;

    /// Registers a user token and returns its id. Registering the same
    /// token twice returns the same id.
    fn register_token(&mut self, token: &str) -> TokenId;

    /// Drops one registration of a token.
    fn unregister_token(&mut self, id: TokenId);
}
