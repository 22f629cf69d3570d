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

//! Canonical fixtures.
//!
//! - **ontologies**: the "book" ontology and an annotation ontology
//! - **typesystems**: a small typesystem with struct, enum and array types
//! - **documents**: a sample book document with an annotation
//! - **builders**: builder for ad-hoc ontologies

pub mod builders;
mod documents;
mod ontologies;
mod typesystems;

pub use documents::*;
pub use ontologies::*;
pub use typesystems::*;
