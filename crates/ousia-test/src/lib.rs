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

//! Shared test fixtures and utilities for the Ousia crates.
//!
//! Fixtures build into a caller-provided [`Manager`] and project and
//! return plain structs of node handles.
//!
//! # Quick Start
//!
//! ```rust
//! use ousia_core::{ConcreteLogger, Manager};
//! use ousia_test::{count_entities, fixtures};
//!
//! let mut mgr = Manager::new();
//! let project = mgr.create_project().unwrap();
//! let doc = fixtures::sample_document(&mut mgr, project);
//!
//! let mut logger = ConcreteLogger::default();
//! assert!(mgr.validate(doc.document, &mut logger));
//! assert_eq!(count_entities(&mgr, doc.document), 6);
//! ```

use ousia_core::{Manager, NodeId};

/// Canonical fixtures.
pub mod fixtures;

/// Fixture counting utilities.
pub mod counts;

pub use counts::{count_anchors, count_annotations, count_entities, count_primitives, text_content};
pub use fixtures::*;

/// A fresh manager with a project.
pub fn project() -> (Manager, NodeId) {
    let mut mgr = Manager::new();
    let project = mgr.create_project().expect("create project");
    (mgr, project)
}
