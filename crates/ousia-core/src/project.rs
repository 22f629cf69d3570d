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

//! The project: root of everything loaded in one session.

use crate::error::OusiaResult;
use crate::logger::Logger;
use crate::managed::{Manager, NodeId, NodeKind, NodeVector, Slot};

/// Payload of a project node.
#[derive(Debug, Clone, Default)]
pub struct ProjectData {
    pub(crate) documents: NodeVector,
    pub(crate) ontologies: NodeVector,
    pub(crate) typesystems: NodeVector,
    pub(crate) system_typesystem: Option<NodeId>,
}

impl Manager {
    /// Creates a project together with its system typesystem. Both are
    /// registered as roots.
    pub fn create_project(&mut self) -> OusiaResult<NodeId> {
        let system = self.create_system_typesystem()?;
        let project = self.create(
            "",
            NodeKind::Project(ProjectData {
                system_typesystem: Some(system),
                ..Default::default()
            }),
        );
        self.add_root(system);
        self.add_root(project);
        Ok(project)
    }

    pub fn system_typesystem(&self, project: NodeId) -> Option<NodeId> {
        match self.kind(project) {
            Some(NodeKind::Project(p)) => p.system_typesystem,
            _ => None,
        }
    }

    pub fn create_project_document(&mut self, project: NodeId, name: impl Into<String>) -> OusiaResult<NodeId> {
        let document = self.create_document(name);
        self.attach(project, Slot::ProjectDocuments, document)?;
        Ok(document)
    }

    /// Creates an ontology that sees the system typesystem.
    pub fn create_project_ontology(&mut self, project: NodeId, name: impl Into<String>) -> OusiaResult<NodeId> {
        let ontology = self.create_ontology(name);
        self.attach(project, Slot::ProjectOntologies, ontology)?;
        if let Some(system) = self.system_typesystem(project) {
            self.attach(ontology, Slot::OntologyTypesystems, system)?;
        }
        Ok(ontology)
    }

    /// Creates a typesystem that includes the system typesystem.
    pub fn create_project_typesystem(&mut self, project: NodeId, name: impl Into<String>) -> OusiaResult<NodeId> {
        let typesystem = self.create_typesystem(name);
        self.attach(project, Slot::ProjectTypesystems, typesystem)?;
        if let Some(system) = self.system_typesystem(project) {
            self.add_typesystem_include(typesystem, system)?;
        }
        Ok(typesystem)
    }

    pub fn project_documents(&self, project: NodeId) -> &[NodeId] {
        self.children(project, Slot::ProjectDocuments)
    }

    pub fn project_ontologies(&self, project: NodeId) -> &[NodeId] {
        self.children(project, Slot::ProjectOntologies)
    }

    pub fn project_typesystems(&self, project: NodeId) -> &[NodeId] {
        self.children(project, Slot::ProjectTypesystems)
    }

    pub(crate) fn validate_project(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let mut valid = true;
        for (slot, what) in [
            (Slot::ProjectDocuments, "documents"),
            (Slot::ProjectOntologies, "ontologies"),
            (Slot::ProjectTypesystems, "typesystems"),
        ] {
            valid &= self.validate_unique_names(self.children(id, slot), what, logger);
        }
        valid
    }
}
