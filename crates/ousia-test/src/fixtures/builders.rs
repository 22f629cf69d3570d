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

//! Builder for small ad-hoc ontologies.
//!
//! Classes are declared by name first; fields refer to classes by name and
//! are resolved when the ontology is built.

use std::collections::BTreeMap;

use ousia_core::{FieldType, Manager, NodeId, OusiaResult, RangeSet};

#[derive(Debug, Clone)]
struct ClassDecl {
    name: String,
    cardinality: RangeSet,
    superclass: Option<String>,
    transparent: bool,
    root: bool,
}

#[derive(Debug, Clone)]
struct FieldDecl {
    class: String,
    name: String,
    field_type: FieldType,
    optional: bool,
    children: Vec<String>,
    primitive: Option<String>,
}

/// Builder for creating ontologies in tests.
///
/// # Examples
///
/// ```
/// use ousia_core::{ConcreteLogger, Manager};
/// use ousia_test::fixtures::builders::OntologyBuilder;
///
/// let mut mgr = Manager::new();
/// let project = mgr.create_project().unwrap();
/// let ontology = OntologyBuilder::new("list")
///     .root_class("list")
///     .transparent_class("item")
///     .tree("list", &["item"])
///     .primitive("item", "string")
///     .build(&mut mgr, project)
///     .unwrap();
///
/// let mut logger = ConcreteLogger::default();
/// assert!(mgr.validate(ontology.ontology, &mut logger));
/// assert_eq!(mgr.name(ontology["item"]), "item");
/// ```
#[derive(Debug, Clone)]
pub struct OntologyBuilder {
    name: String,
    classes: Vec<ClassDecl>,
    annotations: Vec<String>,
    fields: Vec<FieldDecl>,
}

/// Result of [`OntologyBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuiltOntology {
    pub ontology: NodeId,
    pub classes: BTreeMap<String, NodeId>,
}

impl BuiltOntology {
    pub fn class(&self, name: &str) -> Option<NodeId> {
        self.classes.get(name).copied()
    }
}

impl std::ops::Index<&str> for BuiltOntology {
    type Output = NodeId;

    fn index(&self, name: &str) -> &NodeId {
        &self.classes[name]
    }
}

impl OntologyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
            annotations: Vec::new(),
            fields: Vec::new(),
        }
    }

    fn push_class(mut self, name: &str, transparent: bool, root: bool) -> Self {
        self.classes.push(ClassDecl {
            name: name.to_string(),
            cardinality: RangeSet::any(),
            superclass: None,
            transparent,
            root,
        });
        self
    }

    /// Adds a plain structured class.
    pub fn class(self, name: &str) -> Self {
        self.push_class(name, false, false)
    }

    /// Adds a class that may be the root of a document.
    pub fn root_class(self, name: &str) -> Self {
        self.push_class(name, false, true)
    }

    /// Adds a class that may be created implicitly.
    pub fn transparent_class(self, name: &str) -> Self {
        self.push_class(name, true, false)
    }

    /// Sets the cardinality of the most recently added class.
    pub fn cardinality(mut self, cardinality: RangeSet) -> Self {
        if let Some(class) = self.classes.last_mut() {
            class.cardinality = cardinality;
        }
        self
    }

    /// Sets the superclass of the most recently added class.
    pub fn extends(mut self, superclass: &str) -> Self {
        if let Some(class) = self.classes.last_mut() {
            class.superclass = Some(superclass.to_string());
        }
        self
    }

    pub fn annotation_class(mut self, name: &str) -> Self {
        self.annotations.push(name.to_string());
        self
    }

    /// Adds the default TREE field of `class` with the given children.
    pub fn tree(self, class: &str, children: &[&str]) -> Self {
        self.field(class, "", FieldType::Tree, false, children)
    }

    /// Adds a non-primitive field.
    pub fn field(
        mut self,
        class: &str,
        name: &str,
        field_type: FieldType,
        optional: bool,
        children: &[&str],
    ) -> Self {
        self.fields.push(FieldDecl {
            class: class.to_string(),
            name: name.to_string(),
            field_type,
            optional,
            children: children.iter().map(|c| c.to_string()).collect(),
            primitive: None,
        });
        self
    }

    /// Adds a default TREE field holding a primitive of the named system
    /// type.
    pub fn primitive(mut self, class: &str, ty: &str) -> Self {
        self.fields.push(FieldDecl {
            class: class.to_string(),
            name: String::new(),
            field_type: FieldType::Tree,
            optional: false,
            children: Vec::new(),
            primitive: Some(ty.to_string()),
        });
        self
    }

    /// Creates the ontology in `project`. Unknown class or type names are
    /// reported as structure errors.
    pub fn build(self, mgr: &mut Manager, project: NodeId) -> OusiaResult<BuiltOntology> {
        let ontology = mgr.create_project_ontology(project, self.name)?;
        let mut classes = BTreeMap::new();
        for decl in &self.classes {
            let class = mgr.create_structured_class(
                ontology,
                decl.name.as_str(),
                decl.cardinality.clone(),
                None,
                decl.transparent,
                decl.root,
            )?;
            classes.insert(decl.name.clone(), class);
        }
        for name in &self.annotations {
            let class = mgr.create_annotation_class(ontology, name.as_str())?;
            classes.insert(name.clone(), class);
        }

        let lookup = |classes: &BTreeMap<String, NodeId>, name: &str| {
            classes.get(name).copied().ok_or_else(|| {
                ousia_core::LoggableException::structure(format!("Unknown class \"{name}\""))
            })
        };

        for decl in &self.classes {
            if let Some(superclass) = &decl.superclass {
                let superclass = lookup(&classes, superclass)?;
                mgr.set_superclass(classes[&decl.name], Some(superclass))?;
            }
        }

        let system = mgr.system_typesystem(project);
        for decl in &self.fields {
            let owner = lookup(&classes, &decl.class)?;
            match &decl.primitive {
                Some(ty) => {
                    let ty = system
                        .and_then(|s| mgr.lookup_type(s, ty))
                        .ok_or_else(|| {
                            ousia_core::LoggableException::structure(format!("Unknown type \"{ty}\""))
                        })?;
                    mgr.create_primitive_field_descriptor(
                        owner,
                        ty,
                        decl.field_type,
                        decl.name.as_str(),
                        decl.optional,
                    )?;
                }
                None => {
                    let field = mgr.create_field_descriptor(
                        owner,
                        decl.field_type,
                        decl.name.as_str(),
                        decl.optional,
                    )?;
                    for child in &decl.children {
                        mgr.add_child_class(field, lookup(&classes, child)?)?;
                    }
                }
            }
        }

        Ok(BuiltOntology { ontology, classes })
    }
}
