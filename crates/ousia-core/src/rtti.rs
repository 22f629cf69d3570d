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

//! Runtime type information.
//!
//! Every node class and every variant kind has a static [`Rtti`] descriptor.
//! Descriptors form a DAG through their parent lists; [`Rtti::isa`] checks
//! reflexive-transitive inheritance and [`Rtti::composed_of`] checks whether
//! instances of a type may (transitively) own instances of another type,
//! which drives the resolution algorithm.
//!
//! Descriptors are declared as statics and identified by address.
//!
//! # Examples
//!
//! ```
//! use ousia_core::rtti::types;
//!
//! assert!(types::STRUCTURED_CLASS.isa(&types::DESCRIPTOR));
//! assert!(types::STRUCTURED_CLASS.isa(&types::NODE));
//! assert!(!types::DESCRIPTOR.isa(&types::STRUCTURED_CLASS));
//! assert!(types::PROJECT.composed_of(&types::STRUCTURED_CLASS));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

struct Closures {
    /// All parents including the type itself.
    parents: Vec<&'static Rtti>,
    /// All types instances may transitively own.
    composed_of: Vec<&'static Rtti>,
}

/// Static type descriptor.
pub struct Rtti {
    name: &'static str,
    parents: &'static [&'static Rtti],
    composed_of: &'static [&'static Rtti],
    closures: OnceLock<Closures>,
}

impl Rtti {
    pub const fn new(
        name: &'static str,
        parents: &'static [&'static Rtti],
        composed_of: &'static [&'static Rtti],
    ) -> Self {
        Self {
            name,
            parents,
            composed_of,
            closures: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Direct parents as declared.
    pub fn direct_parents(&self) -> &'static [&'static Rtti] {
        self.parents
    }

    fn closures(&'static self) -> &'static Closures {
        self.closures.get_or_init(|| {
            let parents = collect_parents(self);
            // Everything any ancestor is composed of, closed under the
            // composition relation of the collected types and their parents.
            let mut seen: HashSet<*const Rtti> = HashSet::new();
            let mut composed_of = Vec::new();
            let mut queue: Vec<&'static Rtti> = parents
                .iter()
                .flat_map(|p| p.composed_of.iter().copied())
                .collect();
            while let Some(t) = queue.pop() {
                if !seen.insert(t as *const Rtti) {
                    continue;
                }
                composed_of.push(t);
                for p in collect_parents(t) {
                    queue.extend(p.composed_of.iter().copied());
                }
            }
            Closures {
                parents,
                composed_of,
            }
        })
    }

    /// All ancestors of this type, including the type itself.
    pub fn parents(&'static self) -> &'static [&'static Rtti] {
        &self.closures().parents
    }

    /// Returns true if this type is `other` or inherits from it.
    pub fn isa(&'static self, other: &Rtti) -> bool {
        std::ptr::eq(self, other) || self.closures().parents.iter().any(|p| std::ptr::eq(*p, other))
    }

    /// Returns true if this type is any of `others`.
    pub fn isa_one_of(&'static self, others: &[&'static Rtti]) -> bool {
        others.iter().any(|o| self.isa(o))
    }

    /// Returns true if instances of this type may transitively own
    /// instances of `other`.
    pub fn composed_of(&'static self, other: &'static Rtti) -> bool {
        self.closures().composed_of.iter().any(|t| other.isa(t))
    }
}

fn collect_parents(rtti: &'static Rtti) -> Vec<&'static Rtti> {
    let mut seen: HashSet<*const Rtti> = HashSet::new();
    let mut result = Vec::new();
    let mut queue = vec![rtti];
    while let Some(t) = queue.pop() {
        if seen.insert(t as *const Rtti) {
            result.push(t);
            queue.extend(t.parents.iter().copied());
        }
    }
    result
}

impl PartialEq for Rtti {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Rtti {}

impl Hash for Rtti {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self as *const Rtti).hash(state);
    }
}

impl fmt::Debug for Rtti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rtti({})", self.name)
    }
}

impl fmt::Display for Rtti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

macro_rules! define_rtti {
    (@count) => { 0usize };
    (@count $head:ident $($tail:ident)*) => { 1usize + define_rtti!(@count $($tail)*) };
    ($(
        $(#[$meta:meta])*
        $ident:ident = $name:literal, parents [$($parent:ident),*], composed_of [$($composed:ident),*];
    )*) => {
        $(
            $(#[$meta])*
            pub static $ident: Rtti = Rtti::new(
                $name,
                {
                    static PARENTS: [&Rtti; define_rtti!(@count $($parent)*)] = [$(&$parent),*];
                    &PARENTS
                },
                {
                    static COMPOSED: [&Rtti; define_rtti!(@count $($composed)*)] = [$(&$composed),*];
                    &COMPOSED
                },
            );
        )*

        /// All descriptors known to this crate.
        pub fn all() -> &'static [&'static Rtti] {
            static ALL: [&Rtti; define_rtti!(@count $($ident)*)] = [$(&$ident),*];
            &ALL
        }
    };
}

/// Descriptors of the built-in types.
pub mod types {
    use super::Rtti;

    define_rtti! {
        /// Matches anything; used as "no type restriction".
        NONE = "none", parents [], composed_of [];
        NULLPTR = "nullptr", parents [], composed_of [];
        BOOL = "bool", parents [], composed_of [];
        INT = "int", parents [], composed_of [];
        DOUBLE = "double", parents [], composed_of [];
        STRING = "string", parents [], composed_of [];
        ARRAY = "array", parents [], composed_of [];
        MAP = "map", parents [], composed_of [];
        FUNCTION = "function", parents [], composed_of [];

        NODE = "Node", parents [], composed_of [];
        PROJECT = "Project", parents [NODE], composed_of [DOCUMENT, ONTOLOGY, TYPESYSTEM];

        TYPESYSTEM = "Typesystem", parents [NODE], composed_of [TYPE];
        SYSTEM_TYPESYSTEM = "SystemTypesystem", parents [TYPESYSTEM], composed_of [];
        TYPE = "Type", parents [NODE], composed_of [];
        BOOL_TYPE = "BoolType", parents [TYPE], composed_of [];
        INT_TYPE = "IntType", parents [TYPE], composed_of [];
        DOUBLE_TYPE = "DoubleType", parents [TYPE], composed_of [];
        STRING_TYPE = "StringType", parents [TYPE], composed_of [];
        UNKNOWN_TYPE = "UnknownType", parents [TYPE], composed_of [];
        ENUMERATION_TYPE = "EnumerationType", parents [TYPE], composed_of [];
        ARRAY_TYPE = "ArrayType", parents [TYPE], composed_of [];
        STRUCT_TYPE = "StructType", parents [TYPE], composed_of [ATTRIBUTE];
        ATTRIBUTE = "Attribute", parents [NODE], composed_of [];

        ONTOLOGY = "Ontology", parents [NODE], composed_of [STRUCTURED_CLASS, ANNOTATION_CLASS];
        DESCRIPTOR = "Descriptor", parents [NODE], composed_of [STRUCT_TYPE, FIELD_DESCRIPTOR];
        STRUCTURED_CLASS = "StructuredClass", parents [DESCRIPTOR], composed_of [];
        ANNOTATION_CLASS = "AnnotationClass", parents [DESCRIPTOR], composed_of [];
        FIELD_DESCRIPTOR = "FieldDescriptor", parents [NODE], composed_of [];

        DOCUMENT = "Document", parents [NODE], composed_of [STRUCTURED_ENTITY, ANNOTATION_ENTITY];
        DOCUMENT_ENTITY = "DocumentEntity", parents [], composed_of [STRUCTURE_NODE];
        STRUCTURE_NODE = "StructureNode", parents [NODE], composed_of [];
        STRUCTURED_ENTITY = "StructuredEntity", parents [STRUCTURE_NODE, DOCUMENT_ENTITY], composed_of [];
        DOCUMENT_PRIMITIVE = "DocumentPrimitive", parents [STRUCTURE_NODE], composed_of [];
        ANCHOR = "Anchor", parents [STRUCTURE_NODE], composed_of [];
        ANNOTATION_ENTITY = "AnnotationEntity", parents [NODE, DOCUMENT_ENTITY], composed_of [];
    }
}

/// Looks up a built-in descriptor by name.
pub fn lookup(name: &str) -> Option<&'static Rtti> {
    types::all().iter().copied().find(|t| t.name() == name)
}

#[cfg(test)]
mod tests {
    use super::types::*;
    use super::*;

    // ==================== isa tests ====================

    #[test]
    fn test_isa_reflexive() {
        for t in types::all() {
            assert!(t.isa(t), "{} isa itself", t);
        }
    }

    #[test]
    fn test_isa_transitive() {
        assert!(STRUCTURED_ENTITY.isa(&STRUCTURE_NODE));
        assert!(STRUCTURED_ENTITY.isa(&NODE));
        assert!(STRUCTURED_ENTITY.isa(&DOCUMENT_ENTITY));
        assert!(SYSTEM_TYPESYSTEM.isa(&NODE));
        assert!(STRUCT_TYPE.isa(&TYPE));
    }

    #[test]
    fn test_isa_not_symmetric() {
        assert!(!NODE.isa(&DOCUMENT));
        assert!(!STRUCTURED_CLASS.isa(&ANNOTATION_CLASS));
        assert!(!INT.isa(&DOUBLE));
    }

    #[test]
    fn test_isa_one_of() {
        assert!(ANCHOR.isa_one_of(&[&DOCUMENT, &STRUCTURE_NODE]));
        assert!(!ANCHOR.isa_one_of(&[&DOCUMENT, &ONTOLOGY]));
    }

    #[test]
    fn test_parents_closure() {
        let names: Vec<&str> = STRUCTURED_CLASS.parents().iter().map(|p| p.name()).collect();
        assert!(names.contains(&"StructuredClass"));
        assert!(names.contains(&"Descriptor"));
        assert!(names.contains(&"Node"));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_parents_are_static() {
        fn ancestors(t: &'static Rtti) -> &'static [&'static Rtti] {
            t.parents()
        }
        let parents = ancestors(&ANCHOR);
        assert!(parents.iter().any(|p| std::ptr::eq(*p, &ANCHOR)));
        assert!(parents.iter().any(|p| std::ptr::eq(*p, &NODE)));
    }

    // ==================== composed_of tests ====================

    #[test]
    fn test_composed_of_direct() {
        assert!(ONTOLOGY.composed_of(&STRUCTURED_CLASS));
        assert!(DOCUMENT.composed_of(&STRUCTURED_ENTITY));
    }

    #[test]
    fn test_composed_of_inherited() {
        // StructuredClass inherits the composition of Descriptor
        assert!(STRUCTURED_CLASS.composed_of(&FIELD_DESCRIPTOR));
    }

    #[test]
    fn test_composed_of_transitive() {
        assert!(PROJECT.composed_of(&FIELD_DESCRIPTOR));
        assert!(ONTOLOGY.composed_of(&STRUCT_TYPE));
        assert!(DOCUMENT.composed_of(&DOCUMENT_PRIMITIVE));
        assert!(DOCUMENT.composed_of(&ANCHOR));
    }

    #[test]
    fn test_not_composed_of() {
        assert!(!DOCUMENT.composed_of(&ONTOLOGY));
        assert!(!FIELD_DESCRIPTOR.composed_of(&STRUCTURED_CLASS));
        assert!(!TYPE.composed_of(&NODE));
    }

    // ==================== Registry tests ====================

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("StructuredClass"), Some(&STRUCTURED_CLASS));
        assert!(lookup("NoSuchType").is_none());
    }

    #[test]
    fn test_equality_is_identity() {
        assert_eq!(&NODE, &NODE);
        assert_ne!(&NODE, &DOCUMENT);
        assert_eq!(format!("{:?}", DOCUMENT), "Rtti(Document)");
    }
}
