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

//! Typesystems and the types of attribute values.
//!
//! A [`Type`](TypeKind) describes which [`Variant`]s are acceptable for an
//! attribute. [`Manager::prepare`] checks a value against a type and
//! coerces it in place; on failure the value is replaced by the default of
//! the type so the result is always well-formed.
//!
//! Struct types map attribute names to positions. Prepared struct values
//! are arrays holding the attributes of the whole inheritance chain in
//! order, parent attributes first.

use std::collections::HashSet;

use crate::error::{LoggableException, OusiaResult};
use crate::location::SourceLocation;
use crate::logger::{Logger, LoggerExt};
use crate::managed::{Manager, NodeId, NodeKind, NodeVector, Slot};
use crate::rtti::{types, Rtti};
use crate::tokens::is_identifier;
use crate::variant::{ConversionMode, Variant, VariantArray, VariantConverter};

/// Payload of a typesystem node.
#[derive(Debug, Clone, Default)]
pub struct TypesystemData {
    pub(crate) types: NodeVector,
    pub(crate) includes: NodeVector,
    pub(crate) system: bool,
}

/// Payload of a struct type.
#[derive(Debug, Clone, Default)]
pub struct StructData {
    pub(crate) parent: Option<NodeId>,
    pub(crate) attributes: NodeVector,
}

/// Payload of a type node.
#[derive(Debug, Clone)]
pub enum TypeKind {
    Bool,
    Int,
    Double,
    String,
    /// Accepts any value.
    Unknown,
    /// Named constants; values are stored as ordinals.
    Enumeration(Vec<String>),
    /// Array of the given inner type.
    Array(NodeId),
    Struct(StructData),
}

impl TypeKind {
    pub fn rtti(&self) -> &'static Rtti {
        match self {
            TypeKind::Bool => &types::BOOL_TYPE,
            TypeKind::Int => &types::INT_TYPE,
            TypeKind::Double => &types::DOUBLE_TYPE,
            TypeKind::String => &types::STRING_TYPE,
            TypeKind::Unknown => &types::UNKNOWN_TYPE,
            TypeKind::Enumeration(_) => &types::ENUMERATION_TYPE,
            TypeKind::Array(_) => &types::ARRAY_TYPE,
            TypeKind::Struct(_) => &types::STRUCT_TYPE,
        }
    }

    /// Primitive types accept single scalar values.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeKind::Bool | TypeKind::Int | TypeKind::Double | TypeKind::String
        )
    }
}

/// Payload of a struct attribute.
#[derive(Debug, Clone)]
pub struct AttributeData {
    pub(crate) default: Variant,
    pub(crate) optional: bool,
    pub(crate) ty: Option<NodeId>,
}

impl Manager {
    // ==================== Construction ====================

    pub fn create_typesystem(&mut self, name: impl Into<String>) -> NodeId {
        self.create(name, NodeKind::Typesystem(TypesystemData::default()))
    }

    /// Creates the typesystem holding the primitive types `string`, `int`,
    /// `double` and `bool`.
    pub fn create_system_typesystem(&mut self) -> OusiaResult<NodeId> {
        let ts = self.create(
            "system",
            NodeKind::Typesystem(TypesystemData {
                system: true,
                ..Default::default()
            }),
        );
        for (name, kind) in [
            ("string", TypeKind::String),
            ("int", TypeKind::Int),
            ("double", TypeKind::Double),
            ("bool", TypeKind::Bool),
        ] {
            self.create_type(ts, name, kind)?;
        }
        Ok(ts)
    }

    /// Creates a type and adds it to a typesystem.
    pub fn create_type(
        &mut self,
        typesystem: NodeId,
        name: impl Into<String>,
        kind: TypeKind,
    ) -> OusiaResult<NodeId> {
        let ty = self.create(name, NodeKind::Type(kind));
        self.attach(typesystem, Slot::TypesystemTypes, ty)?;
        Ok(ty)
    }

    /// Creates an enumeration type, dropping invalid and duplicate values.
    pub fn create_enumeration_type(
        &mut self,
        typesystem: NodeId,
        name: impl Into<String>,
        values: &[&str],
        logger: &mut dyn Logger,
    ) -> OusiaResult<NodeId> {
        let mut unique: Vec<String> = Vec::with_capacity(values.len());
        for &value in values {
            if !is_identifier(value) {
                logger.error(
                    format!("\"{value}\" is not a valid enumeration constant"),
                    SourceLocation::default(),
                );
            } else if unique.iter().any(|v| v == value) {
                logger.error(
                    format!("Enumeration constant \"{value}\" is duplicated"),
                    SourceLocation::default(),
                );
            } else {
                unique.push(value.to_string());
            }
        }
        if unique.is_empty() {
            logger.error("Enumeration has no constants", SourceLocation::default());
        }
        self.create_type(typesystem, name, TypeKind::Enumeration(unique))
    }

    /// Returns the array type `inner[]` of a typesystem, creating it if
    /// necessary.
    pub fn create_array_type(&mut self, typesystem: NodeId, inner: NodeId) -> OusiaResult<NodeId> {
        let name = format!("{}[]", self.name(inner));
        let existing = self
            .child_by_name(typesystem, Slot::TypesystemTypes, &name)
            .filter(|&t| matches!(self.type_kind(t), Some(TypeKind::Array(i)) if *i == inner));
        if let Some(existing) = existing {
            return Ok(existing);
        }
        self.create_type(typesystem, name, TypeKind::Array(inner))
    }

    pub fn create_struct_type(
        &mut self,
        typesystem: NodeId,
        name: impl Into<String>,
    ) -> OusiaResult<NodeId> {
        self.create_type(typesystem, name, TypeKind::Struct(StructData::default()))
    }

    /// Adds an attribute to a struct type. Attributes with a default value
    /// are optional.
    pub fn create_attribute(
        &mut self,
        struct_type: NodeId,
        name: impl Into<String>,
        ty: Option<NodeId>,
        default: Option<Variant>,
    ) -> OusiaResult<NodeId> {
        let optional = default.is_some();
        let attribute = self.create(
            name,
            NodeKind::Attribute(AttributeData {
                default: default.unwrap_or_default(),
                optional,
                ty,
            }),
        );
        self.attach(struct_type, Slot::StructAttributes, attribute)?;
        Ok(attribute)
    }

    pub fn set_struct_parent(&mut self, struct_type: NodeId, parent: Option<NodeId>) -> OusiaResult<()> {
        match self.kind_mut(struct_type) {
            Some(NodeKind::Type(TypeKind::Struct(s))) => {
                s.parent = parent;
                Ok(())
            }
            _ => Err(LoggableException::structure("Parent can only be set on struct types")),
        }
    }

    /// Makes the types of `include` visible in `typesystem`.
    pub fn add_typesystem_include(&mut self, typesystem: NodeId, include: NodeId) -> OusiaResult<()> {
        self.attach(typesystem, Slot::TypesystemIncludes, include)
    }

    // ==================== Queries ====================

    pub fn type_kind(&self, ty: NodeId) -> Option<&TypeKind> {
        match self.kind(ty) {
            Some(NodeKind::Type(kind)) => Some(kind),
            _ => None,
        }
    }

    pub fn is_system_typesystem(&self, typesystem: NodeId) -> bool {
        matches!(self.kind(typesystem), Some(NodeKind::Typesystem(t)) if t.system)
    }

    /// Looks up a type in a typesystem and its includes.
    pub fn lookup_type(&self, typesystem: NodeId, name: &str) -> Option<NodeId> {
        let mut visited = HashSet::new();
        let mut stack = vec![typesystem];
        while let Some(ts) = stack.pop() {
            if !visited.insert(ts) {
                continue;
            }
            if let Some(ty) = self.child_by_name(ts, Slot::TypesystemTypes, name) {
                return Some(ty);
            }
            stack.extend(self.children(ts, Slot::TypesystemIncludes).iter().rev());
        }
        None
    }

    pub fn struct_parent(&self, struct_type: NodeId) -> Option<NodeId> {
        match self.type_kind(struct_type) {
            Some(TypeKind::Struct(s)) => s.parent,
            _ => None,
        }
    }

    /// Struct types from the root of the inheritance chain down to
    /// `struct_type`. Cycles are cut.
    fn struct_chain(&self, struct_type: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(struct_type);
        while let Some(id) = current {
            if chain.contains(&id) || !matches!(self.type_kind(id), Some(TypeKind::Struct(_))) {
                break;
            }
            chain.push(id);
            current = self.struct_parent(id);
        }
        chain.reverse();
        chain
    }

    /// Whether the parent chain of a struct type loops.
    pub fn struct_has_cycle(&self, struct_type: NodeId) -> bool {
        let chain = self.struct_chain(struct_type);
        chain
            .first()
            .and_then(|&root| self.struct_parent(root))
            .map_or(false, |p| chain.contains(&p))
    }

    /// All attributes of a struct type including inherited ones, parent
    /// attributes first.
    pub fn struct_attributes(&self, struct_type: NodeId) -> Vec<NodeId> {
        self.struct_chain(struct_type)
            .into_iter()
            .flat_map(|s| self.children(s, Slot::StructAttributes).to_vec())
            .collect()
    }

    pub fn struct_attribute_index(&self, struct_type: NodeId, name: &str) -> Option<usize> {
        self.struct_attributes(struct_type)
            .into_iter()
            .position(|a| self.name(a) == name)
    }

    pub fn attribute_data(&self, attribute: NodeId) -> Option<&AttributeData> {
        match self.kind(attribute) {
            Some(NodeKind::Attribute(a)) => Some(a),
            _ => None,
        }
    }

    pub fn enumeration_values(&self, ty: NodeId) -> &[String] {
        match self.type_kind(ty) {
            Some(TypeKind::Enumeration(values)) => values,
            _ => &[],
        }
    }

    pub fn enumeration_ordinal(&self, ty: NodeId, name: &str) -> Option<usize> {
        self.enumeration_values(ty).iter().position(|v| v == name)
    }

    /// Default value of a type.
    pub fn type_create(&self, ty: NodeId) -> Variant {
        match self.type_kind(ty) {
            Some(TypeKind::Bool) => Variant::Bool(false),
            Some(TypeKind::Int) | Some(TypeKind::Enumeration(_)) => Variant::Int(0),
            Some(TypeKind::Double) => Variant::Double(0.0),
            Some(TypeKind::String) => Variant::String(String::new()),
            Some(TypeKind::Array(_)) => Variant::Array(VariantArray::new()),
            Some(TypeKind::Struct(_)) => Variant::Array(
                self.struct_attributes(ty)
                    .into_iter()
                    .map(|a| self.attribute_default(a))
                    .collect(),
            ),
            Some(TypeKind::Unknown) | None => Variant::Null,
        }
    }

    fn attribute_default(&self, attribute: NodeId) -> Variant {
        match self.attribute_data(attribute) {
            Some(a) if a.optional => a.default.clone(),
            Some(a) => a.ty.map_or(Variant::Null, |t| self.type_create(t)),
            None => Variant::Null,
        }
    }

    // ==================== Preparation ====================

    /// Checks `var` against the type `ty` and coerces it in place.
    ///
    /// Returns false and replaces `var` by a well-formed default if the
    /// value is not acceptable.
    pub fn prepare(&self, ty: NodeId, var: &mut Variant, logger: &mut dyn Logger) -> bool {
        let mut visiting = Vec::new();
        self.prepare_at(ty, var, logger, &mut visiting)
    }

    fn prepare_at(
        &self,
        ty: NodeId,
        var: &mut Variant,
        logger: &mut dyn Logger,
        visiting: &mut Vec<NodeId>,
    ) -> bool {
        let Some(kind) = self.type_kind(ty) else {
            logger.error("Cannot prepare value with an invalid type", SourceLocation::default());
            return false;
        };
        match kind {
            TypeKind::Bool => VariantConverter::to_bool(var, logger, ConversionMode::Safe),
            TypeKind::Int => VariantConverter::to_int(var, logger, ConversionMode::Safe),
            TypeKind::Double => VariantConverter::to_double(var, logger, ConversionMode::Safe),
            TypeKind::String => {
                if !var.is_string() && !var.is_magic() {
                    logger.note(
                        format!("Implicit conversion from {} to string", var.type_name()),
                        SourceLocation::default(),
                    );
                }
                VariantConverter::to_string(var, logger, ConversionMode::Safe)
            }
            TypeKind::Unknown => true,
            TypeKind::Enumeration(values) => self.prepare_enumeration(values, var, logger),
            TypeKind::Array(inner) => {
                let Variant::Array(items) = var else {
                    logger.error(
                        format!("Expected array but got {}", var.type_name()),
                        SourceLocation::default(),
                    );
                    *var = Variant::Array(VariantArray::new());
                    return false;
                };
                let mut ok = true;
                for item in items.iter_mut() {
                    ok &= self.prepare_at(*inner, item, logger, visiting);
                }
                ok
            }
            TypeKind::Struct(_) => {
                if visiting.contains(&ty) {
                    logger.error(
                        format!("Struct type \"{}\" contains itself", self.name(ty)),
                        SourceLocation::default(),
                    );
                    *var = Variant::Null;
                    return false;
                }
                visiting.push(ty);
                let ok = self.prepare_struct(ty, var, logger, visiting);
                visiting.pop();
                ok
            }
        }
    }

    fn prepare_enumeration(&self, values: &[String], var: &mut Variant, logger: &mut dyn Logger) -> bool {
        match var {
            Variant::Int(i) if *i >= 0 && (*i as usize) < values.len() => true,
            Variant::Int(i) => {
                logger.error(
                    format!("Invalid ordinal {i} for enumeration with {} constants", values.len()),
                    SourceLocation::default(),
                );
                *var = Variant::Int(0);
                false
            }
            Variant::String(s) | Variant::Magic(s) => match values.iter().position(|v| v == s) {
                Some(ordinal) => {
                    *var = Variant::Int(ordinal as i64);
                    true
                }
                None => {
                    logger.error(
                        format!(
                            "Unknown enumeration constant \"{s}\", expected one of {}",
                            values.join(", ")
                        ),
                        SourceLocation::default(),
                    );
                    *var = Variant::Int(0);
                    false
                }
            },
            ref other => {
                logger.error(
                    format!("Expected enumeration constant but got {}", other.type_name()),
                    SourceLocation::default(),
                );
                *var = Variant::Int(0);
                false
            }
        }
    }

    fn prepare_struct(
        &self,
        ty: NodeId,
        var: &mut Variant,
        logger: &mut dyn Logger,
        visiting: &mut Vec<NodeId>,
    ) -> bool {
        let attributes = self.struct_attributes(ty);
        let mut ok = true;
        let mut values: Vec<Option<Variant>> = vec![None; attributes.len()];
        match std::mem::take(var) {
            Variant::Array(items) => {
                if items.len() > attributes.len() {
                    logger.error(
                        format!(
                            "Expected at most {} attributes but got {}",
                            attributes.len(),
                            items.len()
                        ),
                        SourceLocation::default(),
                    );
                    ok = false;
                }
                for (slot, item) in values.iter_mut().zip(items) {
                    *slot = Some(item);
                }
            }
            Variant::Map(entries) => {
                for (key, value) in entries {
                    match attributes.iter().position(|&a| self.name(a) == key) {
                        Some(i) => values[i] = Some(value),
                        None => {
                            logger.error(
                                format!("Invalid attribute \"{key}\""),
                                SourceLocation::default(),
                            );
                            ok = false;
                        }
                    }
                }
            }
            other => {
                logger.error(
                    format!("Expected array or map but got {}", other.type_name()),
                    SourceLocation::default(),
                );
                *var = self.type_create(ty);
                return false;
            }
        }

        let mut result = VariantArray::with_capacity(attributes.len());
        for (&attribute, value) in attributes.iter().zip(values) {
            let Some(data) = self.attribute_data(attribute) else {
                result.push(Variant::Null);
                continue;
            };
            let name = self.name(attribute);
            let mut value = match value {
                Some(v) => v,
                None if data.optional => {
                    logger.note(
                        format!("Using default value for attribute \"{name}\""),
                        SourceLocation::default(),
                    );
                    result.push(data.default.clone());
                    continue;
                }
                None => {
                    logger.error(
                        format!("Missing attribute \"{name}\""),
                        SourceLocation::default(),
                    );
                    ok = false;
                    result.push(self.attribute_default(attribute));
                    continue;
                }
            };
            if let Some(attr_ty) = data.ty {
                ok &= self.prepare_at(attr_ty, &mut value, logger, visiting);
            }
            result.push(value);
        }
        *var = Variant::Array(result);
        ok
    }

    // ==================== Validation ====================

    pub(crate) fn validate_typesystem(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let mut valid = self.validate_name(id, logger);
        valid &= self.validate_unique_names(self.children(id, Slot::TypesystemTypes), "types", logger);
        valid
    }

    pub(crate) fn validate_type(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let location = self.location(id);
        let name = self.name(id);
        match self.type_kind(id) {
            Some(TypeKind::Enumeration(values)) => {
                let mut valid = self.validate_name(id, logger);
                if values.is_empty() {
                    logger.error(format!("Enumeration \"{name}\" has no constants"), location);
                    valid = false;
                }
                let mut seen = HashSet::new();
                for value in values {
                    if !is_identifier(value) {
                        logger.error(format!("\"{value}\" is not a valid enumeration constant"), location);
                        valid = false;
                    }
                    if !seen.insert(value.as_str()) {
                        logger.error(format!("Enumeration constant \"{value}\" is duplicated"), location);
                        valid = false;
                    }
                }
                valid
            }
            Some(TypeKind::Array(inner)) => {
                if self.isa(*inner, &types::TYPE) {
                    true
                } else {
                    logger.error(format!("Inner type of \"{name}\" is not a type"), location);
                    false
                }
            }
            Some(TypeKind::Struct(data)) => {
                let mut valid = name.is_empty() || self.validate_name(id, logger);
                if let Some(parent) = data.parent {
                    if !self.isa(parent, &types::STRUCT_TYPE) {
                        logger.error(format!("Parent of \"{name}\" is not a struct type"), location);
                        valid = false;
                    }
                }
                if self.struct_has_cycle(id) {
                    logger.error(format!("Struct type \"{name}\" inherits from itself"), location);
                    return false;
                }
                let mut seen = HashSet::new();
                for attribute in self.struct_attributes(id) {
                    let attr_name = self.name(attribute);
                    if !seen.insert(attr_name) {
                        logger.error(
                            format!("Attribute \"{attr_name}\" is defined more than once in \"{name}\""),
                            self.location(attribute),
                        );
                        valid = false;
                    }
                }
                valid
            }
            Some(_) => self.validate_name(id, logger),
            None => false,
        }
    }

    pub(crate) fn validate_attribute(&self, id: NodeId, logger: &mut dyn Logger) -> bool {
        let Some(data) = self.attribute_data(id) else {
            return false;
        };
        let mut valid = self.validate_name(id, logger);
        match data.ty {
            Some(ty) if !self.isa(ty, &types::TYPE) => {
                logger.error(
                    format!("Type of attribute \"{}\" is not a type", self.name(id)),
                    self.location(id),
                );
                valid = false;
            }
            Some(ty) if data.optional => {
                let mut default = data.default.clone();
                if !self.prepare(ty, &mut default, logger) {
                    logger.error(
                        format!("Invalid default value for attribute \"{}\"", self.name(id)),
                        self.location(id),
                    );
                    valid = false;
                }
            }
            _ => {}
        }
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{ConcreteLogger, Severity};
    use crate::variant::VariantMap;

    fn system(mgr: &mut Manager) -> NodeId {
        mgr.create_system_typesystem().unwrap()
    }

    fn map(entries: &[(&str, Variant)]) -> Variant {
        Variant::Map(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<VariantMap>(),
        )
    }

    // ==================== Primitive tests ====================

    #[test]
    fn test_system_typesystem() {
        let mut mgr = Manager::new();
        let sys = system(&mut mgr);
        assert!(mgr.is_system_typesystem(sys));
        assert!(mgr.isa(sys, &types::TYPESYSTEM));
        for name in ["string", "int", "double", "bool"] {
            assert!(mgr.lookup_type(sys, name).is_some(), "{name}");
        }
        let mut logger = ConcreteLogger::default();
        assert!(mgr.validate(sys, &mut logger));
    }

    #[test]
    fn test_prepare_primitives() {
        let mut mgr = Manager::new();
        let sys = system(&mut mgr);
        let int = mgr.lookup_type(sys, "int").unwrap();
        let double = mgr.lookup_type(sys, "double").unwrap();
        let string = mgr.lookup_type(sys, "string").unwrap();
        let mut logger = ConcreteLogger::default();

        let mut v = Variant::Int(3);
        assert!(mgr.prepare(double, &mut v, &mut logger));
        assert_eq!(v, Variant::Double(3.0));

        let mut v = Variant::Double(3.5);
        assert!(!mgr.prepare(int, &mut v, &mut logger));
        assert_eq!(v, Variant::Int(0));

        let mut v = Variant::Int(5);
        assert!(mgr.prepare(string, &mut v, &mut logger));
        assert_eq!(v, Variant::from("5"));
        assert!(logger.contains("Implicit conversion from integer to string"));

        let mut v = Variant::magic("abc");
        assert!(mgr.prepare(string, &mut v, &mut logger));
        assert_eq!(v, Variant::String("abc".into()));
    }

    #[test]
    fn test_prepare_unknown_accepts_anything() {
        let mut mgr = Manager::new();
        let ts = mgr.create_typesystem("ts");
        let unknown = mgr.create_type(ts, "any", TypeKind::Unknown).unwrap();
        let mut logger = ConcreteLogger::default();
        let mut v = Variant::Array(vec![1.into(), "x".into()]);
        assert!(mgr.prepare(unknown, &mut v, &mut logger));
        assert_eq!(v, Variant::Array(vec![1.into(), "x".into()]));
    }

    // ==================== Enumeration tests ====================

    #[test]
    fn test_enumeration_validated_factory() {
        let mut mgr = Manager::new();
        let ts = mgr.create_typesystem("ts");
        let mut logger = ConcreteLogger::default();
        let e = mgr
            .create_enumeration_type(ts, "color", &["red", "green", "red", "no such"], &mut logger)
            .unwrap();
        assert_eq!(mgr.enumeration_values(e), &["red".to_string(), "green".to_string()]);
        assert_eq!(logger.severity_count(Severity::Error), 2);
    }

    #[test]
    fn test_prepare_enumeration() {
        let mut mgr = Manager::new();
        let ts = mgr.create_typesystem("ts");
        let mut logger = ConcreteLogger::default();
        let e = mgr
            .create_enumeration_type(ts, "color", &["red", "green"], &mut logger)
            .unwrap();

        let mut v = Variant::magic("green");
        assert!(mgr.prepare(e, &mut v, &mut logger));
        assert_eq!(v, Variant::Int(1));

        let mut v = Variant::Int(1);
        assert!(mgr.prepare(e, &mut v, &mut logger));

        let mut v = Variant::Int(2);
        assert!(!mgr.prepare(e, &mut v, &mut logger));
        assert_eq!(v, Variant::Int(0));

        let mut v = Variant::magic("blue");
        assert!(!mgr.prepare(e, &mut v, &mut logger));
        assert!(logger.contains("Unknown enumeration constant \"blue\""));

        let mut v = Variant::Double(1.5);
        assert!(!mgr.prepare(e, &mut v, &mut logger));
        assert_eq!(v, Variant::Int(0));
        assert!(logger.contains("Expected enumeration constant but got double"));
    }

    // ==================== Array tests ====================

    #[test]
    fn test_array_type() {
        let mut mgr = Manager::new();
        let sys = system(&mut mgr);
        let int = mgr.lookup_type(sys, "int").unwrap();
        let ts = mgr.create_typesystem("ts");
        let arr = mgr.create_array_type(ts, int).unwrap();
        assert_eq!(mgr.name(arr), "int[]");
        assert_eq!(mgr.create_array_type(ts, int).unwrap(), arr);

        let mut logger = ConcreteLogger::default();
        let mut v = Variant::Array(vec![1.into(), 2.into()]);
        assert!(mgr.prepare(arr, &mut v, &mut logger));

        let mut v = Variant::Array(vec![1.into(), "x".into()]);
        assert!(!mgr.prepare(arr, &mut v, &mut logger));
        assert_eq!(v, Variant::Array(vec![1.into(), 0.into()]));

        let mut v = Variant::Int(1);
        assert!(!mgr.prepare(arr, &mut v, &mut logger));
        assert_eq!(v, Variant::Array(vec![]));
    }

    // ==================== Struct tests ====================

    fn point(mgr: &mut Manager) -> (NodeId, NodeId) {
        let sys = system(mgr);
        let int = mgr.lookup_type(sys, "int").unwrap();
        let ts = mgr.create_typesystem("geometry");
        let point = mgr.create_struct_type(ts, "point").unwrap();
        mgr.create_attribute(point, "x", Some(int), None).unwrap();
        mgr.create_attribute(point, "y", Some(int), Some(Variant::Int(7))).unwrap();
        (ts, point)
    }

    #[test]
    fn test_struct_from_map() {
        let mut mgr = Manager::new();
        let (_, point) = point(&mut mgr);
        let mut logger = ConcreteLogger::default();

        let mut v = map(&[("x", 1.into()), ("y", 2.into())]);
        assert!(mgr.prepare(point, &mut v, &mut logger));
        assert_eq!(v, Variant::Array(vec![1.into(), 2.into()]));

        let mut v = map(&[("x", 1.into())]);
        assert!(mgr.prepare(point, &mut v, &mut logger));
        assert_eq!(v, Variant::Array(vec![1.into(), 7.into()]));
        assert!(logger.contains("Using default value for attribute \"y\""));
        assert!(!logger.has_error());
    }

    #[test]
    fn test_struct_errors() {
        let mut mgr = Manager::new();
        let (_, point) = point(&mut mgr);
        let mut logger = ConcreteLogger::default();

        let mut v = map(&[("y", 2.into())]);
        assert!(!mgr.prepare(point, &mut v, &mut logger));
        assert!(logger.contains("Missing attribute \"x\""));
        assert_eq!(v, Variant::Array(vec![0.into(), 2.into()]));

        let mut v = map(&[("x", 1.into()), ("z", 2.into())]);
        assert!(!mgr.prepare(point, &mut v, &mut logger));
        assert!(logger.contains("Invalid attribute \"z\""));

        let mut v = Variant::Array(vec![1.into(), 2.into(), 3.into()]);
        assert!(!mgr.prepare(point, &mut v, &mut logger));

        let mut v = Variant::Bool(true);
        assert!(!mgr.prepare(point, &mut v, &mut logger));
        assert_eq!(v, Variant::Array(vec![0.into(), 7.into()]));
    }

    #[test]
    fn test_struct_inheritance() {
        let mut mgr = Manager::new();
        let (ts, point) = point(&mut mgr);
        assert_eq!(mgr.lookup_type(ts, "point"), Some(point));
        let string_ts = mgr.create_system_typesystem().unwrap();
        let string = mgr.lookup_type(string_ts, "string").unwrap();
        let labeled = mgr.create_struct_type(ts, "labeled_point").unwrap();
        mgr.create_attribute(labeled, "label", Some(string), Some("".into())).unwrap();
        mgr.set_struct_parent(labeled, Some(point)).unwrap();

        assert_eq!(mgr.struct_attribute_index(labeled, "label"), Some(2));
        let mut logger = ConcreteLogger::default();
        let mut v = map(&[("x", 1.into()), ("label", "p".into())]);
        assert!(mgr.prepare(labeled, &mut v, &mut logger));
        assert_eq!(v, Variant::Array(vec![1.into(), 7.into(), "p".into()]));
        assert!(mgr.validate(ts, &mut logger));
    }

    #[test]
    fn test_struct_shadowed_attribute_invalid() {
        let mut mgr = Manager::new();
        let (ts, point) = point(&mut mgr);
        let child = mgr.create_struct_type(ts, "child").unwrap();
        mgr.create_attribute(child, "x", None, None).unwrap();
        mgr.set_struct_parent(child, Some(point)).unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!mgr.validate(ts, &mut logger));
        assert!(logger.contains("Attribute \"x\" is defined more than once"));
    }

    #[test]
    fn test_struct_cycle_invalid() {
        let mut mgr = Manager::new();
        let ts = mgr.create_typesystem("ts");
        let a = mgr.create_struct_type(ts, "a").unwrap();
        let b = mgr.create_struct_type(ts, "b").unwrap();
        mgr.set_struct_parent(a, Some(b)).unwrap();
        mgr.set_struct_parent(b, Some(a)).unwrap();
        assert!(mgr.struct_has_cycle(a));
        let mut logger = ConcreteLogger::default();
        assert!(!mgr.validate(ts, &mut logger));
        assert!(logger.contains("inherits from itself"));
    }

    #[test]
    fn test_invalid_default_value() {
        let mut mgr = Manager::new();
        let sys = system(&mut mgr);
        let int = mgr.lookup_type(sys, "int").unwrap();
        let ts = mgr.create_typesystem("ts");
        let s = mgr.create_struct_type(ts, "s").unwrap();
        mgr.create_attribute(s, "a", Some(int), Some("x".into())).unwrap();
        let mut logger = ConcreteLogger::default();
        assert!(!mgr.validate(ts, &mut logger));
        assert!(logger.contains("Invalid default value for attribute \"a\""));
    }

    #[test]
    fn test_type_create() {
        let mut mgr = Manager::new();
        let (_, point) = point(&mut mgr);
        assert_eq!(mgr.type_create(point), Variant::Array(vec![0.into(), 7.into()]));
    }

    #[test]
    fn test_includes() {
        let mut mgr = Manager::new();
        let sys = system(&mut mgr);
        let ts = mgr.create_typesystem("ts");
        mgr.add_typesystem_include(ts, sys).unwrap();
        assert!(mgr.lookup_type(ts, "int").is_some());
        assert!(mgr.lookup_type(ts, "float").is_none());
    }
}
