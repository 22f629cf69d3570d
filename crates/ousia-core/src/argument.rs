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

//! Argument schemas.
//!
//! An [`Arguments`] list describes the parameters of a command or function.
//! Validation coerces the given values to the declared types in SAFE mode;
//! missing values are replaced by their default (or by a typed zero value
//! plus an error), so the validated collection is always complete.

use std::collections::HashMap;

use crate::error::{LoggableException, OusiaResult};
use crate::function::NullFunction;
use crate::location::SourceLocation;
use crate::logger::{Logger, LoggerExt};
use crate::rtti::{types, Rtti};
use crate::variant::{ConversionMode, Variant, VariantArray, VariantConverter, VariantMap};

/// A single named, typed parameter.
#[derive(Debug, Clone)]
pub struct Argument {
    name: String,
    ty: &'static Rtti,
    inner: &'static Rtti,
    default: Variant,
    has_default: bool,
}

/// Zero value of a type, used when a mandatory argument is missing.
pub(crate) fn typed_default(ty: &'static Rtti) -> Variant {
    if ty == &types::BOOL {
        Variant::Bool(false)
    } else if ty == &types::INT {
        Variant::Int(0)
    } else if ty == &types::DOUBLE {
        Variant::Double(0.0)
    } else if ty == &types::STRING {
        Variant::String(String::new())
    } else if ty == &types::ARRAY {
        Variant::Array(VariantArray::new())
    } else if ty == &types::MAP {
        Variant::Map(VariantMap::new())
    } else if ty == &types::FUNCTION {
        Variant::function(NullFunction)
    } else {
        Variant::Null
    }
}

impl Argument {
    fn new(
        name: impl Into<String>,
        ty: &'static Rtti,
        inner: &'static Rtti,
        default: Option<Variant>,
    ) -> Self {
        let has_default = default.is_some();
        Self {
            name: name.into(),
            ty,
            inner,
            default: default.unwrap_or_default(),
            has_default,
        }
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, &types::NONE, &types::NONE, None)
    }

    pub fn any_with_default(name: impl Into<String>, default: Variant) -> Self {
        Self::new(name, &types::NONE, &types::NONE, Some(default))
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, &types::BOOL, &types::NONE, None)
    }

    pub fn bool_with_default(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, &types::BOOL, &types::NONE, Some(default.into()))
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, &types::INT, &types::NONE, None)
    }

    pub fn int_with_default(name: impl Into<String>, default: i64) -> Self {
        Self::new(name, &types::INT, &types::NONE, Some(default.into()))
    }

    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, &types::DOUBLE, &types::NONE, None)
    }

    pub fn double_with_default(name: impl Into<String>, default: f64) -> Self {
        Self::new(name, &types::DOUBLE, &types::NONE, Some(default.into()))
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, &types::STRING, &types::NONE, None)
    }

    pub fn string_with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(
            name,
            &types::STRING,
            &types::NONE,
            Some(Variant::String(default.into())),
        )
    }

    /// Object argument of the given node type.
    pub fn object(name: impl Into<String>, ty: &'static Rtti) -> Self {
        Self::new(name, ty, &types::NONE, None)
    }

    /// Object argument that defaults to null.
    pub fn optional_object(name: impl Into<String>, ty: &'static Rtti) -> Self {
        Self::new(name, ty, &types::NONE, Some(Variant::Null))
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::new(name, &types::FUNCTION, &types::NONE, None)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::array_of(name, &types::NONE)
    }

    pub fn array_of(name: impl Into<String>, inner: &'static Rtti) -> Self {
        Self::new(name, &types::ARRAY, inner, None)
    }

    pub fn array_with_default(name: impl Into<String>, inner: &'static Rtti, default: VariantArray) -> Self {
        Self::new(name, &types::ARRAY, inner, Some(Variant::Array(default)))
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self::map_of(name, &types::NONE)
    }

    pub fn map_of(name: impl Into<String>, inner: &'static Rtti) -> Self {
        Self::new(name, &types::MAP, inner, None)
    }

    pub fn map_with_default(name: impl Into<String>, inner: &'static Rtti, default: VariantMap) -> Self {
        Self::new(name, &types::MAP, inner, Some(Variant::Map(default)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &'static Rtti {
        self.ty
    }

    pub fn inner(&self) -> &'static Rtti {
        self.inner
    }

    pub fn default_value(&self) -> &Variant {
        &self.default
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    /// Value used when the argument is missing.
    fn missing_value(&self) -> Variant {
        if self.has_default {
            self.default.clone()
        } else {
            typed_default(self.ty)
        }
    }

    /// Coerces `var` to the declared type.
    ///
    /// On failure the variant is reset to the default value if there is one.
    pub fn validate(&self, var: &mut Variant, logger: &mut dyn Logger) -> bool {
        if self.has_default && self.default.is_null() && var.is_null() {
            return true;
        }
        if VariantConverter::convert(var, self.ty, self.inner, logger, ConversionMode::Safe) {
            return true;
        }
        if self.has_default {
            *var = self.default.clone();
        }
        false
    }
}

/// Ordered list of [`Argument`]s.
///
/// [`Arguments::none`] describes an unknown signature; validating against it
/// accepts everything unchanged.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    arguments: Vec<Argument>,
    names: HashMap<String, usize>,
    valid: bool,
}

impl Arguments {
    /// Signature that is not checked at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds a signature. Later arguments reusing a name are not reachable
    /// by name; use [`Arguments::try_new`] to reject them.
    pub fn new(arguments: Vec<Argument>) -> Self {
        let mut names = HashMap::with_capacity(arguments.len());
        for (i, arg) in arguments.iter().enumerate() {
            names.entry(arg.name.clone()).or_insert(i);
        }
        Self {
            arguments,
            names,
            valid: true,
        }
    }

    /// Builds a signature, failing on duplicate argument names.
    pub fn try_new(arguments: Vec<Argument>) -> OusiaResult<Self> {
        let args = Self::new(arguments);
        if args.names.len() != args.arguments.len() {
            let dup = args
                .arguments
                .iter()
                .enumerate()
                .find(|(i, a)| args.names.get(&a.name) != Some(i))
                .map(|(_, a)| a.name.clone())
                .unwrap_or_default();
            return Err(LoggableException::invalid_command(format!(
                "Argument \"{dup}\" is defined more than once"
            )));
        }
        Ok(args)
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Argument> {
        self.arguments.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.index_of(name).map(|i| &self.arguments[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Validates positional arguments in place.
    pub fn validate_array(&self, args: &mut VariantArray, logger: &mut dyn Logger) -> bool {
        if !self.valid {
            return true;
        }
        let mut ok = true;
        let given = args.len();
        if given > self.arguments.len() {
            logger.error(
                format!(
                    "Too many arguments: expected at most {} but got {given}",
                    self.arguments.len()
                ),
                SourceLocation::default(),
            );
            args.truncate(self.arguments.len());
            ok = false;
        }
        for (i, arg) in self.arguments.iter().enumerate() {
            if i < args.len() {
                ok &= arg.validate(&mut args[i], logger);
            } else {
                if !arg.has_default {
                    logger.error(
                        format!("Missing argument {} \"{}\"", i + 1, arg.name),
                        SourceLocation::default(),
                    );
                    ok = false;
                }
                args.push(arg.missing_value());
            }
        }
        ok
    }

    /// Validates keyword arguments in place.
    ///
    /// Unknown keys produce a warning and are left untouched if
    /// `ignore_unknown` is set, otherwise they are errors.
    pub fn validate_map(
        &self,
        args: &mut VariantMap,
        logger: &mut dyn Logger,
        ignore_unknown: bool,
    ) -> bool {
        if !self.valid {
            return true;
        }
        let mut ok = true;
        for (key, value) in args.iter_mut() {
            match self.get(key) {
                Some(arg) => ok &= arg.validate(value, logger),
                None if ignore_unknown => {
                    logger.warning(
                        format!("Ignoring unknown argument \"{key}\""),
                        SourceLocation::default(),
                    );
                }
                None => {
                    logger.error(
                        format!("Invalid argument \"{key}\""),
                        SourceLocation::default(),
                    );
                    ok = false;
                }
            }
        }
        for arg in &self.arguments {
            if args.contains_key(&arg.name) {
                continue;
            }
            if !arg.has_default {
                logger.error(
                    format!("Missing argument \"{}\"", arg.name),
                    SourceLocation::default(),
                );
                ok = false;
            }
            args.insert(arg.name.clone(), arg.missing_value());
        }
        ok
    }

    /// Converts positional arguments to a map keyed by argument name.
    pub fn to_map(&self, args: VariantArray) -> VariantMap {
        self.arguments
            .iter()
            .zip(args)
            .map(|(arg, value)| (arg.name.clone(), value))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.arguments.iter()
    }
}
