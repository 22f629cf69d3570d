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

//! Callable values and properties.
//!
//! Functions are carried around inside [`Variant`]s but never evaluated by
//! the core itself; host code registers native functions and methods that
//! formats and handlers may call.

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::argument::Arguments;
use crate::error::{ErrorKind, LoggableException, OusiaResult};
use crate::logger::ExceptionLogger;
use crate::rtti::{types, Rtti};
use crate::variant::{ConversionMode, Variant, VariantArray, VariantConverter};

/// A callable value.
pub trait Function: fmt::Debug {
    /// Calls the function. `this_ref` is the object a method is bound to.
    fn call(&self, args: &VariantArray, this_ref: Option<&mut dyn Any>) -> OusiaResult<Variant>;
}

/// Function doing nothing and returning null.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFunction;

impl Function for NullFunction {
    fn call(&self, _args: &VariantArray, _this_ref: Option<&mut dyn Any>) -> OusiaResult<Variant> {
        Ok(Variant::Null)
    }
}

fn validate_args(arguments: &Arguments, args: &VariantArray) -> OusiaResult<VariantArray> {
    let mut args = args.clone();
    let mut logger = ExceptionLogger::new(ErrorKind::TypeMismatch);
    arguments.validate_array(&mut args, &mut logger);
    logger.into_result(args)
}

type NativeCallback = dyn Fn(&VariantArray) -> OusiaResult<Variant>;

/// Host function with an optional argument schema.
///
/// Arguments are validated before the callback runs; validation errors are
/// returned as [`ErrorKind::TypeMismatch`] exceptions.
#[derive(Clone)]
pub struct NativeFunction {
    arguments: Arguments,
    callback: Rc<NativeCallback>,
}

impl NativeFunction {
    pub fn new(callback: impl Fn(&VariantArray) -> OusiaResult<Variant> + 'static) -> Self {
        Self::with_arguments(Arguments::none(), callback)
    }

    pub fn with_arguments(
        arguments: Arguments,
        callback: impl Fn(&VariantArray) -> OusiaResult<Variant> + 'static,
    ) -> Self {
        Self {
            arguments,
            callback: Rc::new(callback),
        }
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("arguments", &self.arguments.len())
            .finish_non_exhaustive()
    }
}

impl Function for NativeFunction {
    fn call(&self, args: &VariantArray, _this_ref: Option<&mut dyn Any>) -> OusiaResult<Variant> {
        let args = validate_args(&self.arguments, args)?;
        (self.callback)(&args)
    }
}

/// Method callback bound to objects of type `T`.
pub type MethodCallback<T> = fn(&mut T, &VariantArray) -> OusiaResult<Variant>;

/// Function calling a static callback on a `this` object of type `T`.
pub struct Method<T> {
    arguments: Arguments,
    callback: MethodCallback<T>,
    _marker: PhantomData<fn(&mut T)>,
}

impl<T: 'static> Method<T> {
    pub fn new(callback: MethodCallback<T>) -> Self {
        Self::with_arguments(Arguments::none(), callback)
    }

    pub fn with_arguments(arguments: Arguments, callback: MethodCallback<T>) -> Self {
        Self {
            arguments,
            callback,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Method<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Method<{}>", type_name::<T>())
    }
}

impl<T: 'static> Function for Method<T> {
    fn call(&self, args: &VariantArray, this_ref: Option<&mut dyn Any>) -> OusiaResult<Variant> {
        let this = this_ref
            .and_then(|t| t.downcast_mut::<T>())
            .ok_or_else(|| {
                LoggableException::type_mismatch("unknown object", type_name::<T>())
            })?;
        let args = validate_args(&self.arguments, args)?;
        (self.callback)(this, &args)
    }
}

/// Declared type of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyType {
    pub ty: &'static Rtti,
    /// Element type for arrays and maps.
    pub inner: &'static Rtti,
}

impl PropertyType {
    pub fn new(ty: &'static Rtti) -> Self {
        Self {
            ty,
            inner: &types::NONE,
        }
    }

    pub fn with_inner(ty: &'static Rtti, inner: &'static Rtti) -> Self {
        Self { ty, inner }
    }
}

impl Default for PropertyType {
    fn default() -> Self {
        Self::new(&types::NONE)
    }
}

/// Getter/setter pair exposing a value of a host object.
///
/// Values passed to [`Property::set`] are checked against the declared
/// [`PropertyType`] before the setter sees them. A property without setter
/// is read-only.
#[derive(Debug, Clone)]
pub struct Property {
    ty: PropertyType,
    getter: Option<Rc<dyn Function>>,
    setter: Option<Rc<dyn Function>>,
}

impl Property {
    pub fn new(
        ty: PropertyType,
        getter: Option<Rc<dyn Function>>,
        setter: Option<Rc<dyn Function>>,
    ) -> Self {
        Self { ty, getter, setter }
    }

    pub fn read_only(ty: PropertyType, getter: Rc<dyn Function>) -> Self {
        Self::new(ty, Some(getter), None)
    }

    /// Builds a property from accessor functions of `T`.
    pub fn from_accessors<T: 'static>(
        ty: PropertyType,
        getter: MethodCallback<T>,
        setter: Option<MethodCallback<T>>,
    ) -> Self {
        Self::new(
            ty,
            Some(Rc::new(Method::new(getter))),
            setter.map(|s| Rc::new(Method::new(s)) as Rc<dyn Function>),
        )
    }

    pub fn property_type(&self) -> PropertyType {
        self.ty
    }

    pub fn is_readonly(&self) -> bool {
        self.setter.is_none()
    }

    pub fn get(&self, this: &mut dyn Any) -> OusiaResult<Variant> {
        match &self.getter {
            Some(getter) => getter.call(&VariantArray::new(), Some(this)),
            None => Err(LoggableException::invalid_command("Property has no getter")),
        }
    }

    pub fn set(&self, value: Variant, this: &mut dyn Any) -> OusiaResult<()> {
        let Some(setter) = &self.setter else {
            return Err(LoggableException::invalid_command("Property is read-only"));
        };
        let mut value = value;
        let mut logger = ExceptionLogger::new(ErrorKind::TypeMismatch);
        VariantConverter::convert(
            &mut value,
            self.ty.ty,
            self.ty.inner,
            &mut logger,
            ConversionMode::Safe,
        );
        logger.into_result(())?;
        setter.call(&vec![value], Some(this))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Argument;

    #[derive(Debug, Default)]
    struct Counter {
        value: i64,
    }

    fn get_value(c: &mut Counter, _args: &VariantArray) -> OusiaResult<Variant> {
        Ok(Variant::Int(c.value))
    }

    fn set_value(c: &mut Counter, args: &VariantArray) -> OusiaResult<Variant> {
        c.value = args[0].as_int()?;
        Ok(Variant::Null)
    }

    // ==================== Function tests ====================

    #[test]
    fn test_null_function() {
        assert_eq!(NullFunction.call(&vec![1.into()], None).unwrap(), Variant::Null);
    }

    #[test]
    fn test_native_function_validates() {
        let f = NativeFunction::with_arguments(
            Arguments::new(vec![Argument::int("a"), Argument::int_with_default("b", 10)]),
            |args| Ok(Variant::Int(args[0].as_int()? + args[1].as_int()?)),
        );
        assert_eq!(f.call(&vec![1.into()], None).unwrap(), Variant::Int(11));
        assert_eq!(f.call(&vec![1.into(), 2.into()], None).unwrap(), Variant::Int(3));
        let err = f.call(&vec!["x".into()], None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_method_downcasts_this() {
        let m = Method::new(get_value);
        let mut c = Counter { value: 4 };
        assert_eq!(m.call(&vec![], Some(&mut c)).unwrap(), Variant::Int(4));
        assert!(m.call(&vec![], None).is_err());
        let mut other = 5u8;
        assert!(m.call(&vec![], Some(&mut other)).is_err());
    }

    // ==================== Property tests ====================

    #[test]
    fn test_property_get_set() {
        let p = Property::from_accessors(
            PropertyType::new(&types::INT),
            get_value,
            Some(set_value),
        );
        let mut c = Counter::default();
        assert!(!p.is_readonly());
        p.set(Variant::Int(9), &mut c).unwrap();
        assert_eq!(c.value, 9);
        assert_eq!(p.get(&mut c).unwrap(), Variant::Int(9));
    }

    #[test]
    fn test_property_rejects_wrong_type() {
        let p = Property::from_accessors(
            PropertyType::new(&types::INT),
            get_value,
            Some(set_value),
        );
        let mut c = Counter::default();
        assert!(p.set(Variant::from("nine"), &mut c).is_err());
        assert_eq!(c.value, 0);
    }

    #[test]
    fn test_read_only_property() {
        let p = Property::read_only(PropertyType::new(&types::INT), Rc::new(Method::new(get_value)));
        let mut c = Counter::default();
        assert!(p.is_readonly());
        let err = p.set(Variant::Int(1), &mut c).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCommand);
    }
}
