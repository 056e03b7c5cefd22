//! Routine signatures.
//!
//! A routine specification is an ordered list of [`SpecItem`]s: named
//! parameters, at most one return declaration, an optional trailing
//! variadic marker, and free-text notes that are skipped.

use crate::error::{FfiError, FfiResult};
use crate::schema::{FieldSchema, TypeSpec, ValueType};
use crate::types::PrimType;
use crate::value::{Category, HostValue};
use std::sync::Arc;

/// A type as written in a routine specification; `void` included.
#[derive(Debug, Clone)]
pub enum RoutineType {
    Void,
    Of(TypeSpec),
}

impl RoutineType {
    /// `"void"` or any primitive keyword.
    pub fn keyword(word: &str) -> FfiResult<RoutineType> {
        if word == "void" {
            Ok(RoutineType::Void)
        } else {
            TypeSpec::keyword(word).map(RoutineType::Of)
        }
    }
}

impl From<PrimType> for RoutineType {
    fn from(ty: PrimType) -> Self {
        RoutineType::Of(TypeSpec::Primitive(ty))
    }
}

impl From<TypeSpec> for RoutineType {
    fn from(spec: TypeSpec) -> Self {
        RoutineType::Of(spec)
    }
}

impl From<Arc<FieldSchema>> for RoutineType {
    fn from(schema: Arc<FieldSchema>) -> Self {
        RoutineType::Of(TypeSpec::Schema(schema))
    }
}

#[derive(Debug, Clone)]
pub enum SpecItem {
    Param { name: String, ty: RoutineType },
    Return(RoutineType),
    Variadic,
    Note(String),
}

impl SpecItem {
    pub fn param(name: impl Into<String>, ty: impl Into<RoutineType>) -> Self {
        SpecItem::Param {
            name: name.into(),
            ty: ty.into(),
        }
    }

    pub fn returns(ty: impl Into<RoutineType>) -> Self {
        SpecItem::Return(ty.into())
    }
}

/// One fixed parameter.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    ty: ValueType,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: impl Into<ValueType>) -> Self {
        Param {
            name: name.into(),
            ty: ty.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    /// Whether a value of this category may be passed for the parameter.
    pub fn accepts(&self, category: Category) -> bool {
        accepts(&self.ty, category)
    }
}

/// Categories a slot of type `ty` accepts before encoding.
pub fn accepts(ty: &ValueType, category: Category) -> bool {
    match ty {
        ValueType::Struct(_) => category == Category::Struct,
        ValueType::Primitive(p) => match p {
            PrimType::Opaque => true,
            PrimType::Pointer => matches!(
                category,
                Category::Null
                    | Category::Integer
                    | Category::Text
                    | Category::Bytes
                    | Category::Struct
                    | Category::Routine
            ),
            p if p.is_float() => matches!(category, Category::Integer | Category::Float),
            _ => category == Category::Integer,
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Param>,
    ret: Option<ValueType>,
    variadic: bool,
}

impl Signature {
    /// Fixed-arity signature.
    pub fn new(params: Vec<Param>, ret: Option<ValueType>) -> Self {
        Signature {
            params,
            ret,
            variadic: false,
        }
    }

    /// Mark the signature as taking trailing variadic arguments.
    pub fn with_variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Parse a routine specification.
    pub fn parse(items: &[SpecItem]) -> FfiResult<Signature> {
        let mut sig = Signature::default();
        let mut ret_seen = false;

        for item in items {
            match item {
                SpecItem::Note(_) => {}
                SpecItem::Return(ty) => {
                    if ret_seen {
                        return Err(FfiError::duplicate_return());
                    }
                    ret_seen = true;
                    sig.ret = resolve(ty)?;
                }
                SpecItem::Variadic => {
                    if sig.variadic {
                        return Err(FfiError::duplicate_variadic());
                    }
                    sig.variadic = true;
                }
                SpecItem::Param { name, ty } => {
                    if sig.variadic {
                        return Err(FfiError::variadic_not_final(name.as_str()));
                    }
                    let ty = resolve(ty)?.ok_or_else(|| {
                        FfiError::invalid_spec(format!("parameter '{}' cannot be void", name))
                    })?;
                    sig.params.push(Param {
                        name: name.clone(),
                        ty,
                    });
                }
            }
        }
        Ok(sig)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn ret(&self) -> Option<&ValueType> {
        self.ret.as_ref()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn arg_types(&self) -> Vec<ValueType> {
        self.params.iter().map(|p| p.ty.clone()).collect()
    }

    /// Arity and per-parameter category checks, done before any encoding.
    pub fn check_args<V: HostValue>(&self, args: &[V]) -> FfiResult<()> {
        if args.len() != self.params.len() {
            return Err(FfiError::arity_mismatch(self.params.len(), args.len()));
        }
        for (param, arg) in self.params.iter().zip(args) {
            let category = arg.category();
            if !param.accepts(category) {
                return Err(FfiError::argument_error(
                    param.name.as_str(),
                    format!("expected {}, got {}", param.ty.describe(), category),
                ));
            }
        }
        Ok(())
    }
}

fn resolve(ty: &RoutineType) -> FfiResult<Option<ValueType>> {
    match ty {
        RoutineType::Void => Ok(None),
        RoutineType::Of(TypeSpec::Primitive(p)) => Ok(Some(ValueType::Primitive(*p))),
        RoutineType::Of(TypeSpec::Struct(fields)) => {
            Ok(Some(ValueType::Struct(FieldSchema::build(fields)?)))
        }
        RoutineType::Of(TypeSpec::Schema(schema)) => {
            if !schema.is_struct() || schema.offset().is_some() || schema.is_array() {
                return Err(FfiError::invalid_spec(
                    "routine types must be primitives or whole aggregates",
                ));
            }
            Ok(Some(ValueType::Struct(schema.clone())))
        }
    }
}
