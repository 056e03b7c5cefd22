//! Structured type specifications, as handed over by the host's parser.

use super::FieldSchema;
use crate::error::{FfiError, FfiResult};
use crate::types::PrimType;
use std::sync::Arc;

/// The type of one specified field.
#[derive(Debug, Clone)]
pub enum TypeSpec {
    Primitive(PrimType),
    /// An aggregate described inline.
    Struct(Vec<FieldSpec>),
    /// An aggregate that was already built; its layout is shared, not copied.
    Schema(Arc<FieldSchema>),
}

impl TypeSpec {
    /// Resolve a primitive keyword.
    pub fn keyword(word: &str) -> FfiResult<TypeSpec> {
        PrimType::from_keyword(word)
            .map(TypeSpec::Primitive)
            .ok_or_else(|| FfiError::unknown_type(word))
    }
}

impl From<PrimType> for TypeSpec {
    fn from(ty: PrimType) -> Self {
        TypeSpec::Primitive(ty)
    }
}

impl From<Arc<FieldSchema>> for TypeSpec {
    fn from(schema: Arc<FieldSchema>) -> Self {
        TypeSpec::Schema(schema)
    }
}

/// One `(name?, type, dimension?)` entry of an aggregate specification.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: Option<String>,
    pub ty: TypeSpec,
    pub dimension: Option<u64>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeSpec>) -> Self {
        FieldSpec {
            name: Some(name.into()),
            ty: ty.into(),
            dimension: None,
        }
    }

    pub fn anonymous(ty: impl Into<TypeSpec>) -> Self {
        FieldSpec {
            name: None,
            ty: ty.into(),
            dimension: None,
        }
    }

    /// Turn this entry into a fixed-size array of `dimension` elements.
    pub fn array(mut self, dimension: u64) -> Self {
        self.dimension = Some(dimension);
        self
    }
}
