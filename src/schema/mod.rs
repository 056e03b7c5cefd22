//! Aggregate layouts.
//!
//! A [`FieldSchema`] describes either one field of an aggregate or a whole
//! aggregate (the top-level schema has no name and no offset). Schemas are
//! immutable once built and shared through `Arc`; nested aggregates borrow
//! the inner schema's layout and ABI descriptor instead of copying them.
//!
//! Fields are packed in declaration order with no padding.

mod builder;
mod spec;

pub use spec::{FieldSpec, TypeSpec};

use crate::types::{PrimType, POINTER_SIZE};
use libffi::raw::ffi_type;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Field type: a primitive, or a nested aggregate layout.
#[derive(Debug, Clone)]
pub enum FieldType {
    Primitive(PrimType),
    Struct(Arc<StructLayout>),
}

/// Ordered fields of an aggregate with a by-name index.
#[derive(Debug)]
pub struct StructLayout {
    fields: Vec<FieldSchema>,
    index: FxHashMap<String, usize>,
}

impl StructLayout {
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Recursive layout comparison: same field count and, pairwise, same
    /// kind, primitive, dimension and offset. Names are not compared.
    pub fn compatible(&self, other: &StructLayout) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.same_shape(b))
    }
}

/// One field, or a whole aggregate.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    name: Option<String>,
    ty: FieldType,
    dimension: Option<u32>,
    offset: Option<u32>,
    width: u32,
    abi: AbiType,
}

impl FieldSchema {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn dimension(&self) -> Option<u32> {
        self.dimension
    }

    pub fn is_array(&self) -> bool {
        self.dimension.is_some()
    }

    /// Byte offset inside the enclosing aggregate; `None` at top level.
    pub fn offset(&self) -> Option<u32> {
        self.offset
    }

    /// Width of a single element.
    pub fn width(&self) -> usize {
        self.width as usize
    }

    /// `width * dimension` for arrays, `width` otherwise.
    pub fn total_size(&self) -> usize {
        self.width as usize * self.dimension.unwrap_or(1) as usize
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.ty, FieldType::Struct(_))
    }

    pub fn primitive(&self) -> Option<PrimType> {
        match self.ty {
            FieldType::Primitive(p) => Some(p),
            FieldType::Struct(_) => None,
        }
    }

    pub fn layout(&self) -> Option<&Arc<StructLayout>> {
        match &self.ty {
            FieldType::Struct(layout) => Some(layout),
            FieldType::Primitive(_) => None,
        }
    }

    /// Fields of an aggregate schema; empty for a primitive field.
    pub fn fields(&self) -> &[FieldSchema] {
        self.layout().map(|l| l.fields()).unwrap_or(&[])
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.layout().and_then(|l| l.field(name))
    }

    /// Two schemas describe the same memory shape.
    ///
    /// Reflexive and symmetric; used before any aggregate bytes are copied
    /// from one instance into a slot typed by another schema.
    pub fn compatible(&self, other: &FieldSchema) -> bool {
        self.total_size() == other.total_size()
            && match (&self.ty, &other.ty) {
                (FieldType::Struct(a), FieldType::Struct(b)) => a.compatible(b),
                (FieldType::Primitive(a), FieldType::Primitive(b)) => a == b,
                _ => false,
            }
    }

    fn same_shape(&self, other: &FieldSchema) -> bool {
        self.dimension == other.dimension
            && self.offset == other.offset
            && self.width == other.width
            && match (&self.ty, &other.ty) {
                (FieldType::Struct(a), FieldType::Struct(b)) => a.compatible(b),
                (FieldType::Primitive(a), FieldType::Primitive(b)) => a == b,
                _ => false,
            }
    }

    /// Whole-aggregate schema for one element of a struct-typed field.
    pub fn element_schema(&self) -> Option<Arc<FieldSchema>> {
        match &self.ty {
            FieldType::Struct(_) => Some(Arc::new(FieldSchema {
                name: None,
                ty: self.ty.clone(),
                dimension: None,
                offset: None,
                width: self.width,
                abi: self.abi.clone(),
            })),
            FieldType::Primitive(_) => None,
        }
    }

    pub(crate) fn abi(&self) -> &AbiType {
        &self.abi
    }

    /// Size libffi assigns to the aggregate descriptor.
    ///
    /// Never smaller than the packed width of the fields it flattens.
    pub fn abi_size(&self) -> usize {
        self.abi.size()
    }

    /// Number of scalars in the flattened descriptor.
    pub fn scalar_count(&self) -> usize {
        match &self.abi {
            AbiType::Primitive(_) => self.dimension.unwrap_or(1) as usize,
            AbiType::Struct(s) => s.scalars.len() * self.dimension.unwrap_or(1) as usize,
        }
    }
}

impl fmt::Display for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{}: ", name)?;
        }
        match &self.ty {
            FieldType::Primitive(p) => write!(f, "{}", p)?,
            FieldType::Struct(layout) => {
                write!(f, "struct {{")?;
                for (i, field) in layout.fields().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}", field)?;
                }
                write!(f, " }}")?;
            }
        }
        if let Some(dim) = self.dimension {
            write!(f, " [{}]", dim)?;
        }
        Ok(())
    }
}

/// ABI descriptor for a field's element type.
#[derive(Debug, Clone)]
pub(crate) enum AbiType {
    Primitive(PrimType),
    Struct(Arc<StructAbi>),
}

impl AbiType {
    pub(crate) fn as_raw(&self) -> *mut ffi_type {
        match self {
            AbiType::Primitive(p) => p.ffi_type(),
            AbiType::Struct(s) => s.as_raw(),
        }
    }

    fn size(&self) -> usize {
        match self {
            AbiType::Primitive(p) => p.size(),
            AbiType::Struct(s) => s.ty.size,
        }
    }
}

/// An owned libffi struct descriptor whose elements are the flattened
/// scalars of the aggregate, terminated by a null pointer.
pub(crate) struct StructAbi {
    ty: Box<ffi_type>,
    // `ty.elements` points into this buffer; it is never resized.
    elements: Box<[*mut ffi_type]>,
    scalars: Vec<PrimType>,
}

// Primed once at build time; libffi only reads it afterwards and the
// element pointers are libffi's own immutable statics.
unsafe impl Send for StructAbi {}
unsafe impl Sync for StructAbi {}

impl StructAbi {
    pub(crate) fn as_raw(&self) -> *mut ffi_type {
        &*self.ty as *const ffi_type as *mut ffi_type
    }
}

impl fmt::Debug for StructAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructAbi")
            .field("size", &self.ty.size)
            .field("alignment", &self.ty.alignment)
            .field("elements", &(self.elements.len() - 1))
            .finish()
    }
}

/// The type of one routine parameter or return value.
#[derive(Debug, Clone)]
pub enum ValueType {
    Primitive(PrimType),
    Struct(Arc<FieldSchema>),
}

impl ValueType {
    /// Packed byte size of a value of this type.
    pub fn size(&self) -> usize {
        match self {
            ValueType::Primitive(p) => p.size(),
            ValueType::Struct(s) => s.total_size(),
        }
    }

    /// Bytes reserved for this type in an argument buffer.
    pub(crate) fn slot_size(&self) -> usize {
        match self {
            ValueType::Primitive(p) => p.size(),
            ValueType::Struct(s) => s.total_size().max(s.abi_size()),
        }
    }

    /// Alignment of an argument buffer slot.
    pub(crate) fn slot_align(&self) -> usize {
        match self {
            ValueType::Primitive(p) => p.alignment(),
            ValueType::Struct(_) => POINTER_SIZE,
        }
    }

    pub(crate) fn ffi_type(&self) -> *mut ffi_type {
        match self {
            ValueType::Primitive(p) => p.ffi_type(),
            ValueType::Struct(s) => s.abi().as_raw(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ValueType::Primitive(p) => p.keyword().to_string(),
            ValueType::Struct(s) => s.to_string(),
        }
    }
}

impl From<PrimType> for ValueType {
    fn from(ty: PrimType) -> Self {
        ValueType::Primitive(ty)
    }
}

impl From<Arc<FieldSchema>> for ValueType {
    fn from(schema: Arc<FieldSchema>) -> Self {
        ValueType::Struct(schema)
    }
}
